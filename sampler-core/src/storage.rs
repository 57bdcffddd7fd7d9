//! Storage collaborator used by the diagnostic export.

use core::fmt;

/// Why a file could not be opened or committed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StorageError {
    /// The path does not fit the storage layer's path buffer.
    PathTooLong,
    /// The directory is missing or the medium is not mounted.
    NotFound,
    /// The medium refused the request.
    Denied,
    /// Any other driver failure.
    Io,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StorageError::PathTooLong => "path too long",
            StorageError::NotFound => "not found",
            StorageError::Denied => "access denied",
            StorageError::Io => "i/o failure",
        };
        f.write_str(label)
    }
}

/// An open export file.
pub trait DspFile {
    /// Writes `bytes`, returning how many were actually stored.
    ///
    /// A short count means the medium is full or failing; callers treat it
    /// as fatal for the current export.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Flushes and closes the file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when buffered data could not be committed;
    /// the export is then incomplete even if every write succeeded.
    fn close(self) -> Result<(), StorageError>;
}

/// Application data storage.
pub trait Storage {
    type File: DspFile;

    /// Opens `path` for writing, creating it or truncating an existing file.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the file cannot be created.
    fn open_truncate(&self, path: &str) -> Result<Self::File, StorageError>;
}

impl<S: Storage + ?Sized> Storage for &S {
    type File = S::File;

    fn open_truncate(&self, path: &str) -> Result<Self::File, StorageError> {
        (**self).open_truncate(path)
    }
}
