//! Diagnostic download and export.
//!
//! Entering the screen asks the rangefinder for its identification and its
//! diagnostic log. The log streams in as cumulative frames; the first half of
//! the progress bar tracks the download and the second half tracks the export.
//! Once the last value arrives the handler writes the `.dsp` file
//! synchronously, on the decoder's activity, before returning.

pub mod dsp;

use chrono::NaiveDateTime;
use heapless::String;

use crate::events::{EventSink, FrameRejection, SamplerEvent};
use crate::link::{DiagnosticHandler, IdentificationHandler, LrfCommand, LrfLink};
use crate::model::{ModelCell, StatusLines};
use crate::records::{DiagnosticFrame, Identification};
use crate::storage::{DspFile, Storage, StorageError};
use crate::time::{Calendar, TickSource, elapsed_ms};

use self::dsp::{ExportName, Line};

pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_PROGRESS_UPDATE_EVERY_MS: u32 = 250;
pub const DATA_DIR_CAPACITY: usize = 64;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiagConfig {
    pub data_dir: String<DATA_DIR_CAPACITY>,
    /// Minimum spacing of progress redraws while saving.
    pub progress_update_every_ms: u32,
}

impl DiagConfig {
    /// Builds a config; an over-long directory is cut to capacity.
    pub fn new(data_dir: &str, progress_update_every_ms: u32) -> Self {
        Self {
            data_dir: crate::records::bounded(data_dir),
            progress_update_every_ms,
        }
    }
}

impl Default for DiagConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR, DEFAULT_PROGRESS_UPDATE_EVERY_MS)
    }
}

/// State shown by the save-diagnostic screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveDiagModel {
    pub has_identification: bool,
    pub ident: Identification,
    pub frame: DiagnosticFrame,
    /// `None` until the first frame of the session arrives, then in `[0, 1]`.
    pub progress: Option<f32>,
    pub status: StatusLines,
    pub export: Option<ExportName>,
    /// Bytes of fully written lines in the last export.
    pub bytes_written: u32,
    pub rejected_frames: u32,
    /// The transfer completed and was handled; later frames are ignored.
    pub completed: bool,
}

impl SaveDiagModel {
    /// Returns the model to its empty session state.
    pub fn reset(&mut self) {
        self.has_identification = false;
        self.ident = Identification::default();
        self.frame.values.clear();
        self.frame.received_count = 0;
        self.frame.expected_total = 0;
        self.progress = None;
        self.status.clear();
        self.export = None;
        self.bytes_written = 0;
        self.rejected_frames = 0;
        self.completed = false;
    }

    /// Moves the progress bar forward; it never goes back within a session.
    fn advance_progress(&mut self, progress: f32) {
        let progress = progress.clamp(0.0, 1.0);
        self.progress = Some(self.progress.map_or(progress, |current| current.max(progress)));
    }

    fn check_frame(&self, frame: &DiagnosticFrame) -> Result<(), FrameRejection> {
        if self.completed {
            return Err(FrameRejection::AfterCompletion);
        }
        if frame.expected_total == 0 {
            return Err(FrameRejection::EmptyTransfer);
        }
        if frame.received_count > frame.expected_total {
            return Err(FrameRejection::Overrun);
        }
        if frame.values.len() < usize::from(frame.received_count) {
            return Err(FrameRejection::ShortPayload);
        }
        if self.frame.expected_total != 0 {
            if frame.expected_total != self.frame.expected_total {
                return Err(FrameRejection::TotalMismatch);
            }
            if frame.received_count < self.frame.received_count {
                return Err(FrameRejection::Regressed);
            }
        }
        Ok(())
    }
}

/// Outcome of writing the value lines of an export.
#[derive(Copy, Clone)]
enum WriteOutcome {
    Complete { bytes: u32 },
    Short { bytes: u32, written: u32, expected: u32 },
}

/// Save-diagnostic screen.
pub struct SaveDiagScreen<C, S, K, T, E> {
    cell: C,
    storage: S,
    calendar: K,
    ticks: T,
    events: E,
    config: DiagConfig,
}

impl<C, S, K, T, E> SaveDiagScreen<C, S, K, T, E>
where
    C: ModelCell<SaveDiagModel>,
    S: Storage,
    K: Calendar,
    T: TickSource,
    E: EventSink,
{
    pub fn new(cell: C, storage: S, calendar: K, ticks: T, events: E, config: DiagConfig) -> Self {
        Self {
            cell,
            storage,
            calendar,
            ticks,
            events,
            config,
        }
    }

    pub fn cell(&self) -> &C {
        &self.cell
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &DiagConfig {
        &self.config
    }

    /// Screen enter: registers both handlers, grants the shared receive
    /// buffer and starts a fresh acquisition.
    pub fn enter<'h, L>(&'h self, link: &mut L)
    where
        L: LrfLink<'h>,
    {
        let ident_handler: &'h dyn IdentificationHandler = self;
        let diag_handler: &'h dyn DiagnosticHandler = self;
        link.set_identification_handler(Some(ident_handler));
        link.set_diagnostic_handler(Some(diag_handler));
        link.enable_shared_buffer(true);

        self.cell.update(SaveDiagModel::reset);
        self.request_acquisition(link);
    }

    /// OK button: clears the screen and starts over.
    pub fn ok<'h, L>(&self, link: &mut L)
    where
        L: LrfLink<'h>,
    {
        self.cell.update(SaveDiagModel::reset);
        self.request_acquisition(link);
    }

    /// Screen exit: revokes the shared buffer and deregisters both handlers.
    pub fn exit<'h, L>(&self, link: &mut L)
    where
        L: LrfLink<'h>,
    {
        link.enable_shared_buffer(false);
        link.set_diagnostic_handler(None);
        link.set_identification_handler(None);
    }

    fn request_acquisition<'h, L>(&self, link: &mut L)
    where
        L: LrfLink<'h>,
    {
        link.send_command(LrfCommand::SendIdentification);
        link.send_command(LrfCommand::ReadDiagnostic);
        self.events.emit(SamplerEvent::AcquisitionStarted);
    }

    fn export(&self) {
        // Let the bar visibly reach the halfway mark before file I/O.
        self.cell.request_redraw();
        let mut last_update = self.ticks.now_ms();
        let stamp = self.calendar.now();

        let (serial, signed) = self
            .cell
            .with(|model| (model.ident.serial.clone(), model.ident.signed_values));

        let name = match ExportName::new(&self.config.data_dir, &serial, &stamp) {
            Ok(name) => name,
            Err(_) => {
                self.cell.with(|model| {
                    model
                        .status
                        .set_pair("Error!", format_args!("Could not open {serial}-"));
                });
                self.events.emit(SamplerEvent::ExportOpenFailed);
                return;
            }
        };
        self.cell.with(|model| model.export = Some(name.clone()));

        match self.storage.open_truncate(name.path()) {
            Ok(mut file) => {
                let outcome = self.write_lines(&mut file, &stamp, signed, &mut last_update);
                let closed = file.close();
                self.finish(&name, outcome, closed);
            }
            Err(_) => {
                self.cell.with(|model| {
                    model
                        .status
                        .set_pair("Error!", format_args!("Could not open {}", name.prefix()));
                });
                self.events.emit(SamplerEvent::ExportOpenFailed);
            }
        }

        self.cell
            .with(|model| model.status.set_third(format_args!("{}", name.suffix())));
    }

    fn write_lines(
        &self,
        file: &mut S::File,
        stamp: &NaiveDateTime,
        signed: bool,
        last_update: &mut u32,
    ) -> WriteOutcome {
        let (count, total) = self.cell.with(|model| {
            (
                model.frame.received().len(),
                model.frame.expected_total,
            )
        });

        let mut line = Line::new();
        let mut bytes: u32 = 0;

        for index in 0..count {
            let (raw, marker) = self
                .cell
                .with(|model| (model.frame.values[index], model.frame.marker_index()));

            let first = index == 0;
            let formatted = if marker == Some(index) {
                dsp::write_marker_line(&mut line, stamp, first)
            } else {
                dsp::write_value_line(&mut line, raw, signed, first)
            };

            let expected = u32::try_from(line.len()).unwrap_or(u32::MAX);
            let written = if formatted.is_ok() {
                file.write(line.as_bytes())
            } else {
                0
            };
            let written = u32::try_from(written).unwrap_or(u32::MAX);
            if written != expected {
                return WriteOutcome::Short {
                    bytes,
                    written,
                    expected,
                };
            }
            bytes = bytes.saturating_add(written);

            let done = u16::try_from(index + 1).unwrap_or(u16::MAX);
            let now = self.ticks.now_ms();
            self.cell.with(|model| {
                model.bytes_written = bytes;
                model.advance_progress(0.5 + f32::from(done) / f32::from(total) / 2.0);
            });
            if elapsed_ms(now, *last_update) > self.config.progress_update_every_ms {
                self.cell.request_redraw();
                *last_update = now;
            }
        }

        WriteOutcome::Complete { bytes }
    }

    fn finish(
        &self,
        name: &ExportName,
        outcome: WriteOutcome,
        closed: Result<(), StorageError>,
    ) {
        match (outcome, closed) {
            (WriteOutcome::Complete { bytes }, Ok(())) => {
                self.cell.with(|model| {
                    model.bytes_written = bytes;
                    model
                        .status
                        .set_pair("OK", format_args!("Data saved in {}", name.prefix()));
                });
                self.events.emit(SamplerEvent::ExportSaved { bytes });
            }
            (WriteOutcome::Complete { bytes }, Err(_)) => {
                self.cell.with(|model| {
                    model.bytes_written = bytes;
                    model
                        .status
                        .set_pair("Error!", format_args!("Error writing {}", name.prefix()));
                });
                self.events.emit(SamplerEvent::ExportCloseFailed);
            }
            (
                WriteOutcome::Short {
                    bytes,
                    written,
                    expected,
                },
                _,
            ) => {
                self.cell.with(|model| {
                    model.bytes_written = bytes;
                    model
                        .status
                        .set_pair("Error!", format_args!("Error writing {}", name.prefix()));
                });
                self.events
                    .emit(SamplerEvent::ExportWriteFailed { written, expected });
            }
        }
    }
}

impl<C, S, K, T, E> IdentificationHandler for SaveDiagScreen<C, S, K, T, E>
where
    C: ModelCell<SaveDiagModel>,
    S: Storage,
    K: Calendar,
    T: TickSource,
    E: EventSink,
{
    fn on_identification(&self, ident: &Identification) {
        self.cell.update(|model| {
            model.ident.clone_from(ident);
            model.has_identification = true;
        });
        self.events.emit(SamplerEvent::IdentificationReceived);
    }
}

impl<C, S, K, T, E> DiagnosticHandler for SaveDiagScreen<C, S, K, T, E>
where
    C: ModelCell<SaveDiagModel>,
    S: Storage,
    K: Calendar,
    T: TickSource,
    E: EventSink,
{
    fn on_diagnostic(&self, frame: &DiagnosticFrame) {
        let accepted = self.cell.with(|model| match model.check_frame(frame) {
            Ok(()) => {
                model.frame.clone_from(frame);
                model.advance_progress(
                    f32::from(frame.received_count) / f32::from(frame.expected_total) / 2.0,
                );
                if frame.is_complete() {
                    model.completed = true;
                }
                Ok(frame.is_complete().then_some(model.has_identification))
            }
            Err(reason) => {
                model.rejected_frames = model.rejected_frames.saturating_add(1);
                Err(reason)
            }
        });

        match accepted {
            Ok(Some(true)) => self.export(),
            Ok(Some(false)) => {
                self.cell.with(|model| {
                    model
                        .status
                        .set_pair("Error!", format_args!("Missing LRF identification"));
                });
                self.events.emit(SamplerEvent::MissingIdentification);
            }
            Ok(None) => {}
            Err(reason) => self.events.emit(SamplerEvent::FrameRejected(reason)),
        }

        self.cell.request_redraw();
    }
}
