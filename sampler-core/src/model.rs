//! Screen models and the exclusive-access scope that guards them.
//!
//! Handlers run on the decoder activity while the render side reads the same
//! model, so every access goes through a [`ModelCell`]. Mutations made with
//! [`ModelCell::update`] request a redraw when the scope closes; the save loop
//! uses [`ModelCell::with`] and throttles its own redraw requests.

use core::cell::{Cell, RefCell};
use core::fmt::{self, Write as _};

use heapless::String;

/// Capacity of a single status line.
pub const STATUS_LINE_CAPACITY: usize = 40;
/// Number of status lines a screen shows.
pub const STATUS_LINE_COUNT: usize = 3;

pub type StatusLine = String<STATUS_LINE_CAPACITY>;

/// Exclusive-access scope around a screen model.
pub trait ModelCell<M> {
    /// Runs `f` with exclusive access to the model. Does not request a redraw.
    fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut M) -> R;

    /// Tells the render side that the model changed.
    fn request_redraw(&self);

    /// Mutates the model and requests a redraw once access is released.
    fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut M) -> R,
    {
        let result = self.with(f);
        self.request_redraw();
        result
    }

    /// Copies the model out for rendering.
    fn snapshot(&self) -> M
    where
        M: Clone,
    {
        self.with(|model| model.clone())
    }
}

impl<M, C: ModelCell<M> + ?Sized> ModelCell<M> for &C {
    fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut M) -> R,
    {
        (**self).with(f)
    }

    fn request_redraw(&self) {
        (**self).request_redraw();
    }
}

/// Single-threaded model cell for host tools and tests.
///
/// Redraw requests are counted rather than delivered anywhere.
#[derive(Debug, Default)]
pub struct LocalCell<M> {
    model: RefCell<M>,
    redraws: Cell<u32>,
}

impl<M> LocalCell<M> {
    pub const fn new(model: M) -> Self {
        Self {
            model: RefCell::new(model),
            redraws: Cell::new(0),
        }
    }

    /// Number of redraw requests seen so far.
    pub fn redraw_count(&self) -> u32 {
        self.redraws.get()
    }

    /// Returns the pending redraw count and resets it.
    pub fn take_redraws(&self) -> u32 {
        self.redraws.replace(0)
    }

    pub fn into_inner(self) -> M {
        self.model.into_inner()
    }
}

impl<M> ModelCell<M> for LocalCell<M> {
    fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut M) -> R,
    {
        f(&mut *self.model.borrow_mut())
    }

    fn request_redraw(&self) {
        self.redraws.set(self.redraws.get().saturating_add(1));
    }
}

/// Up to three human-readable status lines shown under a screen.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StatusLines {
    lines: [StatusLine; STATUS_LINE_COUNT],
}

impl StatusLines {
    pub const fn new() -> Self {
        Self {
            lines: [String::new(), String::new(), String::new()],
        }
    }

    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }

    /// Replaces all lines with a headline and a detail line.
    pub fn set_pair(&mut self, headline: &str, detail: fmt::Arguments<'_>) {
        self.clear();
        push_truncated(&mut self.lines[0], format_args!("{headline}"));
        push_truncated(&mut self.lines[1], detail);
    }

    pub fn set_third(&mut self, text: fmt::Arguments<'_>) {
        self.lines[2].clear();
        push_truncated(&mut self.lines[2], text);
    }

    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map_or("", String::as_str)
    }

    /// Non-empty lines in display order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(|line| !line.is_empty())
    }
}

/// Writes `args` into `line`, keeping whatever fits.
fn push_truncated(line: &mut StatusLine, args: fmt::Arguments<'_>) {
    struct Truncating<'a>(&'a mut StatusLine);

    impl fmt::Write for Truncating<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for ch in s.chars() {
                if self.0.push(ch).is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    let _ = Truncating(line).write_fmt(args);
}
