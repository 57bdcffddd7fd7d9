#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Screen model shared between the record handlers and the render task.
//!
//! Handlers mutate the model under a blocking mutex; every redraw request
//! raises a signal that the render task awaits before taking a snapshot.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use sampler_core::model::ModelCell;

pub struct SharedModel<R: RawMutex, M> {
    model: Mutex<R, RefCell<M>>,
    redraw: Signal<R, ()>,
}

impl<R: RawMutex, M> SharedModel<R, M> {
    pub const fn new(model: M) -> Self {
        Self {
            model: Mutex::new(RefCell::new(model)),
            redraw: Signal::new(),
        }
    }

    /// Waits for the next redraw request. Requests raised while nobody
    /// waits collapse into one.
    pub async fn changed(&self) {
        self.redraw.wait().await;
    }

    /// Returns `true` if a redraw is pending, consuming it.
    pub fn take_redraw(&self) -> bool {
        self.redraw.try_take().is_some()
    }
}

impl<R: RawMutex, M> ModelCell<M> for SharedModel<R, M> {
    fn with<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut M) -> T,
    {
        self.model.lock(|cell| f(&mut *cell.borrow_mut()))
    }

    fn request_redraw(&self) {
        self.redraw.signal(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn update_raises_a_single_pending_redraw() {
        let shared: SharedModel<NoopRawMutex, u32> = SharedModel::new(0);

        shared.with(|value| *value = 4);
        assert!(!shared.take_redraw());

        shared.update(|value| *value += 1);
        shared.update(|value| *value += 1);
        assert!(shared.take_redraw());
        assert!(!shared.take_redraw());
        assert_eq!(shared.snapshot(), 6);
    }
}
