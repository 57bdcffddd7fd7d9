//! Host bench for the LRF sampler core.
//!
//! Wires the boot-time and save-diagnostic screens to a simulated rangefinder,
//! a directory-backed storage card, and a virtual tick counter, and records
//! every console exchange in a transcript.

pub mod bench;
pub mod commands;
pub mod console;
pub mod device;
pub mod host;
pub mod link;
pub mod session;
