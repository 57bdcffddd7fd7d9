#![no_std]

// Shared logic for the LRF field sampler.
//
// This crate stays portable across the MCU firmware and host tooling by avoiding
// the Rust standard library. Hardware, storage, and the serial decoder are only
// reached through the collaborator traits exposed here.

pub mod boot_time;
pub mod diag;
pub mod events;
pub mod led;
pub mod link;
pub mod model;
pub mod power;
pub mod records;
pub mod retry;
pub mod storage;
pub mod time;
