//! VVVF CLI library.
//!
//! This crate provides the command implementations behind the `vvvf` binary:
//! document loading, validation, rendering of mascon programs to WAV, cycle
//! analysis and switch-angle table inspection.

pub mod commands;
pub mod input;
pub mod interrupt;
