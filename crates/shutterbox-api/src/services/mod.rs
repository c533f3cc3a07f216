//! Intake pipeline services.
//!
//! `intake` runs the shared extraction → thumbnail → dedup → persist
//! sequence; `transfer` owns resumable uploads and hands completed ones to
//! the intake service; `reaper` sweeps abandoned transfers.

pub mod intake;
pub mod reaper;
pub mod transfer;
