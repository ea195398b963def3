#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `bandwidth` shapes copy throughput for treesync workers. A [`Pacer`] is
//! created per task and inserts sleeps between buffered writes so the
//! observed rate converges on a configured bytes-per-second limit. The crate
//! also parses the human-entered rate strings accepted on the command line
//! (`--bandwidth 512k`).
//!
//! # Design
//!
//! Pacing derives entirely from the task-local start instant and the running
//! byte count: before each write the pacer computes how long the transfer
//! *should* have taken at the configured rate and sleeps off the deficit.
//! There is no shared token state between tasks, so concurrent workers each
//! converge on the limit independently.

mod pacer;
mod parse;

pub use pacer::Pacer;
pub use parse::{parse_rate, RateParseError};
