#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
/// Error handling and custom [`Error`](std::error::Error) types
pub mod errors;
/// Validating inputs and collecting a day's attendance into a session
pub mod form;
/// Functions for reading and writing attendance tables
pub mod io;
/// Business logic for merging and summarizing attendance
pub mod ops;
/// Data types used throughout rollcall
pub mod types;
