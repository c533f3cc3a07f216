//! Request-handling utilities.

pub mod multipart;
pub mod range;
