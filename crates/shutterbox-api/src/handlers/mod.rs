//! HTTP handlers, one module per surface area.

pub mod files;
pub mod health;
pub mod labels;
pub mod metadata;
pub mod resumable;
pub mod upload;
