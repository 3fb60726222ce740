//! Shared utility functions.
//!
//! - `format`: human-readable sizes and durations
//! - `text`: log previews

mod format;
mod text;

pub use format::{format_duration, format_size};
pub use text::preview;
