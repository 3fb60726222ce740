//! HTTP request handlers for the web server.

mod api;
mod helpers;
mod static_files;
mod summarise;

pub use api::{api_modes, health};
pub use static_files::serve_css;
pub use summarise::{api_summarise, index, summarise_form};
