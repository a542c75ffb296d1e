// Adapters layer: concrete page sources and display targets.

pub mod display;
pub mod http;

pub use display::{display_from_config, DocumentDisplay, FileDisplay, TerminalDisplay};
pub use http::HttpPageSource;
