pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::TomlConfig;

pub use crate::adapters::{
    display_from_config, DocumentDisplay, FileDisplay, HttpPageSource, TerminalDisplay,
};
pub use crate::core::engine::SyncEngine;
pub use crate::core::extract::extract_element_text;
pub use crate::core::poller::{Poller, PollerHandle};
pub use crate::domain::model::{OutputKind, PollSettings, TickOutcome, TimerText, UpdateOrdering};
pub use crate::domain::ports::{ConfigProvider, PageSource, TimerDisplay};
pub use crate::utils::error::{PollError, Result};
