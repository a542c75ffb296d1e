pub mod engine;
pub mod extract;
pub mod poller;

pub use crate::domain::model::{PollSettings, TickOutcome, TimerText, UpdateOrdering};
pub use crate::domain::ports::{ConfigProvider, PageSource, TimerDisplay};
pub use crate::utils::error::Result;
