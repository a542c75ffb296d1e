use crate::domain::model::{OutputKind, UpdateOrdering, DEFAULT_ELEMENT_ID};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_PAGE_URL: &str = "http://127.0.0.1:5000/";

#[derive(Debug, Clone, Parser)]
#[command(name = "timer-sync")]
#[command(about = "Polls a page once per interval and mirrors its timer element")]
pub struct CliConfig {
    /// Page that renders the timer element
    #[arg(long, default_value = DEFAULT_PAGE_URL)]
    pub url: String,

    /// Id of the element carrying the timer text
    #[arg(long, default_value = DEFAULT_ELEMENT_ID)]
    pub element_id: String,

    /// Delay between ticks, in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Per-request timeout in milliseconds (no timeout when unset)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Which response wins when requests complete out of order
    #[arg(long, value_enum, default_value_t = UpdateOrdering::LastCompleted)]
    pub ordering: UpdateOrdering,

    /// Where the timer text is written
    #[arg(long, value_enum, default_value_t = OutputKind::Terminal)]
    pub output: OutputKind,

    /// Directory for file output
    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Rewrite a single terminal line instead of printing one line per tick
    #[arg(long)]
    pub inline: bool,

    /// Load settings from a TOML file instead of the flags above
    #[arg(short, long)]
    pub config: Option<String>,

    /// Run a single tick, print the timer and exit
    #[arg(long)]
    pub once: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Log process CPU and memory usage")]
    pub monitor: bool,
}

impl ConfigProvider for CliConfig {
    fn page_url(&self) -> &str {
        &self.url
    }

    fn element_id(&self) -> &str {
        &self.element_id
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    fn ordering(&self) -> UpdateOrdering {
        self.ordering
    }

    fn output_kind(&self) -> OutputKind {
        self.output
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn inline(&self) -> bool {
        self.inline
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitor
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("--url", &self.url)?;
        validation::validate_element_id("--element-id", &self.element_id)?;
        validation::validate_range("--interval-ms", self.interval_ms, 1, 86_400_000)?;

        if let Some(timeout) = self.timeout_ms {
            validation::validate_range("--timeout-ms", timeout, 1, 86_400_000)?;
        }

        if self.output == OutputKind::File {
            validation::validate_path("--output-path", &self.output_path)?;
        }

        Ok(())
    }
}
