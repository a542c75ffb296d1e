use crate::domain::model::{OutputKind, UpdateOrdering, DEFAULT_ELEMENT_ID};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PollError, Result};
use crate::utils::validation::{self, Validate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_element_id")]
    pub element_id: String,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub ordering: UpdateOrdering,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub kind: OutputKind,
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_element_id() -> String {
    DEFAULT_ELEMENT_ID.to_string()
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_output_path() -> String {
    "./output".to_string()
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            element_id: default_element_id(),
            interval_ms: default_interval_ms(),
            ordering: UpdateOrdering::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: OutputKind::default(),
            path: default_output_path(),
            inline: false,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PollError::ConfigParse {
            field: "toml_parsing".to_string(),
            message: e.to_string(),
        })
    }

    /// 替換環境變數 (例如 ${POMO_URL})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        static PLACEHOLDER: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

        let re = PLACEHOLDER
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}"))
            .as_ref()
            .map_err(|e| PollError::Config {
                message: format!("placeholder pattern: {}", e),
            })?;

        let result = re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }
}

impl ConfigProvider for TomlConfig {
    fn page_url(&self) -> &str {
        &self.source.url
    }

    fn element_id(&self) -> &str {
        &self.poll.element_id
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.source.timeout_ms.map(Duration::from_millis)
    }

    fn ordering(&self) -> UpdateOrdering {
        self.poll.ordering
    }

    fn output_kind(&self) -> OutputKind {
        self.output.kind
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn inline(&self) -> bool {
        self.output.inline
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("source.url", &self.source.url)?;

        if let Some(timeout) = self.source.timeout_ms {
            validation::validate_range("source.timeout_ms", timeout, 1, 86_400_000)?;
        }

        validation::validate_element_id("poll.element_id", &self.poll.element_id)?;
        validation::validate_range("poll.interval_ms", self.poll.interval_ms, 1, 86_400_000)?;

        if self.output.kind == OutputKind::File {
            validation::validate_path("output.path", &self.output.path)?;
        }

        Ok(())
    }
}
