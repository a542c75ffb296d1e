use crate::domain::model::{OutputKind, PollSettings, TimerText, UpdateOrdering};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Where the page comes from. One call per tick.
pub trait PageSource: Send + Sync + 'static {
    fn fetch_page(&self) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// The live side: receives the extracted text under the same element id.
#[async_trait]
pub trait TimerDisplay: Send + Sync {
    async fn render(&self, element_id: &str, text: &TimerText) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn page_url(&self) -> &str;
    fn element_id(&self) -> &str;
    fn interval(&self) -> Duration;
    fn request_timeout(&self) -> Option<Duration>;
    fn ordering(&self) -> UpdateOrdering;
    fn output_kind(&self) -> OutputKind;
    fn output_path(&self) -> &str;
    fn inline(&self) -> bool;
    fn monitoring_enabled(&self) -> bool;

    fn poll_settings(&self) -> PollSettings {
        PollSettings {
            element_id: self.element_id().to_string(),
            interval: self.interval(),
            ordering: self.ordering(),
        }
    }
}
