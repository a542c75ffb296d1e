use crate::domain::model::{OutputKind, TimerText};
use crate::domain::ports::{ConfigProvider, TimerDisplay};
use crate::utils::error::{ElementScope, PollError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Builds the display target the configuration asks for.
pub fn display_from_config<C: ConfigProvider>(config: &C) -> Arc<dyn TimerDisplay> {
    match config.output_kind() {
        OutputKind::Terminal => Arc::new(TerminalDisplay::new(config.inline())),
        OutputKind::File => Arc::new(FileDisplay::new(config.output_path())),
    }
}

/// An in-memory live document: element ids mapped to their text content.
///
/// Clones share the same elements, so a test can keep one handle and give the
/// other to the poller.
#[derive(Debug, Clone, Default)]
pub struct DocumentDisplay {
    elements: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl DocumentDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(id: &str, text: &str) -> Self {
        let display = Self::new();
        display.insert_element(id, text);
        display
    }

    pub fn insert_element(&self, id: &str, text: &str) {
        self.lock().insert(id.to_string(), text.to_string());
    }

    pub fn remove_element(&self, id: &str) -> Option<String> {
        self.lock().remove(id)
    }

    pub fn text_of(&self, id: &str) -> Option<String> {
        self.lock().get(id).cloned()
    }

    /// Number of successful renders so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.elements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TimerDisplay for DocumentDisplay {
    async fn render(&self, element_id: &str, text: &TimerText) -> Result<()> {
        let mut elements = self.lock();
        let slot = elements
            .get_mut(element_id)
            .ok_or_else(|| PollError::ElementNotFound {
                id: element_id.to_string(),
                scope: ElementScope::Live,
            })?;

        slot.clear();
        slot.push_str(text.as_str());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Prints the timer on stdout.
#[derive(Debug, Clone, Default)]
pub struct TerminalDisplay {
    inline: bool,
}

impl TerminalDisplay {
    /// With `inline`, every update rewrites the same terminal line.
    pub fn new(inline: bool) -> Self {
        Self { inline }
    }

    fn write_to<W: Write>(&self, out: &mut W, text: &TimerText) -> std::io::Result<()> {
        if self.inline {
            // 回到行首並清除到行尾，多行內容壓成一行
            let line = text.as_str().replace('\n', " ");
            write!(out, "\r{}\x1b[K", line)?;
        } else {
            writeln!(out, "{}", text)?;
        }
        out.flush()
    }
}

#[async_trait]
impl TimerDisplay for TerminalDisplay {
    async fn render(&self, _element_id: &str, text: &TimerText) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.write_to(&mut out, text)?;
        Ok(())
    }
}

/// Writes the timer to `<base_path>/<element_id>.txt`, replacing the previous
/// content.
#[derive(Debug, Clone)]
pub struct FileDisplay {
    base_path: PathBuf,
}

impl FileDisplay {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn path_for(&self, element_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.txt", element_id))
    }
}

#[async_trait]
impl TimerDisplay for FileDisplay {
    async fn render(&self, element_id: &str, text: &TimerText) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        // 先寫暫存檔再改名，讀取端不會看到半寫入的內容
        let target = self.path_for(element_id);
        let staging = self.base_path.join(format!(".{}.txt.tmp", element_id));
        tokio::fs::write(&staging, text.as_str()).await?;
        tokio::fs::rename(&staging, &target).await?;

        Ok(())
    }
}
