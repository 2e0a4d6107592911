//! JsonFileStore - one pretty-printed JSON file per finished activity

use contracts::{ActivityStore, ActivitySummary, ContractError};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, instrument};

/// Store writing `<dir>/<session_id>.json`
pub struct JsonFileStore {
    name: String,
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            name: name.into(),
            dir,
        })
    }

    /// Create from params map (`dir` required)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let dir = params.get("dir").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing 'dir' parameter")
        })?;
        Self::new(name, dir)
    }

    /// File a summary is written to
    pub fn file_for(&self, summary: &ActivitySummary) -> PathBuf {
        self.dir.join(format!("{}.json", summary.session_id))
    }

    fn write_summary(&self, summary: &ActivitySummary) -> std::io::Result<PathBuf> {
        let path = self.file_for(summary);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, summary)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.flush()?;
        Ok(path)
    }
}

impl ActivityStore for JsonFileStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "json_file_store_save",
        skip(self, summary),
        fields(store = %self.name, session_id = %summary.session_id)
    )]
    async fn save(&mut self, summary: &ActivitySummary) -> Result<(), ContractError> {
        let path = self
            .write_summary(summary)
            .map_err(|e| ContractError::store(&self.name, e.to_string()))?;
        info!(store = %self.name, file = %path.display(), "Activity saved");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        // every save is flushed
        Ok(())
    }
}
