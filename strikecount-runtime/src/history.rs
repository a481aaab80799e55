use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use strikecount_core::history::SessionRecord;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
}

impl HistoryStore {
    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            max_entries: 500,
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    pub fn load(&self) -> anyhow::Result<Vec<SessionRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read history: {}", self.path.display()))?;
        let records: Vec<SessionRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse history: {}", self.path.display()))?;
        Ok(records)
    }

    pub fn append(&self, record: SessionRecord) -> anyhow::Result<()> {
        let mut records = self.load()?;
        records.push(record);
        if records.len() > self.max_entries {
            let start = records.len() - self.max_entries;
            records = records.split_off(start);
        }

        let json = serde_json::to_vec_pretty(&records).context("encode history JSON")?;
        crate::fs::write_atomic(&self.path, &json)
            .with_context(|| format!("failed to write history: {}", self.path.display()))
    }

    pub fn last(&self) -> anyhow::Result<Option<SessionRecord>> {
        Ok(self.load()?.pop())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove history: {}", self.path.display()))?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
