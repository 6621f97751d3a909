use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::avatar::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: String,
    pub original_image_url: String,
    pub generated_image_url: Option<String>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub status: GenerationStatus,
    pub created_at: String,
    pub updated_at: String,
    pub processing_time_s: Option<u64>,
}

impl GenerationRecord {
    pub fn new(original_image_url: impl Into<String>, style: Style) -> Self {
        let now = now_utc_iso();
        Self {
            id: Uuid::new_v4().to_string(),
            original_image_url: original_image_url.into(),
            generated_image_url: None,
            style,
            status: GenerationStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
            processing_time_s: None,
        }
    }
}

/// JSON-file record store for generation bookkeeping.
///
/// Every mutation re-reads the file and writes only the touched record back,
/// so independent store handles on one path do not drop each other's rows.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn create(&self, record: &GenerationRecord) -> anyhow::Result<()> {
        let mut on_disk = read_records(&self.path)?;
        if on_disk.contains_key(&record.id) {
            bail!("generation record '{}' already exists", record.id);
        }
        on_disk.insert(record.id.clone(), record.clone());
        write_records(&self.path, &on_disk)
    }

    pub fn get(&self, id: &str) -> anyhow::Result<Option<GenerationRecord>> {
        Ok(read_records(&self.path)?.remove(id))
    }

    pub fn list(&self) -> anyhow::Result<Vec<GenerationRecord>> {
        let mut rows: Vec<GenerationRecord> = read_records(&self.path)?.into_values().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    pub fn mark_processing(&self, id: &str) -> anyhow::Result<GenerationRecord> {
        self.update(id, |record| {
            record.status = GenerationStatus::Processing;
        })
    }

    pub fn mark_completed(
        &self,
        id: &str,
        generated_image_url: impl Into<String>,
        processing_time_s: u64,
    ) -> anyhow::Result<GenerationRecord> {
        let url = generated_image_url.into();
        self.update(id, move |record| {
            record.status = GenerationStatus::Completed;
            record.generated_image_url = Some(url);
            record.processing_time_s = Some(processing_time_s);
        })
    }

    pub fn mark_failed(&self, id: &str) -> anyhow::Result<GenerationRecord> {
        self.update(id, |record| {
            record.status = GenerationStatus::Failed;
        })
    }

    fn update(
        &self,
        id: &str,
        apply: impl FnOnce(&mut GenerationRecord),
    ) -> anyhow::Result<GenerationRecord> {
        let mut on_disk = read_records(&self.path)?;
        let Some(record) = on_disk.get_mut(id) else {
            bail!("generation record '{id}' not found");
        };
        apply(record);
        record.updated_at = now_utc_iso();
        let updated = record.clone();
        write_records(&self.path, &on_disk)?;
        Ok(updated)
    }
}

fn read_records(path: &Path) -> anyhow::Result<BTreeMap<String, GenerationRecord>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed reading {}", path.display()))
        }
    };
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw).with_context(|| format!("invalid record store {}", path.display()))
}

fn write_records(path: &Path, records: &BTreeMap<String, GenerationRecord>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(records)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
