//! JSON persistence for the board.
//!
//! All collections live in a single document so that related writes (a stage
//! deletion plus the lead reassignment it forces) commit together. Writes go
//! to a temp file first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::StoreError;
use crate::model::{default_stages, Lead, Stage, Task, Theme};

pub const STORE_FILE: &str = "leadkan.json";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Document {
    leads: Vec<Lead>,
    tasks: Vec<Task>,
    pipeline_stages: Vec<Stage>,
    theme: Theme,
}

/// Everything the store holds, as loaded at startup.
#[derive(Debug)]
pub struct BoardState {
    pub leads: Vec<Lead>,
    pub tasks: Vec<Task>,
    pub stages: Vec<Stage>,
    pub theme: Theme,
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document, StoreError> {
        if !self.path.exists() {
            return Ok(Document::default());
        }
        let data = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Read for a read-modify-write save. A corrupt document would otherwise
    /// fail every future save; it degrades to the empty document here and
    /// gets replaced by the write. I/o failures still propagate.
    fn read_for_update(&self) -> Result<Document, StoreError> {
        match self.read_document() {
            Ok(doc) => Ok(doc),
            Err(StoreError::Corrupt { path, source }) => {
                warn!(path = %path.display(), error = %source, "overwriting corrupt board document");
                Ok(Document::default())
            }
            Err(err) => Err(err),
        }
    }

    fn write_document(&self, doc: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Loads the whole board, recovering from a corrupt document by falling
    /// back to empty collections. A board with no stages gets the seed set,
    /// so at least one stage always exists.
    pub fn load_or_default(&self) -> BoardState {
        let doc = match self.read_document() {
            Ok(doc) => doc,
            Err(err) => {
                warn!(error = %err, "persisted board unreadable, starting empty");
                Document::default()
            }
        };
        let stages = if doc.pipeline_stages.is_empty() {
            default_stages()
        } else {
            doc.pipeline_stages
        };
        BoardState {
            leads: doc.leads,
            tasks: doc.tasks,
            stages,
            theme: doc.theme,
        }
    }

    pub fn load_leads(&self) -> Result<Vec<Lead>, StoreError> {
        Ok(self.read_document()?.leads)
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.read_document()?.tasks)
    }

    pub fn load_stages(&self) -> Result<Vec<Stage>, StoreError> {
        Ok(self.read_document()?.pipeline_stages)
    }

    pub fn load_theme(&self) -> Result<Theme, StoreError> {
        Ok(self.read_document()?.theme)
    }

    pub fn save_leads(&self, leads: &[Lead]) -> Result<(), StoreError> {
        let mut doc = self.read_for_update()?;
        doc.leads = leads.to_vec();
        self.write_document(&doc)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut doc = self.read_for_update()?;
        doc.tasks = tasks.to_vec();
        self.write_document(&doc)
    }

    pub fn save_stages(&self, stages: &[Stage]) -> Result<(), StoreError> {
        let mut doc = self.read_for_update()?;
        doc.pipeline_stages = stages.to_vec();
        self.write_document(&doc)
    }

    /// Commits stages and leads in one write. Used by stage deletion so a
    /// crash can never leave leads pointing at a removed stage.
    pub fn save_pipeline(&self, stages: &[Stage], leads: &[Lead]) -> Result<(), StoreError> {
        let mut doc = self.read_for_update()?;
        doc.pipeline_stages = stages.to_vec();
        doc.leads = leads.to_vec();
        self.write_document(&doc)
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        let mut doc = self.read_for_update()?;
        doc.theme = theme;
        self.write_document(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn lead(id: i64, stage: &str) -> Lead {
        Lead {
            id,
            name: format!("lead-{id}"),
            company: String::new(),
            email: String::new(),
            phone: String::new(),
            stage: stage.to_string(),
            expected_revenue: 0.0,
            notes: String::new(),
            created_at: Utc::now(),
            last_contact: Utc::now(),
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let state = store.load_or_default();
        assert!(state.leads.is_empty());
        assert!(state.tasks.is_empty());
        assert_eq!(state.stages, default_stages());
        assert_eq!(state.theme, Theme::Dark);
    }

    #[test]
    fn leads_round_trip() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.save_leads(&[lead(1, "new"), lead(2, "won")]).unwrap();
        let loaded = store.load_leads().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].stage, "won");
    }

    #[test]
    fn independent_keys_do_not_clobber_each_other() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.save_leads(&[lead(1, "new")]).unwrap();
        store.save_theme(Theme::Light).unwrap();
        assert_eq!(store.load_leads().unwrap().len(), 1);
        assert_eq!(store.load_theme().unwrap(), Theme::Light);
    }

    #[test]
    fn corrupt_document_is_a_typed_error() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        match store.load_leads() {
            Err(StoreError::Corrupt { .. }) => {}
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_document_recovers_to_empty_collections() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        fs::write(store.path(), "[[[").unwrap();
        let state = store.load_or_default();
        assert!(state.leads.is_empty());
        assert_eq!(state.stages, default_stages());
    }

    #[test]
    fn save_replaces_a_corrupt_document() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        store.save_leads(&[lead(1, "new")]).unwrap();
        assert_eq!(store.load_leads().unwrap().len(), 1);
        store.save_theme(Theme::Light).unwrap();
        assert_eq!(store.load_theme().unwrap(), Theme::Light);
    }

    #[test]
    fn save_pipeline_writes_both_collections_at_once() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let stages = vec![Stage {
            id: "only".into(),
            name: "Only".into(),
            color: "blue".into(),
        }];
        store.save_pipeline(&stages, &[lead(7, "only")]).unwrap();
        assert_eq!(store.load_stages().unwrap(), stages);
        assert_eq!(store.load_leads().unwrap()[0].stage, "only");
    }

    #[test]
    fn persisted_document_uses_documented_keys() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.save_stages(&default_stages()).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"pipelineStages\""));
        assert!(raw.contains("\"leads\""));
        assert!(raw.contains("\"tasks\""));
        assert!(raw.contains("\"theme\""));
    }
}
