use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalogue::Title;
use crate::storage::KeyValueStore;

pub const NOTE_KEY_PREFIX: &str = "thisTV_note_";
pub const DEFAULT_NOTE: &str = "Write your notes here...";

/// A user's local note and screenshots for one title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub content_type: String,
    /// Hex-encoded image bytes.
    pub data: String,
}

impl Screenshot {
    pub fn from_bytes(content_type: &str, bytes: &[u8]) -> Result<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(anyhow!("unsupported screenshot type '{}'", content_type));
        }
        if bytes.is_empty() {
            return Err(anyhow!("empty screenshot upload"));
        }
        Ok(Self {
            content_type,
            data: hex::encode(bytes),
        })
    }

    pub fn bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.data).context("screenshot data is not valid hex")
    }
}

pub fn note_key(id: &str) -> String {
    format!("{NOTE_KEY_PREFIX}{id}")
}

/// Saved note first, then the catalogue description, then a prompt.
pub fn description_for<'a>(title: &'a Title, annotation: Option<&'a Annotation>) -> &'a str {
    annotation
        .and_then(|a| a.description.as_deref())
        .filter(|d| !d.trim().is_empty())
        .or(title.description.as_deref())
        .unwrap_or(DEFAULT_NOTE)
}

#[derive(Clone)]
pub struct AnnotationStore {
    store: Arc<dyn KeyValueStore>,
}

impl AnnotationStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Unparseable stored values read as absent.
    pub fn load(&self, id: &str) -> Option<Annotation> {
        let raw = self.store.get(&note_key(id))?;
        match serde_json::from_str(&raw) {
            Ok(annotation) => Some(annotation),
            Err(e) => {
                warn!("Ignoring malformed note for '{}': {}", id, e);
                None
            }
        }
    }

    pub fn save_description(&self, id: &str, description: &str) -> Result<Annotation> {
        let mut annotation = self.load(id).unwrap_or_default();
        annotation.description = Some(description.trim().to_string());
        self.write(id, annotation)
    }

    pub fn add_screenshot(&self, id: &str, screenshot: Screenshot) -> Result<Annotation> {
        let mut annotation = self.load(id).unwrap_or_default();
        annotation.screenshots.push(screenshot);
        self.write(id, annotation)
    }

    pub fn screenshot(&self, id: &str, index: usize) -> Option<Screenshot> {
        self.load(id)?.screenshots.into_iter().nth(index)
    }

    pub fn reset(&self, id: &str) -> Result<()> {
        self.store.remove(&note_key(id))?;
        info!("Reset local notes for '{}'", id);
        Ok(())
    }

    fn write(&self, id: &str, mut annotation: Annotation) -> Result<Annotation> {
        annotation.updated_at = Some(Utc::now().to_rfc3339());
        let body = serde_json::to_string(&annotation).context("serializing note")?;
        self.store.set(&note_key(id), &body)?;
        Ok(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn store() -> (Arc<MemoryStore>, AnnotationStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), AnnotationStore::new(kv))
    }

    #[test]
    fn save_keeps_screenshots_and_reset_clears() {
        let (_kv, notes) = store();
        let shot = Screenshot::from_bytes("image/png", &[1, 2, 3]).unwrap();
        notes.add_screenshot("42", shot.clone()).unwrap();
        let saved = notes.save_description("42", "  great  ").unwrap();
        assert_eq!(saved.description.as_deref(), Some("great"));
        assert_eq!(saved.screenshots, vec![shot.clone()]);
        assert_eq!(notes.screenshot("42", 0).unwrap().bytes().unwrap(), vec![1, 2, 3]);
        assert!(notes.screenshot("42", 1).is_none());

        notes.reset("42").unwrap();
        assert!(notes.load("42").is_none());
    }

    #[test]
    fn malformed_note_reads_as_absent() {
        let (kv, notes) = store();
        kv.set(&note_key("9"), "{broken").unwrap();
        assert!(notes.load("9").is_none());
    }

    #[test]
    fn rejects_non_image_uploads() {
        assert!(Screenshot::from_bytes("text/html", b"<p>").is_err());
        assert!(Screenshot::from_bytes("image/jpeg", b"").is_err());
    }

    #[test]
    fn description_falls_back_in_order() {
        let title = Title::from_value(&json!({"id": "1", "description": "From catalogue"})).unwrap();
        let bare = Title::from_value(&json!({"id": "2"})).unwrap();
        let note = Annotation {
            description: Some("Mine".to_string()),
            ..Default::default()
        };
        assert_eq!(description_for(&title, Some(&note)), "Mine");
        assert_eq!(description_for(&title, None), "From catalogue");
        assert_eq!(description_for(&bare, None), DEFAULT_NOTE);
    }

    #[test]
    fn notes_never_touch_catalogue_record() {
        let (_kv, notes) = store();
        let title = Title::from_value(&json!({"id": "1", "description": "Original"})).unwrap();
        let before = title.clone();
        notes.save_description(&title.id, "Edited").unwrap();
        assert_eq!(title, before);
    }
}
