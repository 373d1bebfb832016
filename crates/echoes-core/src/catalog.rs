//! Question Catalog
//!
//! The static list of reflective prompts. Loaded once at startup, either from
//! the built-in set or from a JSON file of the same shape:
//!
//! ```json
//! [{ "id": 1, "text": "...", "category": "childhood", "source": "echoes" }]
//! ```
//!
//! An empty catalog is a configuration error and is rejected here, so nothing
//! downstream ever has to handle one.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

const BUILTIN_CATALOG: &str = include_str!("../data/questions.json");

/// Catalog loading errors
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No questions at all
    #[error("Question catalog is empty")]
    Empty,
    /// Two questions share an id
    #[error("Duplicate question id: {0}")]
    DuplicateId(u32),
    /// Malformed JSON
    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// IO error reading the catalog file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One journaling prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub category: String,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "echoes".to_string()
}

/// Immutable, non-empty question list in catalog order
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Build a catalog, rejecting empty lists and duplicate ids
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id) {
                return Err(CatalogError::DuplicateId(q.id));
            }
        }

        Ok(Self { questions })
    }

    /// The catalog shipped with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), questions = catalog.len(), "Loaded question catalog");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the catalog holds no questions; construction rejects empty lists
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Question counts per category, sorted by category name
    pub fn categories(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for q in &self.questions {
            *counts.entry(q.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}
