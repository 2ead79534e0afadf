//! Herd directory and pedigree query collaborators.
//!
//! The traits describe the data source a UI talks to; [`Herd`] is an
//! in-memory implementation backed by a CSV export.

pub mod herd;

use serde::{Deserialize, Serialize};

use crate::animal::{Animal, AnimalRef, Gender, NewAnimal};
use crate::error::Result;
use crate::pedigree::RawAncestorRecord;
use crate::types::AnimalId;

pub use herd::Herd;

pub const DEFAULT_PAGE_LIMIT: usize = 20;

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

/// Filter and page selection for animal lists. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalQuery {
    #[serde(default)]
    pub id_eq: Option<AnimalId>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub gender_eq: Option<Gender>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for AnimalQuery {
    fn default() -> Self {
        Self {
            id_eq: None,
            search: None,
            gender_eq: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl AnimalQuery {
    pub fn search(text: &str) -> Self {
        Self {
            search: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn by_id(id: &str) -> Self {
        Self {
            id_eq: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender_eq = Some(gender);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `animal` passes every filter (paging aside).
    pub fn matches(&self, animal: &Animal) -> bool {
        if self.id_eq.as_deref().is_some_and(|id| id != animal.id) {
            return false;
        }
        if self.gender_eq.is_some_and(|g| g != animal.gender) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => {
                let needle = text.to_lowercase();
                animal.name.to_lowercase().contains(&needle)
                    || animal.code.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// One page of animal list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalPage {
    pub docs: Vec<AnimalRef>,
    pub limit: usize,
    pub page: usize,
    pub has_next_page: bool,
}

/// Source of animal records by id or filter.
pub trait AnimalDirectory {
    fn list(&self, query: &AnimalQuery) -> Result<AnimalPage>;

    fn get(&self, id: &str) -> Result<Animal>;

    /// Validate and store a new animal, returning the stored record.
    fn create(&mut self, body: &NewAnimal) -> Result<Animal>;
}

/// Source of flat ancestor records for tree assembly.
pub trait PedigreeTreeQuery {
    /// Records for `animal_id_eq` and its ancestors up to `level` generations back.
    fn ancestors(&self, animal_id_eq: &str, level: u32) -> Result<Vec<RawAncestorRecord>>;
}
