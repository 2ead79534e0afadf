// Pedigree module: ancestor-tree assembly, navigation and layout.

pub mod builder;
pub mod layout;
pub mod navigate;
pub mod record;
pub mod tree;

use serde::{Deserialize, Serialize};

use crate::types::{AnimalId, DEFAULT_LEVEL};

pub use builder::{build_tree, DuplicatePolicy, PedigreeTreeBuilder};
pub use layout::{layout, Edge, LayoutConfig, NodeBox, Orientation, Point, TreeLayout};
pub use navigate::PositionChange;
pub use record::{read_records_csv, read_records_csv_from, read_records_json, RawAncestorRecord};
pub use tree::{LineageAnomaly, PedigreeTree, TreeDocs, TreeNode};

fn default_level() -> u32 {
    DEFAULT_LEVEL
}

/// Query parameters of a pedigree-tree request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeRequest {
    pub animal_id_eq: AnimalId,
    #[serde(default = "default_level")]
    pub level: u32,
}

impl TreeRequest {
    pub fn new(animal_id: &str) -> Self {
        Self {
            animal_id_eq: animal_id.to_string(),
            level: DEFAULT_LEVEL,
        }
    }
}
