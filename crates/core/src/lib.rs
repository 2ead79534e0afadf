//! Herd records and pedigree-tree assembly for animal husbandry.
//!
//! The centre of the crate is [`pedigree::PedigreeTreeBuilder`], which turns
//! flat ancestor records into a fixed-size, position-indexed ancestor tree
//! that a renderer can lay out from slot indices alone.

pub mod animal;
pub mod cache;
pub mod config;
pub mod data;
pub mod directory;
pub mod error;
pub mod pedigree;
pub mod types;

pub use config::{HerdbookConfig, TreeOptions};
pub use error::{HerdbookError, Result};
pub use pedigree::{PedigreeTree, PedigreeTreeBuilder, RawAncestorRecord, TreeNode};
