//! Array-backed ancestor tree and its position arithmetic.
//!
//! Positions follow the usual pedigree numbering: the root animal is 1, the
//! father of `k` is `2k` and the mother is `2k + 1`. A tree of depth `L`
//! therefore always has `2^(L + 1) - 1` slots, and `nodes[k - 1]` holds
//! position `k`.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::animal::AnimalRef;
use crate::error::{HerdbookError, Result};
use crate::types::{AnimalId, Position, MAX_SUPPORTED_LEVEL};

/// Number of slots in a tree of depth `max_level`.
pub fn capacity(max_level: u32) -> usize {
    (1usize << (max_level + 1)) - 1
}

/// Generation of `position`, 0 for the root.
pub fn level_of(position: Position) -> u32 {
    debug_assert!(position >= 1, "positions start at 1");
    usize::BITS - 1 - position.leading_zeros()
}

/// Index of `position` within its generation, counted from the father side.
pub fn slot_of(position: Position) -> usize {
    position - (1usize << level_of(position))
}

pub fn father_of(position: Position) -> Position {
    2 * position
}

pub fn mother_of(position: Position) -> Position {
    2 * position + 1
}

/// The offspring position whose parent `position` is; `None` for the root.
pub fn child_of(position: Position) -> Option<Position> {
    (position > 1).then_some(position / 2)
}

/// Which parent of its child a position is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRole {
    Father,
    Mother,
}

/// Role of `position` relative to [`child_of`]; `None` for the root.
pub fn role_of(position: Position) -> Option<ParentRole> {
    match position {
        0 | 1 => None,
        p if p % 2 == 0 => Some(ParentRole::Father),
        _ => Some(ParentRole::Mother),
    }
}

/// A populated slot of the ancestor tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub position: Position,
    pub level: u32,
    pub animal: AnimalRef,
}

impl TreeNode {
    pub fn new(position: Position, animal: AnimalRef) -> Self {
        Self {
            position,
            level: level_of(position),
            animal,
        }
    }
}

/// Data problems noticed while assembling a tree. They are reported, never
/// repaired; the depth bound is the only thing that limits their effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LineageAnomaly {
    /// More than one record carried this id; one was chosen by policy.
    #[serde(rename_all = "camelCase")]
    DuplicateRecord { id: AnimalId, count: usize },
    /// A parent link named an id absent from the record set.
    #[serde(rename_all = "camelCase")]
    MissingParent { position: Position, parent_id: AnimalId },
    /// The animal at `position` also appears among its own descendants in the tree.
    #[serde(rename_all = "camelCase")]
    SelfAncestor { position: Position, id: AnimalId },
}

/// Wire shape handed to renderers: `{ "docs": [node | null, ...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDocs {
    pub docs: Vec<Option<TreeNode>>,
}

/// Positioned ancestor tree for one root animal.
///
/// Deserializing goes through [`PedigreeTree::check_invariants`], so a tree
/// read from JSON is as well-formed as one the builder produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTree")]
pub struct PedigreeTree {
    root_id: AnimalId,
    max_level: u32,
    nodes: Vec<Option<TreeNode>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    anomalies: Vec<LineageAnomaly>,
}

/// Unchecked wire form of [`PedigreeTree`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTree {
    root_id: AnimalId,
    max_level: u32,
    nodes: Vec<Option<TreeNode>>,
    #[serde(default)]
    anomalies: Vec<LineageAnomaly>,
}

impl TryFrom<RawTree> for PedigreeTree {
    type Error = HerdbookError;

    fn try_from(raw: RawTree) -> Result<Self> {
        if raw.max_level > MAX_SUPPORTED_LEVEL {
            return Err(HerdbookError::InvalidLevel {
                level: raw.max_level,
                max: MAX_SUPPORTED_LEVEL,
            });
        }
        let tree = Self {
            root_id: raw.root_id,
            max_level: raw.max_level,
            nodes: raw.nodes,
            anomalies: raw.anomalies,
        };
        tree.check_invariants()?;
        Ok(tree)
    }
}

impl PedigreeTree {
    /// All-null tree, used when the root cannot be resolved. Levels above
    /// [`MAX_SUPPORTED_LEVEL`] are clamped to it.
    pub fn empty(root_id: &str, max_level: u32) -> Self {
        let max_level = max_level.min(MAX_SUPPORTED_LEVEL);
        Self {
            root_id: root_id.to_string(),
            max_level,
            nodes: vec![None; capacity(max_level)],
            anomalies: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        root_id: &str,
        max_level: u32,
        nodes: Vec<Option<TreeNode>>,
        anomalies: Vec<LineageAnomaly>,
    ) -> Self {
        debug_assert_eq!(nodes.len(), capacity(max_level));
        Self {
            root_id: root_id.to_string(),
            max_level,
            nodes,
            anomalies,
        }
    }

    /// Rebuild a tree from its wire shape, checking every structural invariant.
    ///
    /// # Errors
    /// Returns an error if the length is not `2^(L + 1) - 1` for some
    /// supported `L`, if a node sits at the wrong index, or if a node exists
    /// while its child position is empty.
    pub fn from_docs(root_id: &str, docs: TreeDocs) -> Result<Self> {
        let len = docs.docs.len();
        let max_level = (0..=MAX_SUPPORTED_LEVEL)
            .find(|&l| capacity(l) == len)
            .ok_or_else(|| {
                HerdbookError::Pedigree(format!(
                    "{} tree slots do not form a complete binary tree",
                    len
                ))
            })?;
        let tree = Self::from_parts(root_id, max_level, docs.docs, Vec::new());
        tree.check_invariants()?;
        Ok(tree)
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Slots in position order; `nodes()[k - 1]` is position `k`.
    pub fn nodes(&self) -> &[Option<TreeNode>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.first().map_or(true, Option::is_none)
    }

    pub fn anomalies(&self) -> &[LineageAnomaly] {
        &self.anomalies
    }

    /// Node at `position`, `None` if unknown or out of range.
    pub fn get(&self, position: Position) -> Option<&TreeNode> {
        position
            .checked_sub(1)
            .and_then(|i| self.nodes.get(i))
            .and_then(Option::as_ref)
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.get(1)
    }

    pub fn father(&self, position: Position) -> Option<&TreeNode> {
        self.get(father_of(position))
    }

    pub fn mother(&self, position: Position) -> Option<&TreeNode> {
        self.get(mother_of(position))
    }

    /// Populated nodes in position order.
    pub fn populated(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().flatten()
    }

    /// Populated nodes of one generation.
    pub fn generation(&self, level: u32) -> impl Iterator<Item = &TreeNode> {
        self.populated().filter(move |n| n.level == level)
    }

    /// Distinct ancestor ids (root excluded) in first-seen position order.
    pub fn ancestor_ids(&self) -> IndexSet<&str> {
        self.populated()
            .filter(|n| n.position > 1)
            .map(|n| n.animal.id.as_str())
            .collect()
    }

    /// Animals occupying more than one position, i.e. pedigree collapse from
    /// related parents, with every position they occupy.
    pub fn inbreeding_loops(&self) -> IndexMap<&str, Vec<Position>> {
        let mut seen: IndexMap<&str, Vec<Position>> = IndexMap::new();
        for node in self.populated() {
            seen.entry(node.animal.id.as_str())
                .or_default()
                .push(node.position);
        }
        seen.retain(|_, positions| positions.len() > 1);
        seen
    }

    pub fn to_docs(&self) -> TreeDocs {
        TreeDocs {
            docs: self.nodes.clone(),
        }
    }

    pub fn into_docs(self) -> TreeDocs {
        TreeDocs { docs: self.nodes }
    }

    /// Verify the slot count, position/index agreement and that no ancestor is
    /// present above an empty slot.
    pub fn check_invariants(&self) -> Result<()> {
        if self.nodes.len() != capacity(self.max_level) {
            return Err(HerdbookError::Pedigree(format!(
                "Tree of level {} has {} slots, expected {}",
                self.max_level,
                self.nodes.len(),
                capacity(self.max_level)
            )));
        }
        for (i, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else { continue };
            let position = i + 1;
            if node.position != position || node.level != level_of(position) {
                return Err(HerdbookError::Pedigree(format!(
                    "Node at slot {} claims position {} level {}",
                    position, node.position, node.level
                )));
            }
            if let Some(child) = child_of(position) {
                if self.get(child).is_none() {
                    return Err(HerdbookError::Pedigree(format!(
                        "Ancestor at position {} has no descendant at position {}",
                        position, child
                    )));
                }
            }
        }
        Ok(())
    }
}
