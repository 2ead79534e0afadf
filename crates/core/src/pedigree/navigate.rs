//! Position-level comparison and re-rooting of built trees.

use serde::{Deserialize, Serialize};

use crate::animal::AnimalRef;
use crate::error::{HerdbookError, Result};
use crate::types::{Position, MAX_SUPPORTED_LEVEL};

use super::tree::{capacity, level_of, LineageAnomaly, PedigreeTree, TreeNode};

/// How one slot differs between two trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum PositionChange {
    Added {
        position: Position,
        animal: AnimalRef,
    },
    Removed {
        position: Position,
        previous: AnimalRef,
    },
    Changed {
        position: Position,
        previous: AnimalRef,
        animal: AnimalRef,
    },
}

impl PositionChange {
    pub fn position(&self) -> Position {
        match self {
            PositionChange::Added { position, .. }
            | PositionChange::Removed { position, .. }
            | PositionChange::Changed { position, .. } => *position,
        }
    }
}

/// Map `old` to its position in the subtree rooted at `root`, if it lies there.
fn remap(root: Position, old: Position) -> Option<Position> {
    let (lr, lo) = (level_of(root), level_of(old));
    if lo < lr {
        return None;
    }
    let depth = lo - lr;
    if old >> depth != root {
        return None;
    }
    Some((1usize << depth) + (old - (root << depth)))
}

impl PedigreeTree {
    /// Per-position differences from `self` to `next`, in position order.
    ///
    /// Trees of different depth are compared over the larger one; slots past
    /// the end of the shorter tree count as empty. Unchanged slots are omitted.
    pub fn diff(&self, next: &PedigreeTree) -> Vec<PositionChange> {
        let n = self.len().max(next.len());
        (1..=n)
            .filter_map(|position| match (self.get(position), next.get(position)) {
                (None, None) => None,
                (None, Some(b)) => Some(PositionChange::Added {
                    position,
                    animal: b.animal.clone(),
                }),
                (Some(a), None) => Some(PositionChange::Removed {
                    position,
                    previous: a.animal.clone(),
                }),
                (Some(a), Some(b)) if a.animal != b.animal => Some(PositionChange::Changed {
                    position,
                    previous: a.animal.clone(),
                    animal: b.animal.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Re-root the tree at the ancestor in `position`, keeping every known
    /// ancestor of it at its new position. Generations the old tree never
    /// reached stay empty until the tree is rebuilt at the new root.
    ///
    /// # Errors
    /// Returns an error if `position` is empty or `max_level` is unsupported.
    pub fn recenter(&self, position: Position, max_level: u32) -> Result<PedigreeTree> {
        if max_level > MAX_SUPPORTED_LEVEL {
            return Err(HerdbookError::InvalidLevel {
                level: max_level,
                max: MAX_SUPPORTED_LEVEL,
            });
        }
        let root = self.get(position).ok_or_else(|| {
            HerdbookError::Pedigree(format!("No ancestor known at position {}", position))
        })?;

        let base = level_of(position);
        let nodes = (1..=capacity(max_level))
            .map(|new_pos| {
                let depth = level_of(new_pos);
                if base + depth > self.max_level() {
                    return None;
                }
                let old_pos = (position << depth) + (new_pos - (1usize << depth));
                self.get(old_pos)
                    .map(|n| TreeNode::new(new_pos, n.animal.clone()))
            })
            .collect();

        let anomalies = self
            .anomalies()
            .iter()
            .filter_map(|a| match a {
                LineageAnomaly::DuplicateRecord { .. } => Some(a.clone()),
                LineageAnomaly::MissingParent { position: p, parent_id } => remap(position, *p)
                    .filter(|&q| level_of(q) <= max_level)
                    .map(|q| LineageAnomaly::MissingParent {
                        position: q,
                        parent_id: parent_id.clone(),
                    }),
                LineageAnomaly::SelfAncestor { position: p, id } => remap(position, *p)
                    .filter(|&q| level_of(q) <= max_level)
                    .map(|q| LineageAnomaly::SelfAncestor {
                        position: q,
                        id: id.clone(),
                    }),
            })
            .collect();

        Ok(PedigreeTree::from_parts(&root.animal.id, max_level, nodes, anomalies))
    }
}
