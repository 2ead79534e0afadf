use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::TreeOptions;
use crate::directory::PedigreeTreeQuery;
use crate::error::{HerdbookError, Result};
use crate::types::{Position, MAX_SUPPORTED_LEVEL};

use super::navigate::PositionChange;
use super::record::RawAncestorRecord;
use super::tree::{capacity, child_of, role_of, LineageAnomaly, ParentRole, PedigreeTree, TreeNode};

/// Which record wins when several share one animal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicatePolicy {
    /// Keep the earliest record in input order.
    #[default]
    FirstWins,
    /// Keep the latest record in input order.
    LastWins,
}

/// Assembles flat ancestor records into a fixed-size, position-indexed tree.
///
/// The builder is a pure transformation: it performs no I/O, keeps no state
/// between calls, and gives identical output for identical input. Slots are
/// filled in position order, each one only from its already-filled child
/// slot, so depth is bounded by construction and cyclic parent links cannot
/// cause runaway output.
#[derive(Debug, Clone)]
pub struct PedigreeTreeBuilder {
    max_level: u32,
    duplicate_policy: DuplicatePolicy,
}

impl PedigreeTreeBuilder {
    /// Builder for trees `max_level` generations deep.
    ///
    /// # Errors
    /// Returns [`HerdbookError::InvalidLevel`] above [`MAX_SUPPORTED_LEVEL`].
    pub fn new(max_level: u32) -> Result<Self> {
        if max_level > MAX_SUPPORTED_LEVEL {
            return Err(HerdbookError::InvalidLevel {
                level: max_level,
                max: MAX_SUPPORTED_LEVEL,
            });
        }
        Ok(Self {
            max_level,
            duplicate_policy: DuplicatePolicy::default(),
        })
    }

    /// Builder configured from [`TreeOptions`], validating them first.
    pub fn from_options(options: &TreeOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::new(options.level)?.duplicate_policy(options.duplicate_policy))
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Build the ancestor tree of `root_id` from `records`.
    ///
    /// A root that is blank or absent from `records` yields an all-null tree.
    /// Parent ids missing from `records` leave their slot null.
    pub fn build(&self, root_id: &str, records: &[RawAncestorRecord]) -> PedigreeTree {
        let root_id = root_id.trim();
        let (index, mut anomalies) = self.index_records(records);

        let Some(root) = index.get(root_id).filter(|_| !root_id.is_empty()) else {
            log::debug!("Root animal '{}' not found among {} records", root_id, records.len());
            return PedigreeTree::from_parts(root_id, self.max_level, vec![None; capacity(self.max_level)], anomalies);
        };

        let n = capacity(self.max_level);
        let mut slots: Vec<Option<&RawAncestorRecord>> = vec![None; n];
        slots[0] = Some(*root);

        for position in 2..=n {
            let Some(child) = child_of(position).and_then(|c| slots[c - 1]) else {
                continue;
            };
            let parent_id = match role_of(position) {
                Some(ParentRole::Father) => child.father(),
                Some(ParentRole::Mother) => child.mother(),
                None => None,
            };
            let Some(parent_id) = parent_id else { continue };

            match index.get(parent_id.as_str()) {
                Some(parent) => {
                    if descends_from_itself(&slots, position, &parent.id) {
                        log::warn!(
                            "Animal '{}' appears as its own ancestor at position {}",
                            parent.id,
                            position
                        );
                        anomalies.push(LineageAnomaly::SelfAncestor {
                            position,
                            id: parent.id.clone(),
                        });
                    }
                    slots[position - 1] = Some(*parent);
                }
                None => {
                    log::warn!(
                        "Parent '{}' of '{}' is not among the fetched records",
                        parent_id,
                        child.id
                    );
                    anomalies.push(LineageAnomaly::MissingParent { position, parent_id });
                }
            }
        }

        let nodes = slots
            .iter()
            .enumerate()
            .map(|(i, rec)| rec.map(|r| TreeNode::new(i + 1, r.to_animal_ref())))
            .collect();

        log::debug!(
            "Built pedigree tree for '{}' at level {} ({} anomalies)",
            root_id,
            self.max_level,
            anomalies.len()
        );
        PedigreeTree::from_parts(root_id, self.max_level, nodes, anomalies)
    }

    /// Build a fresh tree and report how it differs, slot by slot, from
    /// `previous`. Renderer state keyed by position survives wherever the
    /// diff is silent.
    pub fn rebuild(
        &self,
        previous: &PedigreeTree,
        root_id: &str,
        records: &[RawAncestorRecord],
    ) -> (PedigreeTree, Vec<PositionChange>) {
        let next = self.build(root_id, records);
        let changes = previous.diff(&next);
        (next, changes)
    }

    /// Fetch records for `root_id` from `source` and build the tree.
    pub fn fetch_and_build<Q: PedigreeTreeQuery + ?Sized>(
        &self,
        source: &Q,
        root_id: &str,
    ) -> Result<PedigreeTree> {
        let records = source.ancestors(root_id, self.max_level)?;
        Ok(self.build(root_id, &records))
    }

    /// Map ids to records under the duplicate policy, noting each duplicated id
    /// once in first-seen order.
    fn index_records<'a>(
        &self,
        records: &'a [RawAncestorRecord],
    ) -> (IndexMap<&'a str, &'a RawAncestorRecord>, Vec<LineageAnomaly>) {
        let mut index: IndexMap<&str, &RawAncestorRecord> = IndexMap::with_capacity(records.len());
        let mut counts: IndexMap<&str, usize> = IndexMap::new();

        for rec in records {
            let id = rec.id.trim();
            if id.is_empty() {
                continue;
            }
            *counts.entry(id).or_insert(0) += 1;
            match self.duplicate_policy {
                DuplicatePolicy::FirstWins => {
                    index.entry(id).or_insert(rec);
                }
                DuplicatePolicy::LastWins => {
                    index.insert(id, rec);
                }
            }
        }

        let anomalies = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, count)| {
                log::warn!("{} records share animal id '{}'", count, id);
                LineageAnomaly::DuplicateRecord {
                    id: id.to_string(),
                    count,
                }
            })
            .collect();

        (index, anomalies)
    }
}

/// Whether `id` already occupies a slot on the path from `position` down to the root.
fn descends_from_itself(slots: &[Option<&RawAncestorRecord>], position: Position, id: &str) -> bool {
    let mut current = child_of(position);
    while let Some(p) = current {
        if slots[p - 1].is_some_and(|r| r.id.trim() == id) {
            return true;
        }
        current = child_of(p);
    }
    false
}

/// Build a tree with default options at the given depth.
pub fn build_tree(root_id: &str, max_level: u32, records: &[RawAncestorRecord]) -> Result<PedigreeTree> {
    Ok(PedigreeTreeBuilder::new(max_level)?.build(root_id, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, father: Option<&str>, mother: Option<&str>) -> RawAncestorRecord {
        RawAncestorRecord::new(id).with_parents(father, mother)
    }

    fn ids(tree: &PedigreeTree) -> Vec<Option<&str>> {
        tree.nodes()
            .iter()
            .map(|n| n.as_ref().map(|n| n.animal.id.as_str()))
            .collect()
    }

    #[test]
    fn test_father_only() {
        let records = vec![rec("A", Some("B"), None), rec("B", None, None)];
        let tree = build_tree("A", 1, &records).unwrap();
        assert_eq!(ids(&tree), vec![Some("A"), Some("B"), None]);
        assert_eq!(tree.get(2).unwrap().level, 1);
        assert!(tree.anomalies().is_empty());
    }

    #[test]
    fn test_padded_ids_resolve_to_trimmed_nodes() {
        let records = vec![rec(" A ", Some("B "), None), rec("B", None, None)];
        let tree = build_tree("A", 1, &records).unwrap();
        assert_eq!(tree.root_id(), "A");
        assert_eq!(ids(&tree), vec![Some("A"), Some("B"), None]);
    }

    #[test]
    fn test_root_without_parents() {
        let tree = build_tree("A", 2, &[rec("A", None, None)]).unwrap();
        assert_eq!(tree.len(), 7);
        assert!(tree.get(1).is_some());
        assert!((2..=7).all(|p| tree.get(p).is_none()));
    }

    #[test]
    fn test_unknown_root_gives_all_null() {
        let records = vec![rec("A", Some("B"), None), rec("B", None, None)];
        let tree = build_tree("Z", 3, &records).unwrap();
        assert_eq!(tree.len(), 15);
        assert!(tree.is_empty());
        assert!(tree.populated().next().is_none());

        let tree = build_tree("  ", 1, &records).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_full_three_generations() {
        let records = vec![
            rec("A", Some("B"), Some("C")),
            rec("B", Some("D"), Some("E")),
            rec("C", Some("F"), Some("G")),
            rec("D", None, None),
            rec("E", None, None),
            rec("F", None, None),
            rec("G", None, None),
        ];
        let tree = build_tree("A", 2, &records).unwrap();
        assert_eq!(
            ids(&tree),
            vec![Some("A"), Some("B"), Some("C"), Some("D"), Some("E"), Some("F"), Some("G")]
        );
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_missing_parent_is_null_and_flagged() {
        let records = vec![rec("A", Some("B"), Some("ghost"))];
        let tree = build_tree("A", 1, &records).unwrap();
        assert_eq!(ids(&tree), vec![Some("A"), None, None]);
        assert_eq!(
            tree.anomalies(),
            &[
                LineageAnomaly::MissingParent {
                    position: 2,
                    parent_id: "B".to_string()
                },
                LineageAnomaly::MissingParent {
                    position: 3,
                    parent_id: "ghost".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_self_parent_is_bounded() {
        let records = vec![rec("A", Some("A"), None)];
        let tree = build_tree("A", 3, &records).unwrap();
        let fathers: Vec<Position> = tree.populated().map(|n| n.position).collect();
        assert_eq!(fathers, vec![1, 2, 4, 8]);
        assert_eq!(tree.len(), 15);
        assert!(tree
            .anomalies()
            .iter()
            .all(|a| matches!(a, LineageAnomaly::SelfAncestor { id, .. } if id == "A")));
        assert_eq!(tree.anomalies().len(), 3);
    }

    #[test]
    fn test_two_cycle_is_bounded() {
        let records = vec![rec("A", Some("B"), None), rec("B", Some("A"), None)];
        let tree = build_tree("A", 4, &records).unwrap();
        let chain: Vec<&str> = tree.populated().map(|n| n.animal.id.as_str()).collect();
        assert_eq!(chain, vec!["A", "B", "A", "B", "A"]);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_duplicate_first_wins_by_default() {
        let records = vec![
            rec("A", None, None).with_name("first"),
            rec("A", None, None).with_name("second"),
        ];
        let tree = build_tree("A", 0, &records).unwrap();
        assert_eq!(tree.root().unwrap().animal.name, "first");
        assert_eq!(
            tree.anomalies(),
            &[LineageAnomaly::DuplicateRecord {
                id: "A".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn test_duplicate_last_wins() {
        let records = vec![
            rec("A", None, None).with_name("first"),
            rec("A", None, None).with_name("second"),
        ];
        let tree = PedigreeTreeBuilder::new(0)
            .unwrap()
            .duplicate_policy(DuplicatePolicy::LastWins)
            .build("A", &records);
        assert_eq!(tree.root().unwrap().animal.name, "second");
    }

    #[test]
    fn test_level_ceiling() {
        let err = PedigreeTreeBuilder::new(MAX_SUPPORTED_LEVEL + 1).unwrap_err();
        assert!(matches!(err, HerdbookError::InvalidLevel { .. }));
    }

    #[test]
    fn test_rebuild_reports_changes() {
        let records = vec![rec("A", Some("B"), None), rec("B", None, None), rec("C", None, None)];
        let builder = PedigreeTreeBuilder::new(1).unwrap();
        let first = builder.build("A", &records);

        let (same, changes) = builder.rebuild(&first, "A", &records);
        assert_eq!(same, first);
        assert!(changes.is_empty());

        let records = vec![rec("A", Some("B"), Some("C")), rec("B", None, None), rec("C", None, None)];
        let (_, changes) = builder.rebuild(&first, "A", &records);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].position(), 3);
    }
}
