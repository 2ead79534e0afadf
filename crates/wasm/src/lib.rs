//! Herdbook browser boundary.
//!
//! JSON-in, JSON-out entry points for a pedigree renderer. Errors come back
//! as short human-readable strings, ready to show in a notification.

use serde::{Deserialize, Serialize};

use herdbook_core::pedigree::{
    layout, LayoutConfig, LineageAnomaly, PedigreeTree, PedigreeTreeBuilder, PositionChange,
    RawAncestorRecord, TreeDocs, TreeNode, TreeRequest,
};
use herdbook_core::HerdbookError;

/// Tree output: the positioned slots plus any anomalies found in the records.
#[derive(Serialize, Deserialize)]
pub struct TreeOutput {
    pub docs: Vec<Option<TreeNode>>,
    #[serde(default)]
    pub anomalies: Vec<LineageAnomaly>,
}

fn parse<'a, T: Deserialize<'a>>(json: &'a str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Could not read {}: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("JSON serialize error: {}", e))
}

fn user_error(e: HerdbookError) -> String {
    e.user_message()
}

fn build(request_json: &str, records_json: &str) -> Result<PedigreeTree, String> {
    let request: TreeRequest = parse(request_json, "tree request")?;
    let records: Vec<RawAncestorRecord> = parse(records_json, "ancestor records")?;
    let builder = PedigreeTreeBuilder::new(request.level).map_err(user_error)?;
    Ok(builder.build(&request.animal_id_eq, &records))
}

/// Build a pedigree tree.
///
/// `request_json` is `{"animal_id_eq": "...", "level": 4}`; `records_json`
/// is an array of raw ancestor records.
pub fn build_tree_json(request_json: &str, records_json: &str) -> Result<String, String> {
    let tree = build(request_json, records_json)?;
    let anomalies = tree.anomalies().to_vec();
    to_json(&TreeOutput {
        docs: tree.into_docs().docs,
        anomalies,
    })
}

/// Build a tree and lay it out. An empty or `null` config uses the defaults.
pub fn layout_json(request_json: &str, records_json: &str, config_json: &str) -> Result<String, String> {
    let tree = build(request_json, records_json)?;
    let config: LayoutConfig = match config_json.trim() {
        "" | "null" => LayoutConfig::default(),
        json => parse(json, "layout config")?,
    };
    to_json(&layout(&tree, &config))
}

/// Per-position changes between two `{docs}` payloads, e.g. before and after
/// switching the root animal.
pub fn diff_json(previous_docs_json: &str, next_docs_json: &str) -> Result<String, String> {
    let previous: TreeDocs = parse(previous_docs_json, "previous tree")?;
    let next: TreeDocs = parse(next_docs_json, "next tree")?;
    let previous = PedigreeTree::from_docs("", previous).map_err(user_error)?;
    let next = PedigreeTree::from_docs("", next).map_err(user_error)?;
    let changes: Vec<PositionChange> = previous.diff(&next);
    to_json(&changes)
}
