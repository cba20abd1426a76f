//! # Lower Third Items
//!
//! The plugin's list response is loosely specified: depending on plugin
//! version the `items` array sits directly in `responseData`, or one or two
//! `responseData` levels further down. Extraction probes a fixed list of
//! candidate paths in order and falls back to an empty list.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::messages::RequestResponse;

/// Candidate locations of the `items` array, relative to `responseData`.
pub const ITEM_PATHS: [&[&str]; 3] = [
    &["items"],
    &["responseData", "items"],
    &["responseData", "responseData", "items"],
];

/// A lower third as reported by the plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LowerThird {
    /// Plugin-assigned id
    pub id: String,
    /// Headline text
    pub title: String,
    /// Secondary text
    pub subtitle: String,
    /// Currently on screen
    pub is_visible: bool,
    /// Auto-show interval in seconds (0 = off)
    pub repeat_every_sec: u64,
    /// How long an auto-show stays up, in seconds
    pub repeat_visible_sec: u64,
    /// Bound hotkey, if any
    pub hotkey: Option<String>,
}

impl LowerThird {
    /// Title, or the id when the title is blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// Raw item values from a vendor response body.
pub fn extract_items(response_data: &Value) -> Vec<Value> {
    ITEM_PATHS
        .iter()
        .find_map(|path| lookup(response_data, path)?.as_array().cloned())
        .unwrap_or_default()
}

/// Typed items from a vendor response. Entries that do not decode are skipped.
pub fn normalize_items(response: &RequestResponse) -> Vec<LowerThird> {
    extract_items(&response.response_data)
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<LowerThird>(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(error = %e, "Skipping undecodable lower third");
                None
            }
        })
        .collect()
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(key))
}
