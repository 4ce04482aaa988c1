//! Draft overlay resolution
//!
//! Three copies of an action or widget resource can compete: the live
//! server's copy, the stored discovered/custom record, and an uncommitted
//! draft. The rules are:
//!
//! - a live record is shown as-is unless the store holds a dirty copy with
//!   the same key (draft, never deployed, or soft-deleted), in which case the
//!   stored copy replaces it entirely;
//! - stored records without a live counterpart are always shown;
//! - live records keep their order and store-only records follow in store
//!   order.

mod correlate;
mod export;
mod resolver;

pub use correlate::{correlate_widget, link_resources, uri_stem};
pub use export::{DraftExporter, FileExporter};
pub use resolver::{DeployedDrafts, DiscoverySummary, OverlayResolver};

use std::collections::{HashMap, HashSet};

use crate::models::{Action, Overlaid, WidgetResource};

/// Merge live records with stored overlay records
pub fn merge_overlay<T: Overlaid + Clone>(live: &[T], stored: &[T]) -> Vec<T> {
    let mut stored_by_key: HashMap<&str, &T> = HashMap::with_capacity(stored.len());
    for item in stored {
        stored_by_key.entry(item.key()).or_insert(item);
    }
    let live_keys: HashSet<&str> = live.iter().map(Overlaid::key).collect();

    let mut merged = Vec::with_capacity(live.len() + stored.len());

    for item in live {
        match stored_by_key.get(item.key()) {
            Some(stored) if stored.flags().is_dirty() => merged.push((*stored).clone()),
            _ => merged.push(item.clone()),
        }
    }

    let mut emitted: HashSet<&str> = HashSet::new();
    for item in stored {
        if !live_keys.contains(item.key()) && emitted.insert(item.key()) {
            merged.push(item.clone());
        }
    }

    merged
}

/// Merged action list for one server
pub fn merge_actions(live: &[Action], stored: &[Action]) -> Vec<Action> {
    merge_overlay(live, stored)
}

/// Merged widget resource list for one server
pub fn merge_resources(live: &[WidgetResource], stored: &[WidgetResource]) -> Vec<WidgetResource> {
    merge_overlay(live, stored)
}

/// Settle pending records after a successful deploy
///
/// Records with a draft or never deployed become deployed with the draft
/// flag cleared. Soft-deleted records stay as deployed tombstones; only a
/// revert or a delete-before-deploy removes a stored record. Records
/// already settled are left untouched. Returns the keys of every record
/// that changed.
pub fn settle_deployed<T: Overlaid>(items: &mut [T]) -> Vec<String> {
    let mut changed = Vec::new();

    for item in items.iter_mut() {
        if item.flags().is_pending() {
            let flags = item.flags_mut();
            flags.deployed = true;
            flags.draft = false;
            changed.push(item.key().to_string());
        }
    }

    changed
}
