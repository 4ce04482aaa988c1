//! Changelog ledger
//!
//! Session-scoped audit trail of editor changes. Repeated edits of the same
//! subject and field collapse into one uncommitted row that keeps the value
//! from before the first edit.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{Result, StudioError};
use crate::models::{ChangelogEntry, NewChangelogEntry};
use crate::store::Store;

pub struct ChangelogLedger {
    store: Arc<Store>,
}

impl ChangelogLedger {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Record an edit, consolidating with an uncommitted row for the same
    /// `(type, subject, field)` if there is one
    ///
    /// A consolidated row keeps its original `timestamp` and `oldValue` and
    /// takes `id`, `newValue` and `description` from the incoming entry.
    pub fn record(&self, session_id: &str, entry: NewChangelogEntry) -> Result<ChangelogEntry> {
        if session_id.trim().is_empty() {
            return Err(StudioError::validation("Session id must not be empty"));
        }
        if entry.description.trim().is_empty() {
            return Err(StudioError::validation(
                "Changelog entry description must not be empty",
            ));
        }

        self.store.update(|doc| {
            let entries = doc.changelogs.entry(session_id.to_string()).or_default();
            let id = entry
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            if let Some(existing) = entries
                .iter_mut()
                .find(|e| !e.committed && e.same_subject(&entry))
            {
                existing.id = id;
                existing.new_value = entry.new_value;
                existing.description = entry.description;
                tracing::debug!(
                    "Consolidated {} entry in session {}",
                    existing.change_type,
                    session_id
                );
                return Ok(existing.clone());
            }

            let stored = ChangelogEntry {
                id,
                timestamp: entry.timestamp.unwrap_or_else(Utc::now),
                change_type: entry.change_type,
                action_name: entry.action_name,
                resource_uri: entry.resource_uri,
                field_name: entry.field_name,
                old_value: entry.old_value,
                new_value: entry.new_value,
                description: entry.description,
                committed: false,
                session_id: session_id.to_string(),
            };
            entries.push(stored.clone());
            Ok(stored)
        })
    }

    /// All entries of a session, oldest first
    pub fn list(&self, session_id: &str) -> Result<Vec<ChangelogEntry>> {
        Ok(self.store.read(|doc| doc.changelog(session_id).to_vec())?)
    }

    pub fn uncommitted(&self, session_id: &str) -> Result<Vec<ChangelogEntry>> {
        Ok(self.store.read(|doc| {
            doc.changelog(session_id)
                .iter()
                .filter(|e| !e.committed)
                .cloned()
                .collect()
        })?)
    }

    pub fn uncommitted_count(&self, session_id: &str) -> Result<usize> {
        Ok(self.store.read(|doc| {
            doc.changelog(session_id)
                .iter()
                .filter(|e| !e.committed)
                .count()
        })?)
    }

    /// Mark every entry of the session committed; returns how many changed
    pub fn commit(&self, session_id: &str) -> Result<usize> {
        self.store.update(|doc| {
            let Some(entries) = doc.changelogs.get_mut(session_id) else {
                return Ok(0);
            };
            let mut committed = 0;
            for entry in entries.iter_mut().filter(|e| !e.committed) {
                entry.committed = true;
                committed += 1;
            }
            if committed > 0 {
                tracing::info!("Committed {} changelog entries for {}", committed, session_id);
            }
            Ok(committed)
        })
    }

    /// Drop every entry of the session; returns how many were removed
    pub fn clear(&self, session_id: &str) -> Result<usize> {
        self.store.update(|doc| {
            let removed = doc
                .changelogs
                .remove(session_id)
                .map(|entries| entries.len())
                .unwrap_or(0);
            Ok(removed)
        })
    }

    /// Remove one entry, used when the edit it describes was reverted
    pub fn delete_entry(&self, session_id: &str, entry_id: &str) -> Result<ChangelogEntry> {
        self.store.update(|doc| {
            let not_found = || {
                StudioError::not_found(format!(
                    "Changelog entry '{}' not found in session '{}'",
                    entry_id, session_id
                ))
            };

            let entries = doc.changelogs.get_mut(session_id).ok_or_else(not_found)?;
            let pos = entries
                .iter()
                .position(|e| e.id == entry_id)
                .ok_or_else(not_found)?;
            let removed = entries.remove(pos);
            if entries.is_empty() {
                doc.changelogs.remove(session_id);
            }
            Ok(removed)
        })
    }
}
