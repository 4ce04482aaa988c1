//! Draft export to the server's config files
//!
//! Deploying drafts means handing them to whatever build turns config files
//! into a running server. The default exporter writes one JSON file per
//! record under `<root>/<serverId>/`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::models::{Action, WidgetResource};

/// Writes dirty drafts to an external artifact
#[async_trait]
pub trait DraftExporter: Send + Sync {
    /// Write the given actions; returns the names written (deleted ones included)
    async fn export_actions(&self, server_id: &str, actions: &[Action]) -> Result<Vec<String>>;

    /// Write the given resources; returns the uris written
    async fn export_resources(
        &self,
        server_id: &str,
        resources: &[WidgetResource],
    ) -> Result<Vec<String>>;
}

/// Exporter writing `actions/<name>.json` and `widgets/<uri path>.json` files
#[derive(Debug, Clone)]
pub struct FileExporter {
    root: PathBuf,
}

impl FileExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, server_id: &str, kind: &str) -> PathBuf {
        self.root.join(file_name(server_id)).join(kind)
    }
}

/// Make a record key safe to use as a file name
fn file_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// File stem of a widget: its uri without scheme, query or extension
///
/// `ui://shop/card.html` → `shop_card`
fn widget_file_stem(uri: &str) -> String {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let path = rest
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(rest)
        .trim_matches('/');
    let path = match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => stem,
        _ => path,
    };
    if path.is_empty() {
        file_name(uri)
    } else {
        file_name(path)
    }
}

/// Target path of every record, failing when two keys map to one file
fn target_paths<'a>(
    dir: &Path,
    records: impl Iterator<Item = (&'a str, String)>,
) -> Result<Vec<PathBuf>> {
    let mut claimed: HashMap<PathBuf, &str> = HashMap::new();
    let mut paths = Vec::new();
    for (key, stem) in records {
        let path = dir.join(format!("{}.json", stem));
        if let Some(other) = claimed.insert(path.clone(), key) {
            bail!("'{}' and '{}' both export to {:?}", other, key, path);
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Write `value` to `path`, or remove the file when `deleted`
async fn write_or_remove<T: serde::Serialize>(path: &Path, value: &T, deleted: bool) -> Result<()> {
    if deleted {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("Failed to remove {:?}", path)),
        }
        return Ok(());
    }

    let text = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

#[async_trait]
impl DraftExporter for FileExporter {
    async fn export_actions(&self, server_id: &str, actions: &[Action]) -> Result<Vec<String>> {
        let dir = self.dir(server_id, "actions");
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;

        let paths = target_paths(
            &dir,
            actions.iter().map(|a| (a.name.as_str(), file_name(&a.name))),
        )?;

        let mut written = Vec::with_capacity(actions.len());
        for (action, path) in actions.iter().zip(&paths) {
            write_or_remove(path, action, action.flags.deleted).await?;
            written.push(action.name.clone());
        }

        tracing::info!("Exported {} action drafts for {}", written.len(), server_id);
        Ok(written)
    }

    async fn export_resources(
        &self,
        server_id: &str,
        resources: &[WidgetResource],
    ) -> Result<Vec<String>> {
        let dir = self.dir(server_id, "widgets");
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;

        let paths = target_paths(
            &dir,
            resources
                .iter()
                .map(|r| (r.uri.as_str(), widget_file_stem(&r.uri))),
        )?;

        let mut written = Vec::with_capacity(resources.len());
        for (resource, path) in resources.iter().zip(&paths) {
            write_or_remove(path, resource, resource.flags.deleted).await?;
            written.push(resource.uri.clone());
        }

        tracing::info!("Exported {} widget drafts for {}", written.len(), server_id);
        Ok(written)
    }
}
