//! Widget resource ↔ action correlation
//!
//! Live servers do not reliably report which action a widget belongs to, so
//! identity is re-derived in priority order:
//!
//! 1. the resource's own `actionName`
//! 2. the action's `_meta` output template equal to the resource `uri`
//! 3. the resource uri's filename stem naming the action
//!
//! Tier 3 can match the wrong action when two actions share a near-identical
//! widget filename stem. It is kept as the last resort only.

use crate::models::{Action, WidgetResource};

const WIDGET_SUFFIXES: [&str; 2] = ["-widget", "_widget"];

/// Filename stem of a resource uri, without query, fragment or extension
///
/// `ui://eds-widget/foo-widget.html` → `foo-widget`
pub fn uri_stem(uri: &str) -> Option<&str> {
    let path = uri.split(|c: char| c == '?' || c == '#').next()?;
    let file = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = match file.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file,
    };
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

fn stem_names(uri: &str, action_name: &str) -> bool {
    let Some(stem) = uri_stem(uri) else {
        return false;
    };
    stem == action_name
        || WIDGET_SUFFIXES
            .iter()
            .any(|suffix| stem.strip_suffix(suffix) == Some(action_name))
}

/// Find the widget resource rendered for `action`
///
/// Each tier is tried over the whole list before falling through to the
/// next one. No match is not an error: many resources are standalone.
pub fn correlate_widget<'a>(
    action: &Action,
    resources: &'a [WidgetResource],
) -> Option<&'a WidgetResource> {
    if let Some(direct) = resources
        .iter()
        .find(|r| r.action_name.as_deref() == Some(action.name.as_str()))
    {
        return Some(direct);
    }

    if let Some(template) = action.output_template() {
        if let Some(by_template) = resources.iter().find(|r| r.uri == template) {
            return Some(by_template);
        }
    }

    resources.iter().find(|r| stem_names(&r.uri, &action.name))
}

/// Fill in a missing `actionName` on resources by reverse correlation
///
/// Only the metadata tiers apply here (template, then stem); resources that
/// already name an action are left alone.
pub fn link_resources(resources: &mut [WidgetResource], actions: &[Action]) {
    for resource in resources.iter_mut().filter(|r| r.action_name.is_none()) {
        let linked = actions
            .iter()
            .find(|a| a.output_template() == Some(resource.uri.as_str()))
            .or_else(|| actions.iter().find(|a| stem_names(&resource.uri, &a.name)));

        if let Some(action) = linked {
            tracing::debug!("Linked widget {} to action {}", resource.uri, action.name);
            resource.action_name = Some(action.name.clone());
        }
    }
}
