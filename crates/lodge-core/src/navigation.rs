//! Navigation resolution.
//!
//! Normalizes heterogeneous "go here" instructions — absolute URLs,
//! relative paths, symbolic view keys — into a concrete action. This is a
//! pure function so any affordance (notification click, deep link) can use
//! it, and so the mapping is testable in isolation.

use serde::{Deserialize, Serialize};

use crate::view::View;

/// The outcome of resolving a navigation instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavAction {
    /// Switch the main shell to this view.
    SetView { view: View },
    /// Open the target in a new external context; the in-app view is
    /// untouched.
    OpenExternal { url: String },
}

/// Side-effect port for `NavAction::OpenExternal`: how the host environment
/// opens an external URL (browser tab, OS handler).
pub trait ExternalOpener: Send + Sync {
    fn open(&self, url: &str);
}

/// Resolves an arbitrary inbound instruction to a navigation action.
///
/// Ordered, first match wins:
/// 1. `http://`/`https://` prefixes open externally.
/// 2. An exact symbolic view key (`"DEALS"`) selects that view.
/// 3. Otherwise the leading slash is stripped, the first path segment taken
///    (query and fragment dropped), uppercased with dashes replaced by
///    underscores, and matched again.
/// 4. Anything else is opened externally as a best effort, so no
///    instruction dead-ends without navigation at all.
pub fn resolve(input: &str) -> NavAction {
    let trimmed = input.trim();

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return NavAction::OpenExternal {
            url: trimmed.to_string(),
        };
    }

    if let Ok(view) = trimmed.parse::<View>() {
        return NavAction::SetView { view };
    }

    let path = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let segment = path
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let symbolic = segment.to_ascii_uppercase().replace('-', "_");
    if let Ok(view) = symbolic.parse::<View>() {
        return NavAction::SetView { view };
    }

    tracing::warn!(
        "[Navigation] Unrecognized target '{}', falling back to external open",
        trimmed
    );
    NavAction::OpenExternal {
        url: trimmed.to_string(),
    }
}
