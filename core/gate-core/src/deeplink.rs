//! Trader deep-link normalization.
//!
//! `/retreat/:id` needs a farm id, but links to the goblin trader arrive as a
//! bare `/retreat?...`. When the session knows the farm, the link is rewritten
//! to the canonical path with its query intact; otherwise nothing happens and
//! the outlet stays empty.

use serde::Serialize;

use crate::router::serialize_query;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub to: String,
    /// Replace the current history entry so back-navigation skips the
    /// ambiguous link.
    pub replace: bool,
}

pub fn trader_deeplink(farm_id: Option<u64>, query: &[(String, String)]) -> Option<Redirect> {
    // Farm ids start at 1; a zero id is as good as none.
    let farm_id = farm_id.filter(|id| *id != 0)?;

    let mut to = format!("/retreat/{farm_id}");
    if !query.is_empty() {
        to.push('?');
        to.push_str(&serialize_query(query));
    }

    tracing::debug!(to = %to, "Trader deep-link normalized");
    Some(Redirect { to, replace: true })
}
