//! One-shot gate queries against a settled session.
//!
//! These skip the debounce: the view is whatever the tag settles to.

use gate_core::{
    is_experience_visible, resolve_render, route_entries, GateConfig, GateView, Location, Render,
    RouteEntry, SessionState,
};
use serde::Serialize;
use session_protocol::SessionTag;

#[derive(Debug, Serialize)]
pub struct RoutesReport {
    pub tag: SessionTag,
    pub network: String,
    pub view: GateView,
    /// Every route with its guard evaluated; empty while hidden.
    pub routes: Vec<RouteEntry>,
}

pub fn routes_report(tag: SessionTag, config: &GateConfig) -> RoutesReport {
    let view = settled_view(tag);
    let routes = match view {
        GateView::Hidden => Vec::new(),
        GateView::Shown => route_entries(&SessionState::new(tag), config),
    };
    RoutesReport {
        tag,
        network: config.network.clone(),
        view,
        routes,
    }
}

pub fn resolve(tag: SessionTag, farm_id: Option<u64>, config: &GateConfig, location: &str) -> Render {
    let mut state = SessionState::new(tag);
    if let Some(farm_id) = farm_id {
        state = state.with_farm_id(farm_id);
    }
    resolve_render(settled_view(tag), &state, config, &Location::parse(location))
}

fn settled_view(tag: SessionTag) -> GateView {
    GateView::from_visibility(is_experience_visible(tag))
}
