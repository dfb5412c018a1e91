//! Guarded route table.
//!
//! The table is static; guards are evaluated against a session snapshot and
//! the gate configuration every time the active set is requested. Nothing
//! about routes is cached between evaluations.

use serde::Serialize;

use crate::config::GateConfig;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteId {
    Home,
    Visit,
    GuestLand,
    Land,
    Goblins,
    RetreatIndex,
    Retreat,
    Builder,
    CommunityGarden,
}

/// Screen mounted by a route. Rendering is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    LandExpansion,
    /// Forbidden notice inside the splash frame.
    Forbidden,
    TraderDeeplink,
    Retreat,
    Builder,
    Community,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub id: RouteId,
    pub path: &'static str,
    /// Index routes match their path exactly and nothing below it.
    pub index: bool,
    pub screen: Screen,
    /// Remount key; screens sharing a component get distinct keys.
    pub key: Option<&'static str>,
    pub guard: bool,
}

type Guard = fn(&SessionState, &GateConfig) -> bool;

struct RouteDefinition {
    id: RouteId,
    path: &'static str,
    index: bool,
    screen: Screen,
    key: Option<&'static str>,
    guard: Guard,
}

fn always(_: &SessionState, _: &GateConfig) -> bool {
    true
}

/// Visitors are not allowed into the goblin village.
fn not_visiting(state: &SessionState, _: &GateConfig) -> bool {
    !state.matches("visiting")
}

fn test_network_only(_: &SessionState, config: &GateConfig) -> bool {
    config.is_test_network()
}

const ROUTE_TABLE: [RouteDefinition; 9] = [
    RouteDefinition {
        id: RouteId::Home,
        path: "/",
        index: false,
        screen: Screen::LandExpansion,
        key: None,
        guard: always,
    },
    RouteDefinition {
        id: RouteId::Visit,
        path: "/visit/*",
        index: false,
        screen: Screen::LandExpansion,
        key: Some("visit"),
        guard: always,
    },
    RouteDefinition {
        id: RouteId::GuestLand,
        path: "/land",
        index: false,
        screen: Screen::LandExpansion,
        key: Some("guest-land"),
        guard: always,
    },
    RouteDefinition {
        id: RouteId::Land,
        path: "/land/:id/*",
        index: false,
        screen: Screen::LandExpansion,
        key: Some("land"),
        guard: always,
    },
    RouteDefinition {
        id: RouteId::Goblins,
        path: "/goblins",
        index: false,
        screen: Screen::Forbidden,
        key: None,
        guard: not_visiting,
    },
    RouteDefinition {
        id: RouteId::RetreatIndex,
        path: "/retreat",
        index: true,
        screen: Screen::TraderDeeplink,
        key: None,
        guard: always,
    },
    RouteDefinition {
        id: RouteId::Retreat,
        path: "/retreat/:id",
        index: false,
        screen: Screen::Retreat,
        key: Some("retreat"),
        guard: always,
    },
    RouteDefinition {
        id: RouteId::Builder,
        path: "/builder",
        index: false,
        screen: Screen::Builder,
        key: Some("builder"),
        guard: test_network_only,
    },
    RouteDefinition {
        id: RouteId::CommunityGarden,
        path: "/community-garden/:id",
        index: false,
        screen: Screen::Community,
        key: Some("community"),
        guard: always,
    },
];

/// Every route in declaration order with its guard evaluated.
pub fn route_entries(state: &SessionState, config: &GateConfig) -> Vec<RouteEntry> {
    ROUTE_TABLE
        .iter()
        .map(|def| RouteEntry {
            id: def.id,
            path: def.path,
            index: def.index,
            screen: def.screen,
            key: def.key,
            guard: (def.guard)(state, config),
        })
        .collect()
}

/// Routes reachable for this snapshot, in declaration order.
pub fn active_routes(state: &SessionState, config: &GateConfig) -> Vec<RouteEntry> {
    route_entries(state, config)
        .into_iter()
        .filter(|entry| entry.guard)
        .collect()
}
