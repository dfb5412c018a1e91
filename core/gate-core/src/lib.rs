//! # gate-core
//!
//! Session-driven route gate: decides which screen the user may see and which
//! routes are reachable, given a session machine's snapshots and the wallet
//! provider's change events.
//!
//! ## Design Principles
//!
//! - **Pure decisions**: route guards, deep-link normalization and render
//!   resolution are functions of one immutable snapshot.
//! - **No failure paths in the gate**: unknown provider shapes, missing farm
//!   ids and hidden sessions resolve to values (empty outlet, splash).
//! - **Owned teardown**: provider listeners and pending visibility commits are
//!   released when their owner is dropped.
//! - **External machine**: transitions belong to the [`SessionSource`]; the
//!   gate only reads snapshots and sends triggers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gate_core::{AccountCache, GateConfig, LocalSessionSource, Navigation, SessionState};
//! use session_protocol::SessionTag;
//!
//! let (source, triggers) = LocalSessionSource::new(SessionState::new(SessionTag::Idle));
//! let navigation = Navigation::mount(
//!     Arc::new(source),
//!     Arc::new(GateConfig::default()),
//!     AccountCache::global().clone(),
//! );
//! let render = navigation.render("#/retreat?item=axe");
//! ```

pub mod account;
pub mod config;
pub mod deeplink;
pub mod error;
pub mod navigation;
pub mod provider;
pub mod router;
pub mod routes;
pub mod session;
pub mod time;
pub mod visibility;
pub mod wishing_well;

pub use account::AccountCache;
pub use config::{load_gate_config, GateConfig, TEST_NETWORK};
pub use deeplink::{trader_deeplink, Redirect};
pub use error::{GateError, Result};
pub use navigation::{resolve_render, GateView, Navigation, Render};
pub use provider::{
    resolve_emitter, EventEmitter, MemoryEmitter, ProviderBridge, ProviderHandle, WrappedProvider,
};
pub use router::{match_location, Location, RouteMatch};
pub use routes::{active_routes, route_entries, RouteEntry, RouteId, Screen};
pub use session::{LocalSessionSource, SessionSource, SessionState};
pub use time::{seconds_to_string, TimeLength};
pub use visibility::{is_experience_visible, VisibilityDebouncer, VISIBILITY_DELAY};
pub use wishing_well::{load_wishing_well, WishingWellReader, WishingWellTokens};
