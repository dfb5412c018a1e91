//! Entry point that reflects the session in what the user can see.
//!
//! ```text
//! provider events ──► ProviderBridge ──► triggers ──► SessionSource
//!                                                          │ snapshots
//!                      ┌───────────────────────────────────┤
//!                      ▼                                   ▼
//!            VisibilityDebouncer                     route guards
//!                      │ flag                              │ active routes
//!                      └──────────► GateView ◄─────────────┘
//!                                 hidden | shown ──► Render
//! ```
//!
//! The gate has exactly two states. `Hidden` renders the splash and evaluates
//! no routes at all; `Shown` mounts the router over the guarded route set.
//! Only the visibility flag moves between them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::account::AccountCache;
use crate::config::GateConfig;
use crate::deeplink::{trader_deeplink, Redirect};
use crate::provider::ProviderBridge;
use crate::router::{match_location, Location};
use crate::routes::{active_routes, RouteEntry, RouteId, Screen};
use crate::session::{SessionSource, SessionState};
use crate::visibility::VisibilityDebouncer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateView {
    Hidden,
    Shown,
}

impl GateView {
    pub fn from_visibility(visible: bool) -> Self {
        if visible {
            GateView::Shown
        } else {
            GateView::Hidden
        }
    }
}

/// What the rendering boundary should put on screen for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "render", rename_all = "snake_case")]
pub enum Render {
    Splash,
    Screen {
        route: RouteId,
        screen: Screen,
        key: Option<&'static str>,
        params: BTreeMap<String, String>,
    },
    Redirect(Redirect),
    /// Router mounted, outlet empty.
    Empty,
}

/// Pure render decision for one snapshot.
pub fn resolve_render(
    view: GateView,
    state: &SessionState,
    config: &GateConfig,
    location: &Location,
) -> Render {
    if view == GateView::Hidden {
        return Render::Splash;
    }

    let routes = active_routes(state, config);
    let Some(matched) = match_location(&routes, location) else {
        debug!(path = %location.path, tag = %state.tag, "No route matched location");
        return Render::Empty;
    };

    if matched.route.screen == Screen::TraderDeeplink {
        return trader_deeplink(state.farm_id(), &location.query)
            .map(Render::Redirect)
            .unwrap_or(Render::Empty);
    }

    Render::Screen {
        route: matched.route.id,
        screen: matched.route.screen,
        key: matched.route.key,
        params: matched.params,
    }
}

struct Wiring {
    bridge: ProviderBridge,
    debouncer: VisibilityDebouncer,
    unmounted: bool,
}

impl Wiring {
    fn apply(&mut self, state: &SessionState) {
        if self.unmounted {
            return;
        }
        self.bridge.sync(state.provider());
        self.debouncer.observe(state);
    }

    fn teardown(&mut self) {
        self.unmounted = true;
        self.debouncer.cancel_pending();
        self.bridge.detach();
    }
}

fn lock(wiring: &Mutex<Wiring>) -> MutexGuard<'_, Wiring> {
    wiring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mounted navigation gate. Dropping it unmounts.
pub struct Navigation {
    source: Arc<dyn SessionSource>,
    config: Arc<GateConfig>,
    wiring: Arc<Mutex<Wiring>>,
    visibility: watch::Receiver<bool>,
    watcher: Option<JoinHandle<()>>,
}

impl Navigation {
    /// Subscribes to the session source and applies the current snapshot.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        source: Arc<dyn SessionSource>,
        config: Arc<GateConfig>,
        accounts: AccountCache,
    ) -> Self {
        let debouncer = VisibilityDebouncer::new(config.visibility_delay());
        let visibility = debouncer.subscribe();
        let wiring = Arc::new(Mutex::new(Wiring {
            bridge: ProviderBridge::new(Arc::clone(&source), accounts),
            debouncer,
            unmounted: false,
        }));

        let mut updates = source.subscribe();
        let initial = updates.borrow_and_update().clone();
        lock(&wiring).apply(&initial);

        let task_wiring = Arc::clone(&wiring);
        let watcher = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                lock(&task_wiring).apply(&state);
            }
            debug!("Session source closed; navigation watcher stopped");
        });

        debug!(tag = %initial.tag, network = %config.network, "Navigation mounted");
        Self {
            source,
            config,
            wiring,
            visibility,
            watcher: Some(watcher),
        }
    }

    pub fn view(&self) -> GateView {
        GateView::from_visibility(self.is_visible())
    }

    pub fn is_visible(&self) -> bool {
        *self.visibility.borrow()
    }

    pub fn visibility(&self) -> watch::Receiver<bool> {
        self.visibility.clone()
    }

    /// Active routes while shown; `None` while hidden because no router exists.
    pub fn active_routes(&self) -> Option<Vec<RouteEntry>> {
        match self.view() {
            GateView::Hidden => None,
            GateView::Shown => Some(active_routes(&self.source.current_state(), &self.config)),
        }
    }

    pub fn render(&self, location: &str) -> Render {
        let state = self.source.current_state();
        resolve_render(self.view(), &state, &self.config, &Location::parse(location))
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.wiring).bridge.is_subscribed()
    }

    pub fn unmount(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
            // The watcher may still be inside `apply`; the flag stops any later one.
            lock(&self.wiring).teardown();
            debug!("Navigation unmounted");
        }
    }
}

impl Drop for Navigation {
    fn drop(&mut self) {
        self.shutdown();
    }
}
