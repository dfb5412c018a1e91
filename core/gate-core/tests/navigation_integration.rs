//! End-to-end tests for the mounted gate: session snapshots in, provider
//! events in, triggers and render decisions out.

use std::sync::Arc;
use std::time::Duration;

use gate_core::{
    AccountCache, GateConfig, GateView, LocalSessionSource, MemoryEmitter, Navigation,
    ProviderHandle, Render, RouteId, SessionState, TEST_NETWORK, VISIBILITY_DELAY,
};
use session_protocol::{ProviderEvent, SessionTag, Trigger};
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    source: Arc<LocalSessionSource>,
    triggers: UnboundedReceiver<Trigger>,
    navigation: Navigation,
}

fn mount(initial: SessionState, accounts: AccountCache) -> Harness {
    let (source, triggers) = LocalSessionSource::new(initial);
    let source = Arc::new(source);
    let navigation = Navigation::mount(
        source.clone(),
        Arc::new(GateConfig::with_network(TEST_NETWORK)),
        accounts,
    );
    Harness {
        source,
        triggers,
        navigation,
    }
}

async fn tick() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn settle() {
    tokio::time::sleep(VISIBILITY_DELAY + Duration::from_millis(5)).await;
}

fn drain(triggers: &mut UnboundedReceiver<Trigger>) -> Vec<Trigger> {
    let mut seen = Vec::new();
    while let Ok(trigger) = triggers.try_recv() {
        seen.push(trigger);
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn gate_opens_after_authorisation() {
    let harness = mount(SessionState::new(SessionTag::Idle), AccountCache::default());
    settle().await;
    assert_eq!(harness.navigation.view(), GateView::Hidden);
    assert_eq!(harness.navigation.render("/"), Render::Splash);
    assert!(harness.navigation.active_routes().is_none());

    harness
        .source
        .publish(SessionState::new(SessionTag::Authorised));
    tick().await;
    assert_eq!(harness.navigation.view(), GateView::Hidden);

    settle().await;
    assert_eq!(harness.navigation.view(), GateView::Shown);
    assert!(matches!(
        harness.navigation.render("/"),
        Render::Screen {
            route: RouteId::Home,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn visiting_session_is_shown_without_goblins() {
    let harness = mount(SessionState::new(SessionTag::Visiting), AccountCache::default());
    settle().await;

    let routes = harness.navigation.active_routes().expect("router mounted");
    assert!(routes.iter().all(|route| route.id != RouteId::Goblins));
    assert!(routes.iter().any(|route| route.id == RouteId::Builder));
    assert_eq!(harness.navigation.render("/goblins"), Render::Empty);
}

#[tokio::test(start_paused = true)]
async fn logout_closes_the_gate() {
    let harness = mount(SessionState::new(SessionTag::Authorised), AccountCache::default());
    settle().await;
    assert!(harness.navigation.is_visible());

    harness
        .source
        .publish(SessionState::new(SessionTag::Unauthorised));
    settle().await;
    assert!(!harness.navigation.is_visible());
    assert_eq!(harness.navigation.render("/land/3"), Render::Splash);
}

#[tokio::test(start_paused = true)]
async fn trader_link_redirects_once_farm_is_known() {
    let harness = mount(
        SessionState::new(SessionTag::Authorised).with_farm_id(42),
        AccountCache::default(),
    );
    settle().await;

    match harness.navigation.render("#/retreat?a=1&b=2") {
        Render::Redirect(redirect) => {
            assert_eq!(redirect.to, "/retreat/42?a=1&b=2");
            assert!(redirect.replace);
        }
        other => panic!("expected redirect, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn account_guard_applies_end_to_end() {
    let emitter = Arc::new(MemoryEmitter::new());
    let mut harness = mount(
        SessionState::new(SessionTag::Authorised).with_provider(ProviderHandle::direct(emitter.clone())),
        AccountCache::with_account("0xABC"),
    );

    emitter.emit(ProviderEvent::AccountsChanged, &["0xABC".to_string()]);
    assert!(drain(&mut harness.triggers).is_empty());

    emitter.emit(ProviderEvent::AccountsChanged, &["0xDEF".to_string()]);
    emitter.emit(ProviderEvent::ChainChanged, &[]);
    assert_eq!(
        drain(&mut harness.triggers),
        vec![Trigger::AccountChanged, Trigger::ChainChanged]
    );
}

#[tokio::test(start_paused = true)]
async fn provider_replacement_unsubscribes_old_handle() {
    let old = Arc::new(MemoryEmitter::new());
    let new = Arc::new(MemoryEmitter::new());
    let mut harness = mount(
        SessionState::new(SessionTag::Authorised).with_provider(ProviderHandle::direct(old.clone())),
        AccountCache::default(),
    );
    assert_eq!(old.listener_count(), 2);

    harness.source.publish(
        SessionState::new(SessionTag::Authorised).with_provider(ProviderHandle::direct(new.clone())),
    );
    tick().await;

    assert_eq!(old.listener_count(), 0);
    assert_eq!(new.listener_count(), 2);
    assert_eq!(old.emit(ProviderEvent::ChainChanged, &[]), 0);
    assert!(drain(&mut harness.triggers).is_empty());

    new.emit(ProviderEvent::ChainChanged, &[]);
    assert_eq!(drain(&mut harness.triggers), vec![Trigger::ChainChanged]);
}

#[tokio::test(start_paused = true)]
async fn unchanged_provider_is_not_resubscribed() {
    let emitter = Arc::new(MemoryEmitter::new());
    let handle = ProviderHandle::direct(emitter.clone());
    let mut harness = mount(
        SessionState::new(SessionTag::Connecting).with_provider(handle.clone()),
        AccountCache::default(),
    );

    harness
        .source
        .publish(SessionState::new(SessionTag::Authorised).with_provider(handle));
    tick().await;

    assert_eq!(emitter.listener_count(), 2);
    emitter.emit(ProviderEvent::ChainChanged, &[]);
    assert_eq!(drain(&mut harness.triggers), vec![Trigger::ChainChanged]);
}

#[tokio::test(start_paused = true)]
async fn wrapped_provider_forwards_every_account_change() {
    let inner = Arc::new(MemoryEmitter::new());
    let mut harness = mount(
        SessionState::new(SessionTag::Authorised).with_provider(ProviderHandle::wrapped(inner.clone())),
        AccountCache::with_account("0xABC"),
    );

    inner.emit(ProviderEvent::AccountsChanged, &["0xABC".to_string()]);
    assert_eq!(drain(&mut harness.triggers), vec![Trigger::AccountChanged]);
}

#[tokio::test(start_paused = true)]
async fn unmount_before_delay_leaves_no_trace() {
    let emitter = Arc::new(MemoryEmitter::new());
    let harness = mount(
        SessionState::new(SessionTag::Authorised).with_provider(ProviderHandle::direct(emitter.clone())),
        AccountCache::default(),
    );
    let visibility = harness.navigation.visibility();
    assert!(harness.navigation.is_subscribed());

    harness.navigation.unmount();
    settle().await;
    settle().await;

    assert!(!*visibility.borrow());
    assert_eq!(emitter.listener_count(), 0);

    // Later snapshots reach nobody.
    harness.source.publish(
        SessionState::new(SessionTag::Visiting).with_provider(ProviderHandle::direct(emitter.clone())),
    );
    settle().await;
    assert_eq!(emitter.listener_count(), 0);
    assert!(!*visibility.borrow());
}

#[tokio::test(start_paused = true)]
async fn dropping_navigation_unmounts() {
    let emitter = Arc::new(MemoryEmitter::new());
    let (source, _triggers) = LocalSessionSource::new(SessionState::new(SessionTag::Idle));
    let source = Arc::new(source);
    let navigation = Navigation::mount(
        source.clone(),
        Arc::new(GateConfig::default()),
        AccountCache::default(),
    );
    let visibility = navigation.visibility();

    source.publish(
        SessionState::new(SessionTag::Authorised).with_provider(ProviderHandle::direct(emitter.clone())),
    );
    tick().await;
    assert_eq!(emitter.listener_count(), 2);

    drop(navigation);
    settle().await;
    assert_eq!(emitter.listener_count(), 0);
    assert!(!*visibility.borrow());
}

#[tokio::test(start_paused = true)]
async fn rapid_transitions_settle_on_the_latest_state() {
    let harness = mount(SessionState::new(SessionTag::Idle), AccountCache::default());
    let mut visibility = harness.navigation.visibility();
    visibility.borrow_and_update();

    harness
        .source
        .publish(SessionState::new(SessionTag::Authorised));
    tick().await;
    harness
        .source
        .publish(SessionState::new(SessionTag::Blacklisted));
    settle().await;

    assert!(!harness.navigation.is_visible());
    assert!(!visibility.has_changed().expect("debouncer alive"));
}
