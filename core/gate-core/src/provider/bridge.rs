//! Folds wallet provider events into session triggers.
//!
//! One subscription exists per provider identity. On identity change the old
//! subscription is released (listeners removed, callbacks disarmed) before the
//! new one is attached, so nothing delivered by a replaced provider can reach
//! the session machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use session_protocol::{ProviderEvent, Trigger};
use tracing::{debug, info, warn};

use super::{resolve_emitter, EventEmitter, ListenerId, ProviderHandle, ResolvedEmitter};
use crate::account::AccountCache;
use crate::session::SessionSource;

/// Listeners registered on one emitter. Released on drop.
pub struct Subscription {
    emitter: Arc<dyn EventEmitter>,
    listeners: Vec<(ProviderEvent, ListenerId)>,
    armed: Arc<AtomicBool>,
}

impl Subscription {
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    fn release(&mut self) {
        // Disarm first: an emitter that snapshotted its listeners before removal
        // may still call them.
        self.armed.store(false, Ordering::SeqCst);
        for (event, id) in self.listeners.drain(..) {
            self.emitter.remove_listener(event, id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

struct Attached {
    handle: ProviderHandle,
    /// `None` when the handle had no recognizable emitter.
    subscription: Option<Subscription>,
}

pub struct ProviderBridge {
    source: Arc<dyn SessionSource>,
    accounts: AccountCache,
    attached: Option<Attached>,
}

impl ProviderBridge {
    pub fn new(source: Arc<dyn SessionSource>, accounts: AccountCache) -> Self {
        Self {
            source,
            accounts,
            attached: None,
        }
    }

    /// Aligns the subscription with `provider`. Returns true when the provider
    /// identity changed.
    pub fn sync(&mut self, provider: Option<&ProviderHandle>) -> bool {
        let unchanged = match (&self.attached, provider) {
            (None, None) => true,
            (Some(attached), Some(handle)) => attached.handle.same_identity(handle),
            _ => false,
        };
        if unchanged {
            return false;
        }

        self.detach();

        if let Some(handle) = provider {
            let subscription = resolve_emitter(handle)
                .map(|resolved| subscribe(resolved, &self.source, &self.accounts));
            match &subscription {
                Some(sub) => info!(
                    shape = handle.shape_name(),
                    listeners = sub.listener_count(),
                    "Provider subscription attached"
                ),
                None => warn!(
                    shape = handle.shape_name(),
                    "Provider has no event emitter; nothing to subscribe"
                ),
            }
            self.attached = Some(Attached {
                handle: handle.clone(),
                subscription,
            });
        }
        true
    }

    /// Releases the current subscription, if any.
    pub fn detach(&mut self) {
        if let Some(attached) = self.attached.take() {
            if let Some(subscription) = attached.subscription {
                debug!(
                    shape = attached.handle.shape_name(),
                    "Provider subscription released"
                );
                subscription.unsubscribe();
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.attached
            .as_ref()
            .is_some_and(|attached| attached.subscription.is_some())
    }
}

impl Drop for ProviderBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

fn subscribe(
    resolved: ResolvedEmitter,
    source: &Arc<dyn SessionSource>,
    accounts: &AccountCache,
) -> Subscription {
    let armed = Arc::new(AtomicBool::new(true));
    let emitter = resolved.emitter;

    let chain_listener = {
        let source = Arc::clone(source);
        let armed = Arc::clone(&armed);
        emitter.on(
            ProviderEvent::ChainChanged,
            Arc::new(move |_: &[String]| {
                if armed.load(Ordering::SeqCst) {
                    dispatch(source.as_ref(), Trigger::ChainChanged);
                }
            }),
        )
    };

    let accounts_listener = {
        let source = Arc::clone(source);
        let armed = Arc::clone(&armed);
        let accounts = accounts.clone();
        let guarded = resolved.shape.guards_account_changes();
        emitter.on(
            ProviderEvent::AccountsChanged,
            Arc::new(move |reported: &[String]| {
                if !armed.load(Ordering::SeqCst) {
                    return;
                }
                // Some mobile wallets re-fire accountsChanged on navigation with
                // the same account.
                if guarded && accounts.is_current(reported.first().map(String::as_str)) {
                    debug!("accountsChanged reported the cached account; ignored");
                    return;
                }
                dispatch(source.as_ref(), Trigger::AccountChanged);
            }),
        )
    };

    Subscription {
        emitter,
        listeners: vec![
            (ProviderEvent::ChainChanged, chain_listener),
            (ProviderEvent::AccountsChanged, accounts_listener),
        ],
        armed,
    }
}

fn dispatch(source: &dyn SessionSource, trigger: Trigger) {
    debug!(trigger = %trigger, "Provider event forwarded");
    if let Err(err) = source.send(trigger) {
        warn!(error = %err, "Failed to forward provider trigger");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MemoryEmitter, WrappedProvider};
    use crate::session::{LocalSessionSource, SessionState};
    use session_protocol::SessionTag;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn setup(accounts: AccountCache) -> (ProviderBridge, UnboundedReceiver<Trigger>) {
        let (source, triggers) = LocalSessionSource::new(SessionState::new(SessionTag::Idle));
        (ProviderBridge::new(Arc::new(source), accounts), triggers)
    }

    fn drain(triggers: &mut UnboundedReceiver<Trigger>) -> Vec<Trigger> {
        let mut seen = Vec::new();
        while let Ok(trigger) = triggers.try_recv() {
            seen.push(trigger);
        }
        seen
    }

    fn accounts(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn direct_chain_changed_always_fires() {
        let (mut bridge, mut triggers) = setup(AccountCache::default());
        let emitter = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::direct(emitter.clone())));

        emitter.emit(ProviderEvent::ChainChanged, &[]);
        emitter.emit(ProviderEvent::ChainChanged, &[]);
        assert_eq!(
            drain(&mut triggers),
            vec![Trigger::ChainChanged, Trigger::ChainChanged]
        );
    }

    #[test]
    fn direct_accounts_changed_with_cached_account_is_ignored() {
        let (mut bridge, mut triggers) = setup(AccountCache::with_account("0xABC"));
        let emitter = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::direct(emitter.clone())));

        emitter.emit(ProviderEvent::AccountsChanged, &accounts(&["0xABC"]));
        assert!(drain(&mut triggers).is_empty());
    }

    #[test]
    fn direct_accounts_changed_with_new_account_fires_once() {
        let (mut bridge, mut triggers) = setup(AccountCache::with_account("0xABC"));
        let emitter = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::direct(emitter.clone())));

        emitter.emit(ProviderEvent::AccountsChanged, &accounts(&["0xDEF", "0xABC"]));
        assert_eq!(drain(&mut triggers), vec![Trigger::AccountChanged]);
    }

    #[test]
    fn direct_accounts_changed_to_empty_fires() {
        let (mut bridge, mut triggers) = setup(AccountCache::with_account("0xABC"));
        let emitter = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::direct(emitter.clone())));

        emitter.emit(ProviderEvent::AccountsChanged, &[]);
        assert_eq!(drain(&mut triggers), vec![Trigger::AccountChanged]);
    }

    #[test]
    fn wrapped_accounts_changed_is_unguarded() {
        let (mut bridge, mut triggers) = setup(AccountCache::with_account("0xABC"));
        let inner = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::wrapped(inner.clone())));

        inner.emit(ProviderEvent::AccountsChanged, &accounts(&["0xABC"]));
        inner.emit(ProviderEvent::ChainChanged, &[]);
        assert_eq!(
            drain(&mut triggers),
            vec![Trigger::AccountChanged, Trigger::ChainChanged]
        );
    }

    #[test]
    fn unrecognized_provider_subscribes_nothing() {
        let (mut bridge, _triggers) = setup(AccountCache::default());
        let handle = ProviderHandle::Wrapped(Arc::new(WrappedProvider {
            given_provider: None,
        }));

        assert!(bridge.sync(Some(&handle)));
        assert!(!bridge.is_subscribed());
    }

    #[test]
    fn same_identity_does_not_resubscribe() {
        let (mut bridge, _triggers) = setup(AccountCache::default());
        let emitter = Arc::new(MemoryEmitter::new());
        let handle = ProviderHandle::direct(emitter.clone());

        assert!(bridge.sync(Some(&handle)));
        assert!(!bridge.sync(Some(&handle.clone())));
        assert_eq!(emitter.listener_count(), 2);
    }

    #[test]
    fn identity_change_releases_old_listeners_first() {
        let (mut bridge, mut triggers) = setup(AccountCache::default());
        let old = Arc::new(MemoryEmitter::new());
        let new = Arc::new(MemoryEmitter::new());

        bridge.sync(Some(&ProviderHandle::direct(old.clone())));
        bridge.sync(Some(&ProviderHandle::direct(new.clone())));

        assert_eq!(old.listener_count(), 0);
        assert_eq!(new.listener_count(), 2);
        old.emit(ProviderEvent::ChainChanged, &[]);
        assert!(drain(&mut triggers).is_empty());
        new.emit(ProviderEvent::ChainChanged, &[]);
        assert_eq!(drain(&mut triggers), vec![Trigger::ChainChanged]);
    }

    #[test]
    fn provider_removed_detaches() {
        let (mut bridge, _triggers) = setup(AccountCache::default());
        let emitter = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::direct(emitter.clone())));

        assert!(bridge.sync(None));
        assert_eq!(emitter.listener_count(), 0);
        assert!(!bridge.is_subscribed());
    }

    #[test]
    fn dropping_bridge_releases_listeners() {
        let (mut bridge, _triggers) = setup(AccountCache::default());
        let emitter = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::direct(emitter.clone())));
        drop(bridge);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn closed_source_is_logged_not_panicking() {
        let (mut bridge, triggers) = setup(AccountCache::default());
        drop(triggers);
        let emitter = Arc::new(MemoryEmitter::new());
        bridge.sync(Some(&ProviderHandle::direct(emitter.clone())));
        assert_eq!(emitter.emit(ProviderEvent::ChainChanged, &[]), 1);
    }
}
