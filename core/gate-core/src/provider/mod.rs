//! Wallet provider handles and the event bridge.
//!
//! A provider arrives in one of two shapes: it is itself an event emitter, or
//! it wraps one under `given_provider`. [`resolve_emitter`] normalizes both
//! into a single emitter once per provider identity so the bridge never has
//! to branch on shape again.
//!
//! - [`bridge`]: subscription lifecycle and trigger dispatch
//! - [`memory`]: in-process emitter for tests and simulation

pub mod bridge;
pub mod memory;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use session_protocol::ProviderEvent;

pub use bridge::{ProviderBridge, Subscription};
pub use memory::MemoryEmitter;

pub type ListenerId = u64;

/// Listener callback. Receives the event payload as account identifiers;
/// `chainChanged` listeners get an empty slice.
pub type ProviderCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Event-registration capability of a wallet provider.
pub trait EventEmitter: Send + Sync {
    fn on(&self, event: ProviderEvent, callback: ProviderCallback) -> ListenerId;

    /// Removing an unknown id is a no-op.
    fn remove_listener(&self, event: ProviderEvent, id: ListenerId);
}

/// Opaque wallet connection held in session context. Cloning shares identity.
#[derive(Clone)]
pub enum ProviderHandle {
    Direct(Arc<dyn EventEmitter>),
    Wrapped(Arc<WrappedProvider>),
    /// Anything without an event-registration capability.
    Unsupported(Arc<dyn Any + Send + Sync>),
}

pub struct WrappedProvider {
    pub given_provider: Option<Arc<dyn EventEmitter>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderShape {
    Direct,
    Wrapped,
}

impl ProviderShape {
    /// Only the direct shape can be compared against the cached account.
    pub fn guards_account_changes(&self) -> bool {
        matches!(self, ProviderShape::Direct)
    }
}

pub struct ResolvedEmitter {
    pub shape: ProviderShape,
    pub emitter: Arc<dyn EventEmitter>,
}

impl ProviderHandle {
    pub fn direct(emitter: Arc<dyn EventEmitter>) -> Self {
        ProviderHandle::Direct(emitter)
    }

    pub fn wrapped(given_provider: Arc<dyn EventEmitter>) -> Self {
        ProviderHandle::Wrapped(Arc::new(WrappedProvider {
            given_provider: Some(given_provider),
        }))
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            ProviderHandle::Direct(_) => "direct",
            ProviderHandle::Wrapped(_) => "wrapped",
            ProviderHandle::Unsupported(_) => "unsupported",
        }
    }

    /// Reference identity of the outer handle.
    pub fn same_identity(&self, other: &ProviderHandle) -> bool {
        self.identity() == other.identity()
    }

    fn identity(&self) -> *const () {
        match self {
            ProviderHandle::Direct(emitter) => Arc::as_ptr(emitter) as *const (),
            ProviderHandle::Wrapped(wrapped) => Arc::as_ptr(wrapped) as *const (),
            ProviderHandle::Unsupported(value) => Arc::as_ptr(value) as *const (),
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("shape", &self.shape_name())
            .field("identity", &self.identity())
            .finish()
    }
}

/// Capability detection: which emitter to subscribe to, if any.
pub fn resolve_emitter(handle: &ProviderHandle) -> Option<ResolvedEmitter> {
    match handle {
        ProviderHandle::Direct(emitter) => Some(ResolvedEmitter {
            shape: ProviderShape::Direct,
            emitter: Arc::clone(emitter),
        }),
        ProviderHandle::Wrapped(wrapped) => {
            wrapped
                .given_provider
                .as_ref()
                .map(|emitter| ResolvedEmitter {
                    shape: ProviderShape::Wrapped,
                    emitter: Arc::clone(emitter),
                })
        }
        ProviderHandle::Unsupported(_) => None,
    }
}
