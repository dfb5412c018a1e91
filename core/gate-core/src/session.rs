//! Session snapshots and the session source seam.
//!
//! The session machine is external. The gate reads immutable [`SessionState`]
//! snapshots from a [`SessionSource`] and sends it [`Trigger`]s; it never
//! mutates state itself.

use std::fmt;

use session_protocol::{SessionTag, Trigger, UserRecord};
use tokio::sync::{mpsc, watch};

use crate::error::{GateError, Result};
use crate::provider::ProviderHandle;

#[derive(Debug, Clone)]
pub struct SessionState {
    pub tag: SessionTag,
    pub context: SessionContext,
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user: UserContext,
}

#[derive(Debug, Clone, Default)]
pub struct UserContext {
    /// Present only when a server-side session instance exists.
    pub session_id: Option<String>,
    pub farm_id: Option<u64>,
    pub web3: Option<Web3Context>,
}

#[derive(Clone, Default)]
pub struct Web3Context {
    pub provider: Option<ProviderHandle>,
}

impl fmt::Debug for Web3Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Web3Context")
            .field("provider", &self.provider.as_ref().map(ProviderHandle::shape_name))
            .finish()
    }
}

impl SessionState {
    pub fn new(tag: SessionTag) -> Self {
        Self {
            tag,
            context: SessionContext::default(),
        }
    }

    pub fn from_record(tag: SessionTag, record: UserRecord) -> Self {
        Self {
            tag,
            context: SessionContext {
                user: UserContext {
                    session_id: record.session_id,
                    farm_id: record.farm_id,
                    web3: None,
                },
            },
        }
    }

    pub fn with_farm_id(mut self, farm_id: u64) -> Self {
        self.context.user.farm_id = Some(farm_id);
        self
    }

    pub fn with_provider(mut self, provider: ProviderHandle) -> Self {
        self.context.user.web3 = Some(Web3Context {
            provider: Some(provider),
        });
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        self.tag.matches(path)
    }

    pub fn provider(&self) -> Option<&ProviderHandle> {
        self.context
            .user
            .web3
            .as_ref()
            .and_then(|web3| web3.provider.as_ref())
    }

    pub fn farm_id(&self) -> Option<u64> {
        self.context.user.farm_id
    }
}

/// Read side and trigger sink of the external session machine.
pub trait SessionSource: Send + Sync {
    fn current_state(&self) -> SessionState;

    /// Hands a trigger to the machine. Does not wait for the resulting state.
    fn send(&self, trigger: Trigger) -> Result<()>;

    /// Change notifications, in delivery order.
    fn subscribe(&self) -> watch::Receiver<SessionState>;
}

/// In-process session source: the machine publishes snapshots and drains the
/// trigger receiver returned by [`LocalSessionSource::new`].
pub struct LocalSessionSource {
    state: watch::Sender<SessionState>,
    triggers: mpsc::UnboundedSender<Trigger>,
}

impl LocalSessionSource {
    pub fn new(initial: SessionState) -> (Self, mpsc::UnboundedReceiver<Trigger>) {
        let (state, _) = watch::channel(initial);
        let (triggers, trigger_rx) = mpsc::unbounded_channel();
        (Self { state, triggers }, trigger_rx)
    }

    /// Publishes a new snapshot. Every publish notifies, even when the tag is
    /// unchanged, because context (provider, farm id) may have moved.
    pub fn publish(&self, state: SessionState) {
        tracing::debug!(tag = %state.tag, "Session state published");
        self.state.send_replace(state);
    }
}

impl SessionSource for LocalSessionSource {
    fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn send(&self, trigger: Trigger) -> Result<()> {
        self.triggers
            .send(trigger)
            .map_err(|_| GateError::SessionClosed { trigger })
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
