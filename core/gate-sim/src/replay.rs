//! Scripted replay of a mounted gate.
//!
//! A script publishes session snapshots, fires provider events and asks for
//! render decisions. Every step produces zero or more observations, written
//! out as JSON lines: triggers the gate sent, visibility commits, renders.
//!
//! ```json
//! { "network": "mumbai",
//!   "account": "0xabc",
//!   "initial": { "tag": "idle" },
//!   "steps": [
//!     { "step": "state", "tag": "connected.authorised", "farmId": 42,
//!       "provider": { "name": "metamask", "shape": "direct" } },
//!     { "step": "wait_ms", "ms": 25 },
//!     { "step": "emit", "provider": "metamask", "event": "chainChanged" },
//!     { "step": "render", "location": "/retreat?item=axe" },
//!     { "step": "unmount" } ] }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gate_core::{
    AccountCache, GateConfig, LocalSessionSource, MemoryEmitter, Navigation, ProviderHandle,
    Render, SessionState,
};
use serde::{Deserialize, Serialize};
use session_protocol::{ProviderEvent, SessionTag, Trigger, UserRecord};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

/// Time given to the navigation watcher to pick up a published snapshot.
const SETTLE: Duration = Duration::from_millis(2);

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),

    #[error("Invalid user record at step {step}: {reason}")]
    Record { step: usize, reason: String },

    #[error("Step {step}: provider '{name}' was never attached")]
    UnknownProvider { step: usize, name: String },

    #[error("Step {step}: provider '{name}' already declared as {existing:?}")]
    ShapeConflict {
        step: usize,
        name: String,
        existing: Shape,
    },

    #[error("Step {step}: gate already unmounted")]
    Unmounted { step: usize },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub network: Option<String>,
    /// Account the provider last reported before the script starts.
    #[serde(default)]
    pub account: Option<String>,
    pub initial: StateSpec,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StateSpec {
    pub tag: SessionTag,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub farm_id: Option<u64>,
    #[serde(default)]
    pub provider: Option<ProviderSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSpec {
    pub name: String,
    #[serde(default)]
    pub shape: Shape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    #[default]
    Direct,
    Wrapped,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    State(StateSpec),
    Emit {
        provider: String,
        event: ProviderEvent,
        #[serde(default)]
        accounts: Vec<String>,
    },
    SetAccount {
        account: Option<String>,
    },
    WaitMs {
        ms: u64,
    },
    Render {
        location: String,
    },
    Unmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    Trigger {
        step: usize,
        trigger: Trigger,
    },
    Visibility {
        step: usize,
        visible: bool,
    },
    Emitted {
        step: usize,
        provider: String,
        event: ProviderEvent,
        listeners: usize,
    },
    Render {
        step: usize,
        location: String,
        #[serde(flatten)]
        render: Render,
    },
}

pub fn load_script(path: &Path) -> Result<Script, ReplayError> {
    let content = fs_err::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Runs `script` on a fresh single-threaded runtime.
pub fn run(script: Script, config: GateConfig) -> Result<Vec<Observation>, ReplayError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(replay(script, config))
}

pub async fn replay(script: Script, mut config: GateConfig) -> Result<Vec<Observation>, ReplayError> {
    if let Some(network) = script.network.clone() {
        config.network = network;
    }
    let accounts = match &script.account {
        Some(account) => AccountCache::with_account(account.clone()),
        None => AccountCache::default(),
    };

    let mut providers = Providers::default();
    let initial = providers.state(0, script.initial)?;
    let (source, triggers) = LocalSessionSource::new(initial);
    let source = Arc::new(source);
    let navigation = Navigation::mount(source.clone(), Arc::new(config), accounts.clone());

    let mut tape = Run {
        triggers,
        visibility: navigation.visibility(),
        navigation: Some(navigation),
        observations: Vec::new(),
    };
    tape.visibility.borrow_and_update();

    for (index, step) in script.steps.into_iter().enumerate() {
        let step_no = index + 1;
        match step {
            Step::State(spec) => {
                source.publish(providers.state(step_no, spec)?);
                tokio::time::sleep(SETTLE).await;
            }
            Step::Emit {
                provider,
                event,
                accounts: reported,
            } => {
                let emitter = providers.emitter(step_no, &provider)?;
                let listeners = emitter.emit(event, &reported);
                tape.observations.push(Observation::Emitted {
                    step: step_no,
                    provider,
                    event,
                    listeners,
                });
            }
            Step::SetAccount { account } => match account {
                Some(account) => accounts.set(account),
                None => accounts.clear(),
            },
            Step::WaitMs { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            Step::Render { location } => {
                let navigation = tape
                    .navigation
                    .as_ref()
                    .ok_or(ReplayError::Unmounted { step: step_no })?;
                let render = navigation.render(&location);
                tape.observations.push(Observation::Render {
                    step: step_no,
                    location,
                    render,
                });
            }
            Step::Unmount => {
                let navigation = tape
                    .navigation
                    .take()
                    .ok_or(ReplayError::Unmounted { step: step_no })?;
                navigation.unmount();
            }
        }
        tape.collect(step_no);
    }

    tracing::info!(observations = tape.observations.len(), "Replay finished");
    Ok(tape.observations)
}

struct Run {
    triggers: UnboundedReceiver<Trigger>,
    visibility: tokio::sync::watch::Receiver<bool>,
    navigation: Option<Navigation>,
    observations: Vec<Observation>,
}

impl Run {
    fn collect(&mut self, step: usize) {
        while let Ok(trigger) = self.triggers.try_recv() {
            self.observations.push(Observation::Trigger { step, trigger });
        }
        if self.visibility.has_changed().unwrap_or(false) {
            let visible = *self.visibility.borrow_and_update();
            self.observations.push(Observation::Visibility { step, visible });
        }
    }
}

/// Named emitters. A name keeps its handle for the whole script so that
/// republishing it is an unchanged provider.
#[derive(Default)]
struct Providers {
    named: HashMap<String, (Shape, Arc<MemoryEmitter>, ProviderHandle)>,
}

impl Providers {
    fn state(&mut self, step: usize, spec: StateSpec) -> Result<SessionState, ReplayError> {
        let record = UserRecord {
            session_id: spec.session_id,
            farm_id: spec.farm_id,
        };
        record
            .validate()
            .map_err(|err| ReplayError::Record {
                step,
                reason: err.to_string(),
            })?;

        let state = SessionState::from_record(spec.tag, record);
        match spec.provider {
            Some(provider) => Ok(state.with_provider(self.handle(step, provider)?)),
            None => Ok(state),
        }
    }

    fn handle(&mut self, step: usize, spec: ProviderSpec) -> Result<ProviderHandle, ReplayError> {
        if let Some((shape, _, handle)) = self.named.get(&spec.name) {
            if *shape != spec.shape {
                return Err(ReplayError::ShapeConflict {
                    step,
                    name: spec.name,
                    existing: *shape,
                });
            }
            return Ok(handle.clone());
        }

        let emitter = Arc::new(MemoryEmitter::new());
        let handle = match spec.shape {
            Shape::Direct => ProviderHandle::direct(emitter.clone()),
            Shape::Wrapped => ProviderHandle::wrapped(emitter.clone()),
        };
        self.named
            .insert(spec.name, (spec.shape, emitter, handle.clone()));
        Ok(handle)
    }

    fn emitter(&self, step: usize, name: &str) -> Result<Arc<MemoryEmitter>, ReplayError> {
        self.named
            .get(name)
            .map(|(_, emitter, _)| emitter.clone())
            .ok_or_else(|| ReplayError::UnknownProvider {
                step,
                name: name.to_string(),
            })
    }
}
