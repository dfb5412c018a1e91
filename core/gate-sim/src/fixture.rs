//! Wishing well reads served from a JSON fixture instead of a chain node.

use std::path::Path;

use async_trait::async_trait;
use gate_core::{GateError, WishingWellReader};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WellFixture {
    pub account: String,
    /// Falls back to the configured contract when absent.
    #[serde(default)]
    pub well_contract: Option<String>,
    pub well_balance: String,
    pub can_collect: bool,
    pub last_collected: u64,
    pub locked_period: u64,
    pub pair_balance: String,
    /// Token balance held by the well contract itself.
    pub well_token_balance: String,
    /// Calls that should fail, by reader method name.
    #[serde(default)]
    pub failing: Vec<String>,
}

impl WellFixture {
    pub fn load(path: &Path) -> gate_core::Result<Self> {
        let content = fs_err::read_to_string(path).map_err(|source| GateError::Io {
            context: format!("reading {}", path.display()),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| GateError::Json {
            context: format!("parsing {}", path.display()),
            source,
        })
    }

    fn check(&self, call: &'static str) -> gate_core::Result<()> {
        if self.failing.iter().any(|name| name == call) {
            return Err(GateError::ChainRead {
                call,
                details: "fixture marked call as failing".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WishingWellReader for WellFixture {
    async fn well_balance(&self, _account: &str) -> gate_core::Result<String> {
        self.check("well_balance")?;
        Ok(self.well_balance.clone())
    }

    async fn can_collect(&self, _account: &str) -> gate_core::Result<bool> {
        self.check("can_collect")?;
        Ok(self.can_collect)
    }

    async fn last_collected(&self, _account: &str) -> gate_core::Result<u64> {
        self.check("last_collected")?;
        Ok(self.last_collected)
    }

    async fn locked_period(&self, _account: &str) -> gate_core::Result<u64> {
        self.check("locked_period")?;
        Ok(self.locked_period)
    }

    async fn pair_balance(&self, _account: &str) -> gate_core::Result<String> {
        self.check("pair_balance")?;
        Ok(self.pair_balance.clone())
    }

    async fn token_balance_of(&self, _account: &str, holder: &str) -> gate_core::Result<String> {
        self.check("token_balance_of")?;
        if self.well_contract.as_deref().is_some_and(|contract| contract != holder) {
            return Err(GateError::ChainRead {
                call: "token_balance_of",
                details: format!("no balance recorded for holder {holder}"),
            });
        }
        Ok(self.well_token_balance.clone())
    }
}
