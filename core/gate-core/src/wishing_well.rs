//! Wishing well balances for the connected account.
//!
//! Six independent chain reads are issued together and joined; the lock
//! window is derived once all of them are in. Any failed read fails the load.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::time::{seconds_to_string, TimeLength};

/// Chain reads the loader needs. Balances are raw token amounts as decimal
/// strings; times are unix seconds.
#[async_trait]
pub trait WishingWellReader: Send + Sync {
    async fn well_balance(&self, account: &str) -> Result<String>;
    async fn can_collect(&self, account: &str) -> Result<bool>;
    async fn last_collected(&self, account: &str) -> Result<u64>;
    async fn locked_period(&self, account: &str) -> Result<u64>;
    async fn pair_balance(&self, account: &str) -> Result<String>;
    async fn token_balance_of(&self, account: &str, holder: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishingWellTokens {
    pub my_tokens_in_well: String,
    pub total_tokens_in_well: String,
    pub can_collect: bool,
    pub lp_tokens: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_time: Option<String>,
    pub locked_period: u64,
}

pub async fn load_wishing_well(
    reader: &dyn WishingWellReader,
    account: &str,
    well_contract: &str,
    now: DateTime<Utc>,
) -> Result<WishingWellTokens> {
    let (
        my_tokens_in_well,
        can_collect,
        lp_tokens,
        last_collected,
        total_tokens_in_well,
        locked_period,
    ) = tokio::try_join!(
        reader.well_balance(account),
        reader.can_collect(account),
        reader.pair_balance(account),
        reader.last_collected(account),
        reader.token_balance_of(account, well_contract),
        reader.locked_period(account),
    )?;

    let locked_time = remaining_lock(now, last_collected, locked_period)
        .map(|remaining| seconds_to_string(remaining, TimeLength::Full));

    tracing::debug!(
        account = %account,
        can_collect,
        locked_period,
        locked = locked_time.is_some(),
        "Wishing well loaded"
    );

    Ok(WishingWellTokens {
        my_tokens_in_well,
        total_tokens_in_well,
        can_collect,
        lp_tokens,
        locked_time,
        locked_period,
    })
}

/// Seconds left in the lock window, or `None` once it has passed.
fn remaining_lock(now: DateTime<Utc>, last_collected: u64, locked_period: u64) -> Option<u64> {
    let since_lock = now.timestamp() - i64::try_from(last_collected).unwrap_or(i64::MAX);
    let period = i64::try_from(locked_period).unwrap_or(i64::MAX);
    if since_lock > period {
        return None;
    }
    // A collection stamped in the future still counts as the full window.
    Some((period - since_lock.max(0)) as u64)
}
