//! Session vocabulary shared by the route gate and the session machine.
//!
//! The session machine owns transitions; the gate only reads tags and sends
//! triggers. Keeping both ends on the same types prevents the string names
//! (`connected.authorised`, `CHAIN_CHANGED`, `accountsChanged`) from drifting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorInfo {}

// -----------------------------------------------------------------------------
// Session tags
//
// Nested machine states are flattened into dotted paths. Only
// `connected.authorised` and `visiting` show the main experience; every other
// tag keeps the splash up.
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionTag {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "connecting")]
    Connecting,
    #[serde(rename = "signing")]
    Signing,
    #[serde(rename = "connected.authorising")]
    Authorising,
    #[serde(rename = "connected.authorised")]
    Authorised,
    #[serde(rename = "connected.blacklisted")]
    Blacklisted,
    #[serde(rename = "connected.offline")]
    Offline,
    #[serde(rename = "visiting")]
    Visiting,
    #[serde(rename = "unauthorised")]
    Unauthorised,
}

impl SessionTag {
    pub const ALL: [SessionTag; 9] = [
        SessionTag::Idle,
        SessionTag::Connecting,
        SessionTag::Signing,
        SessionTag::Authorising,
        SessionTag::Authorised,
        SessionTag::Blacklisted,
        SessionTag::Offline,
        SessionTag::Visiting,
        SessionTag::Unauthorised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionTag::Idle => "idle",
            SessionTag::Connecting => "connecting",
            SessionTag::Signing => "signing",
            SessionTag::Authorising => "connected.authorising",
            SessionTag::Authorised => "connected.authorised",
            SessionTag::Blacklisted => "connected.blacklisted",
            SessionTag::Offline => "connected.offline",
            SessionTag::Visiting => "visiting",
            SessionTag::Unauthorised => "unauthorised",
        }
    }

    /// Hierarchical match: `connected` matches every `connected.*` tag, a full
    /// path matches only itself. Partial segments never match.
    pub fn matches(&self, path: &str) -> bool {
        let tag = self.as_str();
        if path.is_empty() {
            return false;
        }
        match tag.strip_prefix(path) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionTag {
    type Err = ErrorInfo;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SessionTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == value.trim())
            .ok_or_else(|| ErrorInfo::new("unknown_tag", format!("unknown session tag: {value}")))
    }
}

// -----------------------------------------------------------------------------
// Triggers
// -----------------------------------------------------------------------------

/// Named events accepted by the session machine. The gate only ever sends
/// `ChainChanged` and `AccountChanged`; the rest belong to the machine's own
/// flows and are listed so scripts and logs share one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    ChainChanged,
    AccountChanged,
    Connect,
    Visit,
    Return,
    Refresh,
    Logout,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::ChainChanged => "CHAIN_CHANGED",
            Trigger::AccountChanged => "ACCOUNT_CHANGED",
            Trigger::Connect => "CONNECT",
            Trigger::Visit => "VISIT",
            Trigger::Return => "RETURN",
            Trigger::Refresh => "REFRESH",
            Trigger::Logout => "LOGOUT",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// Provider events
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEvent {
    #[serde(rename = "chainChanged")]
    ChainChanged,
    #[serde(rename = "accountsChanged")]
    AccountsChanged,
}

impl ProviderEvent {
    pub const ALL: [ProviderEvent; 2] = [ProviderEvent::ChainChanged, ProviderEvent::AccountsChanged];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEvent::ChainChanged => "chainChanged",
            ProviderEvent::AccountsChanged => "accountsChanged",
        }
    }
}

impl fmt::Display for ProviderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderEvent {
    type Err = ErrorInfo;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProviderEvent::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == value)
            .ok_or_else(|| {
                ErrorInfo::new(
                    "unknown_provider_event",
                    format!("unknown provider event: {value}"),
                )
            })
    }
}

// -----------------------------------------------------------------------------
// User record
// -----------------------------------------------------------------------------

/// Serializable part of the session's user context. The wallet provider is a
/// live handle and never crosses this boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserRecord {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub farm_id: Option<u64>,
}

impl UserRecord {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if let Some(session_id) = &self.session_id {
            if session_id.trim().is_empty() {
                return Err(ErrorInfo::new(
                    "invalid_session_id",
                    "session_id must not be blank when present",
                ));
            }
            if session_id.len() > MAX_SESSION_ID_LEN {
                return Err(ErrorInfo::new(
                    "invalid_session_id",
                    format!("session_id must be {MAX_SESSION_ID_LEN} characters or fewer"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_its_dotted_name() {
        for tag in SessionTag::ALL {
            assert_eq!(tag.as_str().parse::<SessionTag>(), Ok(tag));
            let json = serde_json::to_string(&tag).expect("serialize");
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "connected".parse::<SessionTag>().unwrap_err();
        assert_eq!(err.code, "unknown_tag");
    }

    #[test]
    fn parent_path_matches_child_tags() {
        assert!(SessionTag::Authorised.matches("connected"));
        assert!(SessionTag::Blacklisted.matches("connected"));
        assert!(!SessionTag::Visiting.matches("connected"));
    }

    #[test]
    fn full_path_matches_only_itself() {
        assert!(SessionTag::Authorised.matches("connected.authorised"));
        assert!(!SessionTag::Authorising.matches("connected.authorised"));
        assert!(SessionTag::Visiting.matches("visiting"));
    }

    #[test]
    fn partial_segment_does_not_match() {
        assert!(!SessionTag::Authorised.matches("connected.author"));
        assert!(!SessionTag::Authorised.matches(""));
    }

    #[test]
    fn trigger_serializes_in_screaming_case() {
        let json = serde_json::to_string(&Trigger::AccountChanged).expect("serialize");
        assert_eq!(json, "\"ACCOUNT_CHANGED\"");
        assert_eq!(Trigger::ChainChanged.to_string(), "CHAIN_CHANGED");
    }

    #[test]
    fn provider_event_names_match_wallet_api() {
        assert_eq!("chainChanged".parse::<ProviderEvent>(), Ok(ProviderEvent::ChainChanged));
        assert_eq!("accountsChanged".parse::<ProviderEvent>(), Ok(ProviderEvent::AccountsChanged));
        assert!("accountChanged".parse::<ProviderEvent>().is_err());
    }

    #[test]
    fn user_record_rejects_blank_session_id() {
        let record = UserRecord {
            session_id: Some("  ".to_string()),
            farm_id: Some(1),
        };
        assert_eq!(record.validate().unwrap_err().code, "invalid_session_id");
    }

    #[test]
    fn user_record_rejects_unknown_fields() {
        let result = serde_json::from_str::<UserRecord>(r#"{"farmId": 3, "extra": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn user_record_parses_camel_case() {
        let record: UserRecord =
            serde_json::from_str(r#"{"sessionId": "abc", "farmId": 42}"#).expect("parse");
        assert_eq!(record.farm_id, Some(42));
        assert!(record.validate().is_ok());
    }
}
