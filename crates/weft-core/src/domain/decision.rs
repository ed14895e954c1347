//! Authorization vocabulary: actions, effects and recorded decisions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::TrustLevel;
use super::ids::AgentId;

/// An action an identity asks to perform.
///
/// Kernel operations have their own variants; anything else (e.g. a
/// `delete_table` an agent wants pre-cleared) is carried as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    AcquireLock,
    ReleaseLock,
    SubmitWork,
    ClaimWork,
    CompleteWork,
    FailWork,
    CancelWork,
    RescheduleWork,
    Custom(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::AcquireLock => "acquire_lock",
            Action::ReleaseLock => "release_lock",
            Action::SubmitWork => "submit_work",
            Action::ClaimWork => "claim_work",
            Action::CompleteWork => "complete_work",
            Action::FailWork => "fail_work",
            Action::CancelWork => "cancel_work",
            Action::RescheduleWork => "reschedule_work",
            Action::Custom(name) => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "acquire_lock" => Action::AcquireLock,
            "release_lock" => Action::ReleaseLock,
            "submit_work" => Action::SubmitWork,
            "claim_work" => Action::ClaimWork,
            "complete_work" => Action::CompleteWork,
            "fail_work" => Action::FailWork,
            "cancel_work" => Action::CancelWork,
            "reschedule_work" => Action::RescheduleWork,
            other => Action::Custom(other.to_string()),
        })
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(action) => action,
            Err(never) => match never {},
        }
    }
}

impl Serialize for Action {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Action::from(s.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
}

/// What an evaluator returns: the effect and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub effect: Effect,
    pub reason: String,
}

impl Verdict {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            effect: Effect::Allow,
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            effect: Effect::Deny,
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }
}

/// A decision as persisted in the audit trail. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub actor: AgentId,
    pub trust_level: TrustLevel,
    pub action: Action,
    pub resource: String,
    pub decision: Effect,
    pub reason: String,
    pub policy_version: String,
    pub timestamp: DateTime<Utc>,
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        self.decision == Effect::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("acquire_lock", Action::AcquireLock)]
    #[case("claim_work", Action::ClaimWork)]
    #[case("reschedule_work", Action::RescheduleWork)]
    #[case("delete_table", Action::Custom("delete_table".into()))]
    fn actions_parse_from_wire_names(#[case] name: &str, #[case] expected: Action) {
        assert_eq!(Action::from(name), expected);
        assert_eq!(expected.as_str(), name);
    }

    #[test]
    fn actions_serialize_as_plain_strings() {
        let json = serde_json::to_string(&Action::CancelWork).unwrap();
        assert_eq!(json, "\"cancel_work\"");
        let back: Action = serde_json::from_str("\"drop_db\"").unwrap();
        assert_eq!(back, Action::Custom("drop_db".into()));
    }
}
