use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec;
use crate::errors::FaceResult;
use crate::Signature;

/// An enrolled person
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub signature: Signature,
    pub registered_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub login_count: u64,
    pub last_logout: Option<DateTime<Utc>>,
}

/// On-disk shape of an identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredIdentity {
    pub id: String,
    pub name: String,
    pub signature: Vec<f64>,
    pub registered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub login_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_logout: Option<DateTime<Utc>>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IdentitySummary {
    pub id: String,
    pub name: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IdentityProfile {
    pub id: String,
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub login_count: u64,
    pub last_logout: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(id: String, name: String, signature: Signature, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            signature,
            registered_at,
            last_login: None,
            login_count: 0,
            last_logout: None,
        }
    }

    pub fn to_stored(&self) -> StoredIdentity {
        StoredIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            signature: codec::encode(&self.signature),
            registered_at: self.registered_at,
            last_login: self.last_login,
            login_count: self.login_count,
            last_logout: self.last_logout,
        }
    }

    pub fn from_stored(stored: StoredIdentity, expected_len: Option<usize>) -> FaceResult<Self> {
        let signature = codec::decode(&stored.signature, expected_len)?;
        Ok(Self {
            id: stored.id,
            name: stored.name,
            signature,
            registered_at: stored.registered_at,
            last_login: stored.last_login,
            login_count: stored.login_count,
            last_logout: stored.last_logout,
        })
    }

    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            registered_at: self.registered_at,
        }
    }

    pub fn profile(&self) -> IdentityProfile {
        IdentityProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            registered_at: self.registered_at,
            last_login: self.last_login,
            login_count: self.login_count,
            last_logout: self.last_logout,
        }
    }
}

/// Trim a display name, rejecting blank ones
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Issues identity ids of the form `user_<seq>_<random>`.
///
/// Every id ever observed or issued is remembered, so an id is never handed out
/// twice in one process, even after the identity holding it was deleted.
#[derive(Debug, Default)]
pub struct IdGenerator {
    sequence: u64,
    issued: HashSet<String>,
}

impl IdGenerator {
    /// Mark an id as taken (loaded from disk or inserted by a caller)
    pub fn observe(&mut self, id: &str) {
        self.issued.insert(id.to_string());
    }

    pub fn seed(&mut self, sequence: u64) {
        self.sequence = self.sequence.max(sequence);
    }

    pub fn next_id(&mut self) -> String {
        loop {
            self.sequence += 1;
            let random = Uuid::new_v4().simple().to_string();
            let candidate = format!("user_{}_{}", self.sequence, &random[..8]);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_sequenced() {
        let mut ids = IdGenerator::default();
        ids.seed(4);
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a.starts_with("user_5_"));
        assert!(b.starts_with("user_6_"));
        assert_ne!(a, b);
        assert_eq!(a.len(), "user_5_".len() + 8);
    }

    #[test]
    fn observed_ids_are_never_issued() {
        let mut ids = IdGenerator::default();
        ids.observe("user_1_deadbeef");
        for _ in 0..64 {
            assert_ne!(ids.next_id(), "user_1_deadbeef");
        }
    }

    #[test]
    fn normalize_name_trims() {
        assert_eq!(normalize_name("  Ana Lucia \n"), Some("Ana Lucia".into()));
        assert_eq!(normalize_name(" \t "), None);
    }

    #[test]
    fn parse_timestamp_accepts_naive_and_rfc3339() {
        let naive = parse_timestamp("2024-03-01T10:20:30").unwrap();
        let zoned = parse_timestamp("2024-03-01T10:20:30Z").unwrap();
        assert_eq!(naive, zoned);
        assert!(parse_timestamp("2024-03-01T10:20:30.125").is_some());
        assert!(parse_timestamp("Unknown").is_none());
    }

    #[test]
    fn stored_round_trip_keeps_session_fields() {
        let mut identity = Identity::new(
            "user_1_abcd1234".into(),
            "Ana".into(),
            Signature::new(vec![0.5, 0.25]),
            Utc::now(),
        );
        identity.login_count = 2;
        identity.last_login = Some(Utc::now());

        let restored = Identity::from_stored(identity.to_stored(), Some(2)).unwrap();
        assert_eq!(restored, identity);
    }
}
