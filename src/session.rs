//! Identity maintenance that involves no face matching.

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::errors::{FaceError, FaceResult};
use crate::identity::{normalize_name, IdentityProfile, IdentitySummary};
use crate::storage::IdentityStore;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogoutReceipt {
    pub id: String,
    pub logout_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenameReceipt {
    pub id: String,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Directory {
    pub identities: Vec<IdentitySummary>,
    pub total: usize,
}

pub fn logout(store: &IdentityStore, id: &str) -> FaceResult<LogoutReceipt> {
    let now = Utc::now();
    store.update(id, |identity| identity.last_logout = Some(now))?;
    info!("logout recorded for {id}");
    Ok(LogoutReceipt {
        id: id.to_string(),
        logout_time: now,
    })
}

pub fn rename(store: &IdentityStore, id: &str, new_name: &str) -> FaceResult<RenameReceipt> {
    let new_name = normalize_name(new_name).ok_or(FaceError::InvalidName)?;
    let mut old_name = String::new();
    store.update(id, |identity| {
        old_name = std::mem::replace(&mut identity.name, new_name.clone());
    })?;
    info!("renamed {id} from {old_name} to {new_name}");
    Ok(RenameReceipt {
        id: id.to_string(),
        old_name,
        new_name,
    })
}

pub fn delete(store: &IdentityStore, id: &str) -> FaceResult<IdentitySummary> {
    let removed = store.delete(id)?;
    info!("deleted {} ({id})", removed.name);
    Ok(removed.summary())
}

pub fn list(store: &IdentityStore) -> Directory {
    let identities: Vec<IdentitySummary> = store.all().map(|identity| identity.summary()).collect();
    Directory {
        total: identities.len(),
        identities,
    }
}

pub fn describe(store: &IdentityStore, id: &str) -> FaceResult<IdentityProfile> {
    Ok(store.get(id)?.profile())
}
