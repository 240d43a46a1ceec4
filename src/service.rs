use serde::Serialize;

use crate::config::Config;
use crate::enrollment::{self, CaptureReport, EnrollmentReceipt};
use crate::errors::FaceResult;
use crate::identity::{IdentityProfile, IdentitySummary};
use crate::login::{self, LoginReceipt, Recognition};
use crate::matcher::Tolerances;
use crate::session::{self, Directory, LogoutReceipt, RenameReceipt};
use crate::storage::{IdentityStore, JsonFileBackend, StoreBackend};
use crate::Capture;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Status {
    pub identities: usize,
}

/// Identity engine shared by every request handler.
///
/// Captures must be extracted before calling in; only matching and mutation
/// run under the store lock.
pub struct FaceGate {
    store: IdentityStore,
    tolerances: Tolerances,
}

impl FaceGate {
    pub fn new(store: IdentityStore, tolerances: Tolerances) -> Self {
        Self { store, tolerances }
    }

    /// Engine over the configured JSON store, loaded from disk
    pub fn open(cfg: &Config) -> Self {
        Self::with_backend(JsonFileBackend::new(&cfg.store_path), cfg.tolerances())
    }

    pub fn with_backend(backend: impl StoreBackend + 'static, tolerances: Tolerances) -> Self {
        Self::new(IdentityStore::open(backend), tolerances)
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    pub fn tolerances(&self) -> Tolerances {
        self.tolerances
    }

    pub fn status(&self) -> FaceResult<Status> {
        Ok(Status {
            identities: self.store.len(),
        })
    }

    pub fn inspect(&self, capture: &Capture) -> FaceResult<CaptureReport> {
        enrollment::inspect(capture)
    }

    pub fn enroll(&self, capture: &Capture, name: &str) -> FaceResult<EnrollmentReceipt> {
        enrollment::enroll(&self.store, &self.tolerances, capture, name)
    }

    pub fn login(&self, capture: &Capture) -> FaceResult<LoginReceipt> {
        login::login(&self.store, self.tolerances.lenient, capture)
    }

    pub fn check_face(&self, capture: &Capture) -> FaceResult<Recognition> {
        login::check_face(&self.store, self.tolerances.lenient, capture)
    }

    pub fn logout(&self, id: &str) -> FaceResult<LogoutReceipt> {
        session::logout(&self.store, id)
    }

    pub fn rename(&self, id: &str, new_name: &str) -> FaceResult<RenameReceipt> {
        session::rename(&self.store, id, new_name)
    }

    pub fn delete(&self, id: &str) -> FaceResult<IdentitySummary> {
        session::delete(&self.store, id)
    }

    pub fn list(&self) -> FaceResult<Directory> {
        Ok(session::list(&self.store))
    }

    pub fn describe(&self, id: &str) -> FaceResult<IdentityProfile> {
        session::describe(&self.store, id)
    }
}
