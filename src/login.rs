use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::codec;
use crate::errors::{FaceError, FaceResult};
use crate::matcher;
use crate::storage::IdentityStore;
use crate::Capture;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoginReceipt {
    pub id: String,
    pub name: String,
    pub login_time: DateTime<Utc>,
    pub face_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recognition {
    pub id: String,
    pub name: String,
    pub face_count: usize,
}

/// Resolve a capture to an enrolled identity and record the login.
///
/// Every detected face is tried in detection order against identities in
/// enrollment order; the first pair within `tolerance` wins.
pub fn login(store: &IdentityStore, tolerance: f64, capture: &Capture) -> FaceResult<LoginReceipt> {
    let receipt = store.exclusive(|ledger| {
        if ledger.is_empty() {
            return Err(FaceError::NoIdentitiesEnrolled);
        }
        if capture.is_empty() {
            return Err(FaceError::NoFaceDetected);
        }
        for probe in &capture.signatures {
            codec::validate(probe, ledger.dimension())?;
        }

        let (id, probe_index) =
            match matcher::first_match(&capture.signatures, ledger.identities(), tolerance)? {
                Some(hit) => {
                    debug!(
                        "face {} matched {} at distance {:.3}",
                        hit.probe_index + 1,
                        hit.identity.id,
                        hit.distance
                    );
                    (hit.identity.id.clone(), hit.probe_index)
                }
                None => {
                    return Err(FaceError::FaceNotRecognized {
                        face_count: capture.face_count,
                    })
                }
            };

        let now = Utc::now();
        let identity = ledger
            .get_mut(&id)
            .ok_or_else(|| FaceError::NotFound(id.clone()))?;
        identity.last_login = Some(now);
        identity.login_count += 1;

        debug!(
            "login via face {} of {}",
            probe_index + 1,
            capture.face_count
        );
        Ok(LoginReceipt {
            id: identity.id.clone(),
            name: identity.name.clone(),
            login_time: now,
            face_count: capture.face_count,
        })
    })?;

    info!("login succeeded for {} ({})", receipt.name, receipt.id);
    Ok(receipt)
}

/// Identify the first detected face without recording a login
pub fn check_face(
    store: &IdentityStore,
    tolerance: f64,
    capture: &Capture,
) -> FaceResult<Recognition> {
    let probe = capture.first().ok_or(FaceError::NoFaceDetected)?;

    store.read(|ledger| -> FaceResult<Recognition> {
        codec::validate(probe, ledger.dimension())?;
        let hit = matcher::first_match(std::slice::from_ref(probe), ledger.identities(), tolerance)?
            .ok_or(FaceError::FaceNotRecognized {
                face_count: capture.face_count,
            })?;
        Ok(Recognition {
            id: hit.identity.id.clone(),
            name: hit.identity.name.clone(),
            face_count: capture.face_count,
        })
    })
}
