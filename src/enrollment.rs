use chrono::Utc;
use log::info;
use serde::Serialize;

use crate::codec;
use crate::errors::{FaceError, FaceResult};
use crate::identity::{normalize_name, Identity};
use crate::matcher::{self, Tolerances};
use crate::storage::IdentityStore;
use crate::{Capture, Signature};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrollmentReceipt {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CaptureReport {
    pub face_count: usize,
}

/// The single usable signature of an enrollment capture
pub fn single_face(capture: &Capture) -> FaceResult<&Signature> {
    match capture.face_count {
        0 => Err(FaceError::NoFaceDetected),
        1 => capture.first().ok_or(FaceError::NoFaceDetected),
        n => Err(FaceError::MultipleFacesDetected(n)),
    }
}

/// Report whether a capture could be enrolled as-is. Does not touch the store.
pub fn inspect(capture: &Capture) -> FaceResult<CaptureReport> {
    match capture.face_count {
        0 => Err(FaceError::NoFaceDetected),
        1 => Ok(CaptureReport { face_count: 1 }),
        n => Err(FaceError::MultipleFacesDetected(n)),
    }
}

pub fn enroll(
    store: &IdentityStore,
    tolerances: &Tolerances,
    capture: &Capture,
    name: &str,
) -> FaceResult<EnrollmentReceipt> {
    let name = normalize_name(name).ok_or(FaceError::InvalidName)?;
    let signature = single_face(capture)?;

    let receipt = store.exclusive(|ledger| {
        codec::validate(signature, ledger.dimension())?;
        if let Some(hit) = matcher::first_match(
            std::slice::from_ref(signature),
            ledger.identities(),
            tolerances.strict,
        )? {
            return Err(FaceError::DuplicateIdentity(hit.identity.name.clone()));
        }

        let id = ledger.next_id();
        ledger.put(Identity::new(
            id.clone(),
            name.clone(),
            signature.clone(),
            Utc::now(),
        ));
        Ok(EnrollmentReceipt { id, name })
    })?;

    info!("enrolled {} as {}", receipt.name, receipt.id);
    Ok(receipt)
}
