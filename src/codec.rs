//! Conversion between in-memory signatures and their persisted float lists.

use crate::errors::{FaceError, FaceResult};
use crate::Signature;

pub fn encode(signature: &Signature) -> Vec<f64> {
    signature.to_vec()
}

/// Rebuild a signature from persisted values.
///
/// `expected_len` is the dimension already fixed by the store, if any.
pub fn decode(values: &[f64], expected_len: Option<usize>) -> FaceResult<Signature> {
    let signature = Signature::new(values.to_vec());
    validate(&signature, expected_len).map_err(|err| match err {
        FaceError::DimensionMismatch { expected, found } => {
            FaceError::Decode(format!("expected {expected} components, found {found}"))
        }
        other => other,
    })?;
    Ok(signature)
}

/// Structural check applied to every signature before it is matched or stored
pub fn validate(signature: &Signature, expected_len: Option<usize>) -> FaceResult<()> {
    if signature.is_empty() {
        return Err(FaceError::Decode("signature is empty".into()));
    }
    if let Some(expected) = expected_len {
        if signature.len() != expected {
            return Err(FaceError::DimensionMismatch {
                expected,
                found: signature.len(),
            });
        }
    }
    if let Some(pos) = signature.iter().position(|v| !v.is_finite()) {
        return Err(FaceError::Decode(format!(
            "component {pos} is not a finite number"
        )));
    }
    Ok(())
}
