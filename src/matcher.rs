use serde::{Deserialize, Serialize};

use crate::errors::{FaceError, FaceResult};
use crate::identity::Identity;
use crate::Signature;

/// Match thresholds, as maximum Euclidean distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Duplicate detection at enrollment
    pub strict: f64,
    /// Login and face checks
    pub lenient: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            strict: 0.5,
            lenient: 0.6,
        }
    }
}

/// A probe signature accepted against a stored identity
#[derive(Debug, Clone, Copy)]
pub struct MatchHit<'a> {
    pub probe_index: usize,
    pub identity: &'a Identity,
    pub distance: f64,
}

pub fn distance(a: &Signature, b: &Signature) -> FaceResult<f64> {
    if a.len() != b.len() {
        return Err(FaceError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(facegate_vision::face::euclidean_distance(a, b))
}

pub fn is_match(a: &Signature, b: &Signature, tolerance: f64) -> FaceResult<bool> {
    Ok(distance(a, b)? <= tolerance)
}

/// First `(probe, identity)` pair within `tolerance`, probes outermost.
///
/// This is not a nearest-neighbour search: when several identities are within
/// tolerance, the earliest one in `identities` wins.
pub fn first_match<'a>(
    probes: &[Signature],
    identities: &'a [Identity],
    tolerance: f64,
) -> FaceResult<Option<MatchHit<'a>>> {
    for (probe_index, probe) in probes.iter().enumerate() {
        for identity in identities {
            let d = distance(&identity.signature, probe)?;
            if d <= tolerance {
                return Ok(Some(MatchHit {
                    probe_index,
                    identity,
                    distance: d,
                }));
            }
        }
    }
    Ok(None)
}
