use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Region of a detected face, in source image pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

/// Face signature (fixed-length feature vector from the extractor)
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub vector: Array1<f64>,
}

impl Signature {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            vector: Array1::from_vec(values),
        }
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.vector.iter()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.vector.to_vec()
    }
}

impl From<Vec<f64>> for Signature {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Euclidean (L2) distance between two signatures.
///
/// Components past the shorter signature are ignored; callers that care about
/// dimensions must compare lengths first.
pub fn euclidean_distance(a: &Signature, b: &Signature) -> f64 {
    a.vector
        .iter()
        .zip(b.vector.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let s = Signature::new(vec![0.25, -1.5, 3.0]);
        assert_eq!(euclidean_distance(&s, &s), 0.0);
    }

    #[test]
    fn test_distance_pythagorean() {
        let a = Signature::new(vec![0.0, 0.0]);
        let b = Signature::new(vec![3.0, 4.0]);
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-12);
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }
}
