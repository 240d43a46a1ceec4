pub mod capture;
pub mod extractor;
pub mod face;

// Re-export commonly used types
pub use capture::{Capture, FeatureRecord, FeatureSummary};
pub use extractor::{decode_image, decode_image_bytes, FeatureExtractor};
pub use face::{BoundingBox, Signature};
