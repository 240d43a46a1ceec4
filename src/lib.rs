pub mod codec;
pub mod config;
pub mod enrollment;
pub mod errors;
pub mod identity;
pub mod login;
pub mod matcher;
pub mod response;
pub mod service;
pub mod session;
pub mod storage;

// Re-export vision types for convenience
pub use facegate_vision::{capture, face, BoundingBox, Capture, FeatureExtractor, Signature};

pub use errors::{FaceError, FaceResult};
pub use matcher::Tolerances;
pub use response::Response;
pub use service::FaceGate;
pub use storage::IdentityStore;
