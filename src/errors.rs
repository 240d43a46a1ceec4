use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("no face detected in the image")]
    NoFaceDetected,

    #[error("{0} faces detected; enrollment requires exactly one face in frame")]
    MultipleFacesDetected(usize),

    #[error("this face is already enrolled as {0}")]
    DuplicateIdentity(String),

    #[error("identity {0} not found")]
    NotFound(String),

    #[error("{}", unrecognized_message(.face_count))]
    FaceNotRecognized { face_count: usize },

    #[error("no identities enrolled; enroll a face first")]
    NoIdentitiesEnrolled,

    #[error("name is required")]
    InvalidName,

    #[error("signature length mismatch: expected {expected} values, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid signature: {0}")]
    Decode(String),

    #[error("failed to read identity store {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("identity store {path} is invalid: {message}")]
    InvalidStoreFile { path: PathBuf, message: String },

    #[error("failed to persist identity store {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn unrecognized_message(face_count: &usize) -> String {
    let mut message =
        "face not recognized; check your position or enroll your face".to_string();
    if *face_count > 1 {
        message.push_str(&format!(" ({face_count} faces detected)"));
    }
    message
}

impl FaceError {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            FaceError::NoFaceDetected => "no_face_detected",
            FaceError::MultipleFacesDetected(_) => "multiple_faces_detected",
            FaceError::DuplicateIdentity(_) => "duplicate_identity",
            FaceError::NotFound(_) => "not_found",
            FaceError::FaceNotRecognized { .. } => "face_not_recognized",
            FaceError::NoIdentitiesEnrolled => "no_identities_enrolled",
            FaceError::InvalidName => "invalid_name",
            FaceError::DimensionMismatch { .. } => "dimension_mismatch",
            FaceError::Decode(_) => "decode_error",
            _ => "internal",
        }
    }

    /// Whether the message is safe to show to an end user
    pub fn is_user_facing(&self) -> bool {
        self.code() != "internal"
    }

    /// Detected face count behind a capture-related failure
    pub fn face_count(&self) -> Option<usize> {
        match self {
            FaceError::FaceNotRecognized { face_count } => Some(*face_count),
            FaceError::MultipleFacesDetected(count) => Some(*count),
            _ => None,
        }
    }

    pub fn human_message(&self) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            "internal error".to_string()
        }
    }
}

pub type FaceResult<T> = Result<T, FaceError>;
