use log::error;
use serde::Serialize;

use crate::enrollment::{CaptureReport, EnrollmentReceipt};
use crate::errors::FaceResult;
use crate::identity::{IdentityProfile, IdentitySummary};
use crate::login::{LoginReceipt, Recognition};
use crate::service::Status;
use crate::session::{Directory, LogoutReceipt, RenameReceipt};

/// Outcome handed to the transport layer
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { message: String, data: T },
    Failure {
        message: String,
        code: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        face_count: Option<usize>,
    },
}

/// Success message for an operation payload
pub trait Describe {
    fn message(&self) -> String;
}

impl<T: Describe> Response<T> {
    pub fn from_result(result: FaceResult<T>) -> Self {
        match result {
            Ok(data) => Response::Success {
                message: data.message(),
                data,
            },
            Err(err) => {
                if !err.is_user_facing() {
                    error!("operation failed: {err}");
                }
                Response::Failure {
                    message: err.human_message(),
                    code: err.code(),
                    face_count: err.face_count(),
                }
            }
        }
    }
}

impl<T: Describe> From<FaceResult<T>> for Response<T> {
    fn from(result: FaceResult<T>) -> Self {
        Self::from_result(result)
    }
}

impl<T> Response<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Response::Success { message, .. } | Response::Failure { message, .. } => message,
        }
    }
}

fn faces_suffix(face_count: usize) -> String {
    if face_count > 1 {
        format!(" ({face_count} faces detected)")
    } else {
        String::new()
    }
}

impl Describe for EnrollmentReceipt {
    fn message(&self) -> String {
        format!("face enrolled for {}", self.name)
    }
}

impl Describe for CaptureReport {
    fn message(&self) -> String {
        "one face detected - ready for enrollment".to_string()
    }
}

impl Describe for LoginReceipt {
    fn message(&self) -> String {
        format!("welcome, {}!{}", self.name, faces_suffix(self.face_count))
    }
}

impl Describe for Recognition {
    fn message(&self) -> String {
        format!("face recognized: {}{}", self.name, faces_suffix(self.face_count))
    }
}

impl Describe for LogoutReceipt {
    fn message(&self) -> String {
        "logged out".to_string()
    }
}

impl Describe for RenameReceipt {
    fn message(&self) -> String {
        format!("renamed from '{}' to '{}'", self.old_name, self.new_name)
    }
}

impl Describe for IdentitySummary {
    fn message(&self) -> String {
        format!("identity {} deleted", self.name)
    }
}

impl Describe for IdentityProfile {
    fn message(&self) -> String {
        "identity found".to_string()
    }
}

impl Describe for Directory {
    fn message(&self) -> String {
        format!("{} identities enrolled", self.total)
    }
}

impl Describe for Status {
    fn message(&self) -> String {
        format!("facegate is running with {} identities", self.identities)
    }
}
