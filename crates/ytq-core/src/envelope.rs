//! JSON response envelope for machine-readable output (`ytq --json`).

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::coordinator::{CoordinatorError, Reported};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub timestamp: String,
    pub correlation_id: Uuid,
    pub status: EnvelopeStatus,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl<T: Serialize> Envelope<T> {
    pub fn success(reported: Reported<T>) -> Self {
        Self {
            timestamp: now_rfc3339(),
            correlation_id: Uuid::new_v4(),
            status: EnvelopeStatus::Success,
            data: Some(reported.value),
            warnings: reported.warnings,
            error: None,
        }
    }

    /// Failure with an explicit code, for errors raised outside the coordinator.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: now_rfc3339(),
            correlation_id: Uuid::new_v4(),
            status: EnvelopeStatus::Failure,
            data: None,
            warnings: Vec::new(),
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    pub fn from_error(err: &CoordinatorError) -> Self {
        Self::failure(err.code(), err.to_string())
    }

    pub fn from_result(result: Result<Reported<T>, CoordinatorError>) -> Self {
        match result {
            Ok(r) => Self::success(r),
            Err(e) => Self::from_error(&e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
