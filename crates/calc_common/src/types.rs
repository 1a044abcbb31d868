//! Wire types shared by the daemon and its tests.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Canvas snapshot as a data-URI (`data:image/png;base64,...`)
    pub image: String,
    /// Variables assigned by earlier calculations, in the order the client sent them
    #[serde(default)]
    pub dict_of_vars: IndexMap<String, Value>,
}

/// One normalized expression/result pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub expr: String,
    pub result: String,
    pub assign: bool,
}

impl AnalysisRecord {
    pub fn new(expr: impl Into<String>, result: impl Into<String>, assign: bool) -> Self {
        Self {
            expr: expr.into(),
            result: result.into(),
            assign,
        }
    }
}

/// Envelope status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Uniform envelope returned by `POST /calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<AnalysisRecord>>,
}

impl CalculateResponse {
    pub fn success(data: Vec<AnalysisRecord>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: "Image processed successfully".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
        }
    }
}

/// Response for `GET /check`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub status: String,
    pub timestamp: String,
    pub message: String,
}

/// Response for `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}
