//! JSON envelope returned by every endpoint.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{GondorError, GondorResult};

/// Operation-level status of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// A decoded response: `status` plus every other top-level key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiResponse {
    pub status: ApiStatus,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ApiResponse {
    pub fn from_json(text: &str) -> GondorResult<Self> {
        serde_json::from_str(text).map_err(|e| GondorError::InvalidResponse(e.to_string()))
    }

    pub fn from_value(value: Value) -> GondorResult<Self> {
        serde_json::from_value(value).map_err(|e| GondorError::InvalidResponse(e.to_string()))
    }

    pub fn is_success(&self) -> bool {
        self.status == ApiStatus::Success
    }

    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    /// Turn `status: error` into [`GondorError::Api`].
    pub fn into_success(self) -> GondorResult<Self> {
        match self.status {
            ApiStatus::Success => Ok(self),
            ApiStatus::Error => Err(GondorError::Api {
                message: self.message().unwrap_or("unknown error").to_string(),
            }),
            ApiStatus::Unknown => Err(GondorError::InvalidResponse(
                "unrecognised response status".to_string(),
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// An identifier the server may send as a string or a number.
    pub fn id_field(&self, key: &str) -> GondorResult<String> {
        match self.body.get(key) {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(GondorError::InvalidResponse(format!(
                "response is missing '{}'",
                key
            ))),
        }
    }
}
