//! Wire shapes shared by the controller and its transports.

use serde_json::{Map, Value};

use crate::transport::TransportError;

/// How the request body is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `multipart/form-data`, text fields only
    Multipart(Vec<(String, String)>),
}

/// A mutating POST against one order resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Path relative to the server root, e.g. `/requests/<id>/status/`.
    pub path: String,
    pub body: RequestBody,
    /// Sent as `X-CSRFToken` when present.
    pub csrf_header: Option<String>,
}

/// `{"success": bool, "error"?: string, ...fields}`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResponse {
    pub success: bool,
    pub error: Option<String>,
    fields: Map<String, Value>,
}

impl UpdateResponse {
    /// Validate the contract; anything else is a malformed body.
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        let Value::Object(fields) = value else {
            return Err(TransportError::Malformed("expected a JSON object".into()));
        };

        let success = fields
            .get("success")
            .and_then(Value::as_bool)
            .ok_or_else(|| TransportError::Malformed("missing boolean `success`".into()))?;
        let error = fields
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            success,
            error,
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }
}
