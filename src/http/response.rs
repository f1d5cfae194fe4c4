//! Diagnostic response body.
//!
//! Field order matches the wire format clients parse.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diagnostics::{AnonymityLevel, DiagnosticResult, RequestSnapshot};

pub const STATUS_SUCCESS: &str = "success";
pub const MESSAGE: &str = "Proxy test endpoint is active and providing details.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticResponse {
    pub status: String,
    pub message: String,
    pub received_path: String,
    pub method: String,
    /// Header names are lowercase as parsed by hyper; values are verbatim.
    pub headers_received: Map<String, Value>,
    pub connecting_ip: String,
    pub client_ip_from_headers: String,
    pub anonymity_level: AnonymityLevel,
    pub server_processing_latency_ms: f64,
    pub args: Map<String, Value>,
    pub form: Map<String, Value>,
    pub json_body: Option<Value>,
}

impl DiagnosticResponse {
    /// Combine a snapshot and its diagnosis.
    pub fn assemble(snapshot: RequestSnapshot, result: DiagnosticResult) -> Self {
        let headers_received = snapshot
            .headers
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        Self {
            status: STATUS_SUCCESS.to_string(),
            message: MESSAGE.to_string(),
            received_path: snapshot.path,
            method: snapshot.method,
            headers_received,
            connecting_ip: snapshot.connecting_address,
            client_ip_from_headers: result.inferred_client_address,
            anonymity_level: result.anonymity_level,
            server_processing_latency_ms: result.server_processing_latency_ms,
            args: snapshot.query_parameters,
            form: snapshot.form_fields,
            json_body: snapshot.json_body,
        }
    }
}
