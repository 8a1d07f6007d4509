//! Parsing and dispatch of adapter requests.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::projector::project;
use crate::basic::model::build_model;
use crate::basic::simulation::run_simulation;
use crate::error::AdapterError;

pub const KEEP_ALIVE: &str = "KEEP_ALIVE";
pub const SIM_REQUEST: &str = "SIM_REQUEST";

/// Successful reply to a request, tagged by `status`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status")]
pub enum Reply {
    #[serde(rename = "KEEP_ALIVE")]
    KeepAlive { response: &'static str },
    #[serde(rename = "SIM_RESULT")]
    SimResult { elements: Map<String, Value> },
}

impl Reply {
    pub fn keep_alive() -> Self {
        Reply::KeepAlive {
            response: "Keep alive request acknowledged",
        }
    }
}

fn get<'a>(request: &'a Value, key: &str) -> Result<&'a Value, AdapterError> {
    request.get(key).ok_or_else(|| AdapterError::missing_key(key))
}

/// Handles one raw request body.
pub fn handle_request(body: &[u8]) -> Result<Reply, AdapterError> {
    let request: Value = serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "request body is not json");
        AdapterError::Json("Could not parse json from request data".to_owned())
    })?;

    let status = get(&request, "status")?;
    match status.as_str() {
        Some(KEEP_ALIVE) => Ok(Reply::keep_alive()),
        Some(SIM_REQUEST) => {
            let three_phase = get(&request, "3phase")?
                .as_bool()
                .ok_or_else(|| AdapterError::invalid("Property \"3phase\" must be a boolean."))?;
            let elements = get(&request, "elements")?
                .as_object()
                .ok_or_else(|| AdapterError::invalid("Property \"elements\" must be an object."))?;
            debug!(elements = elements.len(), three_phase, "simulation request");
            let model = build_model(elements)?;
            let results = run_simulation(&model, three_phase)?;
            Ok(Reply::SimResult {
                elements: project(&model, &results),
            })
        }
        other => {
            let shown = other.map(str::to_owned).unwrap_or_else(|| status.to_string());
            Err(AdapterError::invalid(format!(
                "Status \"{shown}\" is not a valid status code."
            )))
        }
    }
}
