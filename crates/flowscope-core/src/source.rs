#![forbid(unsafe_code)]

//! Source structures handed in by the data-fetch collaborator.
//!
//! Field names follow the camelCase JSON the collaborator produces. Every
//! field is optional at the serde level; the transformer decides what is
//! required.

use serde::{Deserialize, Serialize};

use crate::transform::TransformError;

/// One automation unit with its triggers and agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSource {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub triggers: Vec<TriggerSource>,
    pub agents: Vec<AgentSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerSource {
    pub id: Option<String>,
    pub name: String,
    pub objective: Option<String>,
    pub target_table: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSource {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub role: Option<String>,
    pub instructions: Option<String>,
    pub tools: Vec<ToolSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSource {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<WorkflowSource>),
    Wrapped { workflows: Vec<WorkflowSource> },
}

/// Parse a workflow payload.
///
/// Accepts either a bare array of workflows or an object with a
/// `workflows` array.
pub fn parse_workflows(json: &str) -> Result<Vec<WorkflowSource>, TransformError> {
    let payload: Payload =
        serde_json::from_str(json).map_err(|e| TransformError::Parse(e.to_string()))?;
    Ok(match payload {
        Payload::List(list) => list,
        Payload::Wrapped { workflows } => workflows,
    })
}

/// Id if present and not blank.
pub(crate) fn explicit_id(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|s| !s.is_empty())
}
