#![forbid(unsafe_code)]

//! Nested workflow definitions → flat [`FlowGraph`].
//!
//! Workflows are stable-sorted by name and walked depth-first. Entities
//! without a usable source id get a path-derived id (`workflow[2]`,
//! `billing/agent[0]`, `billing/agent[0]/tool[1]`), so logically identical
//! input always yields identical ids.
//!
//! The returned graph has every node hidden; callers run
//! [`crate::visibility::initialize`] (or go through a session) before
//! presenting it.

use std::fmt;

use serde::Serialize;
use tracing::{debug, debug_span};

use crate::graph::{FlowGraph, GraphBuilder, NodeDetails, NodeId, NodeKind, NodeSpec, Relationship};
use crate::source::{AgentSource, ToolSource, TriggerSource, WorkflowSource, explicit_id};

/// Fatal transform failure. No partial graph is ever produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Non-empty input yielded zero nodes and zero edges.
    EmptyGraph { workflows: usize },
    /// Two entities resolved to the same id.
    DuplicateId { id: NodeId, kind: NodeKind },
    /// A node names a parent that does not exist.
    MissingParent { id: NodeId, parent: NodeId },
    /// An edge endpoint does not exist.
    DanglingEdge { source: NodeId, target: NodeId },
    /// The JSON payload could not be decoded.
    Parse(String),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGraph { workflows } => {
                write!(f, "{workflows} workflow entries produced an empty graph")
            }
            Self::DuplicateId { id, kind } => write!(f, "duplicate node id `{id}` ({kind})"),
            Self::MissingParent { id, parent } => {
                write!(f, "node `{id}` references missing parent `{parent}`")
            }
            Self::DanglingEdge { source, target } => {
                write!(f, "edge `{source}->{target}` references a missing node")
            }
            Self::Parse(msg) => write!(f, "invalid workflow payload: {msg}"),
        }
    }
}

impl std::error::Error for TransformError {}

/// Build a graph from workflow definitions.
pub fn transform(workflows: &[WorkflowSource]) -> Result<FlowGraph, TransformError> {
    let _span = debug_span!("flowscope.transform", workflows = workflows.len()).entered();

    let mut sorted: Vec<&WorkflowSource> = workflows.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut builder = GraphBuilder::default();
    for (index, wf) in sorted.into_iter().enumerate() {
        emit_workflow(&mut builder, index, wf)?;
    }

    let graph = builder.finish()?;
    if !workflows.is_empty() && graph.is_empty() && graph.edges().is_empty() {
        return Err(TransformError::EmptyGraph {
            workflows: workflows.len(),
        });
    }
    debug!(
        nodes = graph.len(),
        edges = graph.edges().len(),
        "transform complete"
    );
    Ok(graph)
}

/// Decode a JSON payload and transform it.
pub fn transform_json(json: &str) -> Result<FlowGraph, TransformError> {
    let workflows = crate::source::parse_workflows(json)?;
    transform(&workflows)
}

fn emit_workflow(
    builder: &mut GraphBuilder,
    index: usize,
    wf: &WorkflowSource,
) -> Result<(), TransformError> {
    let wf_id = resolve_id(wf.id.as_deref(), || format!("workflow[{index}]"));
    builder.add_node(NodeSpec {
        id: wf_id.clone(),
        kind: NodeKind::Workflow,
        parent: None,
        level: 0,
        label: label_or_id(&wf.name, &wf_id),
        details: NodeDetails {
            description: non_blank(wf.description.as_deref()),
            ..NodeDetails::default()
        },
        raw: raw_without(wf, &["triggers", "agents"]),
    })?;

    for (i, trigger) in wf.triggers.iter().enumerate() {
        emit_trigger(builder, &wf_id, i, trigger)?;
    }
    for (i, agent) in wf.agents.iter().enumerate() {
        emit_agent(builder, &wf_id, i, agent)?;
    }
    Ok(())
}

fn emit_trigger(
    builder: &mut GraphBuilder,
    wf_id: &NodeId,
    i: usize,
    trigger: &TriggerSource,
) -> Result<(), TransformError> {
    let id = resolve_id(trigger.id.as_deref(), || format!("{wf_id}/trigger[{i}]"));
    builder.add_node(NodeSpec {
        id: id.clone(),
        kind: NodeKind::Trigger,
        parent: None,
        level: 0,
        label: label_or_id(&trigger.name, &id),
        details: NodeDetails {
            objective: non_blank(trigger.objective.as_deref()),
            target_table: non_blank(trigger.target_table.as_deref()),
            condition: non_blank(trigger.condition.as_deref()),
            ..NodeDetails::default()
        },
        raw: raw_without(trigger, &[]),
    })?;
    builder.add_edge(id, wf_id.clone(), Relationship::Initiates);
    Ok(())
}

fn emit_agent(
    builder: &mut GraphBuilder,
    wf_id: &NodeId,
    i: usize,
    agent: &AgentSource,
) -> Result<(), TransformError> {
    let id = resolve_id(agent.id.as_deref(), || format!("{wf_id}/agent[{i}]"));
    builder.add_node(NodeSpec {
        id: id.clone(),
        kind: NodeKind::Agent,
        parent: Some(wf_id.clone()),
        level: 1,
        label: label_or_id(&agent.name, &id),
        details: NodeDetails {
            description: non_blank(agent.description.as_deref()),
            role: non_blank(agent.role.as_deref()),
            instructions: non_blank(agent.instructions.as_deref()),
            ..NodeDetails::default()
        },
        raw: raw_without(agent, &["tools"]),
    })?;
    builder.add_edge(wf_id.clone(), id.clone(), Relationship::Uses);

    for (t, tool) in agent.tools.iter().enumerate() {
        emit_tool(builder, &id, t, tool)?;
    }
    Ok(())
}

fn emit_tool(
    builder: &mut GraphBuilder,
    agent_id: &NodeId,
    i: usize,
    tool: &ToolSource,
) -> Result<(), TransformError> {
    let id = resolve_id(tool.id.as_deref(), || format!("{agent_id}/tool[{i}]"));
    builder.add_node(NodeSpec {
        id: id.clone(),
        kind: NodeKind::Tool,
        parent: Some(agent_id.clone()),
        level: 2,
        label: label_or_id(&tool.name, &id),
        details: NodeDetails {
            description: non_blank(tool.description.as_deref()),
            ..NodeDetails::default()
        },
        raw: raw_without(tool, &[]),
    })?;
    builder.add_edge(agent_id.clone(), id, Relationship::Uses);
    Ok(())
}

fn resolve_id(explicit: Option<&str>, fallback: impl FnOnce() -> String) -> NodeId {
    match explicit_id(explicit) {
        Some(id) => NodeId::from(id),
        None => NodeId::from(fallback()),
    }
}

fn label_or_id(name: &str, id: &NodeId) -> String {
    let name = name.trim();
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Serialize an entity for passthrough, dropping nested collections.
fn raw_without<T: Serialize>(entity: &T, drop: &[&str]) -> serde_json::Value {
    let mut value = serde_json::to_value(entity).unwrap_or(serde_json::Value::Null);
    if let serde_json::Value::Object(map) = &mut value {
        for key in drop {
            map.remove(*key);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> ToolSource {
        ToolSource {
            name: name.to_string(),
            ..ToolSource::default()
        }
    }

    fn agent(id: &str, tools: Vec<ToolSource>) -> AgentSource {
        AgentSource {
            id: Some(id.to_string()),
            name: id.to_uppercase(),
            tools,
            ..AgentSource::default()
        }
    }

    fn workflow(id: Option<&str>, name: &str) -> WorkflowSource {
        WorkflowSource {
            id: id.map(str::to_string),
            name: name.to_string(),
            ..WorkflowSource::default()
        }
    }

    #[test]
    fn lone_workflow_is_a_single_leaf() {
        let g = transform(&[workflow(Some("w"), "Solo")]).unwrap();
        assert_eq!(g.len(), 1);
        assert!(g.edges().is_empty());
        let w = g.node("w").unwrap();
        assert_eq!(w.children_count(), 0);
        assert!(!w.has_toggle());
    }

    #[test]
    fn nesting_produces_levels_parents_and_edges() {
        let mut wf = workflow(Some("w"), "Flow");
        wf.agents = vec![agent("a1", vec![tool("t")]), agent("a2", vec![tool("u")])];
        wf.triggers = vec![TriggerSource {
            id: Some("tr".into()),
            name: "On insert".into(),
            condition: Some("x > 1".into()),
            ..TriggerSource::default()
        }];
        let g = transform(&[wf]).unwrap();

        assert_eq!(g.len(), 6);
        let tr = g.node("tr").unwrap();
        assert_eq!(tr.level(), 0);
        assert!(tr.parent().is_none());
        assert_eq!(tr.details().condition.as_deref(), Some("x > 1"));

        assert_eq!(g.node("a1").unwrap().parent().map(NodeId::as_str), Some("w"));
        let tool_id = "a1/tool[0]";
        let t = g.node(tool_id).unwrap();
        assert_eq!(t.level(), 2);
        assert_eq!(t.parent().map(NodeId::as_str), Some("a1"));

        let ids: Vec<&str> = g.edges().iter().map(|e| e.id()).collect();
        assert!(ids.contains(&"tr->w"));
        assert!(ids.contains(&"w->a1"));
        assert!(ids.contains(&"a1->a1/tool[0]"));
        let initiates = g
            .edges()
            .iter()
            .filter(|e| e.relationship() == Relationship::Initiates)
            .count();
        assert_eq!(initiates, 1);
        assert_eq!(g.node("w").unwrap().children_count(), 2);
    }

    #[test]
    fn workflows_sorted_by_name() {
        let g = transform(&[workflow(Some("z"), "Zeta"), workflow(Some("a"), "Alpha")]).unwrap();
        let order: Vec<&str> = g.nodes().iter().map(|n| n.id().as_str()).collect();
        assert_eq!(order, vec!["a", "z"]);
    }

    #[test]
    fn fallback_ids_are_path_derived_and_stable() {
        let mut wf = workflow(None, "Beta");
        wf.agents = vec![AgentSource {
            name: "helper".into(),
            tools: vec![tool("x"), tool("y")],
            ..AgentSource::default()
        }];
        let input = vec![workflow(None, "Alpha"), wf];

        let first = transform(&input).unwrap();
        let second = transform(&input).unwrap();
        let ids = |g: &FlowGraph| -> Vec<String> {
            g.nodes().iter().map(|n| n.id().to_string()).collect()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(
            ids(&first),
            vec![
                "workflow[0]",
                "workflow[1]",
                "workflow[1]/agent[0]",
                "workflow[1]/agent[0]/tool[0]",
                "workflow[1]/agent[0]/tool[1]",
            ]
        );
    }

    #[test]
    fn duplicate_source_ids_are_fatal() {
        let mut wf = workflow(Some("w"), "Flow");
        wf.agents = vec![agent("dup", vec![]), agent("dup", vec![])];
        let err = transform(&[wf]).unwrap_err();
        assert!(matches!(err, TransformError::DuplicateId { .. }));
    }

    #[test]
    fn blank_entry_still_emits_a_workflow_node() {
        let g = transform(&[WorkflowSource::default()]).unwrap();
        assert_eq!(g.len(), 1);
        assert!(g.edges().is_empty());
        let node = g.node("workflow[0]").unwrap();
        assert_eq!(node.label(), "workflow[0]");
        assert!(!node.has_toggle());
    }

    #[test]
    fn empty_input_is_an_empty_graph() {
        let g = transform(&[]).unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn raw_passthrough_drops_nested_collections() {
        let mut wf = workflow(Some("w"), "Flow");
        wf.description = Some("does things".into());
        wf.agents = vec![agent("a", vec![])];
        let g = transform(&[wf]).unwrap();
        let raw = g.node("w").unwrap().raw();
        assert_eq!(raw["description"], "does things");
        assert!(raw.get("agents").is_none());
        assert!(raw.get("triggers").is_none());
    }

    #[test]
    fn transform_json_surfaces_parse_errors() {
        assert!(matches!(
            transform_json("[1, 2]"),
            Err(TransformError::Parse(_))
        ));
    }
}
