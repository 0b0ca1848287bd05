#![forbid(unsafe_code)]

//! Property tests for deferred scheduling and session commands.
//!
//! Invariants:
//! 1. The queue holds at most one task per kind; the latest schedule wins.
//! 2. Due tasks come out ordered by due time, then by scheduling order.
//! 3. A forced fit stays forced when coalesced with unforced fits.
//! 4. After `flush`, nothing is pending and visibility invariants hold.
//! 5. After `flush`, no two visible nodes overlap.
//! 6. With auto-fit off and no reset-view, the viewport never moves.

use std::time::{Duration, Instant};

use flowscope_core::{AgentSource, ToolSource, TriggerSource, WorkflowSource, check_invariants};
use flowscope_layout::Direction;
use flowscope_runtime::{DeferredQueue, FlowConfig, FlowSession, TaskKind};
use proptest::prelude::*;

// ═════════════════════════════════════════════════════════════════════════
// Strategies
// ═════════════════════════════════════════════════════════════════════════

fn kind_strategy() -> impl Strategy<Value = TaskKind> {
    prop_oneof![
        Just(TaskKind::Layout),
        any::<bool>().prop_map(|forced| TaskKind::FitView { forced }),
    ]
}

/// (kind, generation, due offset in ms)
fn schedule_strategy() -> impl Strategy<Value = Vec<(TaskKind, u64, u64)>> {
    prop::collection::vec((kind_strategy(), 0u64..50, 0u64..200), 1..40)
}

/// Workflows without explicit ids, so every id is path-derived.
fn workflows_strategy() -> impl Strategy<Value = Vec<WorkflowSource>> {
    let agent = prop::collection::vec(Just(()), 0..3).prop_map(|tools| AgentSource {
        name: "agent".into(),
        role: Some("worker".into()),
        tools: tools
            .iter()
            .map(|_| ToolSource {
                name: "tool".into(),
                ..ToolSource::default()
            })
            .collect(),
        ..AgentSource::default()
    });
    let workflow = (0usize..3, prop::collection::vec(agent, 0..4)).prop_map(|(triggers, agents)| {
        WorkflowSource {
            id: None,
            name: "flow".into(),
            triggers: (0..triggers)
                .map(|_| TriggerSource {
                    name: "on event".into(),
                    condition: Some("always".into()),
                    ..TriggerSource::default()
                })
                .collect(),
            agents,
            ..WorkflowSource::default()
        }
    });
    prop::collection::vec(workflow, 1..4)
}

#[derive(Debug, Clone)]
enum Op {
    Toggle(usize),
    ExpandAll,
    CollapseAll,
    FlipDirection,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<usize>().prop_map(Op::Toggle),
        1 => Just(Op::ExpandAll),
        1 => Just(Op::CollapseAll),
        1 => Just(Op::FlipDirection),
    ]
}

fn apply(session: &mut FlowSession, op: &Op) {
    match op {
        Op::Toggle(pick) => {
            let nodes = session.graph().nodes();
            let id = nodes[pick % nodes.len()].id().to_string();
            // hidden targets are rejected; that is part of the property
            let _ = session.toggle_node(&id);
        }
        Op::ExpandAll => {
            session.expand_all();
        }
        Op::CollapseAll => {
            session.collapse_all();
        }
        Op::FlipDirection => {
            let next = match session.direction() {
                Direction::TopBottom => Direction::LeftRight,
                Direction::LeftRight => Direction::TopBottom,
            };
            session.set_direction(next);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Queue
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn queue_keeps_latest_per_kind(schedule in schedule_strategy()) {
        let t0 = Instant::now();
        let mut queue = DeferredQueue::new();
        for &(kind, generation, ms) in &schedule {
            queue.schedule(kind, generation, t0 + Duration::from_millis(ms));
        }
        prop_assert!(queue.len() <= 2);
        prop_assert_eq!(queue.len() as u64 + queue.coalesced(), schedule.len() as u64);

        let tasks = queue.drain_all();
        for task in &tasks {
            let last = schedule
                .iter()
                .rev()
                .find(|(k, _, _)| k.as_str() == task.kind.as_str())
                .copied();
            let Some((_, generation, ms)) = last else {
                return Err(TestCaseError::fail("task with no matching schedule"));
            };
            prop_assert_eq!(task.generation, generation);
            prop_assert_eq!(task.due, t0 + Duration::from_millis(ms));
        }
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn due_tasks_are_ordered(schedule in schedule_strategy(), cut in 0u64..250) {
        let t0 = Instant::now();
        let mut queue = DeferredQueue::new();
        for &(kind, generation, ms) in &schedule {
            queue.schedule(kind, generation, t0 + Duration::from_millis(ms));
        }
        let now = t0 + Duration::from_millis(cut);
        let due = queue.take_due(now);
        for pair in due.windows(2) {
            prop_assert!(pair[0].due <= pair[1].due);
        }
        prop_assert!(due.iter().all(|t| t.due <= now));
        if let Some(next) = queue.next_due() {
            prop_assert!(next > now);
        }
    }

    #[test]
    fn forced_fit_survives_coalescing(flags in prop::collection::vec(any::<bool>(), 1..10)) {
        let t0 = Instant::now();
        let mut queue = DeferredQueue::new();
        for (i, &forced) in flags.iter().enumerate() {
            queue.schedule(TaskKind::FitView { forced }, i as u64, t0);
        }
        let tasks = queue.drain_all();
        prop_assert_eq!(tasks.len(), 1);
        prop_assert_eq!(
            tasks[0].kind,
            TaskKind::FitView { forced: flags.iter().any(|&f| f) }
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4-5. Session state after flush
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn flushed_session_is_settled_and_non_overlapping(
        workflows in workflows_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..25),
    ) {
        let mut session = FlowSession::default();
        session.load(&workflows).unwrap();
        session.flush();
        for op in &ops {
            apply(&mut session, op);
            let report = session.flush();
            prop_assert_eq!(report.layout_failures, 0);
            prop_assert!(!session.is_layout_pending());
            let violations = check_invariants(session.graph());
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", op, violations);
        }

        let snap = session.snapshot();
        let visible: Vec<_> = snap.visible_nodes().collect();
        for (i, a) in visible.iter().enumerate() {
            for b in &visible[i + 1..] {
                let dx = (a.position.x - b.position.x).abs();
                let dy = (a.position.y - b.position.y).abs();
                let overlap = dx + 1e-6 < (a.width + b.width) / 2.0
                    && dy + 1e-6 < (a.height + b.height) / 2.0;
                prop_assert!(!overlap, "{} overlaps {}", a.id, b.id);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Auto-fit off
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn viewport_fixed_without_auto_fit(
        workflows in workflows_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..25),
    ) {
        let config = FlowConfig {
            auto_fit: false,
            ..FlowConfig::default()
        };
        let mut session = FlowSession::new(config);
        session.load(&workflows).unwrap();
        let initial = session.viewport();
        let mut fits = session.flush().fits_run;
        for op in &ops {
            apply(&mut session, op);
            fits += session.flush().fits_run;
        }
        prop_assert_eq!(fits, 0);
        prop_assert_eq!(session.viewport(), initial);
    }
}
