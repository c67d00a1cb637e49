//! Execution planning: dependency closure plus a priority-aware topological
//! order over the registry.
//!
//! Edges point from a dependency to its dependents. Among actions whose
//! dependencies are all scheduled, the highest `priority` goes first and
//! equal priorities fall back to registration order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{MultiToolError, Result};

use super::registry::ActionRegistry;

/// Ordered list of actions one invocation will run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub order: Vec<String>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|n| n == name)
    }
}

/// How to treat `depends` entries that name unregistered actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingDependencyPolicy {
    /// Drop them from the plan.
    #[default]
    Ignore,
    /// Fail with `MissingDependency`.
    Reject,
}

/// Build the plan for `names`.
///
/// Every requested name must be registered. Transitive dependencies are
/// collected with a visited set so cyclic `depends` graphs terminate; a cycle
/// inside the closure is reported as `CyclicDependency`.
pub fn build_plan<S: AsRef<str>>(
    registry: &ActionRegistry,
    names: &[S],
    policy: MissingDependencyPolicy,
) -> Result<ExecutionPlan> {
    for name in names {
        let name = name.as_ref();
        if !registry.contains(name) {
            return Err(MultiToolError::UnknownAction(name.to_string()));
        }
    }

    let nodes = dependency_closure(registry, names, policy)?;
    let order = topo_order(registry, &nodes)?;
    debug!(?order, "execution plan built");
    Ok(ExecutionPlan { order })
}

/// Requested names plus every registered action reachable through `depends`.
///
/// Returned in discovery order.
pub fn dependency_closure<S: AsRef<str>>(
    registry: &ActionRegistry,
    names: &[S],
    policy: MissingDependencyPolicy,
) -> Result<Vec<String>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut closure: Vec<String> = Vec::new();
    let mut stack: Vec<String> = names.iter().rev().map(|n| n.as_ref().to_string()).collect();

    while let Some(name) = stack.pop() {
        if seen.contains(&name) {
            continue;
        }
        let Some(meta) = registry.get(&name) else {
            continue;
        };
        seen.insert(name.clone());
        closure.push(name);

        for dep in meta.depends.iter().rev() {
            if registry.contains(dep) {
                stack.push(dep.clone());
                continue;
            }
            match policy {
                MissingDependencyPolicy::Ignore => {
                    debug!(action = %meta.name, dependency = %dep, "dropping unregistered dependency");
                }
                MissingDependencyPolicy::Reject => {
                    return Err(MultiToolError::MissingDependency {
                        action: meta.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
    }

    Ok(closure)
}

/// Kahn's algorithm restricted to `nodes`.
pub fn topo_order(registry: &ActionRegistry, nodes: &[String]) -> Result<Vec<String>> {
    let in_set: HashSet<&str> = nodes.iter().map(String::as_str).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indegree: HashMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();

    for node in nodes {
        let Some(meta) = registry.get(node) else {
            continue;
        };
        for dep in &meta.depends {
            if let Some(&dep) = in_set.get(dep.as_str()) {
                dependents.entry(dep).or_default().push(node.as_str());
                *indegree.entry(node.as_str()).or_default() += 1;
            }
        }
    }

    let rank = |name: &str| {
        let priority = registry.get(name).map(|m| m.priority).unwrap_or(0);
        let position = registry.position(name).unwrap_or(usize::MAX);
        (priority, Reverse(position))
    };

    let mut ready: BinaryHeap<((i32, Reverse<usize>), &str)> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(&n, _)| (rank(n), n))
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(nodes.len());
    while let Some((_, name)) = ready.pop() {
        order.push(name.to_string());
        for &next in dependents.get(name).map(Vec::as_slice).unwrap_or_default() {
            if let Some(deg) = indegree.get_mut(next) {
                *deg -= 1;
                if *deg == 0 {
                    ready.push((rank(next), next));
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let scheduled: HashSet<&str> = order.iter().map(String::as_str).collect();
        let stuck: Vec<String> = nodes
            .iter()
            .filter(|n| !scheduled.contains(n.as_str()))
            .cloned()
            .collect();
        return Err(MultiToolError::CyclicDependency(stuck));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::action::ActionMetadata;
    use crate::privilege::FixedPrivilege;
    use serde_json::json;

    fn action(name: &str, priority: i32, deps: &[&str]) -> ActionMetadata {
        ActionMetadata::new(name, |_, _| Ok(json!(null)))
            .priority(priority)
            .depends_on(deps.iter().copied())
    }

    fn registry(actions: Vec<ActionMetadata>) -> ActionRegistry {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        for a in actions {
            reg.register(a);
        }
        reg
    }

    fn plan(reg: &ActionRegistry, names: &[&str]) -> Vec<String> {
        build_plan(reg, names, MissingDependencyPolicy::Ignore)
            .unwrap()
            .order
    }

    fn index(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn dependency_runs_first() {
        let reg = registry(vec![action("A", 1, &[]), action("B", 0, &["A"])]);
        assert_eq!(plan(&reg, &["B"]), vec!["A", "B"]);
    }

    #[test]
    fn dependency_beats_priority() {
        let reg = registry(vec![action("low", -5, &[]), action("high", 100, &["low"])]);
        assert_eq!(plan(&reg, &["high"]), vec!["low", "high"]);
    }

    #[test]
    fn higher_priority_wins_among_ready() {
        let reg = registry(vec![
            action("a", 0, &[]),
            action("b", 5, &[]),
            action("c", 2, &[]),
        ]);
        assert_eq!(plan(&reg, &["a", "b", "c"]), vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_priority_follows_registration_order() {
        let reg = registry(vec![
            action("z", 0, &[]),
            action("y", 0, &[]),
            action("x", 0, &[]),
        ]);
        assert_eq!(plan(&reg, &["x", "y", "z"]), vec!["z", "y", "x"]);
    }

    #[test]
    fn newly_ready_node_competes_on_priority() {
        // base unlocks `urgent`, which must then beat the already-ready `idle`.
        let reg = registry(vec![
            action("base", 10, &[]),
            action("idle", 1, &[]),
            action("urgent", 5, &["base"]),
        ]);
        assert_eq!(plan(&reg, &["idle", "urgent"]), vec!["base", "urgent", "idle"]);
    }

    #[test]
    fn diamond_respects_every_edge() {
        let reg = registry(vec![
            action("root", 0, &[]),
            action("left", 1, &["root"]),
            action("right", 3, &["root"]),
            action("join", 9, &["left", "right"]),
        ]);
        let order = plan(&reg, &["join"]);
        assert_eq!(order, vec!["root", "right", "left", "join"]);
    }

    #[test]
    fn every_action_follows_its_dependencies() {
        let reg = registry(vec![
            action("fetch", 0, &[]),
            action("configure", 7, &["fetch"]),
            action("compile", 2, &["configure"]),
            action("lint", 9, &["fetch"]),
            action("test", 4, &["compile", "lint"]),
            action("package", 1, &["compile"]),
            action("publish", 0, &["package", "test"]),
        ]);
        let order = plan(&reg, &["publish"]);
        assert_eq!(order.len(), 7);
        for meta in reg.list_actions() {
            for dep in &meta.depends {
                assert!(
                    index(&order, dep) < index(&order, &meta.name),
                    "{dep} must run before {}",
                    meta.name
                );
            }
        }
    }

    #[test]
    fn closure_excludes_unrequested_actions() {
        let reg = registry(vec![
            action("A", 0, &[]),
            action("B", 0, &["A"]),
            action("unrelated", 50, &[]),
        ]);
        let order = plan(&reg, &["B"]);
        assert!(!order.contains(&"unrelated".to_string()));
    }

    #[test]
    fn unregistered_dependency_is_dropped_by_default() {
        // Deliberate tolerance for partially registered environments.
        let reg = registry(vec![action("B", 0, &["ghost", "A"]), action("A", 0, &[])]);
        assert_eq!(plan(&reg, &["B"]), vec!["A", "B"]);
    }

    #[test]
    fn unregistered_dependency_rejected_in_strict_mode() {
        let reg = registry(vec![action("B", 0, &["ghost"])]);
        let err = build_plan(&reg, &["B"], MissingDependencyPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            MultiToolError::MissingDependency { action, dependency }
                if action == "B" && dependency == "ghost"
        ));
    }

    #[test]
    fn unknown_requested_action_fails() {
        let reg = registry(vec![action("A", 0, &[])]);
        let err = build_plan(&reg, &["A", "nope"], MissingDependencyPolicy::Ignore).unwrap_err();
        assert!(matches!(err, MultiToolError::UnknownAction(n) if n == "nope"));
    }

    #[test]
    fn duplicate_requests_are_planned_once() {
        let reg = registry(vec![action("A", 0, &[]), action("B", 0, &["A"])]);
        assert_eq!(plan(&reg, &["B", "A", "B"]), vec!["A", "B"]);
    }

    #[test]
    fn closure_terminates_on_cycles() {
        let reg = registry(vec![action("a", 0, &["b"]), action("b", 0, &["a"])]);
        let mut closure =
            dependency_closure(&reg, &["a"], MissingDependencyPolicy::Ignore).unwrap();
        closure.sort();
        assert_eq!(closure, vec!["a", "b"]);
    }

    #[test]
    fn cycle_is_reported() {
        let reg = registry(vec![
            action("ok", 0, &[]),
            action("a", 0, &["b", "ok"]),
            action("b", 0, &["a"]),
        ]);
        let err = build_plan(&reg, &["a"], MissingDependencyPolicy::Ignore).unwrap_err();
        match err {
            MultiToolError::CyclicDependency(mut stuck) => {
                stuck.sort();
                assert_eq!(stuck, vec!["a", "b"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let reg = registry(vec![action("loop", 0, &["loop"])]);
        let err = build_plan(&reg, &["loop"], MissingDependencyPolicy::Ignore).unwrap_err();
        assert!(matches!(err, MultiToolError::CyclicDependency(_)));
    }

    #[test]
    fn empty_request_is_empty_plan() {
        let reg = registry(vec![action("A", 0, &[])]);
        let empty: [&str; 0] = [];
        assert!(build_plan(&reg, &empty, MissingDependencyPolicy::Ignore)
            .unwrap()
            .is_empty());
    }
}
