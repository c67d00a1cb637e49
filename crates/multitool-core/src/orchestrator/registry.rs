//! Registry of runnable actions.
//!
//! The CLI builds one `ActionRegistry` at startup and hands it by reference to
//! every command and to the `Orchestrator`. Registration is expected to finish
//! before any run starts; runs only read from the registry.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{MultiToolError, Result};
use crate::privilege::{OsPrivilegeProbe, PrivilegeProbe};

use super::action::{ActionMetadata, Params};

pub struct ActionRegistry {
    actions: Vec<ActionMetadata>,
    index: HashMap<String, usize>,
    probe: Box<dyn PrivilegeProbe>,
}

impl ActionRegistry {
    /// Empty registry using the OS privilege check.
    pub fn new() -> Self {
        Self::with_probe(OsPrivilegeProbe)
    }

    pub fn with_probe(probe: impl PrivilegeProbe + 'static) -> Self {
        Self {
            actions: Vec::new(),
            index: HashMap::new(),
            probe: Box::new(probe),
        }
    }

    /// Insert or overwrite the action stored under `metadata.name`.
    ///
    /// The last registration wins silently. An overwritten action keeps the
    /// position of the first registration, which is the scheduler's final
    /// tie-break.
    pub fn register(&mut self, metadata: ActionMetadata) {
        match self.index.get(&metadata.name) {
            Some(&pos) => self.actions[pos] = metadata,
            None => {
                self.index.insert(metadata.name.clone(), self.actions.len());
                self.actions.push(metadata);
            }
        }
    }

    /// Like `register`, but refuses to overwrite an existing action.
    pub fn try_register(&mut self, metadata: ActionMetadata) -> Result<()> {
        if self.index.contains_key(&metadata.name) {
            return Err(MultiToolError::DuplicateAction(metadata.name));
        }
        self.register(metadata);
        Ok(())
    }

    /// Snapshot of every action in registration order.
    pub fn list_actions(&self) -> Vec<ActionMetadata> {
        self.actions.clone()
    }

    pub fn get(&self, name: &str) -> Option<&ActionMetadata> {
        self.index.get(name).map(|&pos| &self.actions[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registration position of `name`, used for deterministic ordering.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn is_elevated(&self) -> bool {
        self.probe.is_elevated()
    }

    /// Run a single action after the permission and dry-run checks.
    ///
    /// Handler errors are returned as `MultiToolError::Action` without any
    /// added context, so their message reaches the caller unchanged.
    pub fn run_action(
        &self,
        name: &str,
        dry_run: bool,
        params: &Params,
        check_admin: bool,
    ) -> Result<serde_json::Value> {
        let meta = self
            .get(name)
            .ok_or_else(|| MultiToolError::UnknownAction(name.to_string()))?;

        if meta.admin_only && check_admin && !self.probe.is_elevated() {
            return Err(MultiToolError::PermissionDenied(name.to_string()));
        }
        if dry_run && !meta.supports_dry_run {
            return Err(MultiToolError::DryRunUnsupported(name.to_string()));
        }

        debug!(action = name, dry_run, "invoking action");
        meta.invoke(dry_run, params).map_err(MultiToolError::Action)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::action::ParamSpec;
    use crate::privilege::FixedPrivilege;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn simple() -> ActionMetadata {
        ActionMetadata::new("test.simple", |dry_run, params: &Params| {
            if dry_run {
                return Ok(json!("dry"));
            }
            let name = params.get("name").cloned().unwrap_or_default();
            Ok(json!(format!("ok:{name}")))
        })
        .description("simple action")
        .supports_dry_run(true)
        .param("name", "target name")
    }

    fn admin() -> ActionMetadata {
        ActionMetadata::new("test.admin", |_, _| Ok(json!("admin-ok")))
            .description("needs admin")
            .admin_only(true)
            .supports_dry_run(true)
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn list_contains_registered() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(simple());
        let names: Vec<String> = reg.list_actions().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["test.simple"]);
    }

    #[test]
    fn list_is_a_snapshot() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(simple());

        let mut snapshot = reg.list_actions();
        snapshot[0].description = "mutated".into();
        snapshot.clear();

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("test.simple").unwrap().description, "simple action");
    }

    #[test]
    fn register_overwrites_silently_and_keeps_position() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(ActionMetadata::new("a", |_, _| Ok(json!(1))));
        reg.register(ActionMetadata::new("b", |_, _| Ok(json!(2))));
        reg.register(ActionMetadata::new("a", |_, _| Ok(json!(3))).description("second"));

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.position("a"), Some(0));
        assert_eq!(reg.get("a").unwrap().description, "second");
        assert_eq!(
            reg.run_action("a", false, &Params::new(), true).unwrap(),
            json!(3)
        );
    }

    #[test]
    fn try_register_rejects_duplicates() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.try_register(simple()).unwrap();
        let err = reg.try_register(simple()).unwrap_err();
        assert!(matches!(err, MultiToolError::DuplicateAction(n) if n == "test.simple"));
    }

    #[test]
    fn dry_run_reaches_handler() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(simple());
        let out = reg
            .run_action("test.simple", true, &params(&[("name", "x")]), true)
            .unwrap();
        assert_eq!(out, json!("dry"));
    }

    #[test]
    fn params_reach_handler() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(simple());
        let out = reg
            .run_action("test.simple", false, &params(&[("name", "bob")]), true)
            .unwrap();
        assert_eq!(out, json!("ok:bob"));
    }

    #[test]
    fn unknown_action_fails() {
        let reg = ActionRegistry::with_probe(FixedPrivilege(true));
        let err = reg
            .run_action("missing.action", false, &Params::new(), true)
            .unwrap_err();
        assert!(matches!(err, MultiToolError::UnknownAction(n) if n == "missing.action"));
    }

    #[test]
    fn admin_action_denied_without_privilege() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(admin());
        let err = reg
            .run_action("test.admin", false, &Params::new(), true)
            .unwrap_err();
        assert!(matches!(err, MultiToolError::PermissionDenied(_)));
    }

    #[test]
    fn admin_action_allowed_when_elevated() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(true));
        reg.register(admin());
        let out = reg
            .run_action("test.admin", false, &Params::new(), true)
            .unwrap();
        assert_eq!(out, json!("admin-ok"));
    }

    #[test]
    fn admin_check_can_be_skipped() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(admin());
        let out = reg
            .run_action("test.admin", false, &Params::new(), false)
            .unwrap();
        assert_eq!(out, json!("admin-ok"));
    }

    #[test]
    fn dry_run_unsupported_never_invokes_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(ActionMetadata::new("wet.only", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!(null))
        }));

        let err = reg
            .run_action("wet.only", true, &Params::new(), true)
            .unwrap_err();
        assert!(matches!(err, MultiToolError::DryRunUnsupported(n) if n == "wet.only"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_error_propagates_verbatim() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(ActionMetadata::new("explode", |_, _| anyhow::bail!("boom")));
        let err = reg
            .run_action("explode", false, &Params::new(), true)
            .unwrap_err();
        assert!(matches!(err, MultiToolError::Action(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn required_param_schema_is_visible() {
        let mut reg = ActionRegistry::with_probe(FixedPrivilege(false));
        reg.register(
            ActionMetadata::new("test.require_param", |_, p: &Params| {
                Ok(json!(p.get("username")))
            })
            .supports_dry_run(true)
            .param("username", ParamSpec::required("user name")),
        );
        let meta = reg.get("test.require_param").unwrap();
        assert!(meta.param_spec("username").unwrap().required);
    }
}
