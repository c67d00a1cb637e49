//! Action metadata: the unit the registry stores and the orchestrator runs.
//!
//! An `ActionMetadata` pairs a handler (what to run) with the declarations the
//! scheduler and the CLI rely on: dependencies, priority, admin requirement,
//! dry-run support and the parameter schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// User-supplied parameters, keyed by parameter name.
pub type Params = BTreeMap<String, String>;

/// Signature every action handler implements: `f(dry_run, params)`.
pub type Handler = Arc<dyn Fn(bool, &Params) -> anyhow::Result<serde_json::Value> + Send + Sync>;

// ---------------------------------------------------------------------------
// ParamSpec
// ---------------------------------------------------------------------------

/// Declaration of a single parameter in an action's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    pub fn required(description: impl Into<String>) -> Self {
        Self {
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(description: impl Into<String>) -> Self {
        Self {
            required: false,
            description: description.into(),
        }
    }
}

/// A bare description declares an optional parameter.
impl From<&str> for ParamSpec {
    fn from(description: &str) -> Self {
        Self::optional(description)
    }
}

impl From<String> for ParamSpec {
    fn from(description: String) -> Self {
        Self::optional(description)
    }
}

// ---------------------------------------------------------------------------
// ActionMetadata
// ---------------------------------------------------------------------------

/// A registered action. Cloning is cheap: the handler is reference-counted.
#[derive(Clone)]
pub struct ActionMetadata {
    pub name: String,
    handler: Handler,
    pub description: String,
    pub admin_only: bool,
    pub supports_dry_run: bool,
    /// Parameter schema in declaration order.
    pub params: Vec<(String, ParamSpec)>,
    /// Actions that must run before this one.
    pub depends: Vec<String>,
    /// Higher runs first among actions that are ready at the same time.
    pub priority: i32,
}

impl ActionMetadata {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(bool, &Params) -> anyhow::Result<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            description: String::new(),
            admin_only: false,
            supports_dry_run: false,
            params: Vec::new(),
            depends: Vec::new(),
            priority: 0,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn admin_only(mut self, admin_only: bool) -> Self {
        self.admin_only = admin_only;
        self
    }

    pub fn supports_dry_run(mut self, supports: bool) -> Self {
        self.supports_dry_run = supports;
        self
    }

    /// Declare a parameter. Redeclaring a name replaces the earlier spec.
    pub fn param(mut self, name: impl Into<String>, spec: impl Into<ParamSpec>) -> Self {
        let name = name.into();
        let spec = spec.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = spec,
            None => self.params.push((name, spec)),
        }
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Call the handler directly, bypassing every registry check.
    pub fn invoke(&self, dry_run: bool, params: &Params) -> anyhow::Result<serde_json::Value> {
        (self.handler)(dry_run, params)
    }

    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    pub fn required_params(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.params
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(n, spec)| (n.as_str(), spec))
    }

    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            admin_only: self.admin_only,
            supports_dry_run: self.supports_dry_run,
            params: self
                .params
                .iter()
                .map(|(name, spec)| ParamSummary {
                    name: name.clone(),
                    required: spec.required,
                    description: spec.description.clone(),
                })
                .collect(),
            depends: self.depends.clone(),
            priority: self.priority,
        }
    }
}

impl fmt::Debug for ActionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionMetadata")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("admin_only", &self.admin_only)
            .field("supports_dry_run", &self.supports_dry_run)
            .field("params", &self.params)
            .field("depends", &self.depends)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ActionSummary
// ---------------------------------------------------------------------------

/// Serializable view of an action, without its handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSummary {
    pub name: String,
    pub description: String,
    pub admin_only: bool,
    pub supports_dry_run: bool,
    pub params: Vec<ParamSummary>,
    pub depends: Vec<String>,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSummary {
    pub name: String,
    pub required: bool,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_defaults() {
        let meta = ActionMetadata::new("noop", |_, _| Ok(json!(null)));
        assert_eq!(meta.name, "noop");
        assert!(!meta.admin_only);
        assert!(!meta.supports_dry_run);
        assert!(meta.params.is_empty());
        assert!(meta.depends.is_empty());
        assert_eq!(meta.priority, 0);
    }

    #[test]
    fn bare_description_is_optional_param() {
        let meta = ActionMetadata::new("simple", |_, _| Ok(json!(null)))
            .param("name", "target name")
            .param("user", ParamSpec::required("user name"));

        assert_eq!(
            meta.param_spec("name"),
            Some(&ParamSpec::optional("target name"))
        );
        let required: Vec<&str> = meta.required_params().map(|(n, _)| n).collect();
        assert_eq!(required, vec!["user"]);
    }

    #[test]
    fn redeclared_param_replaces_spec_in_place() {
        let meta = ActionMetadata::new("p", |_, _| Ok(json!(null)))
            .param("a", "first")
            .param("b", "second")
            .param("a", ParamSpec::required("again"));

        let names: Vec<&str> = meta.params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(meta.param_spec("a").unwrap().required);
    }

    #[test]
    fn invoke_passes_dry_run_and_params() {
        let meta = ActionMetadata::new("echo", |dry_run, params: &Params| {
            Ok(json!({ "dry_run": dry_run, "name": params.get("name") }))
        });
        let mut params = Params::new();
        params.insert("name".into(), "bob".into());

        let out = meta.invoke(true, &params).unwrap();
        assert_eq!(out, json!({ "dry_run": true, "name": "bob" }));
    }

    #[test]
    fn summary_serializes_schema() {
        let meta = ActionMetadata::new("deploy", |_, _| Ok(json!(null)))
            .description("ship it")
            .admin_only(true)
            .param("env", ParamSpec::required("target env"))
            .depends_on(["build"])
            .priority(3);

        let value = serde_json::to_value(meta.summary()).unwrap();
        assert_eq!(value["name"], "deploy");
        assert_eq!(value["admin_only"], true);
        assert_eq!(value["params"][0]["name"], "env");
        assert_eq!(value["params"][0]["required"], true);
        assert_eq!(value["depends"], json!(["build"]));
        assert_eq!(value["priority"], 3);
    }
}
