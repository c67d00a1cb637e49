//! Actions that ship with the `multitool` binary.
//!
//! `registry()` is the composition root: `main` calls it once and passes the
//! result by reference to every command.

use anyhow::bail;
use multitool_core::orchestrator::{ActionMetadata, ActionRegistry, ParamSpec, Params};
use multitool_core::privilege::{OsPrivilegeProbe, PrivilegeProbe};
use serde_json::{json, Value};

const REQUIRED_TOOLS: &[&str] = &["git"];
const OPTIONAL_TOOLS: &[&str] = &["docker", "node"];

pub fn registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    register_builtins(&mut registry);
    registry
}

pub fn register_builtins(registry: &mut ActionRegistry) {
    registry.register(
        ActionMetadata::new("hello", hello)
            .description("Print a greeting")
            .supports_dry_run(true),
    );
    registry.register(
        ActionMetadata::new("greet", greet)
            .description("Greet a user by name")
            .supports_dry_run(true)
            .param("username", ParamSpec::required("Name to greet"))
            .param("greeting", "Greeting word (default: Hello)")
            .depends_on(["hello"]),
    );
    registry.register(
        ActionMetadata::new("env.check", env_check)
            .description("Check that developer tools are on PATH")
            .supports_dry_run(true)
            .param("require", "Extra required tools, comma-separated")
            .priority(10),
    );
    registry.register(
        ActionMetadata::new("admin.ping", admin_ping)
            .description("Confirm privileged actions can run on this host")
            .admin_only(true),
    );
}

fn hello(dry_run: bool, _params: &Params) -> anyhow::Result<Value> {
    if dry_run {
        return Ok(json!("[dry-run] hello"));
    }
    Ok(json!("hello from multitool"))
}

fn greet(dry_run: bool, params: &Params) -> anyhow::Result<Value> {
    let Some(username) = params.get("username").filter(|u| !u.trim().is_empty()) else {
        bail!("username must not be empty");
    };
    let greeting = params
        .get("greeting")
        .map(String::as_str)
        .unwrap_or("Hello");
    let message = format!("{greeting}, {}!", username.trim());
    if dry_run {
        return Ok(json!(format!("[dry-run] {message}")));
    }
    Ok(json!(message))
}

fn required_tools(params: &Params) -> Vec<String> {
    let extra = params
        .get("require")
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    REQUIRED_TOOLS
        .iter()
        .map(|t| t.to_string())
        .chain(extra)
        .collect()
}

fn env_check(dry_run: bool, params: &Params) -> anyhow::Result<Value> {
    let required = required_tools(params);
    if dry_run {
        return Ok(json!({ "would_check": { "required": required, "optional": OPTIONAL_TOOLS } }));
    }

    let mut found = serde_json::Map::new();
    let mut missing = Vec::new();
    for tool in &required {
        match which::which(tool) {
            Ok(path) => {
                found.insert(tool.clone(), json!(path.display().to_string()));
            }
            Err(_) => missing.push(tool.clone()),
        }
    }
    let mut optional_missing = Vec::new();
    for tool in OPTIONAL_TOOLS {
        match which::which(tool) {
            Ok(path) => {
                found.insert(tool.to_string(), json!(path.display().to_string()));
            }
            Err(_) => {
                tracing::info!(tool, "optional tool not found");
                optional_missing.push(*tool);
            }
        }
    }

    if !missing.is_empty() {
        bail!("missing required tools: {}", missing.join(", "));
    }
    Ok(json!({ "found": found, "optional_missing": optional_missing }))
}

fn admin_ping(_dry_run: bool, _params: &Params) -> anyhow::Result<Value> {
    Ok(json!({
        "elevated": OsPrivilegeProbe.is_elevated(),
        "pid": std::process::id(),
    }))
}
