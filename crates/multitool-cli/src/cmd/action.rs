use crate::output::{print_json, print_table, render_value};
use anyhow::Context;
use clap::Subcommand;
use multitool_core::{
    config::Settings,
    orchestrator::{ActionMetadata, ActionRegistry, Orchestrator, ParamSpec, ResultMap, RunOptions},
    params::{parse_param_pairs, resolve_params, Prompter},
    MultiToolError,
};
use std::io::{BufRead, Write};
use std::time::Duration;

#[derive(Subcommand)]
pub enum ActionSubcommand {
    /// List registered actions and their parameters
    List,

    /// Show the order actions would run in, without running them
    Plan {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Run an action after everything it depends on
    Run {
        name: String,
        /// Simulate without side effects (fails for actions that cannot)
        #[arg(long)]
        dry_run: bool,
        /// Action parameter as key=value (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Fail instead of prompting for missing required parameters
        #[arg(long)]
        non_interactive: bool,
        /// Skip the admin privilege check (testing/CI only)
        #[arg(long)]
        as_admin: bool,
        /// Seconds to wait for another run to release the lock
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

pub fn run(
    registry: &ActionRegistry,
    settings: &Settings,
    subcmd: ActionSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ActionSubcommand::List => list(registry, json),
        ActionSubcommand::Plan { names } => plan(registry, settings, &names, json),
        ActionSubcommand::Run {
            name,
            dry_run,
            params,
            non_interactive,
            as_admin,
            timeout,
        } => {
            let options = RunOptions {
                dry_run,
                timeout: timeout
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| settings.lock_timeout()),
                check_admin: !as_admin,
            };
            run_action(registry, settings, &name, &params, non_interactive, &options, json)
        }
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

fn list(registry: &ActionRegistry, json: bool) -> anyhow::Result<()> {
    let actions = registry.list_actions();

    if json {
        let summaries: Vec<_> = actions.iter().map(ActionMetadata::summary).collect();
        return print_json(&summaries);
    }

    if actions.is_empty() {
        println!("No actions registered.");
        return Ok(());
    }

    for action in &actions {
        println!("{}: {}{}", action.name, action.description, tags(action));
        for (name, spec) in &action.params {
            let required = if spec.required { " (required)" } else { "" };
            println!("    {name}{required}: {}", spec.description);
        }
    }
    Ok(())
}

fn tags(action: &ActionMetadata) -> String {
    let mut tags = Vec::new();
    if action.admin_only {
        tags.push("admin".to_string());
    }
    if action.supports_dry_run {
        tags.push("dry-run".to_string());
    }
    if !action.depends.is_empty() {
        tags.push(format!("after: {}", action.depends.join(", ")));
    }
    if action.priority != 0 {
        tags.push(format!("priority {}", action.priority));
    }
    if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join("; "))
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

fn plan(
    registry: &ActionRegistry,
    settings: &Settings,
    names: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let plan = Orchestrator::from_settings(registry, settings)
        .plan(names)
        .context("cannot build execution plan")?;

    if json {
        return print_json(&plan);
    }
    for (i, name) in plan.order.iter().enumerate() {
        println!("{}. {name}", i + 1);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn run_action(
    registry: &ActionRegistry,
    settings: &Settings,
    name: &str,
    raw_params: &[String],
    non_interactive: bool,
    options: &RunOptions,
    json: bool,
) -> anyhow::Result<()> {
    let action = registry
        .get(name)
        .ok_or_else(|| MultiToolError::UnknownAction(name.to_string()))?;

    let supplied = parse_param_pairs(raw_params)?;
    let params = if non_interactive {
        resolve_params(action, supplied, None)?
    } else {
        let mut prompter = StdinPrompter;
        resolve_params(action, supplied, Some(&mut prompter))?
    };

    let results = Orchestrator::from_settings(registry, settings)
        .run_actions(&[name], &params, options)
        .with_context(|| format!("cannot run action '{name}'"))?;

    print_results(&results, json)?;

    if let Some((failed, error)) = results.first_failure() {
        anyhow::bail!("action '{failed}' failed: {error}");
    }
    Ok(())
}

fn print_results(results: &ResultMap, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(results);
    }
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|(name, outcome)| {
            let (status, detail) = if outcome.ok {
                ("ok", outcome.result.as_ref().map(render_value).unwrap_or_default())
            } else {
                ("failed", outcome.error.clone().unwrap_or_default())
            };
            vec![
                name.to_string(),
                status.to_string(),
                format!("{}ms", outcome.elapsed_ms),
                detail,
            ]
        })
        .collect();
    print_table(&["ACTION", "STATUS", "TIME", "DETAIL"], &rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// Prompting
// ---------------------------------------------------------------------------

/// Reads missing parameters from stdin. Prompts go to stderr so `--json`
/// output on stdout stays parseable.
struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&mut self, name: &str, spec: &ParamSpec) -> Option<String> {
        eprint!("Enter value for '{name}' ({}): ", spec.description);
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}
