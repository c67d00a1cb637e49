//! Binding user input to an action's parameter schema.

use tracing::debug;

use crate::error::{MultiToolError, Result};
use crate::orchestrator::action::{ActionMetadata, ParamSpec, Params};

/// Source of values for required parameters the user did not pass.
pub trait Prompter {
    /// Ask for `name`. `None` means input ended before a value was given.
    fn prompt(&mut self, name: &str, spec: &ParamSpec) -> Option<String>;
}

/// Parse repeated `key=value` arguments. Splits at the first `=`, so values
/// may contain `=`; later duplicates win.
pub fn parse_param_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Params> {
    let mut params = Params::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, value)) = pair.split_once('=') else {
            return Err(MultiToolError::InvalidParam(pair.to_string()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(MultiToolError::InvalidParam(pair.to_string()));
        }
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

/// Fill in required parameters missing from `supplied`.
///
/// With no prompter (non-interactive mode) the first missing required
/// parameter is an error. With a prompter, each missing one is asked for in
/// schema order, and end-of-input is an error. Parameters outside the schema
/// are passed through untouched.
pub fn resolve_params(
    action: &ActionMetadata,
    supplied: Params,
    mut prompter: Option<&mut dyn Prompter>,
) -> Result<Params> {
    let mut params = supplied;
    for (name, spec) in action.required_params() {
        if params.contains_key(name) {
            continue;
        }
        let missing = || MultiToolError::MissingParameter {
            action: action.name.clone(),
            param: name.to_string(),
        };
        let Some(input) = prompter.as_deref_mut() else {
            return Err(missing());
        };
        let value = input.prompt(name, spec).ok_or_else(missing)?;
        debug!(action = %action.name, param = name, "parameter supplied interactively");
        params.insert(name.to_string(), value);
    }
    Ok(params)
}
