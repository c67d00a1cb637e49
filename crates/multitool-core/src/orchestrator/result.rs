//! Per-run results, in execution order.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Outcome of one executed action.
///
/// Serializes as `{"ok": true, "result": ...}` or `{"ok": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ActionOutcome {
    pub fn succeeded(result: serde_json::Value, elapsed_ms: u64) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }
}

/// Results keyed by action name. Stops growing at the first failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMap {
    entries: Vec<(String, ActionOutcome)>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, name: impl Into<String>, outcome: ActionOutcome) {
        self.entries.push((name.into(), outcome));
    }

    pub fn get(&self, name: &str) -> Option<&ActionOutcome> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Executed action names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionOutcome)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all_ok(&self) -> bool {
        self.entries.iter().all(|(_, o)| o.ok)
    }

    /// The action that halted the run, with its error message.
    pub fn first_failure(&self) -> Option<(&str, &str)> {
        self.entries.iter().find_map(|(n, o)| {
            if o.ok {
                None
            } else {
                Some((n.as_str(), o.error.as_deref().unwrap_or_default()))
            }
        })
    }
}

impl Serialize for ResultMap {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.entries.len()))?;
        for (name, outcome) in &self.entries {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}
