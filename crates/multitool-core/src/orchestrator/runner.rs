//! Guarded, ordered execution of a plan.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{MultiToolError, Result};
use crate::lock::FileLock;
use crate::paths;

use super::action::Params;
use super::plan::{build_plan, ExecutionPlan, MissingDependencyPolicy};
use super::registry::ActionRegistry;
use super::result::{ActionOutcome, ResultMap};

/// Per-invocation switches for `Orchestrator::run_actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Upper bound on waiting for the host-wide lock.
    pub timeout: Duration,
    /// When false, admin-only actions run without the privilege probe.
    pub check_admin: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            timeout: Duration::from_secs(30),
            check_admin: true,
        }
    }
}

/// Runs registered actions in dependency order under a single lock.
///
/// Every `Orchestrator` pointed at the same lock path, in any process,
/// serializes with every other one.
pub struct Orchestrator<'a> {
    registry: &'a ActionRegistry,
    lock_path: PathBuf,
    throttle: Duration,
    missing_dependencies: MissingDependencyPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a ActionRegistry, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            lock_path: lock_path.into(),
            throttle: Duration::from_millis(20),
            missing_dependencies: MissingDependencyPolicy::Ignore,
        }
    }

    /// Orchestrator using the shared lock in the system temp directory.
    pub fn with_default_lock(registry: &'a ActionRegistry) -> Self {
        Self::new(registry, paths::default_lock_path())
    }

    pub fn from_settings(registry: &'a ActionRegistry, settings: &Settings) -> Self {
        Self::new(registry, settings.lock_path())
            .throttle(settings.throttle())
            .strict_dependencies(settings.strict_dependencies)
    }

    /// Pause between consecutive actions.
    pub fn throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Fail planning on `depends` entries that are not registered.
    pub fn strict_dependencies(mut self, strict: bool) -> Self {
        self.missing_dependencies = if strict {
            MissingDependencyPolicy::Reject
        } else {
            MissingDependencyPolicy::Ignore
        };
        self
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn plan<S: AsRef<str>>(&self, names: &[S]) -> Result<ExecutionPlan> {
        build_plan(self.registry, names, self.missing_dependencies)
    }

    /// Plan, lock, then run each action in order until one fails.
    ///
    /// Planning and lock errors are returned as `Err` before anything runs.
    /// Action failures are recorded in the `ResultMap` and end the run; the
    /// actions that already succeeded are not undone.
    pub fn run_actions<S: AsRef<str>>(
        &self,
        names: &[S],
        params: &Params,
        options: &RunOptions,
    ) -> Result<ResultMap> {
        let plan = self.plan(names)?;
        let mut results = ResultMap::new();
        if plan.is_empty() {
            return Ok(results);
        }

        let mut lock = FileLock::new(&self.lock_path);
        lock.acquire(options.timeout)?;

        for (i, name) in plan.order.iter().enumerate() {
            if i > 0 && !self.throttle.is_zero() {
                thread::sleep(self.throttle);
            }

            let supports_dry_run = self
                .registry
                .get(name)
                .map(|m| m.supports_dry_run)
                .unwrap_or(false);
            if options.dry_run && !supports_dry_run {
                let err = MultiToolError::DryRunUnsupported(name.clone());
                warn!(action = %name, "{err}");
                results.record(name.as_str(), ActionOutcome::failed(err.to_string(), 0));
                break;
            }

            info!(action = %name, dry_run = options.dry_run, "running action");
            let started = Instant::now();
            let outcome =
                self.registry
                    .run_action(name, options.dry_run, params, options.check_admin);
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(value) => {
                    results.record(name.as_str(), ActionOutcome::succeeded(value, elapsed_ms));
                }
                Err(err) => {
                    warn!(action = %name, error = %err, "action failed, halting run");
                    results.record(name.as_str(), ActionOutcome::failed(err.to_string(), elapsed_ms));
                    break;
                }
            }
        }

        lock.release();
        Ok(results)
    }
}
