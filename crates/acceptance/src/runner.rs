//! Scenario runner: executes scenarios one at a time, each with a fresh context

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::HarnessConfig;
use crate::context::ScenarioContext;
use crate::error::{HarnessError, HarnessResult};
use crate::outcome::{ScenarioPhase, StepOutcome};
use crate::probe::ProbeClient;
use crate::schema::SchemaRegistry;
use crate::spec::{Keyword, ScenarioSpec};
use crate::steps::Steps;

/// Result of running a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub keyword: Keyword,
    pub text: String,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub phase: ScenarioPhase,
    pub duration_ms: u64,
    pub steps: Vec<StepReport>,
    /// Skip or failure reason
    pub reason: Option<String>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.phase == ScenarioPhase::Completed
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Main acceptance runner
pub struct TestRunner {
    config: HarnessConfig,
    probe: ProbeClient,
    schemas: SchemaRegistry,
}

impl TestRunner {
    /// Create a runner with configuration from defaults and the environment
    pub fn new() -> HarnessResult<Self> {
        Self::with_config(HarnessConfig::load(None)?)
    }

    pub fn with_config(config: HarnessConfig) -> HarnessResult<Self> {
        let probe = ProbeClient::new(config.endpoints.clone(), config.request_timeout())?;
        let schemas = SchemaRegistry::builtin()?;
        Ok(Self {
            config,
            probe,
            schemas,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run all scenarios in the scenarios directory
    pub async fn run_all(&self) -> HarnessResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.config.scenarios_dir)?;
        Ok(self.run_specs(&specs).await)
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&self, tag: &str) -> HarnessResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.config.scenarios_dir)?;
        let filtered: Vec<ScenarioSpec> = specs.into_iter().filter(|s| s.has_tag(tag)).collect();
        Ok(self.run_specs(&filtered).await)
    }

    /// Run a specific scenario by name
    pub async fn run_test(&self, name: &str) -> HarnessResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.config.scenarios_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| HarnessError::SpecParse(format!("Scenario not found: {}", name)))?;

        Ok(self.run_specs(std::slice::from_ref(&spec)).await)
    }

    /// Run a list of scenarios sequentially
    pub async fn run_specs(&self, specs: &[ScenarioSpec]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);

        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            let result = self.run_spec(spec).await;
            let reason = result.reason.as_deref().unwrap_or("unknown reason");
            match result.phase {
                ScenarioPhase::Completed => {
                    passed += 1;
                    info!("✓ {} ({} ms)", result.name, result.duration_ms);
                }
                ScenarioPhase::Skipped => {
                    skipped += 1;
                    warn!("- {} skipped: {}", result.name, reason);
                }
                _ => {
                    failed += 1;
                    error!("✗ {} - {}", result.name, reason);
                }
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Scenario results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        SuiteResult {
            started_at,
            total: specs.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Run a single scenario against a fresh context
    pub async fn run_spec(&self, spec: &ScenarioSpec) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let steps = Steps::new(&self.probe, &self.schemas, &self.config);
        let mut ctx = ScenarioContext::new();
        let mut phase = ScenarioPhase::NotStarted;
        let mut reports = Vec::with_capacity(spec.steps.len());
        let mut reason = None;

        for step in &spec.steps {
            let step_start = Instant::now();
            let outcome = StepOutcome::from(steps.execute(&step.action, &mut ctx).await);
            debug!("{} -> {:?}", step, outcome);

            phase = phase.advance(step.keyword, &outcome);
            if let StepOutcome::Skipped(r) | StepOutcome::Failed(r) = &outcome {
                reason = Some(format!("{step}: {r}"));
            }
            reports.push(StepReport {
                keyword: step.keyword,
                text: step.action.describe(),
                outcome,
                duration_ms: step_start.elapsed().as_millis() as u64,
            });

            if phase.is_terminal() {
                break; // Stop on first skip or failure
            }
        }

        ScenarioResult {
            name: spec.name.clone(),
            phase: phase.finish(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps: reports,
            reason,
        }
    }

    /// Write results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
