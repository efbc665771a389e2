//! Platform Acceptance Test Harness
//!
//! Black-box acceptance tests for the deployed platform services. The harness:
//! - Generates isolated test users per scenario
//! - Probes each service over HTTP, treating unreachable services as skips
//! - Logs in and caches bearer tokens for the rest of a scenario
//! - Asserts on status codes, JSON Schemas and health payload shapes
//! - Runs declarative YAML scenarios one at a time, each with a fresh context
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Acceptance Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── run_spec(spec) -> ScenarioResult                     │
//! │    │     ├── ScenarioContext::new()   (fresh per scenario)  │
//! │    │     └── Steps::execute(action, &mut ctx) -> StepResult │
//! │    │            ├── ProbeClient      (HTTP, Unreachable)    │
//! │    │            ├── SessionManager   (login, tokens)        │
//! │    │            └── assertions       (status/schema/health) │
//! │    └── write_results(suite) -> test-results.json            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioSpec (YAML)                                        │
//! │    ├── name, description, tags                              │
//! │    └── steps: [{ keyword: given|when|then|and|but,          │
//! │                  action: <step>, ...params }]               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod config;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod health;
pub mod outcome;
pub mod probe;
pub mod runner;
pub mod schema;
pub mod session;
pub mod spec;
pub mod steps;

pub use config::HarnessConfig;
pub use context::ScenarioContext;
pub use error::{HarnessError, HarnessResult, StepError};
pub use outcome::{ScenarioPhase, StepOutcome};
pub use probe::{ProbeClient, ProbeError, ProbeResponse};
pub use runner::TestRunner;
pub use spec::{ScenarioSpec, StepAction};
