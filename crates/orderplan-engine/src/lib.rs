//! # Orderplan Engine
//!
//! Deterministic execution of fulfillment plans.
//!
//! - [`Executor`] - step-by-step state machine for one plan and one context
//! - [`replay`] - the same plan against many contexts, concurrently
//! - [`ReplayReport`] - per-context outcomes and where they diverge

pub mod config;
pub mod executor;
pub mod replay;

pub use config::ExecutorConfig;
pub use executor::{Executor, RunOutcome};
pub use replay::{replay, replay_presets, ContextRun, Divergence, ReplayReport};
