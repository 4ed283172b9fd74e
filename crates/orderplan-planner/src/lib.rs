//! # Orderplan Planner
//!
//! Where plans come from. Generation itself happens outside the engine;
//! this crate defines the boundary a generator plugs into, renders the
//! planner prompt and checks plans before they are executed.

pub mod check;
pub mod planner;
pub mod scenario;

pub use check::{check_plan, PlanCheck, PlanIssue};
pub use planner::{render_prompt, PlanSource, PlannerConfig, StoredPlanSource};
pub use scenario::{scenario, scenario_named, SCENARIO_NAMES};
