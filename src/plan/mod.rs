//! Action planning
//!
//! Intent -> template or model proposals -> gate -> `Plan`

pub mod gate;
pub mod planner;
pub mod step;
pub mod templates;

pub use gate::{fetch_tool, gate, Rejection, COMMAND_DENYLIST, FETCH_TOOLS};
pub use planner::{ActionPlanner, PlanParseError};
pub use step::{ActionKind, ActionStep, Plan, ProposedStep};
