//! Fleet supervision: spawns the worker fleet for one campaign run and
//! handles SIGINT/SIGTERM (spec.md §4.1).

pub mod shutdown;
pub mod supervisor;

pub use shutdown::{ShutdownController, CHILD_JOIN_TIMEOUT};
pub use supervisor::{run, SupervisorPlan};
