//! wl-optim: linear and mixed-integer programming for waterleak.
//!
//! A solver-neutral `LinearProgram` is assembled by the localization core
//! and handed to any `Solver`. The bundled backend drives `good_lp` with
//! the pure-Rust microlp engine.

pub mod backend;
pub mod error;
pub mod program;
pub mod solver;

pub use backend::GoodLpSolver;
pub use error::{OptimError, OptimResult};
pub use program::{LinearProgram, Row, Sense, VarKind, Variable};
pub use solver::{RetryingSolver, SolveOutcome, SolveStatus, Solver};
