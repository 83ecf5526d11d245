//! Closed-loop control

mod pid;

pub use pid::{PidConfig, PidController, DEFAULT_PERIOD};
