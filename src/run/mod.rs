pub mod cli;
pub mod commands;

pub use cli::{CheckArgs, ProbeArgs, RunArgs};
pub use commands::{handle_check, handle_probe, handle_run};
