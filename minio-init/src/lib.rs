pub mod cli;
pub mod console;
pub mod health;
pub mod mc;
pub mod settings;

pub use cli::{run, Cli, Commands};
