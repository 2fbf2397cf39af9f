//! Command handlers -- one module per subcommand

pub mod process;
pub mod rules;
