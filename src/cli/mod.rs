// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{parse_args, CliArgs, Command};
