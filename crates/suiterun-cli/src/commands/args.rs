//! Args command - print the runner argument vector

use crate::config::{self, OverrideArgs, ProjectArgs};
use anyhow::Result;
use suiterun_core::ArgumentBuilder;

/// Arguments for the args command
#[derive(Debug, Default)]
pub struct ArgsArgs {
    pub project: ProjectArgs,
    pub overrides: OverrideArgs,
    /// Print a JSON array instead of one token per line
    pub json: bool,
}

/// Print the arguments `run` would pass to the test runner
pub fn run(args: ArgsArgs) -> Result<()> {
    let configuration = config::load(&args.project, &args.overrides)?;
    let tokens = ArgumentBuilder::new(&configuration).build();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }
    Ok(())
}
