//! Discover command - list classes under the test output directory

use crate::config::{self, OverrideArgs, ProjectArgs};
use anyhow::{Context, Result};

/// Arguments for the discover command
#[derive(Debug, Default)]
pub struct DiscoverArgs {
    pub project: ProjectArgs,
    /// Output as a JSON object
    pub json: bool,
}

/// Print every discovered class name, sorted
pub fn run(args: DiscoverArgs) -> Result<()> {
    let configuration = config::load(&args.project, &OverrideArgs::default())?;
    let root = &configuration.test_output_dir;

    let classes = suiterun_core::discover(root)
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "root": root.display().to_string(),
                "classes": classes,
            }))?
        );
    } else {
        for class in &classes {
            println!("{}", class);
        }
    }
    Ok(())
}
