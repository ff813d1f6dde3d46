use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process::ExitCode;

mod commands;
mod config;
mod logging;

use config::{OverrideArgs, ProjectArgs};

/// Exit code when some tests failed
const EXIT_TESTS_FAILED: u8 = 1;
/// Exit code for configuration, launch and timeout errors
const EXIT_FATAL: u8 = 2;

/// ScalaTest launcher.
///
/// Builds the ScalaTest runner command line from suiterun.toml and runs it
/// in process, in one forked JVM, or in one forked JVM per suite class.
///
/// EXAMPLES:
///     suiterun run                              Run with suiterun.toml settings
///     suiterun run --fork-mode suite-sequential Fork one JVM per suite
///     suiterun run -s 'FooSuite @exact name'    Run one test of one suite
///     suiterun args                             Show the runner arguments
///     suiterun discover                         List compiled test classes
///
/// ENVIRONMENT VARIABLES:
///     SUITERUN_CONFIG     Configuration file to use instead of searching
///     SUITERUN_FORK_MODE  never, once or suite-sequential
///     SUITERUN_SUITES     Suites to run
///     SUITERUN_TIMEOUT    Seconds before a forked JVM is killed
///     RUST_LOG            Log filter (overrides -v and -q)
#[derive(Parser)]
#[command(name = "suiterun")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured tests
    ///
    /// Exits 0 when every test passed, 1 when some failed and 2 when the run
    /// could not be carried out.
    ///
    /// EXAMPLES:
    ///     suiterun run                          Use suiterun.toml settings
    ///     suiterun run --tests '@adds numbers'  Exact test name
    ///     suiterun run --timeout 600            Kill forked JVMs after 10 minutes
    ///     suiterun run --debug-forked-process   Wait for a debugger on port 5005
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Print the runner arguments without running anything
    ///
    /// EXAMPLES:
    ///     suiterun args                     One argument per line
    ///     suiterun args --json              JSON array
    ///     suiterun args --suites FooSuite   Preview an override
    Args {
        #[command(flatten)]
        project: ProjectArgs,
        #[command(flatten)]
        overrides: OverrideArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List classes found under the test output directory
    ///
    /// Nested and anonymous classes are folded into their enclosing class.
    ///
    /// EXAMPLES:
    ///     suiterun discover
    ///     suiterun discover --json
    Discover {
        #[command(flatten)]
        project: ProjectArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     suiterun completions bash > ~/.bash_completions/suiterun.bash
    ///     suiterun completions zsh > ~/.zfunc/_suiterun
    ///     suiterun completions fish > ~/.config/fish/completions/suiterun.fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_TESTS_FAILED),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Dispatch a command; `Ok(false)` means tests failed
fn execute(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Run { project, overrides } => commands::run::run(commands::run::RunArgs {
            project,
            overrides,
            quiet: cli.quiet,
        }),
        Commands::Args {
            project,
            overrides,
            json,
        } => {
            commands::args::run(commands::args::ArgsArgs {
                project,
                overrides,
                json,
            })?;
            Ok(true)
        }
        Commands::Discover { project, json } => {
            commands::discover::run(commands::discover::DiscoverArgs { project, json })?;
            Ok(true)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(true)
        }
    }
}
