use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, error::ErrorKind};
use lox_lang::cli::{self, EXIT_USAGE, ScriptOptions};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "lox")]
#[command(about = "Lox - A tree-walking interpreter with string interpolation")]
#[command(version)]
struct Cli {
    /// Script to run (starts an interactive prompt if omitted)
    script: Option<PathBuf>,

    /// Only validate the script, don't execute it
    #[arg(long)]
    check: bool,

    /// Print the parsed syntax tree instead of executing
    #[arg(long)]
    print_ast: bool,
}

/// Installs a log subscriber only when `RUST_LOG` is set, so script output
/// stays clean by default.
fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(EXIT_USAGE);
        }
    };
    init_tracing();

    let result = match cli.script {
        Some(script) => cli::run_script(&ScriptOptions {
            script,
            syntax_only: cli.check,
            print_ast: cli.print_ast,
        }),
        None => cli::run_prompt(atty::is(atty::Stream::Stdin)),
    };

    if let Err(e) = result {
        if matches!(e, cli::CliError::Read { .. } | cli::CliError::Io(_)) {
            eprintln!("{}", e);
        }
        process::exit(e.exit_code());
    }
}
