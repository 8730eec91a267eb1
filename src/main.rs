//! Assembles and runs a stack VM listing.
//!
//! # Usage
//! ```text
//! stackvm [FILE] [OPTIONS]
//! ```
//!
//! # Arguments
//! - `FILE`: Assembly listing to run; read from stdin when omitted
//!
//! # Options
//! - `--config <path>`: TOML config file (defaults to `./stackvm.toml` if present)
//! - `--check`: Assemble only and report the result
//! - `--list`: Print the resolved listing and exit
//! - `--trace`: Log every dispatched instruction at debug level
//! - `--dump-state`: Log the final stack and variables
//! - `--log-level <level>`: Minimum log level (debug, info, warn, error)
//! - `--no-timestamp`: Omit timestamps from log lines
//!
//! # Exit codes
//! - `0`: program halted or ran off the end
//! - `1`: the listing or configuration could not be loaded
//! - `2`: runtime fault

use anyhow::Context;
use clap::Parser;
use stackvm::config::Config;
use stackvm::utils::log::{self, Level};
use stackvm::virtual_machine::assembler::{assemble_file, assemble_source_with_name};
use stackvm::virtual_machine::console::StreamConsole;
use stackvm::virtual_machine::errors::LoadError;
use stackvm::virtual_machine::vm::{Outcome, VM};
use stackvm::{error, info};
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

const EXIT_LOAD_FAILURE: u8 = 1;
const EXIT_FAULT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "stackvm")]
#[command(version, about = "Assemble and run an integer stack VM listing", long_about = None)]
struct Cli {
    /// Listing to run; reads stdin when omitted
    file: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Assemble only, do not run
    #[arg(long)]
    check: bool,

    /// Print the resolved listing and exit
    #[arg(long, conflicts_with = "check")]
    list: bool,

    /// Log each instruction before it executes
    #[arg(long)]
    trace: bool,

    /// Log the final stack and variables
    #[arg(long)]
    dump_state: bool,

    /// Minimum log level
    #[arg(long)]
    log_level: Option<Level>,

    /// Omit timestamps from log lines
    #[arg(long)]
    no_timestamp: bool,
}

impl Cli {
    /// Command-line flags take precedence over the config file.
    fn apply(&self, config: &mut Config) {
        config.trace |= self.trace;
        config.dump_state |= self.dump_state;
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.no_timestamp {
            config.show_timestamp = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(EXIT_LOAD_FAILURE)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let cwd = env::current_dir().context("cannot determine working directory")?;
    let mut config = Config::discover(cli.config.as_deref(), &cwd)?;
    cli.apply(&mut config);
    log::set_level(config.log_level);
    log::SHOW_TIMESTAMP.store(config.show_timestamp, Ordering::Relaxed);

    let (name, loaded) = match &cli.file {
        Some(path) => (path.display().to_string(), assemble_file(path)),
        None => {
            let source = io::read_to_string(io::stdin()).context("cannot read listing from stdin")?;
            ("<stdin>".to_string(), assemble_source_with_name(&source, "<stdin>"))
        }
    };
    let program = match loaded {
        Ok(program) => program,
        Err(err) => {
            // Parse diagnostics were already rendered by the assembler.
            if let LoadError::Io { .. } = err {
                error!("{err}");
            }
            return Ok(ExitCode::from(EXIT_LOAD_FAILURE));
        }
    };

    if cli.check {
        info!(
            "{name}: {} instruction(s), {} label(s)",
            program.len(),
            program.labels().len()
        );
        return Ok(ExitCode::SUCCESS);
    }
    if cli.list {
        print!("{}", program.listing());
        return Ok(ExitCode::SUCCESS);
    }

    let mut vm = VM::new(program).with_trace(config.trace);
    let mut console = StreamConsole::stdio();
    let outcome = vm.run(&mut console);
    if config.dump_state {
        dump_state(&vm);
    }

    Ok(match outcome {
        Outcome::Completed | Outcome::Halted => ExitCode::SUCCESS,
        Outcome::Faulted(_) => ExitCode::from(EXIT_FAULT),
    })
}

fn dump_state(vm: &VM) {
    info!("pc={} halted={}", vm.pc(), vm.is_halted());
    info!("stack (bottom first): {:?}", vm.stack());
    let variables = vm.variables();
    if variables.is_empty() {
        info!("no variables");
    }
    for (name, value) in variables {
        info!("  {name} = {value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "stackvm",
            "prog.asm",
            "--trace",
            "--log-level",
            "debug",
            "--no-timestamp",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert!(config.trace);
        assert!(!config.dump_state);
        assert_eq!(config.log_level, Level::Debug);
        assert!(!config.show_timestamp);
        assert_eq!(cli.file, Some(PathBuf::from("prog.asm")));
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let cli = Cli::parse_from(["stackvm"]);
        let mut config = Config {
            log_level: Level::Warn,
            show_timestamp: true,
            trace: true,
            dump_state: true,
        };
        cli.apply(&mut config);
        assert_eq!(config.log_level, Level::Warn);
        assert!(config.trace && config.dump_state && config.show_timestamp);
        assert!(cli.file.is_none());
    }

    #[test]
    fn check_and_list_conflict() {
        assert!(Cli::try_parse_from(["stackvm", "--check", "--list"]).is_err());
    }
}
