//! Command line interfaces for the two drivers.
//!
//! `il-ssa` reads a JSON program, converts each function to SSA form
//! (optionally round-tripping back out of it), and writes the transformed
//! JSON. `il-lower` reads a JSON program and writes the lowered LLVM module.
//! Both read from a file path argument or standard input and write to
//! standard output unless `-o` is given.

use std::fs;
use std::io::{self, Read as _, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;

use crate::ir::Program;
use crate::{lower, ssa};

/// Convert IL programs to and from SSA form.
#[derive(Debug, Parser)]
#[command(author, version, about = "Convert IL programs to SSA form", long_about = None)]
pub struct SsaCli {
    /// Input program (JSON); standard input when omitted.
    pub input: Option<PathBuf>,

    /// Lower φ-instructions back to copies after constructing SSA.
    #[arg(long)]
    pub roundtrip: bool,

    /// Write output here instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, ...).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl SsaCli {
    /// Execute the SSA driver.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable input, malformed programs, failed
    /// transformation, or output failures.
    pub fn run(&self) -> anyhow::Result<()> {
        let (text, _) = read_input(self.input.as_deref())?;
        let mut prog = Program::from_json(&text)?;

        ssa::transform_program(&mut prog, self.roundtrip)?;

        write_output(self.output.as_deref(), &prog.to_json())
    }
}

/// Lower IL programs to LLVM textual assembly.
#[derive(Debug, Parser)]
#[command(author, version, about = "Lower IL programs to LLVM assembly", long_about = None)]
pub struct LowerCli {
    /// Input program (JSON); standard input when omitted.
    pub input: Option<PathBuf>,

    /// Write output here instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, ...).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl LowerCli {
    /// Execute the lowering driver.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable input, malformed programs, failed
    /// lowering, or output failures.
    pub fn run(&self) -> anyhow::Result<()> {
        let (text, source_name) = read_input(self.input.as_deref())?;
        let prog = Program::from_json(&text)?;

        let module = lower::lower_program(prog, &source_name)?;

        write_output(self.output.as_deref(), &module)
    }
}

fn read_input(path: Option<&Path>) -> anyhow::Result<(String, String)> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok((text, path.display().to_string()))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading standard input")?;
            Ok((text, "stdin".to_string()))
        }
    }
}

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            match handle.write_all(content.as_bytes()) {
                Ok(()) => Ok(()),
                // A closed downstream pipe is not a failure of ours.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                Err(err) => Err(err).context("writing standard output"),
            }
        }
    }
}

/// Install the tracing subscriber for a driver binary.
pub fn init_tracing(verbose: u8) {
    use tracing::Level;
    use tracing_subscriber::{fmt, EnvFilter};

    let log_level = match verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("il_midend={log_level}").parse() {
        env_filter = env_filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

/// Report an error chain and terminate with a non-zero exit code.
pub fn exit_with_error(err: &anyhow::Error) -> ! {
    tracing::error!("command failed: {err}");
    for cause in err.chain().skip(1) {
        tracing::error!("  caused by: {cause}");
    }
    std::process::exit(1);
}
