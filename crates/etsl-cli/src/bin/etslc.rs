#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};

use etsl_cli::args::{CliArgs, DiagnosticFormat};
use etsl_cli::driver::{self, CompileOutput, EXIT_FATAL, EXIT_SUCCESS};
use etsl_cli::reporter::Reporter;
use etsl_lowering::PhaseManager;

fn main() {
    // Initialize tracing if ETSL_LOG or RUST_LOG is set (zero cost otherwise).
    etsl_cli::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let status = match run(&args) {
        Ok(status) => status,
        Err(err) => {
            eprintln!("error: {err:#}");
            EXIT_FATAL
        }
    };
    std::process::exit(status);
}

fn run(args: &CliArgs) -> Result<i32> {
    if args.list_phases {
        let manager = PhaseManager::new();
        let mut stdout = std::io::stdout().lock();
        for name in manager.phase_names() {
            writeln!(stdout, "{name}")?;
        }
        return Ok(EXIT_SUCCESS);
    }

    let output = driver::compile(args)?;
    driver::write_units(&mut std::io::stdout().lock(), &output)
        .context("failed to write units")?;
    report(args, &output)?;
    Ok(output.exit_status())
}

fn report(args: &CliArgs, output: &CompileOutput) -> Result<()> {
    match args.format {
        DiagnosticFormat::Json => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &output.diagnostics)
                .context("failed to write diagnostics")?;
            writeln!(stdout)?;
        }
        DiagnosticFormat::Pretty => {
            let color = args.color.unwrap_or_else(|| std::io::stderr().is_terminal());
            let reporter = Reporter::new(color);
            eprint!("{}", reporter.render(&output.diagnostics));
            let summary = reporter.format_summary(&output.diagnostics);
            if !summary.is_empty() {
                eprintln!("\n{summary}");
            }
        }
    }
    for failure in &output.failures {
        eprintln!("error: {failure}");
    }
    Ok(())
}
