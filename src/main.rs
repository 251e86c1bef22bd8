//! Verdict CLI - test command runner and output parser
//!
//! Usage: verdict <COMMAND>
//!
//! Commands:
//!   run         Execute a test command and parse its output
//!   parse       Parse captured test output (debugging)
//!   check       Validate a command against the security policy
//!   frameworks  List supported test frameworks

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use verdict::{
    parse_output, run_tests, validate_command, Config, Framework, ParsedRun, RunRequest,
    Verbosity, VerdictError,
};

/// Verdict - test command runner and output parser
#[derive(Parser, Debug)]
#[command(name = "verdict")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format for CI
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a test command and parse its output
    Run {
        /// Shell command to execute (e.g. "npm test")
        command: String,

        /// Directory to run the command in
        #[arg(short = 'C', long, default_value = ".")]
        working_dir: PathBuf,

        /// Test framework whose output to expect
        #[arg(short, long)]
        framework: Option<Framework>,

        /// Directory for report artifacts (relative to working dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Extra environment variables (KEY=VALUE, repeatable)
        #[arg(short, long = "env", value_parser = parse_key_val)]
        env: Vec<(String, String)>,

        /// Permit sudo in the command
        #[arg(long)]
        allow_sudo: bool,
    },

    /// Parse captured test output (debugging)
    Parse {
        /// Test framework whose output to expect
        #[arg(short, long)]
        framework: Framework,

        /// Output file to parse, or "-" for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Optional file holding the captured stderr stream
        #[arg(long)]
        errors: Option<PathBuf>,
    },

    /// Validate a command against the security policy
    Check {
        /// Shell command to validate
        command: String,

        /// Permit sudo in the command
        #[arg(long)]
        allow_sudo: bool,

        /// Permit su in the command
        #[arg(long)]
        allow_su: bool,
    },

    /// List supported test frameworks
    Frameworks,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid KEY=VALUE pair: {s}")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            command,
            working_dir,
            framework,
            output_dir,
            timeout,
            env,
            allow_sudo,
        } => cmd_run(
            command,
            working_dir,
            framework,
            output_dir,
            timeout,
            env,
            allow_sudo,
            cli.json,
            cli.verbose,
        ),
        Commands::Parse {
            framework,
            input,
            errors,
        } => cmd_parse(framework, &input, errors.as_deref(), cli.json),
        Commands::Check {
            command,
            allow_sudo,
            allow_su,
        } => cmd_check(&command, allow_sudo, allow_su, cli.json),
        Commands::Frameworks => cmd_frameworks(cli.json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    command: String,
    working_dir: PathBuf,
    framework: Option<Framework>,
    output_dir: Option<PathBuf>,
    timeout: Option<u64>,
    env: Vec<(String, String)>,
    allow_sudo: bool,
    json: bool,
    verbose: u8,
) -> Result<()> {
    let config = Config::load_or_default(Some(&working_dir));

    // Config verbosity raises the floor; -v flags can only add to it.
    let verbose = match config.output.verbosity {
        Verbosity::Quiet | Verbosity::Normal => verbose,
        Verbosity::Verbose => verbose.max(1),
        Verbosity::Debug => verbose.max(2),
    };

    let framework = framework.unwrap_or(Framework::Generic);
    let timeout_secs = timeout.unwrap_or(config.run.timeout_secs);
    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.run.output_dir));

    let mut policy = config.security.to_policy();
    if allow_sudo {
        policy.allow_sudo = true;
    }

    let request = RunRequest {
        command: command.clone(),
        working_dir,
        framework,
        output_dir,
        timeout: Duration::from_secs(timeout_secs),
        env: env.into_iter().collect::<HashMap<_, _>>(),
        policy,
    };

    if !json {
        println!("🧪 Verdict Run");
        println!("Command: {command}");
        println!("Framework: {framework}");
        println!();
    }

    let outcome = run_tests(&request).with_context(|| format!("failed to run: {command}"))?;
    let success = outcome.parsed.is_success() && outcome.exit_code == Some(0);

    if json {
        let output = serde_json::json!({
            "event": "run",
            "command": command,
            "framework": framework,
            "exit_code": outcome.exit_code,
            "duration_ms": outcome.duration.as_millis() as u64,
            "total": outcome.parsed.summary.total,
            "passed": outcome.parsed.summary.passed,
            "failed": outcome.parsed.summary.failed,
            "report_dir": outcome.report_dir,
            "success": success
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_results(&outcome.parsed, verbose);

        println!();
        println!(
            "Summary: {} passed, {} failed ({} total) in {}ms",
            outcome.parsed.summary.passed,
            outcome.parsed.summary.failed,
            outcome.parsed.summary.total,
            outcome.duration.as_millis()
        );
        println!("Report: {}", outcome.report_dir.display());

        println!();
        if success {
            println!("🟢 All tests passed!");
        } else {
            println!("🔴 Test run failed.");
        }
    }

    if !success {
        std::process::exit(1);
    }

    Ok(())
}

fn print_results(parsed: &ParsedRun, verbose: u8) {
    for test in &parsed.tests {
        let icon = if test.passed { "✓" } else { "✗" };
        println!("  {} {}", icon, test.name);

        let show_output = verbose >= 2 || (verbose >= 1 && !test.passed);
        if show_output {
            for line in &test.output {
                println!("      {line}");
            }
        }
    }
}

fn cmd_parse(
    framework: Framework,
    input: &std::path::Path,
    errors: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    let stdout = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let stderr = match errors {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => String::new(),
    };

    let parsed = parse_output(framework, &stdout, &stderr);

    if json {
        println!("{}", serde_json::to_string(&parsed)?);
    } else {
        println!("🔍 Verdict Parse ({framework})");
        println!();
        print_results(&parsed, 1);
        println!();
        println!(
            "Summary: {} passed, {} failed ({} total)",
            parsed.summary.passed, parsed.summary.failed, parsed.summary.total
        );
    }

    Ok(())
}

fn cmd_check(command: &str, allow_sudo: bool, allow_su: bool, json: bool) -> Result<()> {
    let working_dir = std::env::current_dir()?;
    let config = Config::load_or_default(Some(&working_dir));

    let mut policy = config.security.to_policy();
    if allow_sudo {
        policy.allow_sudo = true;
    }
    if allow_su {
        policy.allow_su = true;
    }

    match validate_command(command, &policy) {
        Ok(()) => {
            if json {
                let output = serde_json::json!({
                    "event": "check",
                    "command": command,
                    "allowed": true
                });
                println!("{}", serde_json::to_string(&output)?);
            } else {
                println!("✓ Command allowed: {command}");
            }
            Ok(())
        }
        Err(VerdictError::CommandBlocked { reason }) => {
            if json {
                let output = serde_json::json!({
                    "event": "check",
                    "command": command,
                    "allowed": false,
                    "reason": reason
                });
                println!("{}", serde_json::to_string(&output)?);
            } else {
                println!("✗ Command blocked: {command}");
                println!("  ↳ {reason}");
            }
            std::process::exit(1);
        }
        Err(other) => Err(other.into()),
    }
}

fn cmd_frameworks(json: bool) -> Result<()> {
    if json {
        let frameworks: Vec<_> = Framework::ALL
            .iter()
            .map(|f| {
                serde_json::json!({
                    "id": f,
                    "name": f.display_name(),
                    "command": f.conventional_command(),
                    "file_pattern": f.file_pattern()
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&frameworks)?);
    } else {
        println!("Supported frameworks:");
        println!();
        for f in Framework::ALL {
            println!("  {:<10} {:<18} {}", f.to_string(), f.conventional_command(), f.file_pattern());
        }
    }

    Ok(())
}
