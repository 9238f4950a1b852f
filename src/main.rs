use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use ddevstan::config::{Config, MinSeverity};
use ddevstan::ddev::{DdevClient, ValidationOutcome};
use ddevstan::exit_codes::{FINDINGS, SUCCESS, TOOL_ERROR};
use ddevstan::phpstan::{self, Interpretation};
use ddevstan::{AnalysisError, analyze_file};

#[derive(Parser)]
#[command(version, about = "PHPStan diagnostics for DDEV projects", long_about = None)]
struct Cli {
    /// Workspace root containing the DDEV project
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Show detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one PHP file inside the DDEV container
    Check {
        /// File to analyze, relative to the workspace root
        file: String,

        /// PHPStan configuration file, passed through verbatim
        #[arg(short = 'c', long)]
        config_file: Option<String>,

        /// Analysis level (0-9), used when no configuration file is found
        #[arg(long)]
        level: Option<u8>,

        /// Minimum severity to report
        #[arg(long, value_enum)]
        min_severity: Option<MinSeverity>,

        /// Path excluded when no configuration file is found (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Start the Language Server Protocol server
    Server {
        /// Listen on TCP instead of stdio (useful for debugging)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the DDEV environment validation outcome
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = env_logger::Env::default()
        .default_filter_or(if cli.verbose { "debug" } else { "warn" });
    env_logger::Builder::from_env(env).init();

    let root = cli.root.canonicalize().unwrap_or(cli.root);

    match cli.command {
        Commands::Server { port } => {
            match port {
                Some(port) => ddevstan::lsp::start_tcp_server(port).await?,
                None => ddevstan::lsp::start_server().await?,
            }
            Ok(())
        }
        Commands::Check {
            file,
            config_file,
            level,
            min_severity,
            exclude,
        } => {
            let code =
                run_check(&root, &file, config_file, level, min_severity, exclude, cli.verbose)
                    .await;
            process::exit(code);
        }
        Commands::Status => {
            let code = run_status(&root).await;
            process::exit(code);
        }
    }
}

async fn run_check(
    root: &Path,
    file: &str,
    config_file: Option<String>,
    level: Option<u8>,
    min_severity: Option<MinSeverity>,
    exclude: Vec<String>,
    verbose: bool,
) -> i32 {
    let mut config = match Config::load(root) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {}", "Error".red().bold(), err);
            return TOOL_ERROR;
        }
    };

    // Flags override the workspace config; an explicit invocation also
    // overrides the enable switch.
    config.enable = true;
    if config_file.is_some() {
        config.config_path = config_file;
    }
    if let Some(level) = level {
        config.level = level;
    }
    if let Some(min_severity) = min_severity {
        config.min_severity = min_severity;
    }
    if !exclude.is_empty() {
        config.exclude_paths = exclude;
    }

    let client = DdevClient::new(root);
    match analyze_file(&client, &config, file).await {
        Err(AnalysisError::Invalid { message, .. }) => {
            eprintln!("{}: {}", "Error".red().bold(), message);
            TOOL_ERROR
        }
        Err(AnalysisError::Exec(err)) => {
            eprintln!(
                "{}: {}",
                "Error".red().bold(),
                phpstan::summarize_exec_error(&err)
            );
            if verbose {
                eprintln!("  command: {}", err.command);
                eprintln!("  status: {:?}", err.status);
                if !err.stderr.is_empty() {
                    eprintln!("  stderr: {}", err.stderr.trim());
                }
                if !err.stdout.is_empty() {
                    eprintln!("  stdout: {}", err.stdout.trim());
                }
            }
            TOOL_ERROR
        }
        Ok(Interpretation::Diagnostics(diagnostics)) => {
            if diagnostics.is_empty() {
                println!("{} No issues found in {}", "Success:".green().bold(), file);
                return SUCCESS;
            }
            for diagnostic in &diagnostics {
                println!(
                    "{}:{}: {} {}",
                    file,
                    diagnostic.range.start.line + 1,
                    "error".red().bold(),
                    diagnostic.message
                );
            }
            println!(
                "\n{} {} issue{} found in {}",
                "Issues:".yellow().bold(),
                diagnostics.len(),
                if diagnostics.len() == 1 { "" } else { "s" },
                file
            );
            FINDINGS
        }
        Ok(Interpretation::Fatal) => {
            eprintln!(
                "{}: PHPStan encountered a fatal error. Check the file for syntax errors.",
                "Error".red().bold()
            );
            TOOL_ERROR
        }
        Ok(Interpretation::MissingConfig) => {
            eprintln!(
                "{}: PHPStan configuration file not found. Check the configPath setting.",
                "Error".red().bold()
            );
            TOOL_ERROR
        }
        Ok(Interpretation::Unparsable) => {
            eprintln!(
                "{}: PHPStan output could not be parsed; the analysis may still have succeeded",
                "Warning".yellow().bold()
            );
            SUCCESS
        }
    }
}

async fn run_status(root: &Path) -> i32 {
    let client = DdevClient::new(root);
    match client.validate_tool(phpstan::TOOL_NAME).await {
        ValidationOutcome::Valid => {
            println!(
                "{} PHPStan is ready in the DDEV container at {}",
                "✓".green(),
                root.display()
            );
            SUCCESS
        }
        ValidationOutcome::Invalid { message, .. } => {
            println!("{} {}", "✗".red(), message);
            TOOL_ERROR
        }
    }
}
