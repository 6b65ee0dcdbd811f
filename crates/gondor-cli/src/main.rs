//! Gondor - deployment client
//!
//! Usage:
//!   gondor init <site_key>                       # Write .gondor/config
//!   gondor create [--kind K] <label>             # Create an instance
//!   gondor deploy <label> <commit>               # Deploy a revision
//!   gondor sqldump <label> > dump.sql            # Download a database dump
//!   gondor run <label> <command> [args...]       # Run a management command
//!   gondor manage <label> <operation> [args...]  # Run an instance operation
//!   gondor delete <label>                        # Delete an instance
//!   gondor list                                  # List instances

mod prompts;
mod reporter;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gondor_core::commands::{
    CREATE_SUPERUSER, CommandContext, CreateCommand, CreateOptions, DeleteCommand, DeleteOptions,
    DeployCommand, DeployOptions, InitCommand, InitOptions, ListCommand, ManageCommand,
    ManageOptions, RunCommand, RunOptions, SqldumpCommand, SqldumpOptions,
};
use gondor_core::config::Credentials;
use gondor_core::report::Reporter;
use gondor_core::task::{TaskKind, TaskOutcome, locked_message};
use gondor_core::transport::{ApiClient, CancelToken};
use gondor_core::GondorError;

use crate::prompts::Prompter;
use crate::reporter::{Stream, TerminalReporter};

/// Exit status when interrupted outside archiving, spooling or uploading.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "gondor", version)]
#[command(about = "Deploy Django projects to Gondor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .gondor/config for the Django project in this directory
    Init {
        /// Site key from the Gondor dashboard
        site_key: String,
    },

    /// Create a new instance
    Create {
        /// Instance kind (defaults to dev)
        #[arg(long)]
        kind: Option<String>,
        label: String,
    },

    /// Deploy a revision to an instance
    Deploy {
        label: String,
        /// Branch, tag or revision to deploy
        commit: String,
    },

    /// Write an instance's database dump to standard output
    Sqldump { label: String },

    /// Run a management command on an instance
    Run {
        instance_label: String,
        command: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Delete an instance
    Delete { label: String },

    /// List the instances of this site
    List,

    /// Run an instance operation (e.g. database:reset, database:copy)
    ///
    /// Piped standard input is uploaded and made available to the operation.
    Manage {
        label: String,
        operation: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() {
    // Logs go to stderr so they never mix with command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("GONDOR_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone());

    let code = match run_cli(cli.command, &cancel) {
        Ok(code) => code,
        Err(err) => report_error(&err),
    };
    let _ = io::stdout().flush();
    std::process::exit(code);
}

fn install_interrupt_handler(cancel: CancelToken) {
    let installed = ctrlc::set_handler(move || {
        if cancel.is_armed() {
            cancel.cancel();
        } else {
            std::process::exit(EXIT_INTERRUPTED);
        }
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "failed to install interrupt handler");
    }
}

fn run_cli(command: Commands, cancel: &CancelToken) -> Result<i32> {
    match command {
        Commands::Init { site_key } => run_init(site_key),
        Commands::Create { kind, label } => run_create(label, kind, cancel),
        Commands::Deploy { label, commit } => run_deploy(label, commit, cancel),
        Commands::Sqldump { label } => run_sqldump(label, cancel),
        Commands::Run {
            instance_label,
            command,
            args,
        } => run_run(instance_label, command, args, cancel),
        Commands::Delete { label } => run_delete(label, cancel),
        Commands::List => run_list(cancel),
        Commands::Manage {
            label,
            operation,
            args,
        } => run_manage(label, operation, args, cancel),
    }
}

/// Load credentials and the project, then connect to the configured endpoint.
fn network_context(stream: Stream, cancel: &CancelToken) -> Result<CommandContext> {
    let credentials = Credentials::load_default()?;
    let reporter: Arc<dyn Reporter> = Arc::new(TerminalReporter::new(stream));
    let cwd = std::env::current_dir()?;
    let project = CommandContext::read_project(&cwd, reporter.as_ref())?;
    let api = ApiClient::new(project.config().endpoint.clone(), credentials)?;
    Ok(CommandContext::new(project, Arc::new(api), reporter).with_cancel_token(cancel.clone()))
}

fn run_init(site_key: String) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let reporter = Arc::new(TerminalReporter::new(Stream::Stdout));
    let report = InitCommand::new(cwd, reporter).execute(&InitOptions::new(site_key))?;

    if report.created {
        println!();
        println!("You are now ready to deploy your project to Gondor. You might want to first");
        println!("check .gondor/config (in this directory) for correct values for your");
        println!("application. Once you are ready, run:");
        println!();
        println!("    {}", report.next_command());
    }
    Ok(0)
}

fn run_create(label: String, kind: Option<String>, cancel: &CancelToken) -> Result<i32> {
    let ctx = network_context(Stream::Stdout, cancel)?;
    let mut options = CreateOptions::new(label);
    if let Some(kind) = kind {
        options = options.with_kind(kind);
    }
    let report = CreateCommand::new(&ctx).execute(&options)?;

    println!();
    println!("Run: {}", report.next_command);
    if let Some(url) = &report.url {
        println!("Visit: {url}");
    }
    Ok(0)
}

fn run_deploy(label: String, commit: String, cancel: &CancelToken) -> Result<i32> {
    let ctx = network_context(Stream::Stdout, cancel)?;
    let report = DeployCommand::new(&ctx).execute(&DeployOptions::new(label, commit))?;

    if report.outcome.is_success()
        && let Some(url) = &report.url
    {
        println!();
        println!("Visit: {url}");
    }
    Ok(outcome_exit_code(&report.outcome, TaskKind::Deployment, Stream::Stdout))
}

fn run_sqldump(label: String, cancel: &CancelToken) -> Result<i32> {
    let ctx = network_context(Stream::Stderr, cancel)?;
    let mut stdout = io::stdout().lock();
    let report = SqldumpCommand::new(&ctx).execute(&SqldumpOptions::new(label), &mut stdout)?;
    tracing::debug!(bytes = report.bytes_written, "database dump written");
    Ok(outcome_exit_code(&report.outcome, TaskKind::DatabaseDump, Stream::Stderr))
}

fn run_run(
    instance_label: String,
    command: String,
    args: Vec<String>,
    cancel: &CancelToken,
) -> Result<i32> {
    let ctx = network_context(Stream::Stdout, cancel)?;
    let options = if command == CREATE_SUPERUSER {
        let params = Prompter::new().superuser()?;
        RunOptions::new(instance_label, command).with_superuser(params)
    } else {
        RunOptions::new(instance_label, command).with_args(args)
    };
    let report = RunCommand::new(&ctx).execute(&options)?;

    if let Some(output) = &report.output {
        print!("\n{output}");
    }
    Ok(outcome_exit_code(&report.outcome, TaskKind::Execution, Stream::Stdout))
}

fn run_delete(label: String, cancel: &CancelToken) -> Result<i32> {
    let ctx = network_context(Stream::Stdout, cancel)?;
    if !Prompter::new().confirm_delete()? {
        println!("Exiting without deleting the instance.");
        return Ok(0);
    }
    DeleteCommand::new(&ctx).execute(&DeleteOptions::new(label))?;
    Ok(0)
}

fn run_list(cancel: &CancelToken) -> Result<i32> {
    let ctx = network_context(Stream::Stdout, cancel)?;
    let instances = ListCommand::new(&ctx).execute()?;

    println!();
    if instances.is_empty() {
        println!("No instances found.");
    }
    for instance in &instances {
        println!("{}", instance.display_line());
    }
    Ok(0)
}

fn run_manage(
    label: String,
    operation: String,
    args: Vec<String>,
    cancel: &CancelToken,
) -> Result<i32> {
    let ctx = network_context(Stream::Stdout, cancel)?;
    let mut options = ManageOptions::new(label, operation).with_args(args);
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        options = options.with_stdin(Box::new(stdin));
    }
    let report = ManageCommand::new(&ctx).execute(options)?;
    Ok(outcome_exit_code(&report.outcome, TaskKind::Management, Stream::Stdout))
}

/// Print the reason for a failed or locked task and pick the exit status.
fn outcome_exit_code(outcome: &TaskOutcome, kind: TaskKind, stream: Stream) -> i32 {
    let message = match outcome {
        TaskOutcome::Succeeded(_) => return 0,
        TaskOutcome::Failed { reason } => reason.clone(),
        TaskOutcome::Locked => locked_message(kind),
    };
    match stream {
        Stream::Stdout => println!("\n{message}"),
        Stream::Stderr => eprintln!("\n{message}"),
    }
    1
}

fn report_error(err: &anyhow::Error) -> i32 {
    if let Some(GondorError::Interrupted) = err.downcast_ref::<GondorError>() {
        println!("\nCanceling uploading... [ok]");
        return 1;
    }
    eprintln!("{} {err:#}", style("Error:").red().bold());
    1
}
