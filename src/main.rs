//! kocha - command line entry point
//!
//! ```bash
//! # Run every bundled passing suite file
//! kocha run '*-pass'
//!
//! # Tighter timeout, retries and JSON events
//! kocha run simple-fail --timeout 500 --retries 2 --format json
//!
//! # Register root hooks first
//! kocha run nested-pass --require root-hooks
//!
//! # List suite files
//! kocha list --detailed
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use kocha::cli::{Args, Command, ListArgs, RunArgs};
use kocha::config::{self, EnvConfig, Settings};
use kocha::output::{JsonReporter, OutputFormat, ResultFormatter, SpecReporter, SummaryReporter};
use kocha::utils::logger::{init_logger, LogLevel};
use kocha::{suites, SetupError, TestRunner};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::from_verbose(
        args.verbose || env.verbose == Some(true),
    ));

    match args.command {
        Command::Run(run_args) => {
            let all_passed = run_files(run_args, &env).await?;
            std::process::exit(if all_passed { 0 } else { 1 });
        }
        Command::List(list_args) => list_files(list_args),
    }

    Ok(())
}

async fn run_files(args: RunArgs, env: &EnvConfig) -> Result<bool> {
    let config_file = config::load_config(args.config.as_deref(), env)?;
    let settings = Settings::resolve(&args.overrides(), env, &config_file)?;

    if settings.patterns.is_empty() {
        return Err(SetupError::NoInputFiles.into());
    }

    let mut runner = TestRunner::new();
    let mut registered = Vec::new();

    for name in &settings.require {
        for file in suites::resolve_require(name)? {
            info!("Requiring: {}", file.name);
            file.register(&mut runner.declare());
            registered.push(file.name);
        }
    }

    let files = suites::lookup(&settings.patterns)?;
    if files.is_empty() {
        return Err(SetupError::NoInputFiles.into());
    }
    for file in files {
        if registered.contains(&file.name) {
            debug!("Suite file {} already registered", file.name);
            continue;
        }
        file.register(&mut runner.declare());
        registered.push(file.name);
    }

    if let Some(timeout) = settings.timeout {
        info!("Setting timeout duration: {}ms", timeout.as_millis());
        runner.set_timeout(timeout);
    }
    if let Some(retries) = settings.retries {
        info!("Setting retries: {}", retries);
        runner.set_retries(retries);
    }

    let formatter = if settings.colorize {
        ResultFormatter::new()
    } else {
        ResultFormatter::new().no_color()
    };
    let stdout = std::io::stdout();
    debug!("Using {} reporter", settings.format.name());
    match settings.format {
        OutputFormat::Spec => runner.add_reporter(SpecReporter::new(stdout, formatter)),
        OutputFormat::Json => runner.add_reporter(JsonReporter::new(stdout)),
        OutputFormat::Summary => runner.add_reporter(SummaryReporter::new(stdout, formatter)),
    }

    let all_passed = runner.run().await;
    debug!("{}", runner.summary());
    Ok(all_passed)
}

fn list_files(args: ListArgs) {
    let catalog = suites::catalog();
    println!("\nSuite files ({} total)\n", catalog.len());

    for file in catalog {
        if args.detailed {
            println!("  {:15} {}", file.name, file.description);
        } else {
            println!("  {}", file.name);
        }
    }
    println!();
}
