//! check-meta
//!
//! A check plugin that compares a host metadata value against an expected
//! value and reports OK, CRITICAL or UNKNOWN to the monitoring agent.

mod client;
mod config;
mod output;

use clap::{error::ErrorKind, ArgGroup, Parser};
use meta_lib::{
    cache_file, plugin_work_dir, CheckResult, CompareOptions, ExpectationSource, MetaCheck,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compare host metadata with an expected value
#[derive(Parser, Debug)]
#[command(name = "check-meta")]
#[command(author, version, about = "Compare host metadata with an expected value", long_about = None)]
#[command(group(
    ArgGroup::new("expectation")
        .required(true)
        .multiple(true)
        .args(["expected", "compare_namespace", "compare_key"])
))]
pub struct Cli {
    /// Uses the metadata for the specified namespace
    #[arg(short = 'n', long, value_name = "NAMESPACE")]
    pub namespace: String,

    /// The value matching the specified key is used for comparison
    #[arg(short = 'k', long, value_name = "KEY")]
    pub key: String,

    /// Compares with the specified expected value
    #[arg(
        short = 'e',
        long,
        value_name = "EXPECTED-VALUE",
        conflicts_with_all = ["compare_namespace", "compare_key"]
    )]
    pub expected: Option<String>,

    /// Compare with regular expression (string values only)
    #[arg(long)]
    pub regex: bool,

    /// Compare as 'actual > expected' (number values only)
    #[arg(long)]
    pub gt: bool,

    /// Compare as 'actual < expected' (number values only)
    #[arg(long)]
    pub lt: bool,

    /// Compare as 'actual >= expected' (number values only)
    #[arg(long)]
    pub ge: bool,

    /// Compare as 'actual <= expected' (number values only)
    #[arg(long)]
    pub le: bool,

    /// Uses the metadata for the specified namespace to compare
    #[arg(short = 'N', long, value_name = "NAMESPACE")]
    pub compare_namespace: Option<String>,

    /// Uses the metadata value that matches the specified key as the expected value
    #[arg(short = 'K', long, value_name = "KEY")]
    pub compare_key: Option<String>,

    /// Path to the agent configuration file
    #[arg(long, env = "MACKEREL_AGENT_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    pub conf: PathBuf,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Literal expected value, or the compare namespace/key pair with each
    /// side defaulting to the primary namespace/key
    fn expectation(&self) -> ExpectationSource {
        match &self.expected {
            Some(expected) => ExpectationSource::Literal(expected.clone()),
            None => ExpectationSource::Metadata {
                namespace: self
                    .compare_namespace
                    .clone()
                    .unwrap_or_else(|| self.namespace.clone()),
                key: self
                    .compare_key
                    .clone()
                    .unwrap_or_else(|| self.key.clone()),
            },
        }
    }

    fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            key: self.key.clone(),
            regex: self.regex,
            gt: self.gt,
            lt: self.lt,
            ge: self.ge,
            le: self.le,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout is reserved for the check result line
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: &Cli, args: Vec<String>) -> CheckResult {
    let agent = match config::AgentConfig::load(&cli.conf) {
        Ok(agent) => agent,
        Err(e) => return CheckResult::unknown(format!("{:#}", e)),
    };
    let host_id = match agent.load_host_id() {
        Ok(id) => id,
        Err(e) => return CheckResult::unknown(format!("{:#}", e)),
    };
    let client = match client::ApiClient::new(&agent.apibase, &agent.apikey) {
        Ok(client) => client,
        Err(e) => return CheckResult::unknown(format!("{:#}", e)),
    };

    let cache_file = cache_file(&plugin_work_dir(), &args);
    debug!(host_id = %host_id, cache_file = %cache_file.display(), "Running check");

    let check = MetaCheck {
        host_id,
        namespace: cli.namespace.clone(),
        key: cli.key.clone(),
        expectation: cli.expectation(),
        options: cli.compare_options(),
        cache_file,
        args,
    };
    check.run(&client).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Arguments as given, without the program name, form the cache signature
    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                eprint!("{}", e);
                output::exit_with(&CheckResult::unknown(output::usage_error_message(&e)));
            }
        },
    };

    init_tracing(cli.verbose);

    let result = run(&cli, args).await;
    output::exit_with(&result);
}
