mod storage;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use exlock_core::{namespaced, DistributedLock, KeyResolver, LockError, LockOptions};

use crate::storage::Backend;

// sysexits(3)
const EXIT_USAGE: u8 = 64;
const EXIT_UNAVAILABLE: u8 = 69;
const EXIT_BUSY: u8 = 75;
/// The child could not be started at all.
const EXIT_NOT_STARTED: u8 = 127;

#[derive(Parser)]
#[command(
    name = "exlock",
    about = "exlock: run commands exclusively across hosts sharing a coordination store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a key template and print the resulting lock key
    Resolve {
        /// Template, e.g. "order:#{0.id}"
        template: String,

        /// Positional arguments; parsed as JSON, otherwise taken as strings
        args: Vec<String>,

        /// Print the expanded key without the namespace prefix
        #[arg(long)]
        raw: bool,
    },

    /// Run a command while holding a lock
    Run(RunArgs),

    /// Delete lapsed claims from a SQLite store
    Purge {
        #[arg(long, env = "EXLOCK_STORAGE")]
        storage: Backend,
    },

    /// Print version information
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Lock key template, expanded against --arg values
    #[arg(long)]
    key: String,

    /// Positional argument for the key template (repeatable)
    #[arg(long = "arg")]
    args: Vec<String>,

    /// Storage backend: "memory", "sqlite:<path>" or "redis://host:port"
    #[arg(long, env = "EXLOCK_STORAGE", default_value = "sqlite:exlock.db")]
    storage: Backend,

    /// Claim lifetime in milliseconds [env: EXLOCK_TTL_MS]
    #[arg(long)]
    ttl_ms: Option<u64>,

    /// How long to wait for a busy lock, in milliseconds [env: EXLOCK_WAIT_TIMEOUT_MS]
    #[arg(long)]
    wait_timeout_ms: Option<u64>,

    /// Delay between acquisition attempts, in milliseconds [env: EXLOCK_RETRY_INTERVAL_MS]
    #[arg(long)]
    retry_interval_ms: Option<u64>,

    /// Message reported when the lock stays busy [env: EXLOCK_BUSY_MESSAGE]
    #[arg(long)]
    busy_message: Option<String>,

    /// Command to run, after `--`
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

impl RunArgs {
    /// Flags win over the environment.
    fn options(&self) -> LockOptions {
        let mut options = LockOptions::from_env();
        if let Some(ttl_ms) = self.ttl_ms {
            options.ttl_ms = ttl_ms;
        }
        if let Some(wait_timeout_ms) = self.wait_timeout_ms {
            options.wait_timeout_ms = wait_timeout_ms;
        }
        if let Some(retry_interval_ms) = self.retry_interval_ms {
            options.retry_interval_ms = retry_interval_ms;
        }
        if let Some(message) = &self.busy_message {
            options.busy_message = message.clone();
        }
        options
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { template, args, raw } => {
            let key = KeyResolver::new().resolve(&template, &parse_args(&args));
            if raw {
                println!("{}", key);
            } else {
                println!("{}", namespaced(&key, &LockOptions::from_env().namespace));
            }
            ExitCode::SUCCESS
        }
        Commands::Run(args) => run(args).await,
        Commands::Purge { storage } => match storage::purge(&storage).await {
            Ok(removed) => {
                tracing::info!(storage = %storage, removed, "purged lapsed claims");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(storage = %storage, error = %e, "purge failed");
                ExitCode::from(EXIT_UNAVAILABLE)
            }
        },
        Commands::Version => {
            println!("exlock {}", env!("CARGO_PKG_VERSION"));
            println!("Distributed mutual exclusion over a shared coordination store");
            ExitCode::SUCCESS
        }
    }
}

async fn run(args: RunArgs) -> ExitCode {
    let Some((program, program_args)) = args.command.split_first() else {
        return ExitCode::from(EXIT_USAGE);
    };

    let store = match storage::open(&args.storage).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(storage = %args.storage, error = %e, "failed to open storage");
            return ExitCode::from(EXIT_UNAVAILABLE);
        }
    };

    let lock: DistributedLock = DistributedLock::with_options(store, args.options());
    let request = lock.request(&args.key, &parse_args(&args.args));

    let outcome = lock
        .run_exclusive(&request, || async {
            tokio::process::Command::new(program)
                .args(program_args)
                .status()
                .await
        })
        .await;

    match outcome {
        Ok(Ok(status)) => {
            tracing::debug!(key = %request.key, %status, "command finished");
            ExitCode::from(exit_code_of(status))
        }
        Ok(Err(e)) => {
            tracing::error!(program = %program, error = %e, "failed to start command");
            ExitCode::from(EXIT_NOT_STARTED)
        }
        Err(e) => {
            tracing::error!(key = ?e.key(), "{}", e);
            ExitCode::from(lock_error_code(&e))
        }
    }
}

/// JSON when it parses, otherwise the raw string.
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_args(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|arg| parse_arg(arg)).collect()
}

fn lock_error_code(error: &LockError) -> u8 {
    match error {
        LockError::Busy { .. } => EXIT_BUSY,
        LockError::StoreUnavailable { .. } => EXIT_UNAVAILABLE,
        LockError::InvalidRequest(_) => EXIT_USAGE,
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code).unwrap_or(1);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return u8::try_from(128 + signal).unwrap_or(1);
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_parse_arg_prefers_json() {
        assert_eq!(parse_arg(r#"{"id":7}"#), json!({ "id": 7 }));
        assert_eq!(parse_arg("42"), json!(42));
        assert_eq!(parse_arg(r#""quoted""#), json!("quoted"));
        assert_eq!(parse_arg("user-42"), json!("user-42"));
    }

    #[test]
    fn test_lock_error_codes() {
        let busy = LockError::Busy {
            key: "lock:a".to_string(),
            waited: Duration::ZERO,
            message: "busy".to_string(),
        };
        assert_eq!(lock_error_code(&busy), EXIT_BUSY);
        assert_eq!(
            lock_error_code(&LockError::InvalidRequest("ttl".to_string())),
            EXIT_USAGE
        );
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "exlock",
            "run",
            "--key",
            "deploy:#{0}",
            "--arg",
            "prod",
            "--storage",
            "memory",
            "--wait-timeout-ms",
            "0",
            "--",
            "echo",
            "hello",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("Expected run command");
        };
        assert_eq!(args.key, "deploy:#{0}");
        assert_eq!(args.args, vec!["prod"]);
        assert_eq!(args.storage, Backend::Memory);
        assert_eq!(args.command, vec!["echo", "hello"]);
        assert_eq!(args.options().wait_timeout_ms, 0);
    }

    #[test]
    fn test_cli_run_requires_command() {
        let parsed = Cli::try_parse_from(["exlock", "run", "--key", "k", "--storage", "memory"]);
        assert!(parsed.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_of_child() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(exit_code_of(std::process::ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code_of(std::process::ExitStatus::from_raw(3 << 8)), 3);
        // Killed by SIGKILL
        assert_eq!(exit_code_of(std::process::ExitStatus::from_raw(9)), 137);
    }
}
