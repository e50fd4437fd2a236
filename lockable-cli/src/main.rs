mod pool;
mod runner;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lockable",
    about = "Lockable — exclusive allocation of resources from a shared pool",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the pool is described and how it is locked.
#[derive(Args, Clone)]
pub struct PoolArgs {
    /// JSON list of available resources
    #[arg(long, default_value = "resources.json", env = "LOCKABLE_RESOURCE_LIST_FILE")]
    pub resource_list_file: PathBuf,

    /// Requirements, as `key=value&key=value` or a JSON object
    #[arg(long, default_value = "", env = "LOCKABLE_REQUIREMENTS")]
    pub requirements: String,

    /// Host to allocate for (defaults to this machine)
    #[arg(long, env = "LOCKABLE_HOSTNAME")]
    pub hostname: Option<String>,

    /// Allocation timeout in seconds
    #[arg(long, default_value = "10", value_parser = parse_seconds, env = "LOCKABLE_TIMEOUT")]
    pub timeout: Duration,

    /// Folder for lock files, shared by every cooperating consumer
    /// (defaults to the platform temp dir)
    #[arg(long, env = "LOCKABLE_LOCK_FOLDER")]
    pub lock_folder: Option<PathBuf>,

    /// Lock backend: "folder" or "sqlite:<path>"
    #[arg(long, default_value = "folder", env = "LOCKABLE_STORAGE")]
    pub storage: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Lease a resource and run a command while holding it
    Run {
        #[command(flatten)]
        pool: PoolArgs,

        /// Prefix of the exported environment variables (PREFIX_<ATTRIBUTE>)
        #[arg(long, default_value = "resource")]
        prefix: String,

        /// Command to run, after `--`
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Print the resources matching the requirements as JSON
    Candidates {
        #[command(flatten)]
        pool: PoolArgs,
    },

    /// Show which resources are currently held
    Status {
        #[command(flatten)]
        pool: PoolArgs,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run { pool: args, prefix, command } => runner::run(args, prefix, command).await,
        Commands::Candidates { pool: args } => pool::candidates(&args).map(|()| 0),
        Commands::Status { pool: args } => pool::status(&args).map(|()| 0),
        Commands::Version => {
            println!("lockable {}", env!("CARGO_PKG_VERSION"));
            println!("Exclusive resource allocation from a shared pool");
            Ok(0)
        }
    };

    match code {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("timeout must be a positive number of seconds".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("timeout '{}' is out of range: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_seconds("0.5").unwrap(), Duration::from_millis(500));
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
        assert!(parse_seconds("1e20").is_err());
    }

    #[test]
    fn test_run_collects_trailing_command() {
        let cli = Cli::try_parse_from([
            "lockable",
            "run",
            "--requirements",
            "online=true&zone=eu",
            "--timeout",
            "3",
            "--",
            "pytest",
            "-x",
            "tests/",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { pool, prefix, command } => {
                assert_eq!(pool.requirements, "online=true&zone=eu");
                assert_eq!(pool.timeout, Duration::from_secs(3));
                assert_eq!(pool.storage, "folder");
                assert_eq!(prefix, "resource");
                assert_eq!(command, vec!["pytest", "-x", "tests/"]);
            }
            _ => panic!("expected run"),
        }
    }
}
