use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use core::time::Duration;
use resp_cost::{
    Alphabet, DataKind, LoaderConfig, ReclaimConfig, SessionConfig, UniquenessPolicy, WorkloadSpec,
};
use std::path::PathBuf;

/// Backends `--db-type` accepts.
pub const SUPPORTED_BACKENDS: &[&str] = &["redis"];

/// Command-line interface of the `resp-cost` binary.
///
/// Every connection and tuning knob can also be set through the environment
/// (or a `.env` file), which is handy when the same store is measured over
/// and over.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "resp-cost",
    version,
    about = "Measure how much memory a Redis-compatible store spends on a synthetic dataset"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load one workload and print the resulting memory figures.
    Populate(PopulateArgs),
    /// Run every workload of a JSON plan and emit one JSON line per run.
    Sweep(SweepArgs),
}

/// Where the store lives.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Store backend. Only `redis` is supported.
    ///
    /// Environment variable: `DB_TYPE`
    #[arg(short = 'T', long, env = "DB_TYPE", default_value_t = String::from("redis"))]
    pub db_type: String,

    /// Store address as `host:port`.
    ///
    /// Environment variable: `REDIS_ADDR`
    #[arg(short = 'a', long, env = "REDIS_ADDR", default_value_t = String::from("localhost:6379"))]
    pub addr: String,

    /// Password for `AUTH`. Empty means no authentication.
    ///
    /// Environment variable: `REDIS_PASSWORD`
    #[arg(short = 'p', long, env = "REDIS_PASSWORD", default_value_t = String::new(), hide_env_values = true)]
    pub password: String,
}

/// How a run is executed.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of concurrent loader tasks. Each one owns a contiguous slice of
    /// the key space.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = resp_cost::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Abort the load after this many seconds. `0` waits indefinitely.
    ///
    /// Environment variable: `LOAD_TIMEOUT_SECS`
    #[arg(long, env = "LOAD_TIMEOUT_SECS", default_value_t = 0)]
    pub timeout_secs: u64,

    /// Refuse to run when an identifier width cannot keep its population
    /// unique, instead of warning.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Identifier alphabet: `decimal` or `base62`.
    #[arg(long, default_value_t = String::from("decimal"))]
    pub alphabet: String,

    /// SCAN the whole key space after loading.
    #[arg(long, default_value_t = false)]
    pub walk: bool,

    /// Delay between `INFO memory` samples while waiting for a flush to be
    /// reclaimed.
    ///
    /// Environment variable: `RECLAIM_POLL_MS`
    #[arg(long, env = "RECLAIM_POLL_MS", default_value_t = 100)]
    pub reclaim_poll_ms: u64,

    /// Give up waiting for reclaim after this many samples.
    ///
    /// Environment variable: `RECLAIM_MAX_POLLS`
    #[arg(long, env = "RECLAIM_MAX_POLLS", default_value_t = 600)]
    pub reclaim_max_polls: usize,
}

#[derive(Args, Debug, Clone)]
pub struct PopulateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Flush the store and wait for memory to settle before loading.
    #[arg(short = 'e', long, default_value_t = false)]
    pub empty: bool,

    /// Data type: string, hash, list, set or zset.
    #[arg(short = 't', long = "type", default_value_t = String::from("string"))]
    pub kind: String,

    #[arg(short = 'c', long, default_value_t = 1000)]
    pub key_count: u64,

    #[arg(short = 'k', long, default_value_t = 16)]
    pub key_size: usize,

    /// Fields per hash, or elements per list, set and zset.
    #[arg(short = 'f', long, default_value_t = 5)]
    pub field_count: u64,

    #[arg(short = 'F', long, default_value_t = 16)]
    pub field_size: usize,

    #[arg(short = 's', long, default_value_t = 64)]
    pub value_size: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// JSON file holding the list of workload groups.
    #[arg(long)]
    pub plan: PathBuf,

    /// Append results here instead of writing them to stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl TryFrom<ConnectionArgs> for ConnectionConfig {
    type Error = anyhow::Error;

    fn try_from(args: ConnectionArgs) -> Result<Self, Self::Error> {
        if !SUPPORTED_BACKENDS.contains(&args.db_type.as_str()) {
            bail!(
                "unsupported db type `{}` (supported: {})",
                args.db_type,
                SUPPORTED_BACKENDS.join(", ")
            );
        }

        let (host, port) = split_addr(&args.addr)?;
        Ok(Self {
            host,
            port,
            password: Some(args.password).filter(|p| !p.is_empty()),
        })
    }
}

impl core::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn split_addr(addr: &str) -> anyhow::Result<(String, u16)> {
    let Some((host, port)) = addr.rsplit_once(':') else {
        bail!("address `{addr}` must be host:port");
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        bail!("address `{addr}` has an empty host");
    }
    let port = port
        .parse()
        .with_context(|| format!("invalid port in address `{addr}`"))?;
    Ok((host.to_string(), port))
}

/// Settings shared by `populate` and `sweep`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub alphabet: Alphabet,
    pub session: SessionConfig,
}

impl RunConfig {
    fn from_args(args: RunArgs, empty_first: bool) -> anyhow::Result<Self> {
        if args.workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }
        if args.reclaim_max_polls == 0 {
            bail!("RECLAIM_MAX_POLLS must be greater than 0");
        }
        let alphabet = args
            .alphabet
            .parse::<Alphabet>()
            .map_err(anyhow::Error::msg)?;

        let session = SessionConfig {
            empty_first,
            walk_keys: args.walk,
            policy: if args.strict {
                UniquenessPolicy::Strict
            } else {
                UniquenessPolicy::Warn
            },
            reclaim: ReclaimConfig {
                poll_interval: Duration::from_millis(args.reclaim_poll_ms),
                max_polls: args.reclaim_max_polls,
                ..ReclaimConfig::default()
            },
            loader: LoaderConfig {
                num_workers: args.workers,
                load_timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
            },
            ..SessionConfig::default()
        };

        Ok(Self { alphabet, session })
    }
}

/// Validated `populate` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulateConfig {
    pub connection: ConnectionConfig,
    pub spec: WorkloadSpec,
    pub run: RunConfig,
}

impl TryFrom<PopulateArgs> for PopulateConfig {
    type Error = anyhow::Error;

    fn try_from(args: PopulateArgs) -> Result<Self, Self::Error> {
        let connection = ConnectionConfig::try_from(args.connection)?;
        let run = RunConfig::from_args(args.run, args.empty)?;

        let spec = WorkloadSpec {
            kind: args.kind.parse::<DataKind>()?,
            key_count: args.key_count,
            key_size: args.key_size,
            field_count: args.field_count,
            field_size: args.field_size,
            value_size: args.value_size,
        };
        spec.validate()?;

        Ok(Self {
            connection,
            spec,
            run,
        })
    }
}

/// Validated `sweep` invocation. Every run of a sweep empties the store
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub connection: ConnectionConfig,
    pub run: RunConfig,
    pub plan: PathBuf,
    pub output: Option<PathBuf>,
}

impl TryFrom<SweepArgs> for SweepConfig {
    type Error = anyhow::Error;

    fn try_from(args: SweepArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            connection: ConnectionConfig::try_from(args.connection)?,
            run: RunConfig::from_args(args.run, true)?,
            plan: args.plan,
            output: args.output,
        })
    }
}
