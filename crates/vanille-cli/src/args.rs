use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vanille")]
#[command(
    about = "Send admin actions to a Vanille site and manage its local cache",
    long_about = None
)]
pub struct Cli {
    /// Site configuration (JSON or TOML)
    #[arg(short, long, env = "VANILLE_CONFIG", global = true, default_value = "vanille.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dispatch an action to the site
    Dispatch(DispatchCmd),
    /// Inspect or edit the local cache
    #[command(subcommand)]
    Cache(CacheCmd),
}

#[derive(Args, Debug)]
pub struct DispatchCmd {
    /// Action name, without the namespace prefix
    #[arg(short, long)]
    pub action: Option<String>,

    /// Rest endpoint name
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Security token (nonce for Legacy, header token for Rest)
    #[arg(short, long, env = "VANILLE_TOKEN")]
    pub token: Option<String>,

    /// Force the Rest transport
    #[arg(long, conflicts_with = "legacy")]
    pub rest: bool,

    /// Force the Legacy transport
    #[arg(long)]
    pub legacy: bool,

    #[arg(short, long, value_enum, default_value_t = MethodArg::Post)]
    pub method: MethodArg,

    /// Payload field as key=value. Dotted keys nest one level (settings.limit=int|5)
    #[arg(short, long = "data", value_name = "KEY=VALUE")]
    pub data: Vec<String>,

    /// File to upload (Legacy only)
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Extra request header as name=value (Rest only)
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,

    /// Timeout in seconds, overriding the configuration. 0 disables it
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Post,
    Delete,
}

#[derive(Subcommand, Debug)]
pub enum CacheCmd {
    /// Print a cached value
    Get {
        key: String,
        #[command(flatten)]
        store: StoreArg,
    },
    /// Store a JSON value (plain text is stored as a string)
    Put {
        key: String,
        value: String,
        /// Lifetime in seconds; without it the entry never expires
        #[arg(long)]
        ttl: Option<u64>,
        #[command(flatten)]
        store: StoreArg,
    },
    /// Remove a cached value
    Remove {
        key: String,
        #[command(flatten)]
        store: StoreArg,
    },
    /// Remove this site's entries
    Purge {
        /// Clear the whole store, including other namespaces
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        store: StoreArg,
    },
}

#[derive(Args, Debug)]
pub struct StoreArg {
    /// Cache file
    #[arg(long = "store", env = "VANILLE_STORE", default_value = "vanille-cache.json")]
    pub path: PathBuf,
}
