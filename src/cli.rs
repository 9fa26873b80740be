use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Default, Parser)]
#[command(name = "memrydb")]
#[command(about = "An in-memory, sharded key-value store")]
#[command(long_about = "memrydb serves GET/SET/DEL over a length-prefixed TCP protocol, one request per connection")]
#[command(version)]
pub struct Cli {
    /// Server host to bind to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Server port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Number of shards (0 = default of 32)
    #[arg(short, long)]
    pub shards: Option<u8>,

    /// Configuration file path (JSON format, defaults to ./config.json if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Default log filter directive, overridden by `RUST_LOG`.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
