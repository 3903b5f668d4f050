//! CLI argument definitions for the PostgreSQL backend.

use clap::Args;

/// PostgreSQL connection arguments.
#[derive(Args, Clone, Debug)]
pub struct PostgreSQLArgs {
    /// PostgreSQL connection string
    /// (e.g., "host=localhost port=15432 user=benchmark password=benchmark dbname=benchmark")
    #[arg(long, env = "POSTGRES_CONNECTION_STRING")]
    pub postgres_connection_string: String,

    /// Number of server connections to spread loaders over
    #[arg(long, default_value = "4")]
    pub postgres_connections: usize,
}
