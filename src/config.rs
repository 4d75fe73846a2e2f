// Runtime configuration shared by both binaries
//
// Flags fall back to environment variables (a `.env` file is loaded first).

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_DB: &str = "docket.db";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

/// Where the docket lives
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// SQLite database file
    #[arg(long, env = "DOCKET_DB", default_value = DEFAULT_DB)]
    pub db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// API server settings
#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Address the API listens on
    #[arg(long, env = "DOCKET_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,
}

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "case_docket={level},docket_server={level},tower_http={level}",
            level = log_level
        ))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Same as [`init_tracing`] but writes to a file; the terminal board owns stdout.
pub fn init_file_tracing(log_level: &str, path: &std::path::Path) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("case_docket={}", log_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        server: ServerArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::try_parse_from(["docket-server"]).unwrap();
        assert_eq!(cli.server.listen, DEFAULT_LISTEN.parse::<SocketAddr>().unwrap());
        assert_eq!(cli.server.store.log_level, "info");
    }

    #[test]
    fn test_flags_override() {
        let cli = TestCli::try_parse_from([
            "docket-server",
            "--db",
            "/tmp/firm.db",
            "--listen",
            "0.0.0.0:8080",
        ])
        .unwrap();
        assert_eq!(cli.server.store.db, PathBuf::from("/tmp/firm.db"));
        assert_eq!(cli.server.listen.port(), 8080);
    }
}
