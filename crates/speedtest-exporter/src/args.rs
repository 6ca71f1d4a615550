//! Command-line flags layered over the configuration file.

use crate::config::Config;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Prometheus exporter that runs a speedtest on every scrape
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file; the standard locations are searched when omitted.
    #[arg(long, env = "SPEEDTEST_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listening port to expose metrics on.
    #[arg(long, env = "SPEEDTEST_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Speedtest.net server ID to run the test against; the closest server is used when omitted.
    #[arg(long = "server-id", env = "SPEEDTEST_SERVER_ID")]
    pub server_id: Option<u64>,

    /// Fall back to the closest server if the given server ID is not available.
    /// `--server-fallback=false` overrides a configured `true`.
    #[arg(
        long = "server-fallback",
        env = "SPEEDTEST_SERVER_FALLBACK",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub server_fallback: Option<bool>,

    /// Timeout in seconds for a whole scrape.
    #[arg(long, env = "SPEEDTEST_EXPORTER_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl Args {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.listen_addr = with_port(&config.server.listen_addr, port);
        }
        if let Some(id) = self.server_id {
            config.speedtest.server_id = Some(id);
        }
        if let Some(fallback) = self.server_fallback {
            config.speedtest.server_fallback = fallback;
        }
        if let Some(secs) = self.timeout {
            config.server.scrape_timeout = Duration::from_secs(secs);
        }
    }
}

fn with_port(listen_addr: &str, port: u16) -> String {
    match listen_addr.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("0.0.0.0:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "speedtest-exporter",
            "--port",
            "9798",
            "--server-id",
            "42",
            "--server-fallback",
            "--timeout",
            "90",
        ])
        .unwrap();

        assert_eq!(args.port, Some(9798));
        assert_eq!(args.server_id, Some(42));
        assert_eq!(args.server_fallback, Some(true));
        assert_eq!(args.timeout, Some(90));
    }

    #[test]
    fn test_parse_fallback_values() {
        let args = Args::try_parse_from(["speedtest-exporter", "--server-fallback=false"]).unwrap();
        assert_eq!(args.server_fallback, Some(false));

        let args = Args::try_parse_from(["speedtest-exporter", "--server-fallback=true"]).unwrap();
        assert_eq!(args.server_fallback, Some(true));

        let args = Args::try_parse_from(["speedtest-exporter"]).unwrap();
        assert_eq!(args.server_fallback, None);
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let mut config = Config::default();
        config.speedtest.server_fallback = true;

        let args = Args {
            server_fallback: Some(false),
            ..Args::default()
        };
        args.apply(&mut config);
        assert!(!config.speedtest.server_fallback);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let args = Args {
            port: Some(9798),
            server_id: Some(42),
            server_fallback: Some(true),
            timeout: Some(90),
            ..Args::default()
        };

        args.apply(&mut config);
        assert_eq!(config.server.listen_addr, "0.0.0.0:9798");
        assert_eq!(config.speedtest.server_id, Some(42));
        assert!(config.speedtest.server_fallback);
        assert_eq!(config.server.scrape_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = Config::default();
        config.speedtest.server_id = Some(7);
        config.speedtest.server_fallback = true;

        Args::default().apply(&mut config);
        assert_eq!(config.speedtest.server_id, Some(7));
        assert!(config.speedtest.server_fallback);
        assert_eq!(config.server.listen_addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_with_port() {
        assert_eq!(with_port("127.0.0.1:9090", 80), "127.0.0.1:80");
        assert_eq!(with_port("[::]:9090", 80), "[::]:80");
        assert_eq!(with_port("garbage", 80), "0.0.0.0:80");
    }
}
