use clap::Parser;
use std::time::Duration;

/// Fuse length of the hot potato unless overridden.
pub const DEFAULT_BOMB_FUSE_SECS: u64 = 30;
/// Longest fuse the server accepts.
pub const MAX_BOMB_FUSE_SECS: u64 = 3600;

#[derive(Debug, Clone, Parser)]
#[command(name = "kingscup-server")]
#[command(about = "Authoritative session server for one shared King's Cup table")]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to bind
    #[arg(short, long, env = "PORT", default_value_t = 9001)]
    pub port: u16,
    /// Seconds before an armed hot potato explodes
    #[arg(
        long,
        env = "BOMB_FUSE_SECS",
        default_value_t = DEFAULT_BOMB_FUSE_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_BOMB_FUSE_SECS)
    )]
    pub bomb_fuse_secs: u64,
}

impl Args {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            bomb_fuse: Duration::from_secs(self.bomb_fuse_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub bomb_fuse: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            bomb_fuse: Duration::from_secs(DEFAULT_BOMB_FUSE_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from(["kingscup-server", "--port", "3000", "--bomb-fuse-secs", "5"]).unwrap();
        assert_eq!(args.port, 3000);
        assert_eq!(args.session_config().bomb_fuse, Duration::from_secs(5));
        assert!(args.listen_addr().ends_with(":3000"));
    }

    #[test]
    fn fuse_outside_bounds_is_rejected() {
        for bad in ["0", "3601", "18446744073709551615"] {
            assert!(Args::try_parse_from(["kingscup-server", "--bomb-fuse-secs", bad]).is_err());
        }
        let args = Args::try_parse_from(["kingscup-server", "--bomb-fuse-secs", "3600"]).unwrap();
        assert_eq!(args.bomb_fuse_secs, MAX_BOMB_FUSE_SECS);
    }

    #[test]
    fn default_fuse_is_thirty_seconds() {
        assert_eq!(SessionConfig::default().bomb_fuse, Duration::from_secs(30));
    }
}
