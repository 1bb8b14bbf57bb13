//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::Parser;

/// Runtime configuration of the server.
///
/// Every option can also be given through the environment variable named
/// next to it.
#[derive(Parser, Debug, Clone)]
#[command(name = "pushbench")]
#[command(about = "Synthetic HTTP/2 workload generator for push experiments")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:443")]
    pub listen: SocketAddr,

    /// PEM certificate chain; a self-signed certificate is generated when missing
    #[arg(long, env = "CERT_FILE", requires = "key_file")]
    pub cert_file: Option<PathBuf>,

    /// PEM private key matching `--cert-file`
    #[arg(long, env = "KEY_FILE", requires = "cert_file")]
    pub key_file: Option<PathBuf>,

    /// Host name the generated certificate is issued for
    #[arg(long, env = "DOMAIN_NAME", default_value = "localhost")]
    pub domain_name: String,

    /// Gzip benchmark responses for clients that accept it
    #[arg(long, env = "COMPRESS", value_parser = FalseyValueParser::new())]
    pub compress: bool,

    /// Directory served for every path other than /api
    #[arg(long, env = "STATIC_DIR", default_value = "./static")]
    pub static_dir: PathBuf,

    /// Pushed resources remembered per connection by cache-aware push
    #[arg(long, env = "PUSH_CAPACITY", default_value_t = crate::push::DEFAULT_CAPACITY)]
    pub push_capacity: usize,

    /// Time allowed for the TLS and HTTP/2 handshakes
    #[arg(long, env = "HANDSHAKE_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    pub handshake_timeout: Duration,

    /// Close connections without streams in flight for this long; 0 disables
    #[arg(long, env = "IDLE_TIMEOUT", default_value = "5m", value_parser = parse_duration)]
    pub idle_timeout: Duration,

    /// Idle time before TCP keepalive probes are sent
    #[arg(long, env = "TCP_KEEPALIVE", value_parser = parse_duration)]
    pub tcp_keepalive: Option<Duration>,

    /// SETTINGS_MAX_CONCURRENT_STREAMS advertised to clients
    #[arg(long, env = "MAX_CONCURRENT_STREAMS")]
    pub max_concurrent_streams: Option<u32>,

    /// Log filter directives
    #[arg(long, env = "RUST_LOG", default_value = crate::trace::DEFAULT_FILTER)]
    pub log_filter: String,
}

/// Parse a duration like "10s", "500ms" or a bare number of seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }
    s.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("invalid duration: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("pushbench").chain(args.iter().copied()))
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("3"), Ok(Duration::from_secs(3)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--listen",
            "127.0.0.1:8443",
            "--compress",
            "--push-capacity",
            "8",
            "--handshake-timeout",
            "2s",
            "--max-concurrent-streams",
            "100",
            "--idle-timeout",
            "90s",
        ])
        .unwrap();
        assert_eq!(config.listen, "127.0.0.1:8443".parse().unwrap());
        assert!(config.compress);
        assert_eq!(config.push_capacity, 8);
        assert_eq!(config.handshake_timeout, Duration::from_secs(2));
        assert_eq!(config.max_concurrent_streams, Some(100));
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn certificate_needs_key() {
        assert!(parse(&["--cert-file", "cert.pem"]).is_err());
        let config = parse(&["--cert-file", "cert.pem", "--key-file", "key.pem"]).unwrap();
        assert_eq!(config.key_file, Some(PathBuf::from("key.pem")));
    }
}
