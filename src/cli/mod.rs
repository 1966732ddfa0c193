// CLI module for embedcache

use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// embedcache - prediction service with a risk-driven adaptive embedding cache
#[derive(Parser, Debug)]
#[command(name = "embedcache", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.embedcache/config.toml if present)
    #[arg(short, long, env = "EMBEDCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind, overriding the config file
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overriding the config file
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Args {
    /// Apply CLI overrides, the highest-precedence configuration source.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from(["embedcache", "--host", "0.0.0.0", "-p", "9100"]);
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert!(args.config.is_none());
    }
}
