//! Process configuration: listen address and the on-disk log root.
//! Out of THE CORE per spec §1 (launcher/CLI is an external
//! collaborator), but still part of a runnable binary.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "kafka-broker-lite", about = "A subset Kafka protocol server")]
pub struct Cli {
    /// Host to bind the listener to.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port to bind the listener to.
    #[arg(long, default_value_t = 9092)]
    pub port: u16,

    /// Root directory of the KRaft-combined on-disk log.
    #[arg(long, default_value = "/tmp/kraft-combined-logs")]
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_dir: PathBuf,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            log_dir: cli.log_dir,
        }
    }
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9092,
            log_dir: PathBuf::from("/tmp/kraft-combined-logs"),
        }
    }
}
