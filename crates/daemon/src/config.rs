// SPDX-License-Identifier: MIT

//! CLI configuration (spec §6.1). `--level` and the socket bind addresses
//! come from here; the tuning constants in `MasterConfig` remain fixed, per
//! spec §9's "single immutable configuration record".

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "masterd", about = "Dispatcher master: assigns pipeline jobs to worker hosts")]
pub struct Cli {
    #[arg(long, default_value = "tcp://*:5556")]
    pub master_socket: String,

    #[arg(long, default_value = "tcp://*:5555")]
    pub log_socket: String,

    #[arg(long)]
    pub master_cert: Option<PathBuf>,

    #[arg(long)]
    pub slaves_certs: Option<PathBuf>,

    #[arg(long)]
    pub env: Option<PathBuf>,

    #[arg(long = "env-dut")]
    pub env_dut: Option<PathBuf>,

    #[arg(long)]
    pub dispatchers_config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Debug)]
    pub level: LogLevel,

    #[arg(long)]
    pub encrypt: bool,

    #[arg(long, default_value = "/etc/lava-server/worker.conf")]
    pub role_sentinel: PathBuf,

    #[arg(long, default_value = "/var/log/lava-server/lava-master.log")]
    pub log_file: PathBuf,
}

impl Cli {
    pub fn encryption_enabled(&self) -> bool {
        self.encrypt
    }
}
