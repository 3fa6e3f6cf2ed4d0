use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use wps_core::device::validate_pin;
use wps_core::EnrolleeConfig;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/wps/enrollee.toml";

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[clap(short, long, value_parser, default_value = DEFAULT_CONFIG_PATH)]
    pub config_file: PathBuf,
}

pub fn load_config(args: &ConfigArgs) -> Result<EnrolleeConfig> {
    load_config_from_path(&args.config_file)
}

pub fn load_config_from_path(path: &Path) -> Result<EnrolleeConfig> {
    let config_contents = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: EnrolleeConfig = toml::from_str(&config_contents)
        .with_context(|| format!("parsing {}", path.display()))?;

    if config.event_queue_depth == 0 {
        warn!("event_queue_depth = 0 in {}; sessions will fail to start", path.display());
    }
    if config.identity != wps_net::wsc::ENROLLEE_IDENTITY {
        warn!("Non-standard EAP identity {:?}", config.identity);
    }
    info!("Loaded {:?} enrollee config from {}", config.method, path.display());
    Ok(config)
}

/// Accepts a PIN with the usual separators (`1234-5670`, `1234 5670`).
pub fn normalize_pin(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(|c| !matches!(c, '-' | ' ')).collect();
    validate_pin(&digits).then_some(digits)
}
