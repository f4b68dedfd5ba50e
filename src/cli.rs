use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const DEFAULT_CONFIG_PATH: &str = "./codecritic.jsonc";

pub fn config_path_from_args() -> Result<PathBuf> {
    parse_config_path(env::args().skip(1))
}

fn parse_config_path(args: impl IntoIterator<Item = String>) -> Result<PathBuf> {
    let mut args = args.into_iter();
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --config"))?;
                config_path = Some(PathBuf::from(value));
            }
            other => match other.strip_prefix("--config=") {
                Some(value) if !value.is_empty() => config_path = Some(PathBuf::from(value)),
                _ => {
                    return Err(anyhow!(
                        "unknown argument: {other}. usage: codecritic [--config <path>]"
                    ));
                }
            },
        }
    }

    Ok(config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)))
}
