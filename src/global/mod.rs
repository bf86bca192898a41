use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "meetbot";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .context("Unable to determine config directory")
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_app_dir() {
        if let Ok(path) = config_file() {
            assert!(path.ends_with("meetbot/config.toml"));
        }
    }
}
