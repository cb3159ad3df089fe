use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DATA_DIR: &str = ".nameplate";
const CONTACTS_FILE: &str = "contacts.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectoryConfig {
    /// Overrides the default contacts location (`~/.nameplate/contacts.json`).
    pub contacts_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Interactive lookups are abandoned after this many seconds.
    /// `None` waits for the query to finish on its own.
    pub timeout_seconds: Option<u64>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { timeout_seconds: Some(5) }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { directory: DirectoryConfig::default(), lookup: LookupConfig::default() }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        // If config doesn't exist, create default
        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {:?}", config_path))
    }

    /// The contacts file to load: the configured override, or the default
    /// under the home directory.
    pub fn contacts_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.directory.contacts_file {
            return Ok(path.clone());
        }
        let home_dir = dirs::home_dir().context("Could not find home directory")?;
        Ok(home_dir.join(DATA_DIR).join(CONTACTS_FILE))
    }
}

fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "ducktapeai", "nameplate")
        .context("Failed to determine project directories")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.lookup.timeout_seconds, Some(5));
        assert_eq!(parsed.directory.contacts_file, None);
    }

    #[test]
    fn contacts_path_honors_override() {
        let mut config = Config::default();
        config.directory.contacts_file = Some(PathBuf::from("/tmp/contacts.json"));
        assert_eq!(config.contacts_path().unwrap(), PathBuf::from("/tmp/contacts.json"));
    }
}
