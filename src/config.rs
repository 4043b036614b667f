use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
///
/// Load order: defaults, then the YAML config file, then environment
/// variable overrides (`MARKUP_PORT`, `MARKUP_DATA_DIR`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Directory holding uploaded images and project snapshots.
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("markup-server"),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults.
    ///
    /// The config file location itself resolves as: explicit path (CLI) >
    /// `MARKUP_CONFIG` > the platform default.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("MARKUP_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        if let Ok(port) = std::env::var("MARKUP_PORT") {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        if let Ok(data_dir) = std::env::var("MARKUP_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        Ok(config)
    }

    /// Default config file path: `<config dir>/markup-server/config.yaml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("markup-server")
            .join("config.yaml")
    }

    /// Directory for uploaded image files.
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Directory for persisted project snapshots.
    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidPort(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidPort(value) => {
                write!(f, "Invalid MARKUP_PORT value '{}'", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(config
            .data_dir
            .to_string_lossy()
            .contains("markup-server"));
    }

    #[test]
    fn test_load_no_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "port: 4100").unwrap();
        writeln!(file, "data_dir: /srv/markup").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.data_dir, PathBuf::from("/srv/markup"));
        assert_eq!(config.images_dir(), PathBuf::from("/srv/markup/images"));
        assert_eq!(config.projects_dir(), PathBuf::from("/srv/markup/projects"));
    }

    #[test]
    fn test_markup_config_env_points_at_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "port: 4200\n").unwrap();

        std::env::set_var("MARKUP_CONFIG", &config_path);
        let config = Config::load(None).unwrap();
        std::env::remove_var("MARKUP_CONFIG");

        assert_eq!(config.port, 4200);
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "port: [not a number").unwrap();

        let result = Config::load(Some(config_path));
        assert!(matches!(result, Err(ConfigError::ParseError(_, _))));
    }
}
