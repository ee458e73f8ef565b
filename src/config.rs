use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Field ids of the Google Form that receives finished sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormConfig {
    pub base_url: String,
    pub date_entry: String,
    pub pulse_before_entry: String,
    pub pulse_after_entry: String,
    pub session_entry: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            base_url: "https://docs.google.com/forms/d/e/1FAIpQLSeM3r6WtXCYD7nzH6RMCfXAriTnWT9fXWh-1JQPWZjHvyCOcg/viewform?usp=pp_url".to_string(),
            date_entry: "entry.1646637161".to_string(),
            pulse_before_entry: "entry.514818379".to_string(),
            pulse_after_entry: "entry.1947971010".to_string(),
            session_entry: "entry.185983801".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sound: bool,
    pub require_api_key: bool,
    pub api_key_env: String,
    pub history_csv: bool,
    pub exercises_path: Option<PathBuf>,
    pub form: FormConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sound: true,
            require_api_key: true,
            api_key_env: "GEMINI_API_KEY".to_string(),
            history_csv: true,
            exercises_path: None,
            form: FormConfig::default(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "pulsepower") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("pulsepower_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileConfigStore {
    /// Load the config, writing the defaults out on first run so there is a file to edit
    pub fn load_or_init(&self) -> Config {
        if self.path.exists() {
            return self.load();
        }
        let cfg = Config::default();
        match self.save(&cfg) {
            Ok(()) => info!(path = %self.path.display(), "wrote default config"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not write default config"),
        }
        cfg
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
