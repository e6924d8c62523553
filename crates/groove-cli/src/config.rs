use std::path::PathBuf;

use groove_services::ClockConfig;

#[derive(serde::Serialize, serde::Deserialize, Default)]
pub(crate) struct AppConfig {
    #[serde(default)]
    pub playback: ClockConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
pub(crate) struct LibraryConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Grid store location: configured, else the platform data dir
    pub fn data_dir(&self) -> PathBuf {
        self.library.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("groove")
        })
    }
}

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("groove")
        .join("config.toml")
}

pub(crate) fn load_config() -> AppConfig {
    let path = config_path();
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|s| toml::from_str(&s).ok())
        .unwrap_or_default()
}
