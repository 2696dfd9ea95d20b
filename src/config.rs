use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub vision_api_key: String,
    pub vision_endpoint: String,
    pub max_labels: usize,
    pub elasticsearch_url: String,
    pub document_index: String,
    pub tantivy_index_path: String,
    pub web_port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Layers `<dir>/default`, `<dir>/<RUN_MODE>`, `<dir>/local`, then
    /// `IMAGE_TAGGER__*` variables. `VISION_API_KEY` wins over all of them.
    pub fn new(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)))
            .add_source(File::with_name(&format!("{}/{}", config_dir, env)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            .add_source(Environment::with_prefix("IMAGE_TAGGER").separator("__"))
            .set_override_option("vision_api_key", std::env::var("VISION_API_KEY").ok())?
            .build()?;

        s.try_deserialize()
    }
}
