use std::path::PathBuf;

use crate::error::Result;
use biblio_app::state::AppConfig;
pub use clap::Parser;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "BIBLIO_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "BIBLIO_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "BIBLIO_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the server as visible to clients, used for absolute links"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "BIBLIO_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/biblio.db, where data-dir is set by --data-dir"
    )]
    pub database_url: Option<String>,

    #[arg(
        long,
        env = "BIBLIO_DATA_DIR",
        help = "Data directory for the database, default is system default like ~/.local/share/biblio",
        default_value_t = default_data_dir()
    )]
    pub data_dir: String,

    #[arg(
        long,
        env = "BIBLIO_DEFAULT_PAGE_SIZE",
        default_value = "10",
        help = "Default page size"
    )]
    pub default_page_size: u32,

    #[arg(
        long,
        env = "BIBLIO_MAX_PAGE_SIZE",
        default_value = "100",
        help = "Upper limit for page size requested by clients"
    )]
    pub max_page_size: u32,

    #[arg(long, env = "BIBLIO_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("biblio"))
        .unwrap_or_else(|| PathBuf::from("biblio"))
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/biblio.db", self.data_dir))
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        let default_page_size = config.default_page_size.max(1);
        AppConfig {
            base_url: config.base_url.clone(),
            default_page_size,
            max_page_size: config.max_page_size.max(default_page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["biblio-server", "--data-dir", "/tmp/biblio"]).unwrap();
        assert_eq!(3000, config.port);
        assert_eq!("sqlite:///tmp/biblio/biblio.db", config.database_url());
        let app_config: AppConfig = (&config).into();
        assert_eq!(10, app_config.default_page_size);
        assert_eq!(100, app_config.max_page_size);
        assert!(!config.cors);
    }

    #[test]
    fn test_page_size_limits_consistent() {
        let config = ServerConfig::try_parse_from([
            "biblio-server",
            "--default-page-size",
            "50",
            "--max-page-size",
            "20",
        ])
        .unwrap();
        let app_config: AppConfig = (&config).into();
        assert_eq!(50, app_config.default_page_size);
        assert_eq!(50, app_config.max_page_size);
    }
}
