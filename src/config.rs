use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::OrderError;
use crate::payload::DocumentSettings;

// Seeded into <data_root>/form.toml on first run
pub const DEFAULT_FORM_TEMPLATE: &str = include_str!("../form.toml");

pub const DEFAULT_API_BASE_URL: &str = "https://api.yeshinvoice.co.il";

#[derive(Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub data_root: String,
}

/// API keys for the invoicing service. Kept in the user's config directory,
/// outside the data root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub secret: String,
    pub userkey: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    pub catalog: String,
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    pub customers: CustomerSource,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub document: DocumentSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CustomerSource {
    Csv { path: String },
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub search_page_size: u32,
    pub lookup_page_size: u32,
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            search_page_size: 20,
            lookup_page_size: 1000,
            timeout_secs: None,
        }
    }
}

fn default_image_dir() -> String {
    ".".to_string()
}

impl FormConfig {
    pub fn catalog_path(&self, root: &Path) -> PathBuf {
        resolve_path(root, &self.catalog)
    }

    pub fn image_root(&self, root: &Path) -> PathBuf {
        resolve_path(root, &self.image_dir)
    }
}

/// Relative paths in form.toml are relative to the data root.
pub fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let expanded = PathBuf::from(expand_home_dir(path));
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

fn config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "order-form", "app") {
        let dir = proj_dirs.config_dir();
        if !dir.exists() {
            fs::create_dir_all(dir).ok();
        }
        return dir.to_path_buf();
    }
    PathBuf::from(".")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn credentials_path() -> PathBuf {
    config_dir().join("credentials.toml")
}

pub fn load_settings() -> Option<AppSettings> {
    let path = settings_path();
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

pub fn save_settings(settings: &AppSettings) -> Result<(), OrderError> {
    write_toml(&settings_path(), settings)
}

pub fn load_credentials() -> Result<Credentials, OrderError> {
    let path = credentials_path();
    let content = fs::read_to_string(&path).map_err(|_| {
        OrderError::Config(format!(
            "no API credentials at {}, run `order-form config`",
            path.display()
        ))
    })?;
    let creds: Credentials = toml::from_str(&content)
        .map_err(|e| OrderError::Config(format!("{}: {}", path.display(), e)))?;
    if creds.secret.trim().is_empty() || creds.userkey.trim().is_empty() {
        return Err(OrderError::Config("API credentials are empty".to_string()));
    }
    Ok(creds)
}

pub fn save_credentials(creds: &Credentials) -> Result<(), OrderError> {
    write_toml(&credentials_path(), creds)
}

/// Reads <root>/form.toml, writing the default template first if missing.
pub fn load_form_config(root: &Path) -> Result<FormConfig, OrderError> {
    let path = root.join("form.toml");
    if !path.exists() {
        info!(path = %path.display(), "initializing default form configuration");
        fs::write(&path, DEFAULT_FORM_TEMPLATE)
            .map_err(|e| OrderError::Config(format!("{}: {}", path.display(), e)))?;
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| OrderError::Config(format!("{}: {}", path.display(), e)))?;
    let config = parse_form_config(&content)
        .map_err(|e| OrderError::Config(format!("{}: {}", path.display(), e)))?;
    debug!(customers = ?config.customers, draft = config.document.draft, "form configuration loaded");
    Ok(config)
}

pub fn parse_form_config(content: &str) -> Result<FormConfig, toml::de::Error> {
    toml::from_str(content)
}

fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), OrderError> {
    let toml_str = toml::to_string_pretty(value).map_err(|e| OrderError::Config(e.to_string()))?;
    fs::write(path, toml_str).map_err(|e| OrderError::Config(format!("{}: {}", path.display(), e)))
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_parses() {
        let config = parse_form_config(DEFAULT_FORM_TEMPLATE).unwrap();
        assert_eq!(config.catalog, "data/products.csv");
        assert_eq!(
            config.customers,
            CustomerSource::Csv { path: "data/customers.csv".into() }
        );
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api.search_page_size, 20);
        assert_eq!(config.api.lookup_page_size, 1000);
        assert_eq!(config.document.vat_percentage, 18.0);
        assert!(config.document.draft);
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config = parse_form_config(
            "catalog = \"products.csv\"\n[customers]\nsource = \"remote\"\n[document]\ndraft = false\nvat_percentage = 17\n",
        )
        .unwrap();
        assert_eq!(config.customers, CustomerSource::Remote);
        assert_eq!(config.image_dir, ".");
        assert_eq!(config.api.lookup_page_size, 1000);
        assert!(!config.document.draft);
        assert_eq!(config.document.vat_percentage, 17.0);
        assert_eq!(config.document.currency_id, 2);
        assert_eq!(config.document.due_days, 30);
    }

    #[test]
    fn resolves_relative_paths_against_root() {
        let root = Path::new("/srv/orders");
        assert_eq!(
            resolve_path(root, "data/products.csv"),
            PathBuf::from("/srv/orders/data/products.csv")
        );
        assert_eq!(resolve_path(root, "/tmp/p.csv"), PathBuf::from("/tmp/p.csv"));
    }
}
