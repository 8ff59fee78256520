use crate::catalog::config::split_list;
use std::path::PathBuf;

pub const DEFAULT_BUYERS: &str =
    "OMNIA,HEB,SORIANA,CHEDRAUI,LA COMER,LIVERPOOL,SEARS,3B,CLUBES,DSW,CALIMAX";

/// Process-level settings; catalog settings live in `CatalogConfig`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub image_dir: PathBuf,
    pub buyers: Vec<String>,
    pub image_sync_command: Option<String>,
    pub image_proxy_allowlist: Vec<String>,
    pub export_title: String,
    pub body_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let buyers = std::env::var("BUYERS")
            .ok()
            .map(|raw| split_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| split_list(DEFAULT_BUYERS));
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(3000),
            data_dir: env_path("DATA_DIR", "data"),
            image_dir: env_path("IMAGE_DIR", "public/images"),
            buyers,
            image_sync_command: env_string("IMAGE_SYNC_COMMAND"),
            image_proxy_allowlist: std::env::var("IMAGE_PROXY_ALLOWLIST")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            export_title: env_string("EXPORT_TITLE")
                .unwrap_or_else(|| "Lumina Showroom 2025".to_string()),
            body_limit: std::env::var("REQUEST_MAX_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(100 * 1024 * 1024),
        }
    }

    pub fn cart_path(&self) -> PathBuf {
        self.data_dir.join("cart.json")
    }

    pub fn interactions_path(&self) -> PathBuf {
        self.data_dir.join("interactions.csv")
    }

    pub fn catalog_cache_path(&self) -> PathBuf {
        self.data_dir.join("last.xlsx")
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env_string(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_data_dir() {
        let config = AppConfig {
            port: 3000,
            data_dir: PathBuf::from("/srv/showroom"),
            image_dir: PathBuf::from("/srv/images"),
            buyers: split_list(DEFAULT_BUYERS),
            image_sync_command: None,
            image_proxy_allowlist: Vec::new(),
            export_title: "Showroom".into(),
            body_limit: 1024,
        };
        assert_eq!(config.cart_path(), PathBuf::from("/srv/showroom/cart.json"));
        assert_eq!(config.catalog_cache_path(), PathBuf::from("/srv/showroom/last.xlsx"));
        assert_eq!(config.buyers.len(), 11);
        assert_eq!(config.buyers[4], "LA COMER");
    }
}
