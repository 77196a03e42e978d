use std::{collections::HashMap, fs};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub sheet_id: String,
    pub worksheet: String,
    pub video_column: String,
    pub webhook_url: Option<String>,
    pub service_account_path: Option<String>,
    pub sheets_base_url: Option<String>,
    pub cache_ttl_seconds: u64,
    pub items_per_page: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet_id: String::new(),
            worksheet: "Sheet1".into(),
            video_column: "Video URL".into(),
            webhook_url: None,
            service_account_path: None,
            sheets_base_url: None,
            cache_ttl_seconds: 600,
            items_per_page: 10,
        }
    }
}

/// Defaults, then `sheetcast.toml` in the working directory, then
/// `SHEETCAST__*` environment variables, each layer overriding the last.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("sheetcast.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("sheet_id") {
                settings.sheet_id = v.clone();
            }
            if let Some(v) = file_cfg.get("worksheet") {
                settings.worksheet = v.clone();
            }
            if let Some(v) = file_cfg.get("video_column") {
                settings.video_column = v.clone();
            }
            if let Some(v) = file_cfg.get("webhook_url") {
                settings.webhook_url = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("service_account_path") {
                settings.service_account_path = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("sheets_base_url") {
                settings.sheets_base_url = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("cache_ttl_seconds") {
                if let Ok(parsed) = v.parse::<u64>() {
                    settings.cache_ttl_seconds = parsed;
                }
            }
            if let Some(v) = file_cfg.get("items_per_page") {
                if let Ok(parsed) = v.parse::<usize>() {
                    settings.items_per_page = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("SHEETCAST__SHEET_ID") {
        settings.sheet_id = v;
    }
    if let Ok(v) = std::env::var("SHEETCAST__WORKSHEET") {
        settings.worksheet = v;
    }
    if let Ok(v) = std::env::var("SHEETCAST__VIDEO_COLUMN") {
        settings.video_column = v;
    }
    if let Ok(v) = std::env::var("SHEETCAST__WEBHOOK_URL") {
        settings.webhook_url = Some(v);
    }
    if let Ok(v) = std::env::var("SHEETCAST__SERVICE_ACCOUNT_PATH") {
        settings.service_account_path = Some(v);
    }
    if let Ok(v) = std::env::var("SHEETCAST__SHEETS_BASE_URL") {
        settings.sheets_base_url = Some(v);
    }
    if let Ok(v) = std::env::var("SHEETCAST__CACHE_TTL_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.cache_ttl_seconds = parsed;
        }
    }
    if let Ok(v) = std::env::var("SHEETCAST__ITEMS_PER_PAGE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.items_per_page = parsed;
        }
    }

    settings
}
