use std::path::PathBuf;

use crate::models::settings::{
    AppSettings, CredentialSettings, InstagramCredentials, RedditCredentials,
};

const SETTINGS_FILE: &str = "settings.json";

pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ANYFETCH_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("anyfetch"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE)
}

/// Loads settings from the JSON file, falling back to defaults, then layers
/// the environment overrides on top. Never fails; a broken settings file
/// just means defaults.
pub async fn load_settings() -> AppSettings {
    let mut settings = match tokio::fs::read_to_string(settings_path()).await {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("[config] settings file unreadable, using defaults: {}", e);
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    };
    apply_env_overrides(&mut settings);
    settings
}

pub async fn save_settings(settings: &AppSettings) -> anyhow::Result<()> {
    let path = settings_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    tokio::fs::write(&path, json).await?;
    Ok(())
}

/// The original deployment configured everything through environment
/// variables; those names keep working and win over the file.
fn apply_env_overrides(settings: &mut AppSettings) {
    if let Ok(dir) = std::env::var("ANYFETCH_DOWNLOAD_DIR") {
        settings.download.base_dir = PathBuf::from(dir);
    }

    if let (Ok(username), Ok(password)) = (
        std::env::var("INSTAGRAM_USERNAME"),
        std::env::var("INSTAGRAM_PASSWORD"),
    ) {
        if !username.is_empty() && !password.is_empty() {
            settings.credentials.instagram = Some(InstagramCredentials { username, password });
        }
    }

    if let (Ok(client_id), Ok(client_secret)) = (
        std::env::var("REDDIT_CLIENT_ID"),
        std::env::var("REDDIT_CLIENT_SECRET"),
    ) {
        if !client_id.is_empty() && !client_secret.is_empty() {
            settings.credentials.reddit = Some(RedditCredentials {
                client_id,
                client_secret,
                username: std::env::var("REDDIT_USERNAME").ok().filter(|s| !s.is_empty()),
                password: std::env::var("REDDIT_PASSWORD").ok().filter(|s| !s.is_empty()),
            });
        }
    }
}

/// Which platforms have credentials configured, without leaking secrets.
pub fn credential_summary(credentials: &CredentialSettings) -> serde_json::Value {
    serde_json::json!({
        "instagram": {
            "configured": credentials.instagram.is_some(),
            "username": credentials.instagram.as_ref().map(|c| c.username.clone()),
        },
        "reddit": {
            "configured": credentials.reddit.is_some(),
            "has_user_auth": credentials
                .reddit
                .as_ref()
                .map(|c| c.username.is_some() && c.password.is_some())
                .unwrap_or(false),
        },
        "youtube": {
            "configured": true,
            "note": "streaming extraction works without authentication",
        },
    })
}
