use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;
const MAX_DATE_STRIP_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateStripConfig {
    pub days_before: u32,
    pub days_after: u32,
}

impl Default for DateStripConfig {
    fn default() -> Self {
        Self {
            days_before: 1,
            days_after: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub schema: u8,
    pub app_name: String,
    pub timezone: String,
    pub storage_prefix: String,
    pub retention_days: u32,
    pub default_inbox_limit: u32,
    pub inbox_visible_limit: usize,
    pub date_strip: DateStripConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            app_name: "slate".to_string(),
            timezone: "UTC".to_string(),
            storage_prefix: "slate_app_".to_string(),
            retention_days: 120,
            default_inbox_limit: 15,
            inbox_visible_limit: 3,
            date_strip: DateStripConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.app_name.trim().is_empty() {
            return Err(InfraError::InvalidConfig("appName must not be empty".to_string()));
        }
        if self.storage_prefix.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "storagePrefix must not be empty".to_string(),
            ));
        }
        if self.retention_days == 0 {
            return Err(InfraError::InvalidConfig("retentionDays must be > 0".to_string()));
        }
        if !(1..=99).contains(&self.default_inbox_limit) {
            return Err(InfraError::InvalidConfig(
                "defaultInboxLimit must be between 1 and 99".to_string(),
            ));
        }
        if self.date_strip.days_before > MAX_DATE_STRIP_DAYS
            || self.date_strip.days_after > MAX_DATE_STRIP_DAYS
        {
            return Err(InfraError::InvalidConfig(format!(
                "dateStrip days must be at most {MAX_DATE_STRIP_DAYS}"
            )));
        }
        self.time_zone()?;
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        self.timezone.trim().parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("unknown timezone '{}': {error}", self.timezone))
        })
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let raw = read_config(&config_dir.join(APP_JSON))?;
    let config: AppConfig = serde_json::from_value(raw)?;
    config.validate()?;
    Ok(config)
}
