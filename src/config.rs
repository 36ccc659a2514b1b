use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{Duration, NaiveTime};
use dotenvy::dotenv;

use crate::service::report::ReportSettings;
use crate::utils::time_utils::parse_clock;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_device_per_min: u32,

    // Attendance rules
    pub late_cutoff: NaiveTime,
    pub report_max_days: u32,
    pub class_presence_lookback_minutes: Option<u32>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));

        let late_cutoff = match lookup("LATE_CUTOFF") {
            Some(raw) => parse_clock(&raw)
                .ok_or_else(|| anyhow!("LATE_CUTOFF must be HH:MM:SS, got {raw:?}"))?,
            None => NaiveTime::from_hms_opt(8, 0, 0).context("default cutoff")?,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,
            rate_device_per_min: parse_or(&lookup, "RATE_DEVICE_PER_MIN", 120)?,

            late_cutoff,
            report_max_days: parse_or(&lookup, "REPORT_MAX_DAYS", 366)?,
            class_presence_lookback_minutes: lookup("CLASS_PRESENCE_LOOKBACK_MINUTES")
                .map(|raw| parse_value("CLASS_PRESENCE_LOOKBACK_MINUTES", &raw))
                .transpose()?,
        })
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            late_cutoff: self.late_cutoff,
            max_days: self.report_max_days,
            presence_lookback: self
                .class_presence_lookback_minutes
                .map(|m| Duration::minutes(i64::from(m))),
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("{key} has an invalid value {raw:?}"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
