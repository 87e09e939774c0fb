//! Config command handler

use std::str::FromStr;

use reqwest::Url;

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, TimerConfig};
use crate::domain::conversion::{Quality, BITRATE_RANGE, CHANNELS_RANGE, SAMPLE_RATE_RANGE};
use crate::domain::error::ConfigError;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match read_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            read_value(&config, key).as_deref().unwrap_or(NOT_SET),
        );
    }

    let items = config.items.as_ref().map(Vec::len).unwrap_or(0);
    presenter.key_value("items", &format!("{} override(s)", items));

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "quality" => {
            let quality = Quality::from_str(value).map_err(|e| invalid(key, e.to_string()))?;
            config.quality = Some(quality.to_string());
        }
        "bitrate" => {
            let bitrate: u32 = parse_number(key, value)?;
            if !BITRATE_RANGE.contains(&bitrate) {
                return Err(out_of_range(key, BITRATE_RANGE.start(), BITRATE_RANGE.end()));
            }
            config.bitrate = Some(bitrate);
        }
        "sample_rate" => {
            let rate: u32 = parse_number(key, value)?;
            if !SAMPLE_RATE_RANGE.contains(&rate) {
                return Err(out_of_range(
                    key,
                    SAMPLE_RATE_RANGE.start(),
                    SAMPLE_RATE_RANGE.end(),
                ));
            }
            config.sample_rate = Some(rate);
        }
        "channels" => {
            let channels: u16 = parse_number(key, value)?;
            if !CHANNELS_RANGE.contains(&channels) {
                return Err(out_of_range(key, CHANNELS_RANGE.start(), CHANNELS_RANGE.end()));
            }
            config.channels = Some(channels);
        }
        "allow_pass_through" => config.allow_pass_through = Some(parse_flag(key, value)?),
        "native_fallback" => config.native_fallback = Some(parse_flag(key, value)?),
        "timeslice_ms" => {
            let ms: u64 = parse_number(key, value)?;
            if ms == 0 {
                return Err(invalid(key, "Value must be greater than 0".to_string()));
            }
            config.timeslice_ms = Some(ms);
        }
        "ffmpeg_path" => {
            if value.trim().is_empty() {
                return Err(invalid(key, "Value must not be empty".to_string()));
            }
            config.ffmpeg_path = Some(value.to_string());
        }
        "output_dir" => config.output_dir = Some(value.to_string()),
        "upload_url" => {
            Url::parse(value).map_err(|e| invalid(key, e.to_string()))?;
            config.upload_url = Some(value.to_string());
        }
        timer_key => {
            let ms: u64 = parse_number(key, value)?;
            let timer = config.timer.get_or_insert_with(TimerConfig::default);
            match timer_key {
                "timer.tick_ms" if ms == 0 => {
                    return Err(invalid(key, "Value must be greater than 0".to_string()));
                }
                "timer.tick_ms" => timer.tick_ms = Some(ms),
                "timer.backup_margin_ms" => timer.backup_margin_ms = Some(ms),
                "timer.sanity_interval_ms" => timer.sanity_interval_ms = Some(ms),
                "timer.overrun_margin_ms" => timer.overrun_margin_ms = Some(ms),
                _ => unreachable!(), // Already validated
            }
        }
    }
    Ok(())
}

/// Stored value for `key`, formatted for display
fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    let timer = |pick: fn(&TimerConfig) -> Option<u64>| {
        config.timer.as_ref().and_then(pick).map(|v| v.to_string())
    };

    match key {
        "quality" => config.quality.clone(),
        "bitrate" => config.bitrate.map(|v| v.to_string()),
        "sample_rate" => config.sample_rate.map(|v| v.to_string()),
        "channels" => config.channels.map(|v| v.to_string()),
        "allow_pass_through" => config.allow_pass_through.map(|b| b.to_string()),
        "native_fallback" => config.native_fallback.map(|b| b.to_string()),
        "timeslice_ms" => config.timeslice_ms.map(|v| v.to_string()),
        "ffmpeg_path" => config.ffmpeg_path.clone(),
        "output_dir" => config.output_dir.clone(),
        "upload_url" => config.upload_url.clone(),
        "timer.tick_ms" => timer(|t| t.tick_ms),
        "timer.backup_margin_ms" => timer(|t| t.backup_margin_ms),
        "timer.sanity_interval_ms" => timer(|t| t.sanity_interval_ms),
        "timer.overrun_margin_ms" => timer(|t| t.overrun_margin_ms),
        _ => None,
    }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message,
    }
}

fn out_of_range(key: &str, min: &impl ToString, max: &impl ToString) -> ConfigError {
    invalid(
        key,
        format!(
            "Value must be between {} and {}",
            min.to_string(),
            max.to_string()
        ),
    )
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, format!("'{}' is not a valid number", value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'".to_string()))
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}
