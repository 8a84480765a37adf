use crate::app_config::{AppConfig, Environment, GoogleConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a plain `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if required vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let google = GoogleConfig {
        client_id: require("GOOGLE_CLIENT_ID")?,
        client_secret: require("GOOGLE_CLIENT_SECRET")?,
        refresh_token: require("GOOGLE_REFRESH_TOKEN")?,
        sheet_id: require("GOOGLE_SHEET_ID")?,
        drive_folder_id: lookup("GOOGLE_DRIVE_FOLDER_ID")
            .ok()
            .filter(|v| !v.trim().is_empty()),
        token_url: or_default("GOOGLE_TOKEN_URL", "https://oauth2.googleapis.com/token"),
        drive_base_url: or_default("GOOGLE_DRIVE_BASE_URL", "https://www.googleapis.com"),
        sheets_base_url: or_default("GOOGLE_SHEETS_BASE_URL", "https://sheets.googleapis.com"),
    };

    let env = parse_environment(&or_default("CANVASS_ENV", "development"))?;
    let bind_addr = parse_addr("CANVASS_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CANVASS_LOG_LEVEL", "info");
    let user_agent = or_default("CANVASS_USER_AGENT", "CanvasserApp/1.0");
    let geocode_language = or_default("CANVASS_GEOCODE_LANGUAGE", "id");

    let geocode_timeout_secs = parse_u64("CANVASS_GEOCODE_TIMEOUT_SECS", "3")?;
    if geocode_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "CANVASS_GEOCODE_TIMEOUT_SECS".to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }

    let nominatim_base_url = or_default(
        "NOMINATIM_BASE_URL",
        "https://nominatim.openstreetmap.org",
    );
    let bigdatacloud_base_url = or_default("BIGDATACLOUD_BASE_URL", "https://api.bigdatacloud.net");

    let visit_sheet = or_default("CANVASS_VISIT_SHEET", "Kunjungan Canvaser");
    let sales_sheet = or_default("CANVASS_SALES_SHEET", "Data Sales");
    let status_sheet = or_default("CANVASS_STATUS_SHEET", "Status Kunjungan");

    let photo_max_dimension = parse_u32("CANVASS_PHOTO_MAX_DIMENSION", "1280")?;
    let photo_target_max_bytes = parse_usize("CANVASS_PHOTO_TARGET_MAX_BYTES", "838861")?;
    let max_upload_bytes = parse_usize("CANVASS_MAX_UPLOAD_BYTES", "15728640")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        user_agent,
        geocode_language,
        geocode_timeout_secs,
        nominatim_base_url,
        bigdatacloud_base_url,
        google,
        visit_sheet,
        sales_sheet,
        status_sheet,
        photo_max_dimension,
        photo_target_max_bytes,
        max_upload_bytes,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CANVASS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
