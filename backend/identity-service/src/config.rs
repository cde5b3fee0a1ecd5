//! Configuration management for Identity Service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! Token lifetimes keep the historical lenient behavior: an unparseable
//! duration falls back to its default instead of failing startup, but the
//! fallback is logged.
//!
//! Durations are one or more `<number><unit>` segments (`1h30m`, `1.5h`)
//! with units `ns`, `us`/`µs`, `ms`, `s`, `m`, `h` and `d`, or a bare number
//! of seconds. Values above `MAX_DURATION` (100 years) are treated as
//! malformed.
//!
//! # Example
//!
//! ```no_run
//! use identity_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("Access token TTL: {:?}", settings.jwt.access_ttl);
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Upper bound for any configured duration; longer values count as malformed
pub const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub housekeeping: HousekeepingSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            housekeeping: HousekeepingSettings::from_env(),
        })
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("Invalid DATABASE_MIN_CONNECTIONS")?,
            acquire_timeout: env::var("DATABASE_ACQUIRE_TIMEOUT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid DATABASE_ACQUIRE_TIMEOUT")?,
        })
    }
}

/// JWT signing and token lifetime settings
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "apsdigital".to_string());

        Ok(Self {
            secret,
            issuer,
            access_ttl: duration_or_default(
                "JWT_EXPIRATION",
                env::var("JWT_EXPIRATION").ok(),
                DEFAULT_ACCESS_TTL,
            ),
            refresh_ttl: duration_or_default(
                "REFRESH_TOKEN_EXPIRATION",
                env::var("REFRESH_TOKEN_EXPIRATION").ok(),
                DEFAULT_REFRESH_TTL,
            ),
        })
    }
}

/// Expired-session cleanup loop settings
#[derive(Debug, Clone)]
pub struct HousekeepingSettings {
    pub sweep_interval: Duration,
}

impl HousekeepingSettings {
    fn from_env() -> Self {
        Self {
            sweep_interval: duration_or_default(
                "SESSION_SWEEP_INTERVAL",
                env::var("SESSION_SWEEP_INTERVAL").ok(),
                DEFAULT_SWEEP_INTERVAL,
            ),
        }
    }
}

/// Resolve a configured duration, falling back to `default` when the value is
/// missing or malformed. Malformed values are reported with `warn!`.
pub fn duration_or_default(name: &str, raw: Option<String>, default: Duration) -> Duration {
    let Some(raw) = raw else {
        return default;
    };

    match parse_duration(&raw) {
        Some(duration) => duration,
        None => {
            warn!(
                variable = name,
                value = %raw,
                default_secs = default.as_secs(),
                "Unparseable duration, using default"
            );
            default
        }
    }
}

/// Parse a duration such as `90`, `15m`, `1h30m`, `1.5h`, `7d`, `500ms`,
/// `250us` or `10ns`. Bare numbers are seconds. Segments may be fractional.
/// Zero, negative and longer-than-`MAX_DURATION` values are rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(secs) = raw.parse::<u64>() {
        let duration = Duration::from_secs(secs);
        return (secs > 0 && duration <= MAX_DURATION).then_some(duration);
    }

    let mut total: u128 = 0;
    let mut rest = raw;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (whole, fraction) = match rest[..number_len].split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (&rest[..number_len], ""),
        };
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return None;
        }
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 60 * 60 * NANOS_PER_SEC,
            "d" => 24 * 60 * 60 * NANOS_PER_SEC,
            _ => return None,
        };
        rest = &rest[unit_len..];

        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut segment = whole.checked_mul(unit)?;
        if !fraction.is_empty() {
            // Digits past nanosecond precision never matter
            let fraction = &fraction[..fraction.len().min(18)];
            let scale = 10u128.pow(fraction.len() as u32);
            let value: u128 = fraction.parse().ok()?;
            segment = segment.checked_add(value * unit / scale)?;
        }

        total = total.checked_add(segment)?;
        if total > MAX_DURATION.as_nanos() {
            return None;
        }
    }

    if total == 0 {
        return None;
    }
    let secs = u64::try_from(total / NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("24h"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("168h"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("3600"), Some(Duration::from_secs(3_600)));
    }

    #[test]
    fn test_parse_duration_fractions_and_small_units() {
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_duration(".5m"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2.25s"), Some(Duration::from_millis(2_250)));
        assert_eq!(parse_duration("250us"), Some(Duration::from_micros(250)));
        assert_eq!(parse_duration("3µs"), Some(Duration::from_micros(3)));
        assert_eq!(parse_duration("10ns"), Some(Duration::from_nanos(10)));
        assert_eq!(parse_duration("1h0.5m"), Some(Duration::from_secs(3_630)));
    }

    #[test]
    fn test_parse_duration_rejects_oversized_values() {
        assert_eq!(parse_duration("100000000d"), None);
        assert_eq!(parse_duration("36501d"), None);
        assert_eq!(parse_duration("99999999999999999999"), None);
        assert_eq!(parse_duration("36500d"), Some(MAX_DURATION));

        let ttl = duration_or_default(
            "REFRESH_TOKEN_EXPIRATION",
            Some("100000000d".into()),
            DEFAULT_REFRESH_TTL,
        );
        assert_eq!(ttl, DEFAULT_REFRESH_TTL);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("10x"), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("-5m"), None);
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("0h"), None);
        assert_eq!(parse_duration("1.2.3h"), None);
        assert_eq!(parse_duration(".h"), None);
    }

    #[test]
    fn test_duration_falls_back_on_parse_failure() {
        let ttl = duration_or_default("JWT_EXPIRATION", Some("one day".into()), DEFAULT_ACCESS_TTL);
        assert_eq!(ttl, DEFAULT_ACCESS_TTL);

        let ttl = duration_or_default("JWT_EXPIRATION", None, DEFAULT_ACCESS_TTL);
        assert_eq!(ttl, DEFAULT_ACCESS_TTL);

        let ttl = duration_or_default("JWT_EXPIRATION", Some("2h".into()), DEFAULT_ACCESS_TTL);
        assert_eq!(ttl, Duration::from_secs(7_200));
    }

    #[test]
    #[serial]
    fn test_jwt_settings_from_env() {
        env::set_var("JWT_SECRET", "test-secret-key");
        env::set_var("JWT_ISSUER", "test-issuer");
        env::set_var("JWT_EXPIRATION", "15m");
        env::set_var("REFRESH_TOKEN_EXPIRATION", "not-a-duration");

        let settings = JwtSettings::from_env().unwrap();

        assert_eq!(settings.secret, "test-secret-key");
        assert_eq!(settings.issuer, "test-issuer");
        assert_eq!(settings.access_ttl, Duration::from_secs(900));
        assert_eq!(settings.refresh_ttl, DEFAULT_REFRESH_TTL);
        assert!(!format!("{settings:?}").contains("test-secret-key"));

        // Clean up
        env::remove_var("JWT_SECRET");
        env::remove_var("JWT_ISSUER");
        env::remove_var("JWT_EXPIRATION");
        env::remove_var("REFRESH_TOKEN_EXPIRATION");
    }

    #[test]
    #[serial]
    fn test_database_settings_from_env() {
        env::set_var("DATABASE_URL", "postgres://localhost/test");
        env::set_var("DATABASE_MAX_CONNECTIONS", "100");

        let settings = DatabaseSettings::from_env().unwrap();

        assert_eq!(settings.url, "postgres://localhost/test");
        assert_eq!(settings.max_connections, 100);
        assert_eq!(settings.min_connections, 2); // Default

        env::remove_var("DATABASE_URL");
        env::remove_var("DATABASE_MAX_CONNECTIONS");
    }
}
