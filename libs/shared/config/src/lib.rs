use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub server_port: u16,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            server_port: env_or("PORT", 3000),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Supabase not fully configured - appointment storage will be in-memory");
        }

        config
    }

    /// Whether the PostgREST-backed stores can be used.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }
}

/// A buffer of a full day already blocks every slot of today.
pub const MAX_BOOKING_BUFFER_MINUTES: i64 = 24 * 60;

/// Clinic-wide slot grid and booking buffer.
///
/// One grid applies to every doctor and every day; it is not derived from
/// a doctor's work-schedule text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// First slot of the day starts at this hour.
    pub opening_hour: u32,
    /// Slots start strictly before this hour.
    pub closing_hour: u32,
    pub slot_minutes: u32,
    /// Minimum lead time between "now" and a bookable slot today.
    pub booking_buffer_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            opening_hour: 8,
            closing_hour: 18,
            slot_minutes: 30,
            booking_buffer_minutes: 30,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            opening_hour: env_or("SCHEDULING_OPENING_HOUR", defaults.opening_hour),
            closing_hour: env_or("SCHEDULING_CLOSING_HOUR", defaults.closing_hour),
            slot_minutes: env_or("SCHEDULING_SLOT_MINUTES", defaults.slot_minutes),
            booking_buffer_minutes: env_or(
                "SCHEDULING_BOOKING_BUFFER_MINUTES",
                defaults.booking_buffer_minutes,
            ),
        };

        match config.validate() {
            Ok(()) => config,
            Err(reason) => {
                warn!("Invalid scheduling configuration ({}), using defaults", reason);
                defaults
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.closing_hour > 24 {
            return Err(format!("closing hour {} is past midnight", self.closing_hour));
        }
        if self.opening_hour >= self.closing_hour {
            return Err(format!(
                "opening hour {} must be before closing hour {}",
                self.opening_hour, self.closing_hour
            ));
        }
        if self.slot_minutes == 0 {
            return Err("slot length must be positive".to_string());
        }
        if !(0..=MAX_BOOKING_BUFFER_MINUTES).contains(&self.booking_buffer_minutes) {
            return Err(format!(
                "booking buffer {} must be between 0 and {} minutes",
                self.booking_buffer_minutes, MAX_BOOKING_BUFFER_MINUTES
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheduling_is_valid() {
        let config = SchedulingConfig::default();
        assert_eq!(config.opening_hour, 8);
        assert_eq!(config.closing_hour, 18);
        assert_eq!(config.slot_minutes, 30);
        assert_eq!(config.booking_buffer_minutes, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_hours_rejected() {
        let config = SchedulingConfig {
            opening_hour: 18,
            closing_hour: 8,
            ..SchedulingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buffer_bounded_to_one_day() {
        for buffer in [-1, MAX_BOOKING_BUFFER_MINUTES + 1, i64::MAX] {
            let config = SchedulingConfig {
                booking_buffer_minutes: buffer,
                ..SchedulingConfig::default()
            };
            assert!(config.validate().is_err(), "{}", buffer);
        }

        let full_day = SchedulingConfig {
            booking_buffer_minutes: MAX_BOOKING_BUFFER_MINUTES,
            ..SchedulingConfig::default()
        };
        assert!(full_day.validate().is_ok());
    }

    #[test]
    fn test_zero_slot_rejected() {
        let config = SchedulingConfig {
            slot_minutes: 0,
            ..SchedulingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
