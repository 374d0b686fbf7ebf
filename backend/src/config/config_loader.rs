use std::{fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow};
use crates::domain::value_objects::time_grid::{
    BusinessHours, DEFAULT_CLOSE_HOUR, DEFAULT_OPEN_HOUR, DEFAULT_STEP_MINUTES,
};
use url::Url;

use super::{
    config_model::{
        AuthSecret, BackendServer, Cache, Database, DotEnvyConfig, Notifications, Scheduling,
        Stripe,
    },
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup. Empty values count as unset.
pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    let backend_server = BackendServer {
        port: env.required_parsed("SERVER_PORT")?,
        body_limit: env.required_parsed("SERVER_BODY_LIMIT")?,
        timeout: env.required_parsed("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: env.required("DATABASE_URL")?,
        max_connections: env.parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let auth = AuthSecret {
        jwt_secret: env.required("JWT_SECRET")?,
    };

    let stripe = Stripe {
        secret_key: env.required("STRIPE_SECRET_KEY")?,
        webhook_secret: env.required("STRIPE_WEBHOOK_SECRET")?,
        success_url: env.required("STRIPE_SUCCESS_URL")?,
        cancel_url: env.required("STRIPE_CANCEL_URL")?,
        currency: env.get("STRIPE_CURRENCY").unwrap_or_else(|| "eur".to_string()),
        webhook_tolerance_seconds: env.parsed_or("STRIPE_WEBHOOK_TOLERANCE_SECONDS", 300)?,
    };

    let business_hours = BusinessHours::new(
        env.parsed_or("BUSINESS_OPEN_HOUR", DEFAULT_OPEN_HOUR)?,
        env.parsed_or("BUSINESS_CLOSE_HOUR", DEFAULT_CLOSE_HOUR)?,
        env.parsed_or("SLOT_STEP_MINUTES", DEFAULT_STEP_MINUTES)?,
    )
    .context("BUSINESS_OPEN_HOUR/BUSINESS_CLOSE_HOUR/SLOT_STEP_MINUTES are invalid")?;

    let scheduling = Scheduling {
        business_hours,
        enforce_monthly_booking_limit: env.bool_or("ENFORCE_MONTHLY_BOOKING_LIMIT", false)?,
    };

    let notifications = Notifications {
        webhook_url: env
            .get("NOTIFICATION_WEBHOOK_URL")
            .map(|raw| Url::parse(&raw))
            .transpose()
            .context("NOTIFICATION_WEBHOOK_URL is invalid")?,
    };

    let cache = Cache {
        ttl_seconds: env.parsed_or("CACHE_TTL_SECONDS", 30)?,
        max_entries: env.parsed_or("CACHE_MAX_ENTRIES", 1024)?,
    };

    let stage = match env.get("STAGE") {
        Some(raw) => Stage::try_from(&raw)?,
        None => Stage::default(),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth,
        stripe,
        scheduling,
        notifications,
        cache,
        stage,
    })
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| anyhow!("{key} is missing"))
    }

    fn required_parsed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.required(key)?;
        raw.parse::<T>()
            .map_err(|err| anyhow!("{key} is invalid ({raw}): {err}"))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|err| anyhow!("{key} is invalid ({raw}): {err}")),
            None => Ok(default),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(anyhow!("{key} is invalid ({raw}): expected a boolean")),
            },
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SERVER_PORT", "8080"),
            ("SERVER_BODY_LIMIT", "10"),
            ("SERVER_TIMEOUT", "30"),
            ("DATABASE_URL", "postgres://localhost:5432/salon"),
            ("JWT_SECRET", "supersecretjwtsecretforunittesting123"),
            ("STRIPE_SECRET_KEY", "sk_test"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_test"),
            ("STRIPE_SUCCESS_URL", "https://salon.test/paid"),
            ("STRIPE_CANCEL_URL", "https://salon.test/cancelled"),
        ])
    }

    fn load_map(env: &HashMap<&'static str, &'static str>) -> Result<DotEnvyConfig> {
        load_from(|key| env.get(key).map(|value| value.to_string()))
    }

    #[test]
    fn applies_defaults_for_optional_values() {
        let config = load_map(&base_env()).unwrap();

        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.stripe.currency, "eur");
        assert_eq!(config.stripe.webhook_tolerance_seconds, 300);
        assert_eq!(config.scheduling.business_hours, BusinessHours::default());
        assert!(!config.scheduling.enforce_monthly_booking_limit);
        assert!(config.notifications.webhook_url.is_none());
        assert_eq!(config.cache.ttl_seconds, 30);
        assert_eq!(config.cache.max_entries, 1024);
        assert_eq!(config.stage, Stage::Local);
    }

    #[test]
    fn reads_overrides() {
        let mut env = base_env();
        env.insert("BUSINESS_OPEN_HOUR", "8");
        env.insert("BUSINESS_CLOSE_HOUR", "20");
        env.insert("SLOT_STEP_MINUTES", "15");
        env.insert("ENFORCE_MONTHLY_BOOKING_LIMIT", "true");
        env.insert("NOTIFICATION_WEBHOOK_URL", "https://notify.salon.test/hooks");
        env.insert("STAGE", "Production");

        let config = load_map(&env).unwrap();

        assert_eq!(
            config.scheduling.business_hours,
            BusinessHours::new(8, 20, 15).unwrap()
        );
        assert!(config.scheduling.enforce_monthly_booking_limit);
        assert!(config.notifications.webhook_url.is_some());
        assert_eq!(config.stage, Stage::Production);
    }

    #[test]
    fn missing_required_value_is_reported_by_name() {
        let mut env = base_env();
        env.remove("JWT_SECRET");

        let err = load_map(&env).unwrap_err();

        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn rejects_inverted_business_hours() {
        let mut env = base_env();
        env.insert("BUSINESS_OPEN_HOUR", "18");
        env.insert("BUSINESS_CLOSE_HOUR", "9");

        assert!(load_map(&env).is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        let mut env = base_env();
        env.insert("SERVER_PORT", "eighty");

        assert!(load_map(&env).is_err());
    }
}
