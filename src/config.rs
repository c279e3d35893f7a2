//! Static runtime configuration, resolved from the environment once at
//! startup. Everything has a sane default except the store and webhook
//! URLs, whose absence downgrades durability and delivery respectively
//! (main warns about both).

use crate::maintenance::MaintenanceWindow;
use chrono::NaiveTime;
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_STATUS_URL: &str = "https://status.robertsspaceindustries.com/";
const DEFAULT_FEED_URL: &str = "https://status.robertsspaceindustries.com/index.xml";

pub struct Config {
    pub status_url: Url,
    pub feed_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub maintenance: MaintenanceWindow,
    pub status_ttl: Duration,
    pub redis_url: Option<String>,
    pub webhook_url: Option<Url>,
}

impl Config {
    /// Read configuration, panicking on malformed values. Anything that
    /// would panic here does so before the monitors spawn.
    pub fn from_env() -> Config {
        let maintenance_start = env::var("MAINTENANCE_START").unwrap_or_else(|_| "22:00".into());

        Config {
            status_url: env_url("STATUS_URL", DEFAULT_STATUS_URL),
            feed_url: env_url("FEED_URL", DEFAULT_FEED_URL),
            poll_interval: env_secs("POLL_INTERVAL_SECS", 300),
            request_timeout: env_secs("REQUEST_TIMEOUT_SECS", 10),
            max_retries: env::var("MAX_RETRIES")
                .map(|x| x.parse().expect("Could not parse MAX_RETRIES to u32"))
                .unwrap_or(3),
            retry_backoff: Duration::from_secs(1),
            maintenance: MaintenanceWindow::new(
                parse_hhmm(&maintenance_start)
                    .expect("Could not parse MAINTENANCE_START as HH:MM"),
                env::var("MAINTENANCE_DURATION_HOURS")
                    .map(|x| {
                        x.parse()
                            .expect("Could not parse MAINTENANCE_DURATION_HOURS to u32")
                    })
                    .unwrap_or(3),
            ),
            status_ttl: env_secs("STATUS_TTL_SECS", 300),
            redis_url: env::var("REDIS_URL").ok(),
            webhook_url: env::var("WEBHOOK_URL")
                .ok()
                .map(|x| Url::parse(&x).expect("Could not parse WEBHOOK_URL")),
        }
    }
}

fn env_secs(name: &str, default: u64) -> Duration {
    let secs = env::var(name)
        .map(|x| {
            x.parse()
                .unwrap_or_else(|_| panic!("Could not parse {} to u64", name))
        })
        .unwrap_or(default);

    Duration::from_secs(secs)
}

fn env_url(name: &str, default: &str) -> Url {
    match env::var(name) {
        Ok(x) => Url::parse(&x).unwrap_or_else(|_| panic!("Could not parse {} as a URL", name)),
        // The defaults are statically valid; tested below.
        Err(_) => Url::parse(default).unwrap(),
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls_parse() {
        assert!(Url::parse(DEFAULT_STATUS_URL).is_ok());
        assert!(Url::parse(DEFAULT_FEED_URL).is_ok());
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("22:00"), NaiveTime::from_hms_opt(22, 0, 0));
        assert_eq!(parse_hhmm("08:45"), NaiveTime::from_hms_opt(8, 45, 0));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("22"), None);
        assert_eq!(parse_hhmm("ten past nine"), None);
    }
}
