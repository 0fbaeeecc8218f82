//! When the fetch scheduler fires: a cron expression in a time zone, or a fixed rate.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;

use super::SchedulerError;
use crate::config::FetchSchedulerConfig;

#[derive(Debug, Clone)]
pub enum Trigger {
    Cron { schedule: cron::Schedule, tz: Tz },
    FixedRate(Duration),
}

pub fn parse_time_zone(name: &str) -> Result<Tz, SchedulerError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SchedulerError::InvalidTimeZone(name.to_string()))
}

impl Trigger {
    /// Cron wins over fixed rate when both are set.
    pub fn from_config(config: &FetchSchedulerConfig) -> Result<Self, SchedulerError> {
        let tz = parse_time_zone(&config.time_zone)?;
        if let Some(expr) = config.cron.as_deref().filter(|e| !e.trim().is_empty()) {
            let schedule = cron::Schedule::from_str(expr.trim()).map_err(|e| SchedulerError::InvalidCron {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(Trigger::Cron { schedule, tz });
        }
        match config.fixed_rate_secs {
            Some(0) => Err(SchedulerError::NoTrigger),
            Some(secs) => Ok(Trigger::FixedRate(Duration::from_secs(secs))),
            None => Err(SchedulerError::NoTrigger),
        }
    }

    /// First fire after startup. A fixed rate fires right away.
    pub fn first_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron { .. } => self.next_fire_after(now),
            Trigger::FixedRate(_) => Some(now),
        }
    }

    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron { schedule, tz } => schedule
                .after(&after.with_timezone(tz))
                .next()
                .map(|t| t.with_timezone(&Utc)),
            Trigger::FixedRate(period) => {
                let period = chrono::Duration::from_std(*period).ok()?;
                after.checked_add_signed(period)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg(cron: Option<&str>, tz: &str, rate: Option<u64>) -> FetchSchedulerConfig {
        FetchSchedulerConfig {
            cron: cron.map(str::to_string),
            time_zone: tz.to_string(),
            fixed_rate_secs: rate,
            ..Default::default()
        }
    }

    #[test]
    fn cron_is_evaluated_in_the_configured_zone() {
        // Daily at 06:00 Berlin time (UTC+1 in January).
        let t = Trigger::from_config(&cfg(Some("0 0 6 * * *"), "Europe/Berlin", None)).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        let next = t.next_fire_after(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 11, 5, 0, 0).unwrap());
    }

    #[test]
    fn cron_wins_over_fixed_rate() {
        let t = Trigger::from_config(&cfg(Some("0 */5 * * * *"), "UTC", Some(60))).unwrap();
        assert!(matches!(t, Trigger::Cron { .. }));
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(t.first_fire(now), Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap()));
    }

    #[test]
    fn fixed_rate_fires_immediately_then_every_period() {
        let t = Trigger::from_config(&cfg(None, "UTC", Some(90))).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(t.first_fire(now), Some(now));
        assert_eq!(
            t.next_fire_after(now),
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 30).unwrap())
        );
    }

    #[test]
    fn startup_errors() {
        assert!(matches!(
            Trigger::from_config(&cfg(Some("every day"), "UTC", None)),
            Err(SchedulerError::InvalidCron { .. })
        ));
        assert!(matches!(
            Trigger::from_config(&cfg(Some("0 0 6 * * *"), "Mars/Olympus", None)),
            Err(SchedulerError::InvalidTimeZone(_))
        ));
        assert!(matches!(
            Trigger::from_config(&cfg(None, "UTC", None)),
            Err(SchedulerError::NoTrigger)
        ));
        assert!(matches!(
            Trigger::from_config(&cfg(None, "UTC", Some(0))),
            Err(SchedulerError::NoTrigger)
        ));
    }
}
