//! `grappletimer://start-timer?round=300&rest=60&rounds=5&clapper=10`
//!
//! Durations are seconds (fractions allowed). Missing parameters keep the
//! value from the base configuration; parameters that do not parse are
//! ignored rather than rejected, but the final configuration must validate.

use std::time::Duration;

use url::Url;

use super::config::TimerConfiguration;
use crate::error::ValidationError;

pub const LINK_SCHEME: &str = "grappletimer";
pub const START_TIMER_HOST: &str = "start-timer";

/// Build a configuration from a start-timer link on top of `base`.
///
/// # Errors
///
/// Fails if the URL is malformed, is not a start-timer link, or yields an
/// invalid configuration.
pub fn parse_start_link(
    link: &str,
    base: TimerConfiguration,
) -> Result<TimerConfiguration, ValidationError> {
    let url = Url::parse(link).map_err(|e| ValidationError::Unparseable {
        what: "start link".into(),
        message: e.to_string(),
    })?;

    if url.scheme() != LINK_SCHEME || url.host_str() != Some(START_TIMER_HOST) {
        return Err(ValidationError::invalid(
            "link",
            format!("expected {LINK_SCHEME}://{START_TIMER_HOST}, got {url}"),
        ));
    }

    let mut cfg = base;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "round" => {
                if let Some(d) = parse_seconds(&value) {
                    cfg.round_duration = d;
                }
            }
            "rest" => {
                if let Some(d) = parse_seconds(&value) {
                    cfg.rest_duration = d;
                }
            }
            "rounds" => {
                if let Ok(n) = value.parse::<u32>() {
                    cfg.rounds = n;
                }
            }
            "clapper" => {
                if let Some(d) = parse_seconds(&value) {
                    cfg.clapper_offset = d;
                }
            }
            "delay" => {
                if let Some(d) = parse_seconds(&value) {
                    cfg.start_delay = d;
                }
            }
            _ => {}
        }
    }

    cfg.validate()?;
    Ok(cfg)
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let secs = value.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}
