//! Field parsers for the intake steps
//!
//! Every failure is a tagged `InputError`; the step that produced it is
//! re-entered with the error text and the collected fields untouched.

use super::state::NOW_OPTION;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Why a reply was not accepted for the current step
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Please select at least one user before choosing Done.")]
    NoParticipants,

    #[error("Please enter a name.")]
    EmptyName,

    #[error("Invalid date format. Please enter the date in the format YYYY-MM-DD.")]
    InvalidDate,

    #[error("Invalid miles format. Please enter the number shown on the dashboard.")]
    InvalidOdometer,

    #[error("ERROR: Please enter the number of miles on the dashboard, not the number of miles driven (expected at least {floor}).")]
    OdometerBelowFloor { floor: i64 },

    #[error("The reading {reading} is lower than the previous reading of {previous}. Please check the dashboard and try again.")]
    OdometerBehindPrevious { reading: i64, previous: i64 },

    #[error("Invalid toll amount. Please enter a number (0 if there were no tolls).")]
    InvalidToll,

    #[error("Invalid cost format. Please enter a number for the cost of the fuel pump.")]
    InvalidCost,

    #[error("The cost of the fuel pump must be greater than zero.")]
    NonPositiveCost,

    #[error("Please enter a valid title for the usage.")]
    EmptyTitle,
}

/// A participant or payer name: any non-blank text
pub fn parse_name(text: &str) -> Result<String, InputError> {
    let name = text.trim();
    if name.is_empty() {
        return Err(InputError::EmptyName);
    }
    Ok(name.to_string())
}

/// "Now" (any case) or a `YYYY-MM-DD` date at midnight
pub fn parse_date(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, InputError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case(NOW_OPTION) {
        return Ok(now);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(InputError::InvalidDate)
}

/// Whole-number dashboard reading at or above `floor`
pub fn parse_odometer(text: &str, floor: i64) -> Result<i64, InputError> {
    let reading: i64 = text
        .trim()
        .replace(',', "")
        .parse()
        .map_err(|_| InputError::InvalidOdometer)?;
    if reading < floor {
        return Err(InputError::OdometerBelowFloor { floor });
    }
    Ok(reading)
}

/// Non-negative amount; a leading `$` is allowed
pub fn parse_toll(text: &str) -> Result<f64, InputError> {
    let toll = parse_amount(text).ok_or(InputError::InvalidToll)?;
    if toll < 0.0 {
        return Err(InputError::InvalidToll);
    }
    Ok(toll)
}

/// Positive amount; a leading `$` is allowed
pub fn parse_cost(text: &str) -> Result<f64, InputError> {
    let cost = parse_amount(text).ok_or(InputError::InvalidCost)?;
    if cost <= 0.0 {
        return Err(InputError::NonPositiveCost);
    }
    Ok(cost)
}

pub fn parse_title(text: &str) -> Result<String, InputError> {
    let title = text.trim();
    if title.is_empty() {
        return Err(InputError::EmptyTitle);
    }
    Ok(title.to_string())
}

fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = text.strip_prefix('$').unwrap_or(text);
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
