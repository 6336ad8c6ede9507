// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Business dates.
//!
//! Every event carries a business `date` supplied by the caller (it may be
//! backdated) next to the server-side creation timestamp. Dates arrive either
//! as a calendar day (`2025-03-14`, read as midnight UTC) or as RFC 3339.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::error::{KernelError, KernelResult};

pub fn parse_business_date(raw: &str) -> KernelResult<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(day.and_time(NaiveTime::MIN).and_utc());
    }
    Err(KernelError::Validation(format!("unrecognised date '{}'", raw)))
}

/// Calendar day of `at` as seen from `offset`.
pub fn calendar_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}
