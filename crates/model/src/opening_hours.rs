use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{id::HasId, serde::time_of_day};

/// A single opening period on one day, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpeningInterval {
    #[serde(with = "time_of_day")]
    #[schemars(schema_with = "time_of_day::schema")]
    pub open: u16,
    #[serde(with = "time_of_day")]
    #[schemars(schema_with = "time_of_day::schema")]
    pub close: u16,
}

impl OpeningInterval {
    /// `open` and `close` are minutes after midnight.
    pub fn new(open: u16, close: u16) -> Self {
        Self { open, close }
    }

    /// An interval closing before it opens contains nothing.
    pub fn contains(&self, minute_of_day: u16) -> bool {
        self.open <= minute_of_day && minute_of_day <= self.close
    }
}

/// Regular opening hours keyed by day of week, `0` being Sunday.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct WeeklySchedule(BTreeMap<u8, Vec<OpeningInterval>>);

impl WeeklySchedule {
    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = (u8, Vec<OpeningInterval>)>,
    {
        Self(days.into_iter().collect())
    }

    pub fn intervals_on(&self, day_from_sunday: u8) -> &[OpeningInterval] {
        self.0
            .get(&day_from_sunday)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `at` falls into any interval of its weekday.
    pub fn is_open_at(&self, at: NaiveDateTime) -> bool {
        let day = at.weekday().num_days_from_sunday() as u8;
        let minute = minute_of_day(at);
        self.intervals_on(day)
            .iter()
            .any(|interval| interval.contains(minute))
    }
}

fn minute_of_day(at: NaiveDateTime) -> u16 {
    (at.hour() * 60 + at.minute()) as u16
}

/// Deviating hours for one calendar date, stored in the
/// `stores/{id}/specialHours` collection.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialHours {
    pub date: NaiveDate,
    #[serde(default)]
    pub hours: Vec<OpeningInterval>,
    #[serde(default)]
    pub closed: bool,
    pub note: Option<String>,
}

impl HasId for SpecialHours {
    type IdType = String;
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreHours {
    pub regular: WeeklySchedule,
    pub special: Option<SpecialHours>,
    pub is_special_day: bool,
}

impl StoreHours {
    pub fn new(regular: WeeklySchedule, special: Option<SpecialHours>) -> Self {
        Self {
            is_special_day: special.is_some(),
            regular,
            special,
        }
    }
}
