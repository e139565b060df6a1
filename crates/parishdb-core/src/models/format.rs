//! Serde adapters for the wire shapes records use: `YYYY-MM-DD` dates and
//! English weekday names.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use time::Weekday;

time::serde::format_description!(pub date, Date, "[year]-[month]-[day]");

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    let day = match s.trim().to_ascii_lowercase().as_str() {
        "monday" => Weekday::Monday,
        "tuesday" => Weekday::Tuesday,
        "wednesday" => Weekday::Wednesday,
        "thursday" => Weekday::Thursday,
        "friday" => Weekday::Friday,
        "saturday" => Weekday::Saturday,
        "sunday" => Weekday::Sunday,
        _ => return None,
    };
    Some(day)
}

pub mod weekday {
    use super::*;

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(day)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_weekday(&raw).ok_or_else(|| D::Error::custom(format!("invalid weekday: {}", raw)))
    }
}
