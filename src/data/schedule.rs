use std::fmt::{Display, Formatter};
use std::str::FromStr;

use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::true_bool;

lazy_static! {
    static ref CLOCK_TIME: Regex = Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(alias = "Monday")]
    Mon,
    #[serde(alias = "Tuesday")]
    Tue,
    #[serde(alias = "Wednesday")]
    Wed,
    #[serde(alias = "Thursday")]
    Thu,
    #[serde(alias = "Friday")]
    Fri,
    #[serde(alias = "Saturday")]
    Sat,
    #[serde(alias = "Sunday")]
    Sun,
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Mon" | "Monday" => Weekday::Mon,
            "Tue" | "Tuesday" => Weekday::Tue,
            "Wed" | "Wednesday" => Weekday::Wed,
            "Thu" | "Thursday" => Weekday::Thu,
            "Fri" | "Friday" => Weekday::Fri,
            "Sat" | "Saturday" => Weekday::Sat,
            "Sun" | "Sunday" => Weekday::Sun,
            other => return Err(format!("'{}' is not a day of the week", other)),
        })
    }
}

/// Time of day with minute precision.
///
/// Exchanged as a fixed-width 24-hour `HH:MM` string and compared as minutes
/// since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for ClockTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = CLOCK_TIME
            .captures(s)
            .ok_or_else(|| format!("'{}' is not a HH:MM 24-hour time", s))?;
        let hours: u16 = captures[1].parse().map_err(|_| s.to_string())?;
        let minutes: u16 = captures[2].parse().map_err(|_| s.to_string())?;
        Ok(ClockTime(hours * 60 + minutes))
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub day: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default = "true_bool")]
    pub active: bool,
}

impl ScheduleSlot {
    pub fn new(day: Weekday, start_time: ClockTime, end_time: ClockTime) -> ScheduleSlot {
        ScheduleSlot {
            day,
            start_time,
            end_time,
            active: true,
        }
    }

    /// Half-open interval overlap on the same day.
    ///
    /// Back-to-back slots (`09:00-10:00` and `10:00-11:00`) don't overlap, and
    /// a slot that contains another one does.
    pub fn overlaps(&self, other: &ScheduleSlot) -> bool {
        self.day == other.day
            && other.start_time < self.end_time
            && self.start_time < other.end_time
    }

    /// Whether `other` takes part in conflict checks against this slot.
    pub fn conflicts_with(&self, other: &ScheduleSlot) -> bool {
        other.active && self.overlaps(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(s: &str) -> ClockTime {
        s.parse().expect("valid time")
    }

    fn slot(day: Weekday, start: &str, end: &str) -> ScheduleSlot {
        ScheduleSlot::new(day, time(start), time(end))
    }

    #[test]
    fn clock_time_requires_fixed_width() {
        assert_eq!(time("09:05").minutes(), 9 * 60 + 5);
        assert_eq!(time("23:59").to_string(), "23:59");
        assert!("9:05".parse::<ClockTime>().is_err());
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("12:60".parse::<ClockTime>().is_err());
        assert!("12:00:00".parse::<ClockTime>().is_err());
    }

    #[test]
    fn clock_time_serializes_as_string() {
        let json = serde_json::to_string(&time("07:30")).unwrap();
        assert_eq!(json, "\"07:30\"");
        let parsed: ClockTime = serde_json::from_str("\"13:45\"").unwrap();
        assert_eq!(parsed, time("13:45"));
        assert!(serde_json::from_str::<ClockTime>("\"1:45\"").is_err());
    }

    #[test]
    fn weekday_accepts_full_names() {
        assert_eq!("Monday".parse::<Weekday>(), Ok(Weekday::Mon));
        let day: Weekday = serde_json::from_str("\"Friday\"").unwrap();
        assert_eq!(day, Weekday::Fri);
        assert!("Funday".parse::<Weekday>().is_err());
    }

    #[test]
    fn partial_overlap_conflicts() {
        let existing = slot(Weekday::Mon, "09:00", "10:00");
        assert!(slot(Weekday::Mon, "09:30", "10:30").conflicts_with(&existing));
        assert!(slot(Weekday::Mon, "08:30", "09:30").conflicts_with(&existing));
    }

    #[test]
    fn back_to_back_doesnt_conflict() {
        let existing = slot(Weekday::Mon, "09:00", "10:00");
        assert!(!slot(Weekday::Mon, "10:00", "11:00").conflicts_with(&existing));
        assert!(!slot(Weekday::Mon, "08:00", "09:00").conflicts_with(&existing));
    }

    #[test]
    fn other_day_doesnt_conflict() {
        let existing = slot(Weekday::Mon, "09:00", "10:00");
        assert!(!slot(Weekday::Tue, "09:30", "10:30").conflicts_with(&existing));
    }

    #[test]
    fn containing_interval_conflicts() {
        let existing = slot(Weekday::Wed, "10:00", "10:30");
        assert!(slot(Weekday::Wed, "09:00", "11:00").conflicts_with(&existing));
        assert!(existing.conflicts_with(&slot(Weekday::Wed, "09:00", "11:00")));
    }

    #[test]
    fn inactive_slot_is_ignored() {
        let mut existing = slot(Weekday::Thu, "09:00", "10:00");
        existing.active = false;
        assert!(!slot(Weekday::Thu, "09:00", "10:00").conflicts_with(&existing));
    }
}
