//! Canonical weekday enum and the weekday-keyed mapping used everywhere a
//! per-day collection is stored or serialized.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Day of the week, ordered Monday through Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All seven days in canonical order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Position in the week, Monday = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = ValidationError;

    /// Parse a full English weekday name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Weekday::ALL
            .iter()
            .copied()
            .find(|day| day.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::UnknownWeekday(s.to_string()))
    }
}

/// A mapping from every weekday to a list of `T`.
///
/// All seven keys are always present; days without entries hold an empty list.
/// Serializes as a JSON object keyed by weekday name in Monday..Sunday order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekMap<T> {
    days: [Vec<T>; 7],
}

impl<T> WeekMap<T> {
    /// Create a map with every weekday present and empty.
    pub fn new() -> Self {
        Self {
            days: Default::default(),
        }
    }

    pub fn get(&self, day: Weekday) -> &[T] {
        &self.days[day.index()]
    }

    pub fn get_mut(&mut self, day: Weekday) -> &mut Vec<T> {
        &mut self.days[day.index()]
    }

    pub fn push(&mut self, day: Weekday, item: T) {
        self.days[day.index()].push(item);
    }

    /// Iterate over `(day, entries)` in Monday..Sunday order, including empty days.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[T])> {
        Weekday::ALL
            .iter()
            .map(move |&day| (day, self.days[day.index()].as_slice()))
    }

    /// Iterate over every entry, day by day.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.days.iter().flatten()
    }

    /// Total number of entries across all days.
    pub fn len(&self) -> usize {
        self.days.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// First day (in week order) holding at least one entry.
    pub fn first_non_empty_day(&self) -> Option<Weekday> {
        self.iter()
            .find(|(_, entries)| !entries.is_empty())
            .map(|(day, _)| day)
    }

    /// Apply `f` to each day's list in place.
    pub fn for_each_day_mut(&mut self, mut f: impl FnMut(Weekday, &mut Vec<T>)) {
        for day in Weekday::ALL {
            f(day, &mut self.days[day.index()]);
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> WeekMap<U> {
        let mut out = WeekMap::new();
        for (day, entries) in self.iter() {
            out.days[day.index()] = entries.iter().map(&mut f).collect();
        }
        out
    }
}

impl<T> Default for WeekMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> Serialize for WeekMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7))?;
        for (day, entries) in self.iter() {
            map.serialize_entry(day.as_str(), entries)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for WeekMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<Weekday, Vec<T>>::deserialize(deserializer)?;
        let mut out = WeekMap::new();
        for (day, entries) in raw {
            out.days[day.index()] = entries;
        }
        Ok(out)
    }
}
