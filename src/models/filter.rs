// View filters over the log buffer

use serde::{Deserialize, Serialize};

use super::{LogEntry, LogLevel, LogSource, ModelError};

/// Wire value meaning "no restriction" for level and source filters.
pub const ALL: &str = "all";

/// Current view filter. `None` / empty search matches everything.
/// Filters never touch stored entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default, with = "all_or")]
    pub level: Option<LogLevel>,
    #[serde(default, with = "all_or")]
    pub source: Option<LogSource>,
    #[serde(default)]
    pub search: String,
}

impl FilterState {
    pub fn is_default(&self) -> bool {
        self == &FilterState::default()
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.matches_with(entry, &self.search.to_lowercase())
    }

    /// Same as [`matches`](Self::matches) with the search term lowercased once by the caller.
    pub(crate) fn matches_with(&self, entry: &LogEntry, search_lower: &str) -> bool {
        self.level.is_none_or(|l| l == entry.level)
            && self.source.is_none_or(|s| s == entry.source)
            && entry.contains_lowercase(search_lower)
    }

    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Level(level) => self.level = level,
            FilterUpdate::Source(source) => self.source = source,
            FilterUpdate::Search(search) => self.search = search,
        }
    }
}

/// A change to exactly one filter field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Level(Option<LogLevel>),
    Source(Option<LogSource>),
    Search(String),
}

impl FilterUpdate {
    /// Parse a `(kind, value)` pair as sent by the log viewer, e.g. `("level", "error")`
    /// or `("source", "all")`.
    pub fn parse(kind: &str, value: &str) -> Result<Self, ModelError> {
        match kind.trim().to_lowercase().as_str() {
            "level" => Ok(FilterUpdate::Level(parse_all_or(value)?)),
            "source" => Ok(FilterUpdate::Source(parse_all_or(value)?)),
            "search" => Ok(FilterUpdate::Search(value.to_string())),
            _ => Err(ModelError::UnknownFilterKind(kind.to_string())),
        }
    }
}

fn parse_all_or<T>(value: &str) -> Result<Option<T>, ModelError>
where
    T: std::str::FromStr<Err = ModelError>,
{
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

/// `Option<T>` on the wire as either `"all"` or the inner value.
mod all_or {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{ALL, ModelError, parse_all_or};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(ALL),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: std::str::FromStr<Err = ModelError>,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_all_or(&raw).map_err(D::Error::custom)
    }
}
