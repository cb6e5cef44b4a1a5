use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Markers a user can attach to a line.
pub const MARKER_RANGE: std::ops::RangeInclusive<u8> = 1..=9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Text,
    Marker,
}

/// The matching half of a filter: what it looks for and how.
///
/// `is_regex` and `is_logic` are mutually exclusive; the pair is rejected
/// when the definition is compiled. A marker filter ignores every text
/// field and a text filter ignores `marker`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefinition {
    #[serde(rename = "filterType")]
    pub kind: FilterKind,
    #[serde(rename = "filterText")]
    pub pattern: String,
    pub marker: u8,
    #[serde(rename = "isExcluded")]
    pub excluded: bool,
    #[serde(rename = "isCaseSensitive")]
    pub case_sensitive: bool,
    #[serde(rename = "isRegularExpression")]
    pub is_regex: bool,
    #[serde(rename = "isLogicOperation")]
    pub is_logic: bool,
}

impl FilterDefinition {
    /// Plain substring filter, case-insensitive.
    pub fn text(pattern: impl Into<String>) -> Self {
        Self {
            kind: FilterKind::Text,
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Regular expression filter, case-insensitive.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            is_regex: true,
            ..Self::text(pattern)
        }
    }

    /// `a && b` / `a || b` combination, case-insensitive.
    pub fn logic(pattern: impl Into<String>) -> Self {
        Self {
            is_logic: true,
            ..Self::text(pattern)
        }
    }

    pub fn marker(marker: u8) -> Self {
        Self {
            kind: FilterKind::Marker,
            marker,
            ..Self::default()
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn excluding(mut self, yes: bool) -> Self {
        self.excluded = yes;
        self
    }

    /// What the filter panel shows in the pattern column.
    pub fn display_pattern(&self) -> String {
        match self.kind {
            FilterKind::Marker => self.marker.to_string(),
            FilterKind::Text => self.pattern.clone(),
        }
    }

    /// Short modifier flags: `x` excluding, `m` marker, `c` case, `r` regex, `l` logic.
    pub fn flags(&self) -> String {
        let mut flags = String::new();
        if self.excluded {
            flags.push('x');
        }
        match self.kind {
            FilterKind::Marker => flags.push('m'),
            FilterKind::Text => {
                if self.case_sensitive {
                    flags.push('c');
                }
                if self.is_regex {
                    flags.push('r');
                } else if self.is_logic {
                    flags.push('l');
                }
            }
        }
        flags
    }
}

/// A 24-bit colour, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const GRAY: Rgb = Rgb(0x80, 0x80, 0x80);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("Colour '{s}' must start with '#'"))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("Colour '{s}' must have the form #RRGGBB"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("Colour '{s}' contains non-hex digits"))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_enabled() -> bool {
    true
}

/// Everything about a filter that gets saved, copied and pasted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRecord {
    #[serde(flatten)]
    pub definition: FilterDefinition,
    #[serde(rename = "isEnabled", default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "foregroundColor", default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Rgb>,
    #[serde(rename = "backgroundColor", default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Rgb>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FilterRecord {
    pub fn new(definition: FilterDefinition) -> Self {
        Self {
            definition,
            enabled: true,
            foreground: None,
            background: None,
            description: String::new(),
        }
    }

    pub fn with_colors(mut self, foreground: Option<Rgb>, background: Option<Rgb>) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl From<FilterDefinition> for FilterRecord {
    fn from(definition: FilterDefinition) -> Self {
        Self::new(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_parse_and_display() {
        let color: Rgb = "#1a2B3c".parse().unwrap();
        assert_eq!(color, Rgb(0x1a, 0x2b, 0x3c));
        assert_eq!(color.to_string(), "#1A2B3C");
    }

    #[test]
    fn test_rgb_rejects_malformed() {
        assert!("123456".parse::<Rgb>().is_err());
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#12345G".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_flags() {
        let def = FilterDefinition::regex("a.b").case_sensitive(true).excluding(true);
        assert_eq!(def.flags(), "xcr");
        assert_eq!(FilterDefinition::marker(3).flags(), "m");
        assert_eq!(FilterDefinition::logic("a && b").flags(), "l");
    }

    #[test]
    fn test_display_pattern_for_marker() {
        let def = FilterDefinition {
            pattern: "ignored".to_string(),
            ..FilterDefinition::marker(7)
        };
        assert_eq!(def.display_pattern(), "7");
    }

    #[test]
    fn test_record_json_shape() {
        let record = FilterRecord::new(FilterDefinition::text("error").excluding(true))
            .with_colors(Some(Rgb(255, 0, 0)), None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["filterType"], "text");
        assert_eq!(json["filterText"], "error");
        assert_eq!(json["isExcluded"], true);
        assert_eq!(json["isEnabled"], true);
        assert_eq!(json["foregroundColor"], "#FF0000");
        assert!(json.get("backgroundColor").is_none());
    }

    #[test]
    fn test_record_defaults_when_fields_missing() {
        let record: FilterRecord = serde_json::from_str(r#"{"filterText": "warn"}"#).unwrap();
        assert!(record.enabled);
        assert_eq!(record.definition.kind, FilterKind::Text);
        assert_eq!(record.definition.pattern, "warn");
        assert!(!record.definition.case_sensitive);
    }
}
