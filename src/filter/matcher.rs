use regex::{Regex, RegexBuilder};

use super::definition::{FilterDefinition, FilterKind, MARKER_RANGE};
use crate::error::FilterError;

const AND_SEPARATOR: &str = " && ";
const OR_SEPARATOR: &str = " || ";

/// How one term is looked for in a line.
#[derive(Debug, Clone)]
enum Finder {
    Exact(String),
    /// Escaped literal under Unicode simple case folding.
    Folded(Regex),
}

impl Finder {
    fn new(term: &str, case_sensitive: bool) -> Result<Self, FilterError> {
        if case_sensitive {
            return Ok(Finder::Exact(term.to_string()));
        }
        RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .map(Finder::Folded)
            .map_err(|source| FilterError::InvalidRegex {
                pattern: term.to_string(),
                source,
            })
    }

    #[inline]
    fn found_in(&self, text: &str) -> bool {
        match self {
            Finder::Exact(term) => text.contains(term.as_str()),
            Finder::Folded(re) => re.is_match(text),
        }
    }
}

/// Substring terms with their case rule already applied.
#[derive(Debug, Clone)]
pub struct Terms {
    terms: Vec<String>,
    finders: Vec<Finder>,
}

impl Terms {
    fn new<'a>(
        terms: impl IntoIterator<Item = &'a str>,
        case_sensitive: bool,
    ) -> Result<Self, FilterError> {
        let terms: Vec<String> = terms.into_iter().map(str::to_string).collect();
        let finders = terms
            .iter()
            .map(|t| Finder::new(t, case_sensitive))
            .collect::<Result<_, _>>()?;
        Ok(Self { terms, finders })
    }

    /// The terms as written in the pattern.
    pub fn as_slice(&self) -> &[String] {
        &self.terms
    }

    fn all_in(&self, text: &str) -> bool {
        self.finders.iter().all(|f| f.found_in(text))
    }

    fn any_in(&self, text: &str) -> bool {
        self.finders.iter().any(|f| f.found_in(text))
    }
}

/// A filter definition resolved once into the matching strategy it needs.
#[derive(Debug, Clone)]
pub enum CompiledFilter {
    /// Line carries this marker.
    Marker(u8),
    /// Pattern matches anywhere in the line.
    Regex(Regex),
    /// Line contains the single term.
    Contains(Terms),
    /// Line contains every term (`a && b`).
    AllOf(Terms),
    /// Line contains at least one term (`a || b`).
    AnyOf(Terms),
}

impl CompiledFilter {
    pub fn compile(def: &FilterDefinition) -> Result<Self, FilterError> {
        if def.kind == FilterKind::Marker {
            if !MARKER_RANGE.contains(&def.marker) {
                return Err(FilterError::MarkerOutOfRange(def.marker));
            }
            return Ok(CompiledFilter::Marker(def.marker));
        }

        if def.is_regex && def.is_logic {
            return Err(FilterError::ConflictingModes);
        }

        if def.is_regex {
            let re = RegexBuilder::new(&def.pattern)
                .case_insensitive(!def.case_sensitive)
                .build()
                .map_err(|source| FilterError::InvalidRegex {
                    pattern: def.pattern.clone(),
                    source,
                })?;
            return Ok(CompiledFilter::Regex(re));
        }

        if def.is_logic {
            // AND wins over OR when both separators appear.
            let and_terms: Vec<&str> = def.pattern.split(AND_SEPARATOR).collect();
            if and_terms.len() > 1 {
                return Ok(CompiledFilter::AllOf(Terms::new(and_terms, def.case_sensitive)?));
            }
            let or_terms: Vec<&str> = def.pattern.split(OR_SEPARATOR).collect();
            if or_terms.len() > 1 {
                return Ok(CompiledFilter::AnyOf(Terms::new(or_terms, def.case_sensitive)?));
            }
        }

        Ok(CompiledFilter::Contains(Terms::new(
            [def.pattern.as_str()],
            def.case_sensitive,
        )?))
    }

    /// Decide whether a line matches. `markers` are the line's attached markers.
    #[inline]
    pub fn matches(&self, text: &str, markers: &[u8]) -> bool {
        match self {
            CompiledFilter::Marker(marker) => markers.contains(marker),
            CompiledFilter::Regex(re) => re.is_match(text),
            CompiledFilter::Contains(terms) | CompiledFilter::AllOf(terms) => terms.all_in(text),
            CompiledFilter::AnyOf(terms) => terms.any_in(text),
        }
    }

    pub fn is_marker(&self, marker: u8) -> bool {
        matches!(self, CompiledFilter::Marker(m) if *m == marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(def: FilterDefinition) -> CompiledFilter {
        CompiledFilter::compile(&def).unwrap()
    }

    #[test]
    fn test_plain_text_is_substring() {
        let f = compile(FilterDefinition::text("abc"));
        assert!(f.matches("xxABCxx", &[]));
        assert!(f.matches("abc", &[]));
        assert!(!f.matches("ab c", &[]));
    }

    #[test]
    fn test_plain_text_case_sensitive() {
        let f = compile(FilterDefinition::text("abc").case_sensitive(true));
        assert!(f.matches("xabcx", &[]));
        assert!(!f.matches("ABC", &[]));
    }

    #[test]
    fn test_case_insensitive_non_ascii() {
        let f = compile(FilterDefinition::text("ÉTÉ"));
        assert!(f.matches("un été chaud", &[]));
    }

    #[test]
    fn test_case_insensitive_final_sigma() {
        let f = compile(FilterDefinition::text("Σ"));
        assert!(f.matches("ΟΔΟΣ", &[]));
        assert!(f.matches("Σ", &[]));
        let f = compile(FilterDefinition::text("ΟΔΟΣ"));
        assert!(f.matches("στην οδος", &[]));
        let f = compile(FilterDefinition::logic("Σ || zzz"));
        assert!(f.matches("ΟΔΟΣ", &[]));
    }

    #[test]
    fn test_case_insensitive_term_is_literal() {
        let f = compile(FilterDefinition::text("a.b (c)"));
        assert!(f.matches("x A.B (C) y", &[]));
        assert!(!f.matches("axb (c)", &[]));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let f = compile(FilterDefinition::text(""));
        assert!(f.matches("", &[]));
        assert!(f.matches("anything", &[]));
    }

    #[test]
    fn test_regex_match_and_case() {
        let f = compile(FilterDefinition::regex(r"err(or)?\s+\d+"));
        assert!(f.matches("ERROR 42", &[]));
        let f = compile(FilterDefinition::regex(r"err(or)?\s+\d+").case_sensitive(true));
        assert!(!f.matches("ERROR 42", &[]));
        assert!(f.matches("error 42", &[]));
    }

    #[test]
    fn test_invalid_regex_rejected_at_compile() {
        let err = CompiledFilter::compile(&FilterDefinition::regex("(unclosed")).unwrap_err();
        assert!(matches!(err, FilterError::InvalidRegex { .. }));
    }

    #[test]
    fn test_regex_and_logic_conflict() {
        let def = FilterDefinition {
            is_logic: true,
            ..FilterDefinition::regex("a")
        };
        assert!(matches!(
            CompiledFilter::compile(&def),
            Err(FilterError::ConflictingModes)
        ));
    }

    #[test]
    fn test_logic_and() {
        let f = compile(FilterDefinition::logic("x && y"));
        assert!(matches!(f, CompiledFilter::AllOf(_)));
        assert!(f.matches("y then x", &[]));
        assert!(!f.matches("only x", &[]));
    }

    #[test]
    fn test_logic_or() {
        let f = compile(FilterDefinition::logic("x || y"));
        assert!(matches!(f, CompiledFilter::AnyOf(_)));
        assert!(f.matches("only y", &[]));
        assert!(!f.matches("neither", &[]));
    }

    #[test]
    fn test_logic_and_takes_priority_over_or() {
        let f = compile(FilterDefinition::logic("a || b && c"));
        match &f {
            CompiledFilter::AllOf(terms) => assert_eq!(terms.as_slice(), ["a || b", "c"]),
            other => panic!("expected AllOf, got {:?}", other),
        }
        assert!(f.matches("a || b and c", &[]));
        assert!(!f.matches("a c", &[]));
    }

    #[test]
    fn test_logic_without_separator_degrades_to_contains() {
        let f = compile(FilterDefinition::logic("x&&y"));
        assert!(matches!(f, CompiledFilter::Contains(_)));
        assert!(f.matches("--x&&y--", &[]));
        assert!(!f.matches("x y", &[]));
    }

    #[test]
    fn test_marker_ignores_text() {
        let def = FilterDefinition {
            pattern: "never".to_string(),
            ..FilterDefinition::marker(3)
        };
        let f = compile(def);
        assert!(f.matches("anything", &[1, 3]));
        assert!(!f.matches("never", &[1, 2]));
        assert!(!f.matches("never", &[]));
    }

    #[test]
    fn test_marker_out_of_range() {
        assert!(matches!(
            CompiledFilter::compile(&FilterDefinition::marker(0)),
            Err(FilterError::MarkerOutOfRange(0))
        ));
        assert!(CompiledFilter::compile(&FilterDefinition::marker(10)).is_err());
    }

    #[test]
    fn test_marker_kind_ignores_mode_flags() {
        let def = FilterDefinition {
            is_regex: true,
            is_logic: true,
            ..FilterDefinition::marker(2)
        };
        assert!(CompiledFilter::compile(&def).is_ok());
    }
}
