//! Ordered disambiguation rules.
//!
//! Each rule looks at a [`LocationInput`] and either resolves it to a
//! country, rejects it, or passes it on. [`RuleSet`] runs rules in order and
//! stops at the first one that decides.

use std::fmt;

use super::countries::lookup_exact;
use super::normalize::{contains_term, fold};
use super::tables::{
    ALIASES, FICTIONAL_REGIONS, PLACEHOLDERS, SARCASM_MARKERS, SEPARATORS, SHORT_CODES,
    STATES_AND_CITIES,
};

/// A location string prepared once for every rule.
#[derive(Debug, Clone)]
pub struct LocationInput<'a> {
    raw: &'a str,
    folded: String,
    segments: Vec<String>,
}

impl<'a> LocationInput<'a> {
    /// Folds `raw` and splits it on the recognised separators.
    ///
    /// Without a separator the whole string is the only segment.
    #[must_use]
    pub fn new(raw: &'a str) -> Self {
        let folded = fold(raw);
        let segments = if raw.contains(SEPARATORS) {
            raw.split(SEPARATORS)
                .map(fold)
                .filter(|segment| !segment.is_empty())
                .collect()
        } else if folded.is_empty() {
            Vec::new()
        } else {
            vec![folded.clone()]
        };
        Self {
            raw,
            folded,
            segments,
        }
    }

    /// The untouched input.
    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The folded whole string.
    #[must_use]
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Folded, non-empty segments in input order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Why a location was rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty or whitespace only.
    Empty,
    /// Shorter than two characters, or a two-letter string that is not a known code.
    TooShort,
    /// No alphabetic character at all.
    NoLetters,
    /// Contains a placeholder such as "earth" or "remote".
    Placeholder(&'static str),
    /// Contains a joke or hedge marker.
    Sarcasm(&'static str),
    /// Names a fictional or historical region.
    Fictional(&'static str),
    /// A city matched together with conflicting country names.
    Ambiguous(&'static str),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::TooShort => f.write_str("too short"),
            Self::NoLetters => f.write_str("no letters"),
            Self::Placeholder(term) => write!(f, "placeholder '{term}'"),
            Self::Sarcasm(term) => write!(f, "sarcasm marker '{term}'"),
            Self::Fictional(term) => write!(f, "fictional region '{term}'"),
            Self::Ambiguous(city) => write!(f, "'{city}' with conflicting countries"),
        }
    }
}

/// What a single rule concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Confident match to a canonical country name.
    Resolved(&'static str),
    /// Confidently not a usable location.
    Rejected(RejectReason),
    /// No opinion; try the next rule.
    Pass,
}

/// One step of location classification.
pub trait LocationRule: Send + Sync {
    /// Short stable name, reported as the deciding rule.
    fn name(&self) -> &'static str;

    /// Evaluates the rule against a prepared input.
    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome;
}

fn first_term(folded: &str, terms: &[&'static str]) -> Option<&'static str> {
    terms
        .iter()
        .copied()
        .find(|term| contains_term(folded, term))
}

// ==================== Validity ====================

/// Rejects empty, too-short, letterless and blocklisted strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidityRule;

impl LocationRule for ValidityRule {
    fn name(&self) -> &'static str {
        "validity"
    }

    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome {
        let folded = input.folded();
        if folded.is_empty() {
            return RuleOutcome::Rejected(RejectReason::Empty);
        }
        let length = folded.chars().count();
        // Two-character native aliases (中国, 日本) are not abbreviations.
        let known_short = SHORT_CODES.contains(&folded) || ALIASES.get(folded).is_some();
        if length < 2 || (length == 2 && !known_short) {
            return RuleOutcome::Rejected(RejectReason::TooShort);
        }
        if !folded.chars().any(char::is_alphabetic) {
            return RuleOutcome::Rejected(RejectReason::NoLetters);
        }
        if let Some(term) = first_term(folded, PLACEHOLDERS) {
            return RuleOutcome::Rejected(RejectReason::Placeholder(term));
        }
        SarcasmRule.evaluate(input)
    }
}

// ==================== Sarcasm ====================

/// Rejects strings carrying sarcasm markers or fictional region names.
///
/// Validity already runs this scan; the rule also stands on its own so a
/// custom rule set can place it after rules that rewrite nothing but may
/// otherwise resolve a joke.
#[derive(Debug, Default, Clone, Copy)]
pub struct SarcasmRule;

impl LocationRule for SarcasmRule {
    fn name(&self) -> &'static str {
        "sarcasm"
    }

    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome {
        let folded = input.folded();
        if let Some(term) = first_term(folded, SARCASM_MARKERS) {
            return RuleOutcome::Rejected(RejectReason::Sarcasm(term));
        }
        if let Some(term) = first_term(folded, FICTIONAL_REGIONS) {
            return RuleOutcome::Rejected(RejectReason::Fictional(term));
        }
        RuleOutcome::Pass
    }
}

// ==================== City families ====================

/// Cities whose spelling collides with other countries' names, checked
/// together with a watch-list of country tokens.
#[derive(Debug, Clone, Copy)]
pub struct CityFamily {
    /// Family label for logs.
    pub label: &'static str,
    /// City token and the country it belongs to.
    pub cities: &'static [(&'static str, &'static str)],
    /// Country tokens that may contradict the city, with their countries.
    pub watch: &'static [(&'static str, &'static str)],
}

impl CityFamily {
    /// Resolves the first matching city, or rejects when the string also
    /// names a different watch-listed country.
    fn evaluate(&self, folded: &str) -> Option<RuleOutcome> {
        let (city, country) = self
            .cities
            .iter()
            .copied()
            .find(|(city, _)| contains_term(folded, city))?;

        let conflicting = self
            .watch
            .iter()
            .any(|(token, other)| *other != country && contains_term(folded, token));
        Some(if conflicting {
            RuleOutcome::Rejected(RejectReason::Ambiguous(city))
        } else {
            RuleOutcome::Resolved(country)
        })
    }
}

const SPANISH_CITIES: CityFamily = CityFamily {
    label: "spanish cities",
    cities: &[
        ("madrid", "Spain"),
        ("barcelona", "Spain"),
        ("valencia", "Spain"),
        ("sevilla", "Spain"),
        ("seville", "Spain"),
        ("bilbao", "Spain"),
        ("malaga", "Spain"),
    ],
    watch: &[
        ("spain", "Spain"),
        ("espana", "Spain"),
        ("iceland", "Iceland"),
        ("island", "Iceland"),
        ("reykjavik", "Iceland"),
    ],
};

const ICELANDIC_CITIES: CityFamily = CityFamily {
    label: "icelandic cities",
    cities: &[
        ("reykjavik", "Iceland"),
        ("akureyri", "Iceland"),
        ("keflavik", "Iceland"),
    ],
    watch: &[
        ("iceland", "Iceland"),
        ("island", "Iceland"),
        ("spain", "Spain"),
        ("espana", "Spain"),
    ],
};

const MONTREAL: CityFamily = CityFamily {
    label: "montreal",
    cities: &[("montreal", "Canada")],
    watch: &[],
};

const SCANDINAVIAN_CITIES: CityFamily = CityFamily {
    label: "scandinavian cities",
    cities: &[
        ("copenhagen", "Denmark"),
        ("kobenhavn", "Denmark"),
        ("aarhus", "Denmark"),
        ("odense", "Denmark"),
        ("stockholm", "Sweden"),
        ("gothenburg", "Sweden"),
        ("malmo", "Sweden"),
        ("uppsala", "Sweden"),
        ("oslo", "Norway"),
        ("bergen", "Norway"),
        ("trondheim", "Norway"),
        ("stavanger", "Norway"),
        ("helsinki", "Finland"),
        ("espoo", "Finland"),
        ("tampere", "Finland"),
        ("vantaa", "Finland"),
        ("reykjavik", "Iceland"),
        ("akureyri", "Iceland"),
        ("keflavik", "Iceland"),
    ],
    watch: &[
        ("denmark", "Denmark"),
        ("sweden", "Sweden"),
        ("norway", "Norway"),
        ("finland", "Finland"),
        ("iceland", "Iceland"),
        ("danmark", "Denmark"),
        ("sverige", "Sweden"),
        ("norge", "Norway"),
        ("island", "Iceland"),
    ],
};

/// Checks the high-ambiguity city families in order.
#[derive(Debug, Clone)]
pub struct CityFamilyRule {
    families: Vec<CityFamily>,
}

impl CityFamilyRule {
    /// A rule over custom families, checked in the given order.
    #[must_use]
    pub fn new(families: Vec<CityFamily>) -> Self {
        Self { families }
    }
}

impl Default for CityFamilyRule {
    fn default() -> Self {
        Self::new(vec![
            SPANISH_CITIES,
            ICELANDIC_CITIES,
            MONTREAL,
            SCANDINAVIAN_CITIES,
        ])
    }
}

impl LocationRule for CityFamilyRule {
    fn name(&self) -> &'static str {
        "city_family"
    }

    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome {
        self.families
            .iter()
            .find_map(|family| {
                let outcome = family.evaluate(input.folded())?;
                tracing::trace!(family = family.label, ?outcome, "city family matched");
                Some(outcome)
            })
            .unwrap_or(RuleOutcome::Pass)
    }
}

// ==================== Composite locality ====================

/// "Region marker plus country token" and fixed phrase patterns for one country.
#[derive(Debug, Clone, Copy)]
pub struct CompositeLocality {
    /// Country the rule resolves to.
    pub country: &'static str,
    /// Country token that must appear as a word next to a marker.
    pub country_token: &'static str,
    /// Administrative region words.
    pub markers: &'static [&'static str],
    /// Phrases that resolve on their own (raw substring match).
    pub phrases: &'static [&'static str],
}

impl CompositeLocality {
    fn matches(&self, folded: &str) -> bool {
        self.phrases.iter().any(|phrase| folded.contains(phrase))
            || (self.markers.iter().any(|marker| folded.contains(marker))
                && contains_term(folded, self.country_token))
    }
}

const CHINA_LOCALITIES: CompositeLocality = CompositeLocality {
    country: "China",
    country_token: "china",
    markers: &["province", "district", "prefecture"],
    phrases: &[
        "in china",
        "china.",
        "china,",
        " china ",
        "province china",
        "district china",
        ", china",
        "china)",
    ],
};

/// Resolves "Hunan Province, China"-style strings without enumerating regions.
#[derive(Debug, Clone)]
pub struct CompositeLocalityRule {
    localities: Vec<CompositeLocality>,
}

impl CompositeLocalityRule {
    /// A rule over custom localities, checked in the given order.
    #[must_use]
    pub fn new(localities: Vec<CompositeLocality>) -> Self {
        Self { localities }
    }
}

impl Default for CompositeLocalityRule {
    fn default() -> Self {
        Self::new(vec![CHINA_LOCALITIES])
    }
}

impl LocationRule for CompositeLocalityRule {
    fn name(&self) -> &'static str {
        "composite_locality"
    }

    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome {
        self.localities
            .iter()
            .find(|locality| locality.matches(input.folded()))
            .map_or(RuleOutcome::Pass, |locality| {
                RuleOutcome::Resolved(locality.country)
            })
    }
}

// ==================== Segments ====================

/// Alias table, then state/city table, then ISO names and codes.
fn lookup_segment(segment: &str) -> Option<&'static str> {
    ALIASES
        .get(segment)
        .or_else(|| STATES_AND_CITIES.get(segment))
        .or_else(|| lookup_exact(segment))
}

/// Looks up the final segment of a multi-part string.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastSegmentRule;

impl LocationRule for LastSegmentRule {
    fn name(&self) -> &'static str {
        "last_segment"
    }

    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome {
        match input.segments() {
            [_, .., last] => lookup_segment(last).map_or(RuleOutcome::Pass, RuleOutcome::Resolved),
            _ => RuleOutcome::Pass,
        }
    }
}

/// Looks up every segment in order; the first hit wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentRule;

impl LocationRule for SegmentRule {
    fn name(&self) -> &'static str {
        "segment"
    }

    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome {
        input
            .segments()
            .iter()
            .filter(|segment| segment.chars().count() >= 2)
            .find_map(|segment| lookup_segment(segment))
            .map_or(RuleOutcome::Pass, RuleOutcome::Resolved)
    }
}

// ==================== Keyword ====================

/// Finds a state or city name embedded anywhere in the string.
///
/// Only keys longer than three characters are used; shorter ones are
/// abbreviations that would fire inside ordinary words. Longer keys still
/// match inside other words ("nice" in "Venice").
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordRule;

impl LocationRule for KeywordRule {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn evaluate(&self, input: &LocationInput<'_>) -> RuleOutcome {
        let folded = input.folded();
        STATES_AND_CITIES
            .iter()
            .find(|(key, _)| key.chars().count() > 3 && folded.contains(key))
            .map_or(RuleOutcome::Pass, |(_, country)| {
                RuleOutcome::Resolved(country)
            })
    }
}

// ==================== RuleSet ====================

/// A classification decided by the deterministic rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDecision {
    /// What the deciding rule concluded; `Pass` when no rule decided.
    pub outcome: RuleOutcome,
    /// Name of the deciding rule.
    pub decided_by: Option<&'static str>,
}

/// Rules evaluated in order until one resolves or rejects.
pub struct RuleSet {
    rules: Vec<Box<dyn LocationRule>>,
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.name()))
            .finish()
    }
}

impl RuleSet {
    /// An empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard ordering: validity, sarcasm, city families, composite
    /// localities, last segment, every segment, embedded keywords.
    #[must_use]
    pub fn standard() -> Self {
        let mut rules = Self::new();
        rules.push(ValidityRule);
        rules.push(SarcasmRule);
        rules.push(CityFamilyRule::default());
        rules.push(CompositeLocalityRule::default());
        rules.push(LastSegmentRule);
        rules.push(SegmentRule);
        rules.push(KeywordRule);
        rules
    }

    /// Appends a rule after the existing ones.
    pub fn push(&mut self, rule: impl LocationRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// Rule names in evaluation order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Runs the rules in order and stops at the first decision.
    #[must_use]
    pub fn evaluate(&self, raw: &str) -> RuleDecision {
        let input = LocationInput::new(raw);
        for rule in &self.rules {
            let outcome = rule.evaluate(&input);
            if outcome != RuleOutcome::Pass {
                return RuleDecision {
                    outcome,
                    decided_by: Some(rule.name()),
                };
            }
        }
        RuleDecision {
            outcome: RuleOutcome::Pass,
            decided_by: None,
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(rule: &dyn LocationRule, raw: &str) -> RuleOutcome {
        rule.evaluate(&LocationInput::new(raw))
    }

    // ==================== LocationInput Tests ====================

    #[test]
    fn test_input_segments_on_any_separator() {
        let input = LocationInput::new("Curitiba | PR ⮀ Brasil");
        assert_eq!(input.segments(), ["curitiba", "pr", "brasil"]);
        let input = LocationInput::new("Berlin;  ; DE/");
        assert_eq!(input.segments(), ["berlin", "de"]);
    }

    #[test]
    fn test_input_without_separator_is_one_segment() {
        let input = LocationInput::new(" São Paulo ");
        assert_eq!(input.segments(), ["sao paulo"]);
        assert_eq!(input.raw(), " São Paulo ");
        assert!(LocationInput::new("  ").segments().is_empty());
    }

    // ==================== Validity Tests ====================

    #[test]
    fn test_validity_rejects_short_and_letterless() {
        assert_eq!(
            eval(&ValidityRule, ""),
            RuleOutcome::Rejected(RejectReason::Empty)
        );
        assert_eq!(
            eval(&ValidityRule, "x"),
            RuleOutcome::Rejected(RejectReason::TooShort)
        );
        assert_eq!(
            eval(&ValidityRule, "zz"),
            RuleOutcome::Rejected(RejectReason::TooShort)
        );
        assert_eq!(
            eval(&ValidityRule, "12345"),
            RuleOutcome::Rejected(RejectReason::NoLetters)
        );
        assert_eq!(eval(&ValidityRule, "DE"), RuleOutcome::Pass);
    }

    #[test]
    fn test_validity_accepts_two_character_native_aliases() {
        for alias in ["中国", "中國", "日本", "台灣", "臺灣"] {
            assert_eq!(eval(&ValidityRule, alias), RuleOutcome::Pass, "{alias}");
        }
        assert_eq!(
            eval(&ValidityRule, "京都"),
            RuleOutcome::Rejected(RejectReason::TooShort)
        );
    }

    #[test]
    fn test_validity_rejects_placeholders_at_word_boundaries() {
        assert_eq!(
            eval(&ValidityRule, "Planet Earth"),
            RuleOutcome::Rejected(RejectReason::Placeholder("earth"))
        );
        assert_eq!(
            eval(&ValidityRule, "localhost:8080"),
            RuleOutcome::Rejected(RejectReason::Placeholder("localhost"))
        );
        assert_eq!(eval(&ValidityRule, "Beijing, China"), RuleOutcome::Pass);
        assert_eq!(eval(&ValidityRule, "Hereford, England"), RuleOutcome::Pass);
    }

    #[test]
    fn test_validity_includes_sarcasm_scan() {
        assert_eq!(
            eval(&ValidityRule, "Tokyo lol"),
            RuleOutcome::Rejected(RejectReason::Sarcasm("lol"))
        );
    }

    // ==================== Sarcasm Tests ====================

    #[test]
    fn test_sarcasm_markers_and_fictional_regions() {
        assert_eq!(
            eval(&SarcasmRule, "Paris ;-)"),
            RuleOutcome::Rejected(RejectReason::Sarcasm(";-)"))
        );
        assert_eq!(
            eval(&SarcasmRule, "Turtle Island"),
            RuleOutcome::Rejected(RejectReason::Fictional("turtle island"))
        );
        assert_eq!(eval(&SarcasmRule, "Lolland, Denmark"), RuleOutcome::Pass);
    }

    // ==================== City Family Tests ====================

    #[test]
    fn test_city_family_resolves_unambiguous_city() {
        let rule = CityFamilyRule::default();
        assert_eq!(eval(&rule, "Madrid"), RuleOutcome::Resolved("Spain"));
        assert_eq!(eval(&rule, "Madrid, Spain"), RuleOutcome::Resolved("Spain"));
        assert_eq!(eval(&rule, "Oslo, Norge"), RuleOutcome::Resolved("Norway"));
        assert_eq!(eval(&rule, "Montréal, QC"), RuleOutcome::Resolved("Canada"));
    }

    #[test]
    fn test_city_family_conflicting_tokens_are_ambiguous() {
        let rule = CityFamilyRule::default();
        assert_eq!(
            eval(&rule, "Reykjavik, Spain"),
            RuleOutcome::Rejected(RejectReason::Ambiguous("reykjavik"))
        );
        assert_eq!(
            eval(&rule, "Copenhagen / Sweden"),
            RuleOutcome::Rejected(RejectReason::Ambiguous("copenhagen"))
        );
    }

    #[test]
    fn test_city_family_matches_whole_words_only() {
        let rule = CityFamilyRule::default();
        assert_eq!(eval(&rule, "Osloer Strasse"), RuleOutcome::Pass);
    }

    // ==================== Composite Tests ====================

    #[test]
    fn test_composite_marker_plus_country() {
        let rule = CompositeLocalityRule::default();
        assert_eq!(
            eval(&rule, "Hunan Province China"),
            RuleOutcome::Resolved("China")
        );
        assert_eq!(eval(&rule, "Living in China"), RuleOutcome::Resolved("China"));
        assert_eq!(eval(&rule, "China"), RuleOutcome::Pass);
        assert_eq!(eval(&rule, "Kowloon District"), RuleOutcome::Pass);
    }

    // ==================== Segment Tests ====================

    #[test]
    fn test_last_segment_needs_several_segments() {
        assert_eq!(
            eval(&LastSegmentRule, "Berlin, DE"),
            RuleOutcome::Resolved("Germany")
        );
        assert_eq!(eval(&LastSegmentRule, "Germany"), RuleOutcome::Pass);
    }

    #[test]
    fn test_last_segment_table_priority() {
        // "pr" is a Brazilian state before it is Puerto Rico's code.
        assert_eq!(
            eval(&LastSegmentRule, "Curitiba, PR"),
            RuleOutcome::Resolved("Brazil")
        );
        assert_eq!(
            eval(&LastSegmentRule, "Lagos, Nigeria"),
            RuleOutcome::Resolved("Nigeria")
        );
    }

    #[test]
    fn test_segment_rule_recovers_reversed_order() {
        assert_eq!(
            eval(&SegmentRule, "Deutschland, Kleinstadt"),
            RuleOutcome::Resolved("Germany")
        );
        assert_eq!(eval(&SegmentRule, "Japan"), RuleOutcome::Resolved("Japan"));
        assert_eq!(eval(&SegmentRule, "x, Atlantis Bay"), RuleOutcome::Pass);
    }

    #[test]
    fn test_keyword_rule_finds_embedded_city() {
        assert_eq!(
            eval(&KeywordRule, "Greater London Area"),
            RuleOutcome::Resolved("United Kingdom")
        );
        assert_eq!(eval(&KeywordRule, "near ny"), RuleOutcome::Pass);
    }

    #[test]
    fn test_keyword_rule_matches_raw_substrings() {
        // Keys match anywhere, not only on word boundaries; recall over precision.
        assert_eq!(eval(&KeywordRule, "Venice"), RuleOutcome::Resolved("France"));
        assert_eq!(
            eval(&KeywordRule, "San Salvador"),
            RuleOutcome::Resolved("Brazil")
        );
    }

    // ==================== RuleSet Tests ====================

    #[test]
    fn test_standard_order() {
        assert_eq!(
            RuleSet::standard().names(),
            [
                "validity",
                "sarcasm",
                "city_family",
                "composite_locality",
                "last_segment",
                "segment",
                "keyword"
            ]
        );
    }

    #[test]
    fn test_rule_set_reports_deciding_rule() {
        let rules = RuleSet::standard();
        let decision = rules.evaluate("Remote");
        assert_eq!(decision.decided_by, Some("validity"));
        let decision = rules.evaluate("Recife, Pernambuco, Brasil");
        assert_eq!(decision.outcome, RuleOutcome::Resolved("Brazil"));
        assert_eq!(decision.decided_by, Some("last_segment"));
        let decision = rules.evaluate("Qwertyville");
        assert_eq!(decision.outcome, RuleOutcome::Pass);
        assert_eq!(decision.decided_by, None);
    }

    #[test]
    fn test_empty_rule_set_passes() {
        assert_eq!(RuleSet::new().evaluate("Berlin").decided_by, None);
    }
}
