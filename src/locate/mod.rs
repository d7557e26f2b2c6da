//! Location-to-country resolution.
//!
//! Profile locations are untrusted free text: empty, multilingual, full of
//! jokes and made-up places. [`LocationResolver`] runs an ordered set of
//! deterministic rules over the folded text and, only when none of them
//! decides, asks an optional [`Geocoder`]. The result is a [`Verdict`]:
//! a canonical country name, or unresolved.
//!
//! # Architecture
//!
//! - [`fold`] / [`contains_term`] - text folding and word-boundary matching
//! - [`COUNTRIES`] / [`normalize_country`] - ISO 3166-1 table and name normalization
//! - [`RuleSet`] - ordered [`LocationRule`]s (validity, sarcasm, city families,
//!   composite localities, segments, keywords)
//! - [`Geocoder`] / [`NominatimGeocoder`] - best-effort network fallback
//!
//! # Example
//!
//! ```
//! use forge_harvest::locate::{LocationResolver, Verdict};
//!
//! let resolver = LocationResolver::offline();
//! assert_eq!(resolver.classify("Berlin, DE").verdict, Verdict::country("Germany"));
//! assert_eq!(resolver.classify("Earth").verdict, Verdict::Unresolved);
//! ```

mod countries;
mod error;
mod geocode;
mod normalize;
mod rules;
mod tables;

pub use countries::{COUNTRIES, Country, country_by_code, normalize_country};
pub use error::GeocodeError;
pub use geocode::{
    DEFAULT_NOMINATIM_URL, GEOCODE_SPACING, GEOCODE_TIMEOUT, Geocoder, NominatimGeocoder,
};
pub use normalize::{contains_term, fold};
pub use rules::{
    CityFamily, CityFamilyRule, CompositeLocality, CompositeLocalityRule, KeywordRule,
    LastSegmentRule, LocationInput, LocationRule, RejectReason, RuleDecision, RuleOutcome,
    RuleSet, SarcasmRule, SegmentRule, ValidityRule,
};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

/// Outcome of resolving one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Verdict {
    /// Canonical country name.
    Country(String),
    /// No confident country. An expected outcome, not an error.
    Unresolved,
}

impl Verdict {
    /// Shorthand for `Verdict::Country(name.to_string())`.
    #[must_use]
    pub fn country(name: &str) -> Self {
        Self::Country(name.to_string())
    }

    /// The country name, if resolved.
    #[must_use]
    pub fn as_country(&self) -> Option<&str> {
        match self {
            Self::Country(name) => Some(name),
            Self::Unresolved => None,
        }
    }

    /// Whether a country was found.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Country(_))
    }

    /// Consumes the verdict into an optional country name.
    #[must_use]
    pub fn into_country(self) -> Option<String> {
        match self {
            Self::Country(name) => Some(name),
            Self::Unresolved => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Country(name) => f.write_str(name),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// A verdict together with how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The verdict.
    pub verdict: Verdict,
    /// Rule or geocoder that decided; `None` when nothing did.
    pub decided_by: Option<&'static str>,
    /// Why the input was rejected, when a rule rejected it.
    pub rejection: Option<RejectReason>,
}

impl Classification {
    fn undecided() -> Self {
        Self {
            verdict: Verdict::Unresolved,
            decided_by: None,
            rejection: None,
        }
    }

    fn from_decision(decision: RuleDecision) -> Self {
        match decision.outcome {
            RuleOutcome::Resolved(country) => Self {
                verdict: Verdict::country(country),
                decided_by: decision.decided_by,
                rejection: None,
            },
            RuleOutcome::Rejected(reason) => Self {
                verdict: Verdict::Unresolved,
                decided_by: decision.decided_by,
                rejection: Some(reason),
            },
            RuleOutcome::Pass => Self::undecided(),
        }
    }
}

/// Classifies free-text locations into canonical countries.
///
/// Reference tables are process-wide and read-only, so one resolver can be
/// shared by any number of workers behind an `Arc`.
#[derive(Debug)]
pub struct LocationResolver {
    rules: RuleSet,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl fmt::Debug for dyn Geocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Geocoder({})", self.name())
    }
}

impl LocationResolver {
    /// The standard rules with no network fallback.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            rules: RuleSet::standard(),
            geocoder: None,
        }
    }

    /// The standard rules with a geocoding fallback.
    #[must_use]
    pub fn with_geocoder(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            rules: RuleSet::standard(),
            geocoder: Some(geocoder),
        }
    }

    /// Custom rules, optionally with a geocoding fallback.
    #[must_use]
    pub fn with_rules(rules: RuleSet, geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self { rules, geocoder }
    }

    /// Whether a geocoding fallback is configured.
    #[must_use]
    pub fn has_geocoder(&self) -> bool {
        self.geocoder.is_some()
    }

    /// Deterministic classification; never touches the network.
    #[must_use]
    pub fn classify(&self, location: &str) -> Classification {
        Classification::from_decision(self.rules.evaluate(location))
    }

    /// Resolves a location, falling back to the geocoder when no rule decided.
    pub async fn resolve(&self, location: &str) -> Verdict {
        self.resolve_detailed(location).await.verdict
    }

    /// Like [`Self::resolve`], reporting which step decided.
    ///
    /// Rejected inputs never reach the geocoder. Any geocoder failure is
    /// logged and yields an unresolved verdict.
    #[instrument(skip(self))]
    pub async fn resolve_detailed(&self, location: &str) -> Classification {
        let classification = self.classify(location);
        if classification.decided_by.is_some() {
            debug!(
                verdict = %classification.verdict,
                decided_by = classification.decided_by,
                "classified by rules"
            );
            return classification;
        }
        let Some(geocoder) = &self.geocoder else {
            return classification;
        };

        match geocoder.country_of(location.trim()).await {
            Ok(Some(reported)) => {
                let country = normalize_country(&reported);
                if country.is_empty() {
                    return Classification::undecided();
                }
                debug!(%reported, %country, geocoder = geocoder.name(), "geocoded");
                Classification {
                    verdict: Verdict::Country(country),
                    decided_by: Some(geocoder.name()),
                    rejection: None,
                }
            }
            Ok(None) => {
                debug!(geocoder = geocoder.name(), "geocoder found no country");
                Classification::undecided()
            }
            Err(error) => {
                debug!(geocoder = geocoder.name(), error = %error, "geocoding failed");
                Classification::undecided()
            }
        }
    }

    /// Maps a country-like string to its canonical name. See [`normalize_country`].
    #[must_use]
    pub fn normalize_country(&self, input: &str) -> String {
        normalize_country(input)
    }
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::offline()
    }
}
