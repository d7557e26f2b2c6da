//! Reference tables for location classification.
//!
//! Entries are written in their natural spelling and folded once, on first
//! use, so lookups compare folded text against folded keys. Declaration
//! order matters wherever a table is scanned rather than indexed.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::normalize::fold;

/// Placeholder words, machine names and fictional places that are never a location.
#[rustfmt::skip]
pub(crate) const PLACEHOLDERS: &[&str] = &[
    "earth", "world", "internet", "cyberspace", "online", "remote", "global",
    "nowhere", "somewhere", "anywhere", "everywhere", "unknown", "n/a", "na",
    "localhost", "127.0.0.1", "0.0.0.0", "my computer", "my house", "home",
    "the cloud", "cloud", "servers", "github", "gitlab", "bitbucket",
    "mars", "moon", "space", "universe", "galaxy", "milky way",
    "matrix", "metaverse", "virtual", "digital",
    "my room", "my desk", "my bed", "bedroom", "office",
    "here", "there", "over there", "around", "nearby",
    "undefined", "null", "none", "empty", "blank",
    "now", "kraftland", "the grid", "grid", "lenapehoking",
    "tomorrowland", "wonderland", "neverland", "atlantis",
    "wakanda", "asgard", "gotham", "metropolis", "mordor",
];

/// Emoticons, jokes and hedges that mark a location as not meant literally.
#[rustfmt::skip]
pub(crate) const SARCASM_MARKERS: &[&str] = &[
    ";-)", ":)", ":-)", "xd", "lol", "lmao", "haha", "jk", "kidding",
    "just kidding", "not really", "maybe", "who knows", "guess",
    "somewhere in", "lost in", "stuck in", "trapped in",
    "capital of tango", "previously", "used to be", "formerly",
    "probably", "possibly", "perhaps", "might be",
];

/// Indigenous, historical and geological region names with no modern country.
#[rustfmt::skip]
pub(crate) const FICTIONAL_REGIONS: &[&str] = &[
    "lenapehoking", "turtle island", "abya yala", "anahuac",
    "pangaea", "gondwana", "laurasia",
];

/// Two-letter strings accepted as locations on their own.
pub(crate) const SHORT_CODES: &[&str] = &[
    "us", "uk", "ca", "de", "fr", "br", "in", "au", "es", "it", "nl", "ch", "se", "no", "dk",
];

/// Separators between the parts of a "City, State, Country" style string.
pub(crate) const SEPARATORS: &[char] = &[',', ';', '|', '⮀', '/'];

/// Alternate country names, native spellings and codes.
#[rustfmt::skip]
pub(crate) const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("中国", "China"), ("中國", "China"), ("china", "China"), ("prc", "China"),
    ("people's republic of china", "China"),
    ("deutschland", "Germany"), ("germany", "Germany"), ("de", "Germany"),
    ("nederland", "Netherlands"), ("holland", "Netherlands"), ("netherlands", "Netherlands"),
    ("belgië", "Belgium"), ("belgique", "Belgium"), ("belgien", "Belgium"), ("belgium", "Belgium"),
    ("россия", "Russia"), ("russia", "Russia"), ("russian federation", "Russia"),
    ("україна", "Ukraine"), ("ukraine", "Ukraine"),
    ("sverige", "Sweden"), ("sweden", "Sweden"),
    ("日本", "Japan"), ("nippon", "Japan"), ("japan", "Japan"),
    ("台灣", "Taiwan"), ("臺灣", "Taiwan"), ("taiwan", "Taiwan"),
    ("usa", "United States"), ("us", "United States"), ("united states", "United States"),
    ("united states of america", "United States"),
    ("brasil", "Brazil"), ("brazil", "Brazil"), ("br", "Brazil"),
    ("france", "France"), ("francia", "France"), ("frança", "France"), ("fr", "France"),
    ("england", "United Kingdom"), ("uk", "United Kingdom"), ("united kingdom", "United Kingdom"),
    ("great britain", "United Kingdom"), ("britain", "United Kingdom"),
    ("turkey", "Turkey"), ("türkiye", "Turkey"), ("turkiye", "Turkey"),
    ("canada", "Canada"), ("ca", "Canada"),
    ("portugal", "Portugal"), ("pt", "Portugal"),
    ("italy", "Italy"), ("italia", "Italy"), ("it", "Italy"),
    ("spain", "Spain"), ("españa", "Spain"), ("es", "Spain"),
    ("india", "India"), ("bharat", "India"), ("in", "India"),
    ("poland", "Poland"), ("polska", "Poland"), ("pl", "Poland"),
    ("australia", "Australia"), ("au", "Australia"), ("aus", "Australia"),
    ("denmark", "Denmark"), ("danmark", "Denmark"), ("dk", "Denmark"),
    ("norway", "Norway"), ("norge", "Norway"), ("no", "Norway"),
    ("switzerland", "Switzerland"), ("schweiz", "Switzerland"), ("suisse", "Switzerland"),
    ("svizzera", "Switzerland"), ("ch", "Switzerland"),
    ("south korea", "Korea, Republic of"), ("korea", "Korea, Republic of"),
    ("republic of korea", "Korea, Republic of"),
    ("hong kong", "Hong Kong"), ("hk", "Hong Kong"),
    ("singapore", "Singapore"), ("sg", "Singapore"),
    ("mexico", "Mexico"), ("méxico", "Mexico"), ("mx", "Mexico"),
    ("argentina", "Argentina"), ("ar", "Argentina"),
    ("iceland", "Iceland"), ("island", "Iceland"), ("is", "Iceland"),
    ("montreal", "Canada"), ("toronto", "Canada"), ("vancouver", "Canada"),
    ("bilbao", "Spain"), ("reykjavik", "Iceland"), ("reykjavík", "Iceland"),
];

/// States, provinces and large cities that identify their country.
#[rustfmt::skip]
pub(crate) const STATE_CITY: &[(&str, &str)] = &[
    // Brazil
    ("sp", "Brazil"), ("sao paulo", "Brazil"), ("rj", "Brazil"), ("rio de janeiro", "Brazil"),
    ("mg", "Brazil"), ("minas gerais", "Brazil"), ("rs", "Brazil"), ("rio grande do sul", "Brazil"),
    ("pr", "Brazil"), ("parana", "Brazil"), ("sc", "Brazil"), ("santa catarina", "Brazil"),
    ("ba", "Brazil"), ("bahia", "Brazil"), ("ce", "Brazil"), ("ceara", "Brazil"),
    ("pe", "Brazil"), ("pernambuco", "Brazil"), ("recife", "Brazil"), ("porto alegre", "Brazil"),
    ("curitiba", "Brazil"), ("salvador", "Brazil"), ("fortaleza", "Brazil"),
    ("brasilia", "Brazil"), ("belo horizonte", "Brazil"), ("manaus", "Brazil"),
    ("goiania", "Brazil"),
    // India
    ("delhi", "India"), ("new delhi", "India"), ("mumbai", "India"), ("maharashtra", "India"),
    ("bangalore", "India"), ("karnataka", "India"), ("chennai", "India"), ("tamil nadu", "India"),
    ("kolkata", "India"), ("west bengal", "India"), ("hyderabad", "India"),
    ("telangana", "India"), ("pune", "India"), ("ahmedabad", "India"), ("gujarat", "India"),
    ("jaipur", "India"), ("rajasthan", "India"),
    // Germany
    ("berlin", "Germany"), ("hamburg", "Germany"), ("munich", "Germany"), ("munchen", "Germany"),
    ("bavaria", "Germany"), ("bayern", "Germany"), ("frankfurt", "Germany"), ("hesse", "Germany"),
    ("hessen", "Germany"), ("stuttgart", "Germany"), ("baden-wurttemberg", "Germany"),
    ("dusseldorf", "Germany"), ("dortmund", "Germany"), ("cologne", "Germany"), ("koln", "Germany"),
    ("north rhine-westphalia", "Germany"),
    // United States
    ("ny", "United States"), ("new york", "United States"), ("california", "United States"),
    ("tx", "United States"), ("texas", "United States"), ("fl", "United States"),
    ("florida", "United States"), ("il", "United States"), ("illinois", "United States"),
    ("wa", "United States"), ("washington", "United States"), ("los angeles", "United States"),
    ("san francisco", "United States"), ("chicago", "United States"), ("houston", "United States"),
    ("boston", "United States"), ("atlanta", "United States"), ("seattle", "United States"),
    ("miami", "United States"), ("dallas", "United States"), ("austin", "United States"),
    ("san diego", "United States"), ("philadelphia", "United States"),
    ("portland", "United States"), ("denver", "United States"), ("phoenix", "United States"),
    ("las vegas", "United States"),
    // Canada
    ("montreal", "Canada"), ("toronto", "Canada"), ("vancouver", "Canada"), ("ottawa", "Canada"),
    ("calgary", "Canada"), ("quebec", "Canada"), ("winnipeg", "Canada"), ("edmonton", "Canada"),
    ("ontario", "Canada"), ("british columbia", "Canada"),
    // Spain
    ("madrid", "Spain"), ("barcelona", "Spain"), ("valencia", "Spain"), ("sevilla", "Spain"),
    ("seville", "Spain"), ("bilbao", "Spain"), ("malaga", "Spain"), ("zaragoza", "Spain"),
    ("catalonia", "Spain"), ("andalusia", "Spain"),
    // United Kingdom
    ("london", "United Kingdom"), ("manchester", "United Kingdom"),
    ("birmingham", "United Kingdom"), ("edinburgh", "United Kingdom"),
    ("glasgow", "United Kingdom"), ("liverpool", "United Kingdom"),
    ("bristol", "United Kingdom"), ("scotland", "United Kingdom"),
    // France
    ("paris", "France"), ("marseille", "France"), ("lyon", "France"), ("toulouse", "France"),
    ("nice", "France"),
    // China
    ("beijing", "China"), ("shanghai", "China"), ("guangzhou", "China"), ("shenzhen", "China"),
    ("chengdu", "China"), ("hangzhou", "China"), ("wuhan", "China"), ("xian", "China"),
    ("xi'an", "China"), ("nanjing", "China"),
];

/// A table of folded keys that keeps declaration order for scans and an
/// index for exact lookups.
#[derive(Debug)]
pub(crate) struct FoldedTable {
    ordered: Vec<(String, &'static str)>,
    index: HashMap<String, &'static str>,
}

impl FoldedTable {
    fn build(entries: &[(&'static str, &'static str)]) -> Self {
        let mut ordered = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let folded = fold(key);
            if index.contains_key(&folded) {
                continue;
            }
            index.insert(folded.clone(), *value);
            ordered.push((folded, *value));
        }
        Self { ordered, index }
    }

    /// Exact lookup of an already-folded key.
    pub(crate) fn get(&self, folded: &str) -> Option<&'static str> {
        self.index.get(folded).copied()
    }

    /// Entries in declaration order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.ordered.iter().map(|(key, value)| (key.as_str(), *value))
    }

    /// Distinct values, in first-seen order.
    pub(crate) fn targets(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for (_, value) in &self.ordered {
            if !seen.contains(value) {
                seen.push(*value);
            }
        }
        seen
    }
}

pub(crate) static ALIASES: LazyLock<FoldedTable> =
    LazyLock::new(|| FoldedTable::build(COUNTRY_ALIASES));

pub(crate) static STATES_AND_CITIES: LazyLock<FoldedTable> =
    LazyLock::new(|| FoldedTable::build(STATE_CITY));
