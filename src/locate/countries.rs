//! ISO 3166-1 country table and country-name normalization.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::normalize::{contains_term, fold};
use super::tables::ALIASES;

/// One ISO 3166-1 country with the names it is known by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code.
    pub alpha2: &'static str,
    /// ISO 3166-1 alpha-3 code.
    pub alpha3: &'static str,
    /// Canonical display name; every alias resolves to one of these.
    pub name: &'static str,
    /// Formal state name, when it differs from `name`.
    pub official_name: Option<&'static str>,
    /// Everyday short name, when it differs from `name`.
    pub common_name: Option<&'static str>,
}

impl Country {
    const fn new(alpha2: &'static str, alpha3: &'static str, name: &'static str) -> Self {
        Self {
            alpha2,
            alpha3,
            name,
            official_name: None,
            common_name: None,
        }
    }

    const fn official(mut self, official_name: &'static str) -> Self {
        self.official_name = Some(official_name);
        self
    }

    const fn common(mut self, common_name: &'static str) -> Self {
        self.common_name = Some(common_name);
        self
    }
}

const fn c(alpha2: &'static str, alpha3: &'static str, name: &'static str) -> Country {
    Country::new(alpha2, alpha3, name)
}

/// Every ISO 3166-1 country.
#[rustfmt::skip]
pub static COUNTRIES: &[Country] = &[
    c("AW", "ABW", "Aruba"),
    c("AF", "AFG", "Afghanistan").official("Islamic Republic of Afghanistan"),
    c("AO", "AGO", "Angola").official("Republic of Angola"),
    c("AI", "AIA", "Anguilla"),
    c("AX", "ALA", "Åland Islands"),
    c("AL", "ALB", "Albania").official("Republic of Albania"),
    c("AD", "AND", "Andorra").official("Principality of Andorra"),
    c("AE", "ARE", "United Arab Emirates"),
    c("AR", "ARG", "Argentina").official("Argentine Republic"),
    c("AM", "ARM", "Armenia").official("Republic of Armenia"),
    c("AS", "ASM", "American Samoa"),
    c("AQ", "ATA", "Antarctica"),
    c("TF", "ATF", "French Southern Territories"),
    c("AG", "ATG", "Antigua and Barbuda"),
    c("AU", "AUS", "Australia"),
    c("AT", "AUT", "Austria").official("Republic of Austria"),
    c("AZ", "AZE", "Azerbaijan").official("Republic of Azerbaijan"),
    c("BI", "BDI", "Burundi").official("Republic of Burundi"),
    c("BE", "BEL", "Belgium").official("Kingdom of Belgium"),
    c("BJ", "BEN", "Benin").official("Republic of Benin"),
    c("BQ", "BES", "Bonaire, Sint Eustatius and Saba"),
    c("BF", "BFA", "Burkina Faso"),
    c("BD", "BGD", "Bangladesh").official("People's Republic of Bangladesh"),
    c("BG", "BGR", "Bulgaria").official("Republic of Bulgaria"),
    c("BH", "BHR", "Bahrain").official("Kingdom of Bahrain"),
    c("BS", "BHS", "Bahamas").official("Commonwealth of the Bahamas"),
    c("BA", "BIH", "Bosnia and Herzegovina").official("Republic of Bosnia and Herzegovina"),
    c("BL", "BLM", "Saint Barthélemy"),
    c("BY", "BLR", "Belarus").official("Republic of Belarus"),
    c("BZ", "BLZ", "Belize"),
    c("BM", "BMU", "Bermuda"),
    c("BO", "BOL", "Bolivia, Plurinational State of").official("Plurinational State of Bolivia").common("Bolivia"),
    c("BR", "BRA", "Brazil").official("Federative Republic of Brazil"),
    c("BB", "BRB", "Barbados"),
    c("BN", "BRN", "Brunei Darussalam").common("Brunei"),
    c("BT", "BTN", "Bhutan").official("Kingdom of Bhutan"),
    c("BV", "BVT", "Bouvet Island"),
    c("BW", "BWA", "Botswana").official("Republic of Botswana"),
    c("CF", "CAF", "Central African Republic"),
    c("CA", "CAN", "Canada"),
    c("CC", "CCK", "Cocos (Keeling) Islands"),
    c("CH", "CHE", "Switzerland").official("Swiss Confederation"),
    c("CL", "CHL", "Chile").official("Republic of Chile"),
    c("CN", "CHN", "China").official("People's Republic of China"),
    c("CI", "CIV", "Côte d'Ivoire").official("Republic of Côte d'Ivoire").common("Ivory Coast"),
    c("CM", "CMR", "Cameroon").official("Republic of Cameroon"),
    c("CD", "COD", "Congo, The Democratic Republic of the").common("DR Congo"),
    c("CG", "COG", "Congo").official("Republic of the Congo"),
    c("CK", "COK", "Cook Islands"),
    c("CO", "COL", "Colombia").official("Republic of Colombia"),
    c("KM", "COM", "Comoros").official("Union of the Comoros"),
    c("CV", "CPV", "Cabo Verde").official("Republic of Cabo Verde").common("Cape Verde"),
    c("CR", "CRI", "Costa Rica").official("Republic of Costa Rica"),
    c("CU", "CUB", "Cuba").official("Republic of Cuba"),
    c("CW", "CUW", "Curaçao"),
    c("CX", "CXR", "Christmas Island"),
    c("KY", "CYM", "Cayman Islands"),
    c("CY", "CYP", "Cyprus").official("Republic of Cyprus"),
    c("CZ", "CZE", "Czechia").official("Czech Republic"),
    c("DE", "DEU", "Germany").official("Federal Republic of Germany"),
    c("DJ", "DJI", "Djibouti").official("Republic of Djibouti"),
    c("DM", "DMA", "Dominica").official("Commonwealth of Dominica"),
    c("DK", "DNK", "Denmark").official("Kingdom of Denmark"),
    c("DO", "DOM", "Dominican Republic"),
    c("DZ", "DZA", "Algeria").official("People's Democratic Republic of Algeria"),
    c("EC", "ECU", "Ecuador").official("Republic of Ecuador"),
    c("EG", "EGY", "Egypt").official("Arab Republic of Egypt"),
    c("ER", "ERI", "Eritrea").official("the State of Eritrea"),
    c("EH", "ESH", "Western Sahara"),
    c("ES", "ESP", "Spain").official("Kingdom of Spain"),
    c("EE", "EST", "Estonia").official("Republic of Estonia"),
    c("ET", "ETH", "Ethiopia").official("Federal Democratic Republic of Ethiopia"),
    c("FI", "FIN", "Finland").official("Republic of Finland"),
    c("FJ", "FJI", "Fiji").official("Republic of Fiji"),
    c("FK", "FLK", "Falkland Islands (Malvinas)"),
    c("FR", "FRA", "France").official("French Republic"),
    c("FO", "FRO", "Faroe Islands"),
    c("FM", "FSM", "Micronesia, Federated States of").official("Federated States of Micronesia").common("Micronesia"),
    c("GA", "GAB", "Gabon").official("Gabonese Republic"),
    c("GB", "GBR", "United Kingdom").official("United Kingdom of Great Britain and Northern Ireland"),
    c("GE", "GEO", "Georgia"),
    c("GG", "GGY", "Guernsey"),
    c("GH", "GHA", "Ghana").official("Republic of Ghana"),
    c("GI", "GIB", "Gibraltar"),
    c("GN", "GIN", "Guinea").official("Republic of Guinea"),
    c("GP", "GLP", "Guadeloupe"),
    c("GM", "GMB", "Gambia").official("Republic of the Gambia"),
    c("GW", "GNB", "Guinea-Bissau").official("Republic of Guinea-Bissau"),
    c("GQ", "GNQ", "Equatorial Guinea").official("Republic of Equatorial Guinea"),
    c("GR", "GRC", "Greece").official("Hellenic Republic"),
    c("GD", "GRD", "Grenada"),
    c("GL", "GRL", "Greenland"),
    c("GT", "GTM", "Guatemala").official("Republic of Guatemala"),
    c("GF", "GUF", "French Guiana"),
    c("GU", "GUM", "Guam"),
    c("GY", "GUY", "Guyana").official("Republic of Guyana"),
    c("HK", "HKG", "Hong Kong").official("Hong Kong Special Administrative Region of China"),
    c("HM", "HMD", "Heard Island and McDonald Islands"),
    c("HN", "HND", "Honduras").official("Republic of Honduras"),
    c("HR", "HRV", "Croatia").official("Republic of Croatia"),
    c("HT", "HTI", "Haiti").official("Republic of Haiti"),
    c("HU", "HUN", "Hungary"),
    c("ID", "IDN", "Indonesia").official("Republic of Indonesia"),
    c("IM", "IMN", "Isle of Man"),
    c("IN", "IND", "India").official("Republic of India"),
    c("IO", "IOT", "British Indian Ocean Territory"),
    c("IE", "IRL", "Ireland"),
    c("IR", "IRN", "Iran, Islamic Republic of").official("Islamic Republic of Iran").common("Iran"),
    c("IQ", "IRQ", "Iraq").official("Republic of Iraq"),
    c("IS", "ISL", "Iceland").official("Republic of Iceland"),
    c("IL", "ISR", "Israel").official("State of Israel"),
    c("IT", "ITA", "Italy").official("Italian Republic"),
    c("JM", "JAM", "Jamaica"),
    c("JE", "JEY", "Jersey"),
    c("JO", "JOR", "Jordan").official("Hashemite Kingdom of Jordan"),
    c("JP", "JPN", "Japan"),
    c("KZ", "KAZ", "Kazakhstan").official("Republic of Kazakhstan"),
    c("KE", "KEN", "Kenya").official("Republic of Kenya"),
    c("KG", "KGZ", "Kyrgyzstan").official("Kyrgyz Republic"),
    c("KH", "KHM", "Cambodia").official("Kingdom of Cambodia"),
    c("KI", "KIR", "Kiribati").official("Republic of Kiribati"),
    c("KN", "KNA", "Saint Kitts and Nevis"),
    c("KR", "KOR", "Korea, Republic of").common("South Korea"),
    c("KW", "KWT", "Kuwait").official("State of Kuwait"),
    c("LA", "LAO", "Lao People's Democratic Republic").common("Laos"),
    c("LB", "LBN", "Lebanon").official("Lebanese Republic"),
    c("LR", "LBR", "Liberia").official("Republic of Liberia"),
    c("LY", "LBY", "Libya"),
    c("LC", "LCA", "Saint Lucia"),
    c("LI", "LIE", "Liechtenstein").official("Principality of Liechtenstein"),
    c("LK", "LKA", "Sri Lanka").official("Democratic Socialist Republic of Sri Lanka"),
    c("LS", "LSO", "Lesotho").official("Kingdom of Lesotho"),
    c("LT", "LTU", "Lithuania").official("Republic of Lithuania"),
    c("LU", "LUX", "Luxembourg").official("Grand Duchy of Luxembourg"),
    c("LV", "LVA", "Latvia").official("Republic of Latvia"),
    c("MO", "MAC", "Macao").official("Macao Special Administrative Region of China"),
    c("MF", "MAF", "Saint Martin (French part)"),
    c("MA", "MAR", "Morocco").official("Kingdom of Morocco"),
    c("MC", "MCO", "Monaco").official("Principality of Monaco"),
    c("MD", "MDA", "Moldova, Republic of").official("Republic of Moldova").common("Moldova"),
    c("MG", "MDG", "Madagascar").official("Republic of Madagascar"),
    c("MV", "MDV", "Maldives").official("Republic of Maldives"),
    c("MX", "MEX", "Mexico").official("United Mexican States"),
    c("MH", "MHL", "Marshall Islands").official("Republic of the Marshall Islands"),
    c("MK", "MKD", "North Macedonia").official("Republic of North Macedonia"),
    c("ML", "MLI", "Mali").official("Republic of Mali"),
    c("MT", "MLT", "Malta").official("Republic of Malta"),
    c("MM", "MMR", "Myanmar").official("Republic of Myanmar"),
    c("ME", "MNE", "Montenegro"),
    c("MN", "MNG", "Mongolia"),
    c("MP", "MNP", "Northern Mariana Islands").official("Commonwealth of the Northern Mariana Islands"),
    c("MZ", "MOZ", "Mozambique").official("Republic of Mozambique"),
    c("MR", "MRT", "Mauritania").official("Islamic Republic of Mauritania"),
    c("MS", "MSR", "Montserrat"),
    c("MQ", "MTQ", "Martinique"),
    c("MU", "MUS", "Mauritius").official("Republic of Mauritius"),
    c("MW", "MWI", "Malawi").official("Republic of Malawi"),
    c("MY", "MYS", "Malaysia"),
    c("YT", "MYT", "Mayotte"),
    c("NA", "NAM", "Namibia").official("Republic of Namibia"),
    c("NC", "NCL", "New Caledonia"),
    c("NE", "NER", "Niger").official("Republic of the Niger"),
    c("NF", "NFK", "Norfolk Island"),
    c("NG", "NGA", "Nigeria").official("Federal Republic of Nigeria"),
    c("NI", "NIC", "Nicaragua").official("Republic of Nicaragua"),
    c("NU", "NIU", "Niue"),
    c("NL", "NLD", "Netherlands").official("Kingdom of the Netherlands"),
    c("NO", "NOR", "Norway").official("Kingdom of Norway"),
    c("NP", "NPL", "Nepal").official("Federal Democratic Republic of Nepal"),
    c("NR", "NRU", "Nauru").official("Republic of Nauru"),
    c("NZ", "NZL", "New Zealand"),
    c("OM", "OMN", "Oman").official("Sultanate of Oman"),
    c("PK", "PAK", "Pakistan").official("Islamic Republic of Pakistan"),
    c("PA", "PAN", "Panama").official("Republic of Panama"),
    c("PN", "PCN", "Pitcairn"),
    c("PE", "PER", "Peru").official("Republic of Peru"),
    c("PH", "PHL", "Philippines").official("Republic of the Philippines"),
    c("PW", "PLW", "Palau").official("Republic of Palau"),
    c("PG", "PNG", "Papua New Guinea").official("Independent State of Papua New Guinea"),
    c("PL", "POL", "Poland").official("Republic of Poland"),
    c("PR", "PRI", "Puerto Rico"),
    c("KP", "PRK", "Korea, Democratic People's Republic of").official("Democratic People's Republic of Korea").common("North Korea"),
    c("PT", "PRT", "Portugal").official("Portuguese Republic"),
    c("PY", "PRY", "Paraguay").official("Republic of Paraguay"),
    c("PS", "PSE", "Palestine, State of").official("the State of Palestine").common("Palestine"),
    c("PF", "PYF", "French Polynesia"),
    c("QA", "QAT", "Qatar").official("State of Qatar"),
    c("RE", "REU", "Réunion"),
    c("RO", "ROU", "Romania"),
    c("RU", "RUS", "Russia").official("Russian Federation"),
    c("RW", "RWA", "Rwanda").official("Rwandese Republic"),
    c("SA", "SAU", "Saudi Arabia").official("Kingdom of Saudi Arabia"),
    c("SD", "SDN", "Sudan").official("Republic of the Sudan"),
    c("SN", "SEN", "Senegal").official("Republic of Senegal"),
    c("SG", "SGP", "Singapore").official("Republic of Singapore"),
    c("GS", "SGS", "South Georgia and the South Sandwich Islands"),
    c("SH", "SHN", "Saint Helena, Ascension and Tristan da Cunha"),
    c("SJ", "SJM", "Svalbard and Jan Mayen"),
    c("SB", "SLB", "Solomon Islands"),
    c("SL", "SLE", "Sierra Leone").official("Republic of Sierra Leone"),
    c("SV", "SLV", "El Salvador").official("Republic of El Salvador"),
    c("SM", "SMR", "San Marino").official("Republic of San Marino"),
    c("SO", "SOM", "Somalia").official("Federal Republic of Somalia"),
    c("PM", "SPM", "Saint Pierre and Miquelon"),
    c("RS", "SRB", "Serbia").official("Republic of Serbia"),
    c("SS", "SSD", "South Sudan").official("Republic of South Sudan"),
    c("ST", "STP", "Sao Tome and Principe").official("Democratic Republic of Sao Tome and Principe"),
    c("SR", "SUR", "Suriname").official("Republic of Suriname"),
    c("SK", "SVK", "Slovakia").official("Slovak Republic"),
    c("SI", "SVN", "Slovenia").official("Republic of Slovenia"),
    c("SE", "SWE", "Sweden").official("Kingdom of Sweden"),
    c("SZ", "SWZ", "Eswatini").official("Kingdom of Eswatini").common("Swaziland"),
    c("SX", "SXM", "Sint Maarten (Dutch part)"),
    c("SC", "SYC", "Seychelles").official("Republic of Seychelles"),
    c("SY", "SYR", "Syrian Arab Republic").common("Syria"),
    c("TC", "TCA", "Turks and Caicos Islands"),
    c("TD", "TCD", "Chad").official("Republic of Chad"),
    c("TG", "TGO", "Togo").official("Togolese Republic"),
    c("TH", "THA", "Thailand").official("Kingdom of Thailand"),
    c("TJ", "TJK", "Tajikistan").official("Republic of Tajikistan"),
    c("TK", "TKL", "Tokelau"),
    c("TM", "TKM", "Turkmenistan"),
    c("TL", "TLS", "Timor-Leste").official("Democratic Republic of Timor-Leste").common("East Timor"),
    c("TO", "TON", "Tonga").official("Kingdom of Tonga"),
    c("TT", "TTO", "Trinidad and Tobago").official("Republic of Trinidad and Tobago"),
    c("TN", "TUN", "Tunisia").official("Republic of Tunisia"),
    c("TR", "TUR", "Turkey").official("Republic of Türkiye").common("Türkiye"),
    c("TV", "TUV", "Tuvalu"),
    c("TW", "TWN", "Taiwan").official("Taiwan, Province of China"),
    c("TZ", "TZA", "Tanzania, United Republic of").official("United Republic of Tanzania").common("Tanzania"),
    c("UG", "UGA", "Uganda").official("Republic of Uganda"),
    c("UA", "UKR", "Ukraine"),
    c("UM", "UMI", "United States Minor Outlying Islands"),
    c("UY", "URY", "Uruguay").official("Eastern Republic of Uruguay"),
    c("US", "USA", "United States").official("United States of America"),
    c("UZ", "UZB", "Uzbekistan").official("Republic of Uzbekistan"),
    c("VA", "VAT", "Holy See (Vatican City State)").common("Vatican City"),
    c("VC", "VCT", "Saint Vincent and the Grenadines"),
    c("VE", "VEN", "Venezuela, Bolivarian Republic of").official("Bolivarian Republic of Venezuela").common("Venezuela"),
    c("VG", "VGB", "Virgin Islands, British").official("British Virgin Islands"),
    c("VI", "VIR", "Virgin Islands, U.S.").official("Virgin Islands of the United States"),
    c("VN", "VNM", "Viet Nam").official("Socialist Republic of Viet Nam").common("Vietnam"),
    c("VU", "VUT", "Vanuatu").official("Republic of Vanuatu"),
    c("WF", "WLF", "Wallis and Futuna"),
    c("WS", "WSM", "Samoa").official("Independent State of Samoa"),
    c("YE", "YEM", "Yemen").official("Republic of Yemen"),
    c("ZA", "ZAF", "South Africa").official("Republic of South Africa"),
    c("ZM", "ZMB", "Zambia").official("Republic of Zambia"),
    c("ZW", "ZWE", "Zimbabwe").official("Republic of Zimbabwe"),
];

/// Folded name, official name, common name and both codes, each mapped to
/// the canonical name. Primary names are indexed first so a primary name
/// always resolves to itself.
static EXACT_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let passes: [fn(&Country) -> Option<&'static str>; 5] = [
        |country| Some(country.name),
        |country| country.official_name,
        |country| country.common_name,
        |country| Some(country.alpha2),
        |country| Some(country.alpha3),
    ];
    let mut index = HashMap::with_capacity(COUNTRIES.len() * passes.len());
    for pass in passes {
        for country in COUNTRIES {
            if let Some(form) = pass(country) {
                index.entry(fold(form)).or_insert(country.name);
            }
        }
    }
    index
});

/// Looks up an already-folded name or code among the ISO countries.
pub(crate) fn lookup_exact(folded: &str) -> Option<&'static str> {
    EXACT_INDEX.get(folded).copied()
}

/// Finds a country by its alpha-2 or alpha-3 code.
#[must_use]
pub fn country_by_code(code: &str) -> Option<&'static Country> {
    let code = code.trim();
    COUNTRIES.iter().find(|country| {
        country.alpha2.eq_ignore_ascii_case(code) || country.alpha3.eq_ignore_ascii_case(code)
    })
}

/// Maps any country-like string to a canonical country name.
///
/// Tries, in order: the alias table, an exact match on any ISO name or code,
/// an alias appearing inside the input, and finally the input itself with
/// its first letter capitalised. Empty input yields an empty string. The
/// last fallback can invent a plausible-looking name, so only trust it where
/// a best effort is acceptable.
///
/// ```
/// use forge_harvest::locate::normalize_country;
///
/// assert_eq!(normalize_country("Deutschland"), "Germany");
/// assert_eq!(normalize_country("Russian Federation"), "Russia");
/// assert_eq!(normalize_country("BRA"), "Brazil");
/// assert_eq!(normalize_country("narnia"), "Narnia");
/// ```
#[must_use]
pub fn normalize_country(input: &str) -> String {
    let folded = fold(input);
    if folded.is_empty() {
        return String::new();
    }
    if let Some(country) = ALIASES.get(&folded) {
        return country.to_string();
    }
    if let Some(country) = lookup_exact(&folded) {
        return country.to_string();
    }
    if let Some(country) = alias_within(&folded) {
        return country.to_string();
    }
    capitalize(input.trim())
}

/// First alias (in table order) found inside `folded`. Keys of three
/// characters or fewer are codes and must stand alone as a word.
fn alias_within(folded: &str) -> Option<&'static str> {
    ALIASES.iter().find_map(|(key, country)| {
        let hit = if key.chars().count() <= 3 {
            contains_term(folded, key)
        } else {
            folded.contains(key)
        };
        hit.then_some(country)
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
