//! Field-level text normalization used by the CSV stages and the importer.
//!
//! Every function here is soft: unparseable input degrades to `None` (or is
//! returned cleaned as far as possible), never to an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Street, city, state and zip parsed out of a single address line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParts {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// The three sub-category ratings Google Maps attaches to restaurant reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryRatings {
    pub food_rating: Option<i16>,
    pub service_rating: Option<i16>,
    pub atmosphere_rating: Option<i16>,
}

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*),\s*(.*),\s*([A-Z]{2})\s*([0-9]{5})$").expect("address pattern is valid")
    })
}

fn subcategory_regexes() -> &'static [Regex; 3] {
    static RES: OnceLock<[Regex; 3]> = OnceLock::new();
    RES.get_or_init(|| {
        ["Food", "Service", "Atmosphere"].map(|label| {
            Regex::new(&format!(r"{label}:\s*([0-9]+)")).expect("subcategory pattern is valid")
        })
    })
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("number pattern is valid"))
}

fn emoji_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            "\u{200D}[\u{1F3FB}-\u{1F3FF}]|[",
            "\u{1F600}-\u{1F64F}", // emoticons
            "\u{1F300}-\u{1F5FF}", // symbols & pictographs
            "\u{1F680}-\u{1F6FF}", // transport & map
            "\u{1F700}-\u{1F77F}", // alchemical
            "\u{1F780}-\u{1F7FF}", // geometric shapes extended
            "\u{1F800}-\u{1F8FF}", // supplemental arrows-c
            "\u{1F900}-\u{1F9FF}", // supplemental symbols & pictographs
            "\u{1FA00}-\u{1FA6F}", // chess
            "\u{1FA70}-\u{1FAFF}", // symbols & pictographs extended-a
            "\u{2702}-\u{27B0}",   // dingbats
            "\u{24C2}",            // circled M
            "\u{1F004}-\u{1F0CF}", // mahjong, domino, playing cards
            "\u{1F170}-\u{1F251}", // enclosed alphanumeric supplement
            "\u{1F3FB}-\u{1F3FF}", // skin tones
            "]"
        ))
        .expect("emoji pattern is valid")
    })
}

/// Split `"<street>, <city>, <ST> <ZIP5>"` into its parts.
///
/// Street, city and state come back trimmed and upper-cased; the zip stays a
/// digit string. Anything not in exactly that shape yields four `None`s.
pub fn split_address(address: Option<&str>) -> AddressParts {
    let Some(address) = address else {
        return AddressParts::default();
    };

    match address_regex().captures(address.trim()) {
        Some(caps) => AddressParts {
            street: Some(caps[1].trim().to_uppercase()),
            city: Some(caps[2].trim().to_uppercase()),
            state: Some(caps[3].trim().to_uppercase()),
            zip: Some(caps[4].trim().to_string()),
        },
        None => AddressParts::default(),
    }
}

/// First and last token of a full name, title-cased. Middle names are dropped.
pub fn split_name(name: Option<&str>) -> (Option<String>, Option<String>) {
    let tokens: Vec<&str> = name.map(|n| n.split_whitespace().collect()).unwrap_or_default();

    match tokens.as_slice() {
        [] => (None, None),
        [only] => (Some(title_case(only)), None),
        [first, .., last] => (Some(title_case(first)), Some(title_case(last))),
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_is_alpha = false;
    for c in word.chars() {
        if prev_is_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_is_alpha = c.is_alphabetic();
    }
    out
}

/// Pull `Food:N`, `Service:N` and `Atmosphere:N` out of free text.
///
/// Each label is searched independently, so order and separators do not
/// matter. A label that is absent (or out of range) stays `None`.
pub fn parse_subcategory_ratings(text: Option<&str>) -> SubcategoryRatings {
    let Some(text) = text else {
        return SubcategoryRatings::default();
    };

    let [food, service, atmosphere] = subcategory_regexes().each_ref().map(|re| {
        re.captures(text)
            .and_then(|caps| caps[1].parse::<i16>().ok())
    });

    SubcategoryRatings {
        food_rating: food,
        service_rating: service,
        atmosphere_rating: atmosphere,
    }
}

/// Highest star count Google Maps shows.
pub const MAX_RATING: i16 = 5;

/// Parse a rating cell into a star count in `1..=MAX_RATING`.
///
/// Empty cells, the literal `null`, `NaN` and out-of-range numbers are all
/// treated as "no rating". Float renderings such as `4.0` are accepted.
pub fn parse_rating(raw: Option<&str>) -> Option<i16> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
        return None;
    }

    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = raw.parse::<f64>().ok()?;
            if !f.is_finite() || f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };

    i16::try_from(value)
        .ok()
        .filter(|v| (1..=MAX_RATING).contains(v))
}

/// Remove emoji code points (and skin-tone joiner sequences).
pub fn strip_emojis(text: &str) -> String {
    emoji_regex().replace_all(text, "").into_owned()
}

/// The single number in a rating cell, e.g. `"4 stars"` -> `"4"`.
///
/// Cells with no number or several (`"5/5"`, `"4 of 5"`) yield `None`
/// rather than a concatenation of their digits. A decimal such as `4.5` is
/// kept whole so [`parse_rating`] can reject it.
pub fn rating_number(text: &str) -> Option<String> {
    let mut numbers = number_regex().find_iter(text);
    let first = numbers.next()?;
    if numbers.next().is_some() {
        return None;
    }
    Some(first.as_str().to_string())
}

/// Treat blank strings as missing.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
