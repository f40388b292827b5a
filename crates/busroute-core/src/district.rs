//! Administrative-area heuristics for routes that have no corridor geometry yet.
//!
//! The default resolver matches a closed vocabulary of Ho Chi Minh City districts
//! against free-text addresses. It is a fallback only; anything backed by a real
//! reverse geocoder can implement [`DistrictResolver`] instead.

use crate::models::Anchor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Highest numbered district in the default vocabulary.
const MAX_NUMBERED_DISTRICT: u8 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum District {
    Numbered(u8),
    Named(String),
}

impl District {
    pub fn label(&self) -> String {
        match self {
            District::Numbered(n) => format!("Quận {n}"),
            District::Named(name) => name.clone(),
        }
    }

    /// Case-insensitive equality, or a label substring match for named districts.
    ///
    /// Numbered districts compare by number: "Quận 1" is a substring of "Quận 10".
    pub fn matches(&self, other: &District) -> bool {
        match (self, other) {
            (District::Numbered(a), District::Numbered(b)) => a == b,
            (District::Named(a), District::Named(b)) => {
                let a = a.to_lowercase();
                let b = b.to_lowercase();
                a == b || a.contains(&b) || b.contains(&a)
            }
            _ => false,
        }
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Strategy for mapping addresses to administrative areas.
pub trait DistrictResolver: Send + Sync {
    /// District named in a free-text address, if any.
    fn extract_district(&self, address: &str) -> Option<District>;

    /// Ordered, de-duplicated districts a route between two anchors probably crosses.
    ///
    /// When both anchors are in numbered districts every district between them is
    /// included. An empty result means no filtering is possible.
    fn districts_along_route(&self, origin: &Anchor, destination: &Anchor) -> Vec<District> {
        let from = self.extract_district(anchor_text(origin));
        let to = self.extract_district(anchor_text(destination));

        let mut districts = Vec::new();
        match (from, to) {
            (Some(District::Numbered(a)), Some(District::Numbered(b))) => {
                if a <= b {
                    districts.extend((a..=b).map(District::Numbered));
                } else {
                    districts.extend((b..=a).rev().map(District::Numbered));
                }
            }
            (from, to) => {
                for district in [from, to].into_iter().flatten() {
                    if !districts.contains(&district) {
                        districts.push(district);
                    }
                }
            }
        }
        districts
    }
}

fn anchor_text(anchor: &Anchor) -> &str {
    if anchor.address.trim().is_empty() {
        &anchor.name
    } else {
        &anchor.address
    }
}

/// Closed-vocabulary resolver using keyword matching.
#[derive(Debug, Clone)]
pub struct KeywordDistrictResolver {
    /// Canonical label with its lower-case spellings.
    named: Vec<(String, Vec<String>)>,
}

impl Default for KeywordDistrictResolver {
    fn default() -> Self {
        let named: [(&str, &[&str]); 12] = [
            ("Bình Thạnh", &["bình thạnh", "binh thanh"]),
            ("Gò Vấp", &["gò vấp", "go vap"]),
            ("Phú Nhuận", &["phú nhuận", "phu nhuan"]),
            ("Tân Bình", &["tân bình", "tan binh"]),
            ("Tân Phú", &["tân phú", "tan phu"]),
            ("Bình Tân", &["bình tân", "binh tan"]),
            ("Thủ Đức", &["thủ đức", "thu duc"]),
            ("Hóc Môn", &["hóc môn", "hoc mon"]),
            ("Củ Chi", &["củ chi", "cu chi"]),
            ("Bình Chánh", &["bình chánh", "binh chanh"]),
            ("Nhà Bè", &["nhà bè", "nha be"]),
            ("Cần Giờ", &["cần giờ", "can gio"]),
        ];
        Self::with_named_districts(named.iter().map(|(label, aliases)| {
            (
                label.to_string(),
                aliases.iter().map(|alias| alias.to_string()).collect(),
            )
        }))
    }
}

impl KeywordDistrictResolver {
    /// Build a resolver with a custom named-district vocabulary.
    ///
    /// Numbered districts ("Quận 1" to "Quận 12") are always recognized.
    pub fn with_named_districts<I>(named: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let named = named
            .into_iter()
            .map(|(label, aliases)| {
                let aliases = aliases.iter().map(|alias| alias.to_lowercase()).collect();
                (label, aliases)
            })
            .collect();
        Self { named }
    }

    fn find_numbered(&self, address: &str) -> Option<(usize, District)> {
        numbered_pattern()
            .captures_iter(address)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let number: u8 = caps.get(1)?.as_str().parse().ok()?;
                (1..=MAX_NUMBERED_DISTRICT)
                    .contains(&number)
                    .then_some((whole.start(), District::Numbered(number)))
            })
            .next()
    }

    fn find_named(&self, address: &str) -> Option<(usize, District)> {
        self.named
            .iter()
            .filter_map(|(label, aliases)| {
                aliases
                    .iter()
                    .filter_map(|alias| find_word(address, alias))
                    .min()
                    .map(|position| (position, District::Named(label.clone())))
            })
            .min_by_key(|(position, _)| *position)
    }
}

impl DistrictResolver for KeywordDistrictResolver {
    fn extract_district(&self, address: &str) -> Option<District> {
        let address = address.to_lowercase();
        match (self.find_numbered(&address), self.find_named(&address)) {
            (Some(numbered), Some(named)) => {
                if named.0 < numbered.0 {
                    Some(named.1)
                } else {
                    Some(numbered.1)
                }
            }
            (numbered, named) => numbered.or(named).map(|(_, district)| district),
        }
    }
}

fn numbered_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|[^\p{L}\d])(?:quận|quan|district|q\.?)\s*(\d{1,2})(?:$|[^\d])")
            .expect("district pattern is valid")
    })
}

/// Byte offset of `needle` in `haystack` where it is not part of a longer word.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).find_map(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        let is_boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
        (is_boundary(before) && is_boundary(after)).then_some(start)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn anchor(address: &str) -> Anchor {
        Anchor {
            name: "anchor".into(),
            address: address.into(),
            coordinate: Coordinate::new(10.77, 106.70),
        }
    }

    #[test]
    fn extracts_numbered_district_spellings() {
        let resolver = KeywordDistrictResolver::default();
        for (address, expected) in [
            ("12 Lê Lợi, Phường Bến Nghé, Quận 1, TP.HCM", 1),
            ("45 Nguyen Trai, P.2, Q.5", 5),
            ("7 Hai Ba Trung, q10", 10),
            ("88 Ly Thuong Kiet, District 11", 11),
            ("3 Tran Hung Dao, quan 12", 12),
        ] {
            assert_eq!(
                resolver.extract_district(address),
                Some(District::Numbered(expected)),
                "{address}"
            );
        }
    }

    #[test]
    fn ignores_numbers_outside_vocabulary_and_wards() {
        let resolver = KeywordDistrictResolver::default();
        assert_eq!(resolver.extract_district("Phường 2, Quận 13"), None);
        assert_eq!(resolver.extract_district("10 Phường 7"), None);
        assert_eq!(resolver.extract_district(""), None);
    }

    #[test]
    fn extracts_named_district_with_or_without_accents() {
        let resolver = KeywordDistrictResolver::default();
        assert_eq!(
            resolver.extract_district("22 Xô Viết Nghệ Tĩnh, Bình Thạnh"),
            Some(District::Named("Bình Thạnh".into()))
        );
        assert_eq!(
            resolver.extract_district("5 Quang Trung, GO VAP"),
            Some(District::Named("Gò Vấp".into()))
        );
    }

    #[test]
    fn earliest_match_wins() {
        let resolver = KeywordDistrictResolver::default();
        assert_eq!(
            resolver.extract_district("Tân Bình border, Quận 10"),
            Some(District::Named("Tân Bình".into()))
        );
    }

    #[test]
    fn numeric_anchors_interpolate_in_travel_order() {
        let resolver = KeywordDistrictResolver::default();
        let districts = resolver.districts_along_route(&anchor("Quận 5"), &anchor("Quận 2"));
        assert_eq!(
            districts,
            vec![
                District::Numbered(5),
                District::Numbered(4),
                District::Numbered(3),
                District::Numbered(2),
            ]
        );
    }

    #[test]
    fn named_anchors_are_not_interpolated() {
        let resolver = KeywordDistrictResolver::default();
        let districts = resolver.districts_along_route(&anchor("Quận 3"), &anchor("Gò Vấp"));
        assert_eq!(
            districts,
            vec![District::Numbered(3), District::Named("Gò Vấp".into())]
        );

        let same = resolver.districts_along_route(&anchor("Gò Vấp"), &anchor("go vap"));
        assert_eq!(same, vec![District::Named("Gò Vấp".into())]);
    }

    #[test]
    fn unresolved_anchors_give_empty_set() {
        let resolver = KeywordDistrictResolver::default();
        assert!(resolver
            .districts_along_route(&anchor("Unknown street"), &anchor("Somewhere"))
            .is_empty());
    }

    #[test]
    fn numbered_districts_do_not_substring_match() {
        assert!(!District::Numbered(1).matches(&District::Numbered(10)));
        assert!(District::Named("Thủ Đức".into()).matches(&District::Named("thủ đức".into())));
        assert!(District::Named("TP Thủ Đức".into()).matches(&District::Named("Thủ Đức".into())));
    }
}
