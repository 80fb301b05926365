//! Geographic scopes, ranks and top lists over a pruned result store.

use std::cmp::Ordering;

use crate::dao::models::StoredResult;

/// Country code used when the request carries none.
pub const UNKNOWN_COUNTRY: &str = "UN";
/// Region/city placeholder used when the request carries none.
pub const UNKNOWN_PLACE: &str = "Unknown";

/// Location hints of a request, trusted as provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// ISO country code.
    pub country_code: String,
    /// Region within the country.
    pub region: String,
    /// City name.
    pub city: String,
}

impl Location {
    /// Build a location, substituting placeholders for blank parts.
    pub fn new(country_code: Option<&str>, region: Option<&str>, city: Option<&str>) -> Self {
        fn or_default(value: Option<&str>, default: &str) -> String {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        }

        Self {
            country_code: or_default(country_code, UNKNOWN_COUNTRY).to_ascii_uppercase(),
            region: or_default(region, UNKNOWN_PLACE),
            city: or_default(city, UNKNOWN_PLACE),
        }
    }

    /// Location with every part unknown.
    pub fn unknown() -> Self {
        Self::new(None, None, None)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Leaderboard filter relative to a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Same country and region.
    Regional,
    /// Same country.
    National,
    /// Same city name.
    City,
    /// Everything.
    Global,
}

impl Scope {
    /// Every scope, in response order.
    pub const ALL: [Scope; 4] = [Scope::Regional, Scope::National, Scope::City, Scope::Global];

    /// Whether `entry` falls within this scope around `origin`.
    pub fn contains(self, origin: &Location, entry: &StoredResult) -> bool {
        match self {
            Scope::Regional => {
                entry.country_code == origin.country_code && entry.region == origin.region
            }
            Scope::National => entry.country_code == origin.country_code,
            Scope::City => entry.city == origin.city,
            Scope::Global => true,
        }
    }

    /// Display name of this scope around `origin`.
    pub fn label(self, origin: &Location) -> String {
        match self {
            Scope::Regional => format!("{}, {}", origin.region, country_name(&origin.country_code)),
            Scope::National => country_name(&origin.country_code).to_string(),
            Scope::City => origin.city.clone(),
            Scope::Global => "Global".to_string(),
        }
    }
}

/// Rank of `value` within a scope and the scope size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    /// `1 + number of entries strictly faster than the value`.
    pub rank: usize,
    /// Number of entries in the scope.
    pub total: usize,
}

/// Compute the standing of `value` among the entries of `scope`.
///
/// Equal times share the better rank.
pub fn standing(entries: &[StoredResult], scope: Scope, origin: &Location, value: u32) -> Standing {
    let (faster, total) = entries
        .iter()
        .filter(|entry| scope.contains(origin, entry))
        .fold((0, 0), |(faster, total), entry| {
            let faster = faster + usize::from(entry.reaction_time_ms < value);
            (faster, total + 1)
        });

    Standing {
        rank: faster + 1,
        total,
    }
}

/// Fastest `limit` entries of `scope`, ascending by time then by submission.
pub fn top(
    entries: &[StoredResult],
    scope: Scope,
    origin: &Location,
    limit: usize,
) -> Vec<StoredResult> {
    let mut selected: Vec<&StoredResult> = entries
        .iter()
        .filter(|entry| scope.contains(origin, entry))
        .collect();
    selected.sort_by(|a, b| compare(a, b));
    selected.into_iter().take(limit).cloned().collect()
}

fn compare(a: &StoredResult, b: &StoredResult) -> Ordering {
    a.reaction_time_ms
        .cmp(&b.reaction_time_ms)
        .then(a.timestamp_ms.cmp(&b.timestamp_ms))
}

/// Best-effort English country name for an ISO code, falling back to the code.
pub fn country_name(code: &str) -> &str {
    match code {
        "AR" => "Argentina",
        "AT" => "Austria",
        "AU" => "Australia",
        "BE" => "Belgium",
        "BR" => "Brazil",
        "CA" => "Canada",
        "CH" => "Switzerland",
        "CL" => "Chile",
        "CN" => "China",
        "CO" => "Colombia",
        "CZ" => "Czechia",
        "DE" => "Germany",
        "DK" => "Denmark",
        "EG" => "Egypt",
        "ES" => "Spain",
        "FI" => "Finland",
        "FR" => "France",
        "GB" => "United Kingdom",
        "GR" => "Greece",
        "HK" => "Hong Kong",
        "HU" => "Hungary",
        "ID" => "Indonesia",
        "IE" => "Ireland",
        "IL" => "Israel",
        "IN" => "India",
        "IT" => "Italy",
        "JP" => "Japan",
        "KR" => "South Korea",
        "MX" => "Mexico",
        "MY" => "Malaysia",
        "NG" => "Nigeria",
        "NL" => "Netherlands",
        "NO" => "Norway",
        "NZ" => "New Zealand",
        "PH" => "Philippines",
        "PK" => "Pakistan",
        "PL" => "Poland",
        "PT" => "Portugal",
        "RO" => "Romania",
        "RU" => "Russia",
        "SA" => "Saudi Arabia",
        "SE" => "Sweden",
        "SG" => "Singapore",
        "TH" => "Thailand",
        "TR" => "Türkiye",
        "TW" => "Taiwan",
        "UA" => "Ukraine",
        "US" => "United States",
        "VN" => "Vietnam",
        "ZA" => "South Africa",
        UNKNOWN_COUNTRY => "Unknown",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(time: u32, country: &str, region: &str, city: &str) -> StoredResult {
        StoredResult {
            timestamp_ms: i64::from(time),
            reaction_time_ms: time,
            user_id: "anonymous".into(),
            country_code: country.into(),
            region: region.into(),
            city: city.into(),
        }
    }

    fn berlin() -> Location {
        Location::new(Some("de"), Some("BE"), Some("Berlin"))
    }

    #[test]
    fn blank_hints_get_placeholders() {
        let location = Location::new(Some(" "), None, Some(""));
        assert_eq!(location.country_code, "UN");
        assert_eq!(location.region, "Unknown");
        assert_eq!(location.city, "Unknown");
    }

    #[test]
    fn rank_counts_strictly_faster_entries() {
        let entries: Vec<_> = [150, 170, 180, 190, 210]
            .into_iter()
            .map(|t| entry(t, "DE", "BE", "Berlin"))
            .collect();
        let s = standing(&entries, Scope::Global, &berlin(), 180);
        assert_eq!(s, Standing { rank: 3, total: 5 });

        // ties share the better rank
        let s = standing(&entries, Scope::Global, &berlin(), 170);
        assert_eq!(s.rank, 2);
    }

    #[test]
    fn rank_is_monotonic_in_value() {
        let entries: Vec<_> = [300, 120, 250, 250, 90, 400]
            .into_iter()
            .map(|t| entry(t, "FR", "IDF", "Paris"))
            .collect();
        let origin = Location::new(Some("FR"), Some("IDF"), Some("Paris"));
        let mut previous = 0;
        for value in (0..500).step_by(10) {
            let rank = standing(&entries, Scope::National, &origin, value).rank;
            assert!(rank >= previous);
            previous = rank;
        }
    }

    #[test]
    fn scopes_filter_by_location() {
        let entries = vec![
            entry(100, "DE", "BE", "Berlin"),
            entry(110, "DE", "BY", "Munich"),
            entry(120, "US", "CA", "Berlin"),
            entry(130, "FR", "IDF", "Paris"),
        ];
        let origin = berlin();
        let totals: Vec<usize> = Scope::ALL
            .iter()
            .map(|scope| standing(&entries, *scope, &origin, 0).total)
            .collect();
        assert_eq!(totals, vec![1, 2, 2, 4]);
    }

    #[test]
    fn top_is_sorted_and_limited() {
        let entries: Vec<_> = (0..15)
            .rev()
            .map(|i| entry(200 + i, "DE", "BE", "Berlin"))
            .collect();
        let best = top(&entries, Scope::Global, &berlin(), 10);
        assert_eq!(best.len(), 10);
        assert_eq!(best[0].reaction_time_ms, 200);
        assert!(best.windows(2).all(|w| w[0].reaction_time_ms <= w[1].reaction_time_ms));
    }

    #[test]
    fn labels_use_country_names() {
        let origin = berlin();
        assert_eq!(Scope::Regional.label(&origin), "BE, Germany");
        assert_eq!(Scope::National.label(&origin), "Germany");
        assert_eq!(Scope::City.label(&origin), "Berlin");
        assert_eq!(Scope::Global.label(&origin), "Global");
        assert_eq!(country_name("XK"), "XK");
    }
}
