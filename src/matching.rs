//! Maps the names that live objects report to the names that replacements were registered under.
//!
//! The host reports the same logical asset under different names depending on how it was loaded.
//! Sometimes it's the bare asset name (`title_bg`), sometimes a path (`ui/textures/title_bg`), and
//! instantiated copies get suffixes like ` (Instance)`. Lookups therefore go through two tiers:
//! the normalised name exactly, and then the normalised name with everything up to the last path
//! separator removed.

use case_insensitive_hashmap::CaseInsensitiveHashMap;
use itertools::Itertools;

/// Suffixes that the host appends to instantiated copies of an asset.
const COPY_SUFFIXES: [&str; 2] = [" (Instance)", " (Clone)"];

/// Tokens shorter than this are too generic to be useful when looking for similar names.
const MIN_TOKEN_LEN: usize = 3;

/// Strips surrounding whitespace and any copy suffixes from `name`.
pub fn normalize_name(name: &str) -> &str {
    let mut name = name.trim();

    // Copies of copies get more than one suffix.
    while let Some(stripped) = COPY_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
    {
        name = stripped.trim_end();
    }

    name
}

/// Returns the part of `name` after the last path separator, or `None` if there isn't one.
pub fn strip_path(name: &str) -> Option<&str> {
    name.rfind(['/', '\\']).map(|index| &name[index + 1..])
}

/// Returns the keys to try, in order, when looking up `live_name`.
pub fn candidate_keys(live_name: &str) -> impl Iterator<Item = &str> {
    let normalized = normalize_name(live_name);

    std::iter::once(normalized)
        .chain(strip_path(normalized).filter(|bare| !bare.is_empty()))
        .dedup()
}

/// A case-insensitive name table that resolves live object names using the two-tier lookup.
pub struct MatchResolver<T> {
    table: CaseInsensitiveHashMap<T>,
}

impl<T> MatchResolver<T> {
    /// Creates a resolver from `(name, value)` pairs. If a name appears more than once, the last
    /// value wins.
    pub fn new<S: Into<String>>(pairs: impl IntoIterator<Item = (S, T)>) -> MatchResolver<T> {
        let mut table = CaseInsensitiveHashMap::new();

        for (name, value) in pairs {
            table.insert(name.into(), value);
        }

        MatchResolver { table }
    }

    /// Finds the entry for a live object name.
    pub fn resolve(&self, live_name: &str) -> Option<&T> {
        candidate_keys(live_name).find_map(|key| self.table.get(key))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Keeps a count of how many live objects each requested name was matched against.
pub struct MatchTracker {
    /// Requested names in the order they were added, for stable reporting.
    requested: Vec<String>,

    hits: CaseInsensitiveHashMap<usize>,
}

impl MatchTracker {
    pub fn new<S: Into<String>>(requested: impl IntoIterator<Item = S>) -> MatchTracker {
        let mut tracker = MatchTracker {
            requested: vec![],
            hits: CaseInsensitiveHashMap::new(),
        };

        for name in requested {
            let name = name.into();

            if tracker.hits.insert(name.clone(), 0).is_none() {
                tracker.requested.push(name);
            }
        }

        tracker
    }

    /// Records a match against `name`. Names that were never requested are ignored.
    pub fn record(&mut self, name: &str) {
        if let Some(count) = self.hits.get_mut(name) {
            *count += 1;
        }
    }

    /// Returns the number of matches recorded for `name`.
    pub fn hits(&self, name: &str) -> usize {
        self.hits.get(name).copied().unwrap_or(0)
    }

    /// Returns every requested name that didn't match anything.
    pub fn unmatched(&self) -> Vec<&str> {
        self.requested
            .iter()
            .filter(|name| self.hits(name) == 0)
            .map(String::as_str)
            .collect()
    }
}

/// Splits a name into lowercase tokens that are long enough to be meaningful.
fn tokens(name: &str) -> Vec<String> {
    name.split(['_', '-', '.', '/', '\\', ' '])
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// Picks up to `limit` names from `resident` that look related to `requested`. This is what
/// users need to see when a replacement doesn't apply: usually the name is slightly off.
pub fn similar_names<'a>(
    requested: &str,
    resident: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<String> {
    let requested_lower = normalize_name(requested).to_lowercase();
    let requested_tokens = tokens(&requested_lower);

    resident
        .into_iter()
        .filter(|name| {
            let lower = name.to_lowercase();

            let contains_requested =
                !requested_lower.is_empty() && lower.contains(&requested_lower);

            let contained_in_requested =
                lower.len() >= MIN_TOKEN_LEN && requested_lower.contains(&lower);

            contains_requested
                || contained_in_requested
                || requested_tokens.iter().any(|token| lower.contains(token))
        })
        .unique()
        .take(limit)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_copy_suffixes() {
        assert_eq!(normalize_name("  hero_mat (Instance)"), "hero_mat");
        assert_eq!(normalize_name("door (Clone) (Instance)"), "door");
        assert_eq!(normalize_name("plain"), "plain");
    }

    #[test]
    fn path_suffix_is_tried_after_exact_name() {
        let keys: Vec<_> = candidate_keys("ui/textures/backgrounds/title_bg_02").collect();
        assert_eq!(keys, ["ui/textures/backgrounds/title_bg_02", "title_bg_02"]);

        let keys: Vec<_> = candidate_keys("bare").collect();
        assert_eq!(keys, ["bare"]);

        let keys: Vec<_> = candidate_keys(r"Assets\Audio\theme").collect();
        assert_eq!(keys, [r"Assets\Audio\theme", "theme"]);
    }

    #[test]
    fn resolver_matches_bare_and_path_qualified_names() {
        let resolver = MatchResolver::new([("title_bg_02", 1), ("Theme", 2)]);

        assert_eq!(resolver.resolve("ui/textures/backgrounds/title_bg_02"), Some(&1));
        assert_eq!(resolver.resolve("TITLE_BG_02"), Some(&1));
        assert_eq!(resolver.resolve("theme (Instance)"), Some(&2));
        assert_eq!(resolver.resolve("totally_different"), None);
        assert_eq!(resolver.resolve("folder/"), None);
    }

    #[test]
    fn exact_path_registration_wins_over_suffix() {
        let resolver = MatchResolver::new([("ui/bg", "qualified"), ("bg", "bare")]);

        assert_eq!(resolver.resolve("ui/bg"), Some(&"qualified"));
        assert_eq!(resolver.resolve("world/bg"), Some(&"bare"));
    }

    #[test]
    fn tracker_reports_unmatched_names_once() {
        let mut tracker = MatchTracker::new(["bg", "Logo", "bg"]);
        tracker.record("BG");
        tracker.record("never_requested");

        assert_eq!(tracker.hits("bg"), 1);
        assert_eq!(tracker.unmatched(), ["Logo"]);
    }

    #[test]
    fn similar_names_share_a_substring() {
        let resident = ["title_bg_01", "menu_music", "bg", "logo_main", "title_bg_01"];
        let similar = similar_names("title_bg_02", resident, 10);

        assert_eq!(similar, ["title_bg_01"]);
        assert_eq!(similar_names("main_logo", resident, 10), ["logo_main"]);
        assert!(similar_names("zz", resident, 10).is_empty());
        assert_eq!(similar_names("title_bg_02", resident, 0).len(), 0);
    }
}
