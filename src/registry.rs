//! The table of replacement files supplied by the manifest loader.

use case_insensitive_hashmap::CaseInsensitiveHashMap;
use std::path::PathBuf;

use crate::{kind::ReplacementKind, matching};

/// A single registered replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplacementEntry {
    /// The asset path as written by the user, e.g. `Textures/UI/title_bg.png`.
    pub declared_path: String,

    /// Where the replacement data lives on disk.
    pub disk_path: PathBuf,

    /// The file name from `declared_path` without its extension. This is the lookup key.
    pub asset_name: String,

    pub kind: ReplacementKind,
}

impl ReplacementEntry {
    fn new(declared_path: impl Into<String>, disk_path: impl Into<PathBuf>) -> ReplacementEntry {
        let declared_path = declared_path.into();
        let disk_path = disk_path.into();

        let kind = match extension(&declared_path) {
            Some(ext) => ReplacementKind::from_extension(ext),

            // Fall back to the file that's actually on disk.
            None => disk_path
                .extension()
                .and_then(std::ffi::OsStr::to_str)
                .map_or(ReplacementKind::Unknown, ReplacementKind::from_extension),
        };

        ReplacementEntry {
            asset_name: asset_name(&declared_path).to_string(),
            declared_path,
            disk_path,
            kind,
        }
    }
}

/// Returns the last component of `path`. Both `/` and `\` count as separators because manifests
/// are written on every platform.
fn file_name(path: &str) -> &str {
    matching::strip_path(path).unwrap_or(path)
}

/// Returns the extension of the file named by `path`, if it has one.
fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);

    match name.rfind('.') {
        // A leading dot marks a hidden file rather than an extension.
        Some(0) | None => None,
        Some(index) => Some(&name[index + 1..]).filter(|ext| !ext.is_empty()),
    }
}

/// Returns the asset name for `path`: the file name without its extension.
pub fn asset_name(path: &str) -> &str {
    let name = file_name(path);

    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}

/// Maps asset names to replacements. Names are case-insensitive, and registering a name again
/// replaces the earlier entry regardless of kind.
pub struct ReplacementRegistry {
    entries: CaseInsensitiveHashMap<ReplacementEntry>,
}

impl ReplacementRegistry {
    pub fn new() -> ReplacementRegistry {
        ReplacementRegistry {
            entries: CaseInsensitiveHashMap::new(),
        }
    }

    /// Registers `disk_path` as the replacement for the asset at `declared_path`, returning the
    /// entry that was replaced (if any).
    pub fn register(
        &mut self,
        declared_path: impl Into<String>,
        disk_path: impl Into<PathBuf>,
    ) -> Option<ReplacementEntry> {
        let entry = ReplacementEntry::new(declared_path, disk_path);

        log::info!(
            "Installing {} replacement {:?} for '{}'.",
            entry.kind,
            entry.disk_path,
            entry.asset_name
        );

        let previous = self.entries.insert(entry.asset_name.clone(), entry);

        if let Some(previous) = &previous {
            log::debug!(
                "'{}' was already registered from {:?}; the new file takes over.",
                previous.asset_name,
                previous.disk_path
            );
        }

        previous
    }

    /// Registers every `(declared_path, disk_path)` pair. Used when a manifest is (re)loaded.
    pub fn register_all<D, P>(&mut self, pairs: impl IntoIterator<Item = (D, P)>)
    where
        D: Into<String>,
        P: Into<PathBuf>,
    {
        for (declared_path, disk_path) in pairs {
            self.register(declared_path, disk_path);
        }
    }

    /// Returns `true` if there is a replacement registered for the asset at `declared_path`.
    pub fn has_replacement(&self, declared_path: &str) -> bool {
        self.entries.get(asset_name(declared_path)).is_some()
    }

    /// Returns the entry registered under `asset_name`.
    pub fn get(&self, asset_name: &str) -> Option<&ReplacementEntry> {
        self.entries.get(asset_name)
    }

    /// Finds the entry for a name reported by a live object, trying the exact name first and then
    /// the name without any leading path.
    pub fn resolve(&self, live_name: &str) -> Option<&ReplacementEntry> {
        matching::candidate_keys(live_name).find_map(|key| self.entries.get(key))
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReplacementEntry> {
        self.entries.values()
    }

    /// Returns the entries of a single kind, sorted by name so reports come out in a stable
    /// order.
    pub fn entries_of(&self, kind: ReplacementKind) -> Vec<&ReplacementEntry> {
        let mut entries: Vec<_> = self.entries().filter(|entry| entry.kind == kind).collect();
        entries.sort_by(|a, b| a.asset_name.cmp(&b.asset_name));

        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReplacementRegistry {
    fn default() -> Self {
        ReplacementRegistry::new()
    }
}

impl std::fmt::Debug for ReplacementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries().map(|entry| (&entry.asset_name, entry.kind)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_names_drop_directories_and_extension() {
        assert_eq!(asset_name("Textures/UI/title_bg.png"), "title_bg");
        assert_eq!(asset_name(r"Audio\theme.ogg"), "theme");
        assert_eq!(asset_name("archive.tar.gz"), "archive.tar");
        assert_eq!(asset_name("noext"), "noext");
        assert_eq!(asset_name(".hidden"), ".hidden");
    }

    #[test]
    fn kind_comes_from_declared_extension() {
        let mut registry = ReplacementRegistry::new();
        registry.register("ui/bg.PNG", "/mods/bg.png");
        registry.register("music/theme.ogg", "/mods/theme.ogg");
        registry.register("props/crate.prefab", "/mods/crate.prefab");

        assert_eq!(registry.get("bg").unwrap().kind, ReplacementKind::Texture);
        assert_eq!(registry.get("theme").unwrap().kind, ReplacementKind::Audio);
        assert_eq!(registry.get("crate").unwrap().kind, ReplacementKind::Unknown);
    }

    #[test]
    fn kind_falls_back_to_disk_extension() {
        let mut registry = ReplacementRegistry::new();
        registry.register("ui/logo", "/mods/logo.jpg");

        assert_eq!(registry.get("logo").unwrap().kind, ReplacementKind::Texture);
    }

    #[test]
    fn reregistering_a_name_overwrites_it() {
        let mut registry = ReplacementRegistry::new();
        assert!(registry.register("a/bg.png", "/one/bg.png").is_none());

        let previous = registry.register("b/BG.wav", "/two/bg.wav").unwrap();
        assert_eq!(previous.disk_path, PathBuf::from("/one/bg.png"));

        assert_eq!(registry.len(), 1);

        let entry = registry.get("bg").unwrap();
        assert_eq!(entry.kind, ReplacementKind::Audio);
        assert_eq!(entry.declared_path, "b/BG.wav");
    }

    #[test]
    fn registration_is_idempotent() {
        let pairs = [("ui/bg.png", "/mods/bg.png"), ("music/theme.ogg", "/mods/theme.ogg")];

        let mut registry = ReplacementRegistry::new();
        registry.register_all(pairs);
        registry.register_all(pairs);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entries_of(ReplacementKind::Texture).len(), 1);
    }

    #[test]
    fn existence_check_uses_the_derived_name() {
        let mut registry = ReplacementRegistry::new();
        registry.register("ui/Title_BG.png", "/mods/title_bg.png");

        assert!(registry.has_replacement("title_bg.png"));
        assert!(registry.has_replacement("other/dir/TITLE_BG.jpg"));
        assert!(!registry.has_replacement("title.png"));
    }

    #[test]
    fn resolve_falls_back_to_path_suffix() {
        let mut registry = ReplacementRegistry::new();
        registry.register("title_bg_02.png", "/mods/title_bg_02.png");

        assert!(registry
            .resolve("ui/textures/backgrounds/title_bg_02")
            .is_some());
        assert!(registry.resolve("totally_different").is_none());
    }
}
