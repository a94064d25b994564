//! The replacement passes. Each pass owns one way of applying replacements to live objects.
//!
//! Textures, audio clips and meshes are overwritten in place, so that everything already holding
//! the object sees the new content. Materials are swapped by redirecting the slots that reference
//! them. Hierarchies are overlaid child by child.

use std::collections::HashMap;

use case_insensitive_hashmap::CaseInsensitiveHashMap;
use eyre::Result;
use itertools::Itertools;

use crate::{
    bundle::{BundleAsset, BundleOverrideSource},
    cache::ByteCache,
    diagnostics::{Diagnostic, Diagnostics},
    enumerate::ResourceEnumerator,
    guard::guarded,
    kind::{ObjectKind, ReplacementKind},
    matching::{self, MatchResolver, MatchTracker},
    object::LiveObject,
    orchestrator::Pass,
    registry::ReplacementRegistry,
    settings::Options,
};

mod audio;
mod material;
mod mesh;
mod prefab;
mod texture;

pub use audio::{BundleAudioMutator, DiskAudioMutator};
pub use material::BundleMaterialMutator;
pub use mesh::BundleMeshMutator;
pub use prefab::BundlePrefabMutator;
pub use texture::{BundleTextureMutator, DiskTextureMutator};

/// Everything a pass can use while it runs.
pub struct PassContext<'a> {
    pub registry: &'a ReplacementRegistry,
    pub cache: &'a mut ByteCache,
    pub bundles: &'a dyn BundleOverrideSource,
    pub options: &'a Options,
    pub diagnostics: &'a mut Diagnostics,

    enumerator: ResourceEnumerator<'a>,

    /// Live objects found so far during this run, by kind.
    live: HashMap<ObjectKind, Vec<LiveObject>>,

    /// Bundle asset names that matched a live object during this run, with their match counts.
    applied: CaseInsensitiveHashMap<usize>,

    /// Names that already have an `Unmatched` diagnostic from this run.
    reported: CaseInsensitiveHashMap<Pass>,
}

impl<'a> PassContext<'a> {
    pub fn new(
        registry: &'a ReplacementRegistry,
        cache: &'a mut ByteCache,
        bundles: &'a dyn BundleOverrideSource,
        options: &'a Options,
        diagnostics: &'a mut Diagnostics,
        enumerator: ResourceEnumerator<'a>,
    ) -> PassContext<'a> {
        PassContext {
            registry,
            cache,
            bundles,
            options,
            diagnostics,
            enumerator,
            live: HashMap::new(),
            applied: CaseInsensitiveHashMap::new(),
            reported: CaseInsensitiveHashMap::new(),
        }
    }

    /// Returns the live objects of `kind`. The host is only asked once per kind per run, since
    /// none of the passes create or destroy objects.
    pub fn live(&mut self, kind: ObjectKind) -> Vec<LiveObject> {
        if let Some(objects) = self.live.get(&kind) {
            return objects.clone();
        }

        let objects = self.enumerator.enumerate(kind, self.diagnostics);
        self.live.insert(kind, objects.clone());

        objects
    }

    /// Notes that the bundle asset `name` matched a live object other than itself.
    pub fn note_applied(&mut self, name: &str) {
        let name = matching::normalize_name(name);

        match self.applied.get_mut(name) {
            Some(count) => *count += 1,
            None => {
                self.applied.insert(name.to_string(), 1);
            }
        }
    }

    /// Reports every registration that only a bundle can satisfy (models, materials and unknown
    /// files) and that no bundle pass applied during this run. Names a bundle pass has already
    /// reported are skipped.
    pub fn report_unmatched_registrations(&mut self) {
        let registry = self.registry;

        let resident = self
            .live
            .values()
            .flatten()
            .map(LiveObject::name)
            .unique()
            .collect_vec();

        for (kind, pass) in [
            (ReplacementKind::Model, Pass::BundleMesh),
            (ReplacementKind::Material, Pass::BundleMaterial),
            (ReplacementKind::Unknown, Pass::BundlePrefab),
        ] {
            let entries = registry
                .entries_of(kind)
                .into_iter()
                .filter(|entry| self.reported.get(entry.asset_name.as_str()).is_none())
                .collect_vec();

            if entries.is_empty() {
                continue;
            }

            let mut tracker =
                MatchTracker::new(entries.iter().map(|entry| entry.asset_name.as_str()));

            for entry in &entries {
                if self.applied.get(entry.asset_name.as_str()).is_some() {
                    tracker.record(&entry.asset_name);
                }
            }

            self.report_unmatched(pass, &tracker, resident.iter().map(String::as_str));
        }
    }

    /// Records one diagnostic for every name in `tracker` that matched nothing, then logs a
    /// summary listing them alongside resident names that look related.
    pub fn report_unmatched<'n>(
        &mut self,
        pass: Pass,
        tracker: &MatchTracker,
        resident: impl IntoIterator<Item = &'n str>,
    ) {
        let unmatched = tracker.unmatched();

        if unmatched.is_empty() {
            return;
        }

        let resident = resident.into_iter().collect_vec();
        let limit = self.options.similar_name_limit;

        let mut sample = vec![];

        for name in &unmatched {
            let similar = matching::similar_names(name, resident.iter().copied(), limit);
            sample.extend(similar.iter().cloned());

            self.diagnostics.push(Diagnostic::Unmatched {
                pass,
                name: name.to_string(),
                similar,
            });

            self.reported.insert(name.to_string(), pass);
        }

        let sample = sample.into_iter().unique().take(limit).collect_vec();

        log::warn!(
            "[{}] {} replacement{} matched nothing: {}. Similar resident names: [{}]. \
            Is the name correct?",
            pass,
            unmatched.len(),
            if unmatched.len() == 1 { "" } else { "s" },
            unmatched.join(", "),
            sample.join(", ")
        );
    }
}

/// One replacement pass.
pub trait Mutator {
    fn pass(&self) -> Pass;

    /// Runs the pass and returns the number of objects that were replaced. Failures for
    /// individual objects go into the context's diagnostics.
    fn run(&self, cx: &mut PassContext<'_>) -> usize;
}

/// A pass that copies bundle objects onto live objects of the same kind with a matching name.
pub trait BundleMutator {
    fn pass(&self) -> Pass;

    /// The kind of object this pass reads from the bundles and writes to.
    fn kind(&self) -> ObjectKind;

    /// Returns `true` if `target` is `source` itself or part of it, in which case it must not be
    /// overwritten from `source`.
    fn is_own_source(&self, source: &LiveObject, target: &LiveObject) -> bool {
        source.id() == target.id()
    }

    /// Overwrites `target` with the content of `source`.
    fn apply(&self, source: &LiveObject, target: &LiveObject) -> Result<()>;
}

/// Runs a [`BundleMutator`] over every live object of its kind.
pub fn replace_by_name(mutator: &impl BundleMutator, cx: &mut PassContext<'_>) -> usize {
    let pass = mutator.pass();
    let assets = cx.bundles.assets(mutator.kind());

    if assets.is_empty() {
        return 0;
    }

    let live = cx.live(mutator.kind());

    let resolver: MatchResolver<&BundleAsset> =
        MatchResolver::new(assets.iter().map(|asset| (asset.name.clone(), asset)));

    let mut tracker = MatchTracker::new(assets.iter().map(|asset| asset.name.clone()));
    let mut replaced = 0;

    for target in &live {
        let name = target.name();

        let Some(asset) = resolver.resolve(&name) else {
            continue;
        };

        tracker.record(&asset.name);

        if mutator.is_own_source(&asset.object, target) {
            cx.diagnostics.push(Diagnostic::SelfReplacementSkipped {
                pass,
                name,
                target: target.id(),
            });

            continue;
        }

        cx.note_applied(&asset.name);

        match guarded(|| mutator.apply(&asset.object, target)) {
            Ok(()) => {
                replaced += 1;

                cx.diagnostics.push(Diagnostic::Replaced {
                    pass,
                    name,
                    target: target.id(),
                });
            }

            Err(err) => cx.diagnostics.push(Diagnostic::DecodeFailure {
                pass,
                name,
                target: Some(target.id()),
                reason: format!("{:#}", err),
            }),
        }
    }

    let names = live.iter().map(LiveObject::name).collect_vec();
    cx.report_unmatched(pass, &tracker, names.iter().map(String::as_str));

    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bundle::BundleAssetIndex,
        directory::ResidentObjects,
        object::{Handle, Texture},
    };

    #[test]
    fn live_objects_are_enumerated_once_per_run() {
        let mut resident = ResidentObjects::new();
        resident.track(Handle::new(Texture::new("bg", 1, 1)));

        let registry = ReplacementRegistry::new();
        let mut cache = ByteCache::new();
        let bundles = BundleAssetIndex::new();
        let options = Options::default();
        let mut diagnostics = Diagnostics::new();

        let mut cx = PassContext::new(
            &registry,
            &mut cache,
            &bundles,
            &options,
            &mut diagnostics,
            ResourceEnumerator::new(&resident, 5),
        );

        assert_eq!(cx.live(ObjectKind::Texture).len(), 1);
        assert!(cx.live(ObjectKind::Mesh).is_empty());
        assert!(cx.live(ObjectKind::Mesh).is_empty());

        // The empty kind is only reported the first time.
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn unmatched_names_get_one_diagnostic_each() {
        let resident = ResidentObjects::new();
        let registry = ReplacementRegistry::new();
        let mut cache = ByteCache::new();
        let bundles = BundleAssetIndex::new();
        let options = Options::default();
        let mut diagnostics = Diagnostics::new();

        let mut cx = PassContext::new(
            &registry,
            &mut cache,
            &bundles,
            &options,
            &mut diagnostics,
            ResourceEnumerator::new(&resident, 5),
        );

        let mut tracker = MatchTracker::new(["title_bg_02", "logo"]);
        tracker.record("logo");

        cx.report_unmatched(Pass::BundleTexture, &tracker, ["title_bg_01", "menu"]);

        assert_eq!(
            diagnostics.entries(),
            [Diagnostic::Unmatched {
                pass: Pass::BundleTexture,
                name: "title_bg_02".to_string(),
                similar: vec!["title_bg_01".to_string()],
            }]
        );
    }

    #[test]
    fn bundle_only_registrations_are_reported_unless_applied() {
        let resident = ResidentObjects::new();
        let bundles = BundleAssetIndex::new();
        let options = Options::default();
        let mut cache = ByteCache::new();
        let mut diagnostics = Diagnostics::new();

        let mut registry = ReplacementRegistry::new();
        registry.register_all([
            ("props/crate.fbx", "/mods/crate.fbx"),
            ("mats/skin.mat", "/mods/skin.mat"),
            ("mats/cloth.mat", "/mods/cloth.mat"),
            ("props/door.prefab", "/mods/door.prefab"),
            ("ui/logo.png", "/mods/logo.png"),
        ]);

        let mut cx = PassContext::new(
            &registry,
            &mut cache,
            &bundles,
            &options,
            &mut diagnostics,
            ResourceEnumerator::new(&resident, 5),
        );

        cx.note_applied("Skin (Instance)");

        // Already reported by a bundle pass.
        let tracker = MatchTracker::new(["door"]);
        cx.report_unmatched(Pass::BundlePrefab, &tracker, std::iter::empty());

        cx.report_unmatched_registrations();

        let reported = diagnostics
            .entries()
            .iter()
            .filter_map(|diagnostic| match diagnostic {
                Diagnostic::Unmatched { pass, name, .. } => Some((*pass, name.as_str())),
                _ => None,
            })
            .collect_vec();

        assert_eq!(
            reported,
            [
                (Pass::BundlePrefab, "door"),
                (Pass::BundleMesh, "crate"),
                (Pass::BundleMaterial, "cloth"),
            ]
        );
    }
}
