//! Redirects renderer material slots to bundle materials.

use eyre::Result;
use itertools::Itertools;

use super::{Mutator, PassContext};
use crate::{
    bundle::BundleAsset,
    diagnostics::Diagnostic,
    guard::guarded,
    kind::ObjectKind,
    matching::{MatchResolver, MatchTracker},
    object::{Handle, Renderer},
    orchestrator::Pass,
};

/// A material slot that now references a bundle material.
struct Redirect {
    slot: usize,
    material: String,

    /// `false` if the slot already referenced the bundle material.
    changed: bool,
}

/// Points every slot of `renderer` whose material name matches a bundle material at that bundle
/// material. Slots with other materials are left alone.
fn redirect_slots(
    renderer: &Handle<Renderer>,
    resolver: &MatchResolver<&BundleAsset>,
    tracker: &mut MatchTracker,
) -> Result<Vec<Redirect>> {
    let mut renderer = renderer.borrow_mut();
    let mut redirects = vec![];

    for (slot, current) in renderer.materials.iter_mut().enumerate() {
        let current_name = current.borrow().name.clone();

        let Some(asset) = resolver.resolve(&current_name) else {
            continue;
        };

        let Some(replacement) = asset.object.as_material() else {
            continue;
        };

        tracker.record(&asset.name);

        let changed = !current.same(replacement);

        if changed {
            *current = replacement.clone();
        }

        redirects.push(Redirect {
            slot,
            material: current_name,
            changed,
        });
    }

    Ok(redirects)
}

/// Swaps materials by redirecting the slots that reference them. Materials can't usefully be
/// overwritten in place, so unlike the other passes this one changes references rather than
/// content.
pub struct BundleMaterialMutator;

impl Mutator for BundleMaterialMutator {
    fn pass(&self) -> Pass {
        Pass::BundleMaterial
    }

    fn run(&self, cx: &mut PassContext<'_>) -> usize {
        let assets = cx.bundles.assets(ObjectKind::Material);

        if assets.is_empty() {
            return 0;
        }

        let resolver: MatchResolver<&BundleAsset> =
            MatchResolver::new(assets.iter().map(|asset| (asset.name.clone(), asset)));

        let mut tracker = MatchTracker::new(assets.iter().map(|asset| asset.name.clone()));
        let renderers = cx.live(ObjectKind::Renderer);

        // Collected before redirecting, so the unmatched report shows what was there originally.
        let mut slot_names = vec![];

        let mut covered = 0;

        for object in &renderers {
            let Some(renderer) = object.as_renderer() else {
                continue;
            };

            slot_names.extend(
                renderer
                    .borrow()
                    .materials
                    .iter()
                    .map(|material| material.borrow().name.clone()),
            );

            match guarded(|| redirect_slots(renderer, &resolver, &mut tracker)) {
                Ok(redirects) => {
                    for redirect in redirects {
                        covered += 1;

                        if !redirect.changed {
                            log::trace!(
                                "Slot {} of '{}' already uses the bundle '{}'.",
                                redirect.slot,
                                object.name(),
                                redirect.material
                            );

                            continue;
                        }

                        cx.diagnostics.push(Diagnostic::Replaced {
                            pass: Pass::BundleMaterial,
                            name: format!(
                                "{}[{}]: {}",
                                object.name(),
                                redirect.slot,
                                redirect.material
                            ),
                            target: object.id(),
                        });
                    }
                }

                Err(err) => cx.diagnostics.push(Diagnostic::DecodeFailure {
                    pass: Pass::BundleMaterial,
                    name: object.name(),
                    target: Some(object.id()),
                    reason: format!("{:#}", err),
                }),
            }
        }

        for asset in &assets {
            if tracker.hits(&asset.name) > 0 {
                cx.note_applied(&asset.name);
            }
        }

        let slot_names = slot_names.into_iter().unique().collect_vec();
        cx.report_unmatched(
            Pass::BundleMaterial,
            &tracker,
            slot_names.iter().map(String::as_str),
        );

        covered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bundle::BundleAssetIndex, bundle::BundleOverrideSource, object::Material};

    #[test]
    fn only_matching_slots_are_redirected() {
        let mut index = BundleAssetIndex::new();
        let bundle_skin = Handle::new(Material::new("skin", "Toon"));
        index.insert("skin", bundle_skin.clone());

        let assets = index.assets(ObjectKind::Material);
        let resolver = MatchResolver::new(assets.iter().map(|asset| (asset.name.clone(), asset)));
        let mut tracker = MatchTracker::new(["skin"]);

        let old_skin = Handle::new(Material::new("skin (Instance)", "Standard"));
        let cloth = Handle::new(Material::new("cloth", "Standard"));

        let renderer = Handle::new(Renderer::new(
            "body",
            vec![old_skin.clone(), cloth.clone(), old_skin],
        ));

        let redirects = redirect_slots(&renderer, &resolver, &mut tracker).unwrap();

        assert_eq!(redirects.iter().map(|r| r.slot).collect_vec(), [0, 2]);
        assert!(redirects.iter().all(|r| r.changed));
        assert_eq!(tracker.hits("skin"), 2);

        let renderer = renderer.borrow();
        assert!(renderer.materials[0].same(&bundle_skin));
        assert!(renderer.materials[1].same(&cloth));
        assert!(renderer.materials[2].same(&bundle_skin));
    }

    #[test]
    fn slots_already_redirected_are_unchanged() {
        let mut index = BundleAssetIndex::new();
        let bundle_skin = Handle::new(Material::new("skin", "Toon"));
        index.insert("skin", bundle_skin.clone());

        let assets = index.assets(ObjectKind::Material);
        let resolver = MatchResolver::new(assets.iter().map(|asset| (asset.name.clone(), asset)));
        let mut tracker = MatchTracker::new(["skin"]);

        let renderer = Handle::new(Renderer::new("body", vec![bundle_skin]));
        let redirects = redirect_slots(&renderer, &resolver, &mut tracker).unwrap();

        assert_eq!(redirects.len(), 1);
        assert!(!redirects[0].changed);
    }
}
