//! Overlays bundle hierarchies onto live ones.

use std::collections::HashSet;

use eyre::{eyre, Result};

use super::{replace_by_name, BundleMutator, Mutator, PassContext};
use crate::{
    kind::ObjectKind,
    object::{Handle, LiveObject, Node, ObjectId},
    orchestrator::Pass,
};

/// Returns the IDs of `root` and every node below it.
fn subtree_ids(root: &Handle<Node>) -> HashSet<ObjectId> {
    let mut ids = HashSet::new();
    root.walk(&mut |node| {
        ids.insert(node.id());
    });

    ids
}

/// Copies the mesh and renderer payloads of `source` onto `target`. Only components that
/// `target` already has are touched.
fn copy_components(source: &Handle<Node>, target: &Handle<Node>) {
    let (mesh, source_renderer) = {
        let source = source.borrow();

        (
            source.mesh_filter.as_ref().and_then(|filter| filter.mesh.clone()),
            source.renderer.clone(),
        )
    };

    let mut target = target.borrow_mut();

    if let (Some(mesh), Some(filter)) = (mesh, target.mesh_filter.as_mut()) {
        filter.mesh = Some(mesh);
    }

    let (Some(source_renderer), Some(target_renderer)) = (source_renderer, target.renderer.clone())
    else {
        return;
    };

    if source_renderer.same(&target_renderer) {
        return;
    }

    let source_renderer = source_renderer.borrow();
    let mut target_renderer = target_renderer.borrow_mut();

    target_renderer.materials = source_renderer.materials.clone();

    if source_renderer.skinned && target_renderer.skinned {
        if let Some(mesh) = &source_renderer.skinned_mesh {
            target_renderer.skinned_mesh = Some(mesh.clone());
        }
    }
}

/// Overlays `source` onto `target`, then recurses into children that both have under the same
/// name. Children missing from `target` are skipped; nothing is ever created. Returns the
/// number of nodes that were overlaid.
fn overlay(source: &Handle<Node>, target: &Handle<Node>, source_ids: &HashSet<ObjectId>) -> usize {
    // Enumeration can turn up the bundle's own instance as well as copies in the scene, so this
    // has to be checked at every level and not just for the root.
    if source.same(target) || source_ids.contains(&target.id()) {
        log::trace!("Not overlaying '{}' onto itself.", source.borrow().name);
        return 0;
    }

    copy_components(source, target);

    let children = source.borrow().children.clone();
    let mut overlaid = 1;

    for source_child in &children {
        let name = source_child.borrow().name.clone();

        match target.child(&name) {
            Some(target_child) => overlaid += overlay(source_child, &target_child, source_ids),
            None => log::debug!(
                "'{}' has no child '{}' to overlay onto.",
                target.borrow().name,
                name
            ),
        }
    }

    overlaid
}

/// Overlays bundle hierarchies onto live hierarchies with the same root name.
pub struct BundlePrefabMutator;

impl BundleMutator for BundlePrefabMutator {
    fn pass(&self) -> Pass {
        Pass::BundlePrefab
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Node
    }

    fn is_own_source(&self, source: &LiveObject, target: &LiveObject) -> bool {
        match source.as_node() {
            Some(source) => subtree_ids(source).contains(&target.id()),
            None => source.id() == target.id(),
        }
    }

    fn apply(&self, source: &LiveObject, target: &LiveObject) -> Result<()> {
        let (Some(source), Some(target)) = (source.as_node(), target.as_node()) else {
            return Err(eyre!("bundle prefab pass was given a non-node"));
        };

        let overlaid = overlay(source, target, &subtree_ids(source));

        log::debug!(
            "Overlaid {} node(s) from the bundle '{}'.",
            overlaid,
            source.borrow().name
        );

        Ok(())
    }
}

impl Mutator for BundlePrefabMutator {
    fn pass(&self) -> Pass {
        BundleMutator::pass(self)
    }

    fn run(&self, cx: &mut PassContext<'_>) -> usize {
        replace_by_name(self, cx)
    }
}
