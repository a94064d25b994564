//! Copies bundle meshes over live meshes.

use eyre::{ensure, eyre, Result};

use super::{replace_by_name, BundleMutator, Mutator, PassContext};
use crate::{
    kind::ObjectKind,
    object::{Handle, LiveObject, Mesh},
    orchestrator::Pass,
};

/// Replaces all of `target`'s geometry with `source`'s. Nothing from the old geometry survives,
/// and the bounds are recomputed from the new positions.
fn overwrite(source: &Mesh, target: &Handle<Mesh>) -> Result<()> {
    ensure!(
        source.readable,
        "bundle mesh '{}' is not readable",
        source.name
    );

    let mut target = target.borrow_mut();

    target.positions = source.positions.clone();
    target.normals = source.normals.clone();
    target.tangents = source.tangents.clone();
    target.uvs = source.uvs.clone();
    target.colors = source.colors.clone();
    target.indices = source.indices.clone();
    target.submeshes = source.submeshes.clone();
    target.bone_weights = source.bone_weights.clone();
    target.bind_poses = source.bind_poses.clone();

    target.recalculate_bounds();

    log::debug!(
        "Mesh '{}' now has {} vertices, {} triangles and {} submeshes.",
        target.name,
        target.positions.len(),
        target.triangle_count(),
        target.submeshes.len()
    );

    Ok(())
}

/// Overwrites live meshes with bundle meshes.
pub struct BundleMeshMutator;

impl BundleMutator for BundleMeshMutator {
    fn pass(&self) -> Pass {
        Pass::BundleMesh
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Mesh
    }

    fn apply(&self, source: &LiveObject, target: &LiveObject) -> Result<()> {
        let (Some(source), Some(target)) = (source.as_mesh(), target.as_mesh()) else {
            return Err(eyre!("bundle mesh pass was given a non-mesh"));
        };

        overwrite(&source.borrow(), target)
    }
}

impl Mutator for BundleMeshMutator {
    fn pass(&self) -> Pass {
        BundleMutator::pass(self)
    }

    fn run(&self, cx: &mut PassContext<'_>) -> usize {
        replace_by_name(self, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{BoneWeight, SubMesh, Topology};

    fn quad() -> Mesh {
        let mut mesh = Mesh::new("crate");
        mesh.positions = vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 3.0, 0.0], [0.0, 3.0, -1.0]];
        mesh.normals = vec![[0.0, 0.0, 1.0]; 4];
        mesh.uvs[0] = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        mesh.uvs[3] = vec![[0.5, 0.5]; 4];
        mesh.indices = vec![0, 1, 2, 0, 2, 3];
        mesh.submeshes = vec![
            SubMesh {
                index_start: 0,
                index_count: 3,
                topology: Topology::Triangles,
            },
            SubMesh {
                index_start: 3,
                index_count: 3,
                topology: Topology::Triangles,
            },
        ];
        mesh.bone_weights = vec![BoneWeight::default(); 4];
        mesh
    }

    #[test]
    fn geometry_is_replaced_and_bounds_recomputed() {
        let source = quad();

        let mut old = Mesh::new("crate");
        old.positions = vec![[-50.0, -50.0, -50.0], [50.0, 50.0, 50.0]];
        old.colors = vec![[1.0; 4]; 2];
        old.uvs[7] = vec![[0.0, 0.0]; 2];
        old.recalculate_bounds();

        let target = Handle::new(old);
        overwrite(&source, &target).unwrap();

        let target = target.borrow();
        assert_eq!(target.name, "crate");
        assert_eq!(target.triangle_count(), source.triangle_count());
        assert_eq!(target.submeshes.len(), 2);
        assert_eq!(target.uvs, source.uvs);
        assert!(target.colors.is_empty());
        assert_eq!(target.bounds.min, [0.0, 0.0, -1.0]);
        assert_eq!(target.bounds.max, [2.0, 3.0, 0.0]);
    }

    #[test]
    fn unreadable_sources_are_rejected() {
        let source = Mesh {
            readable: false,
            ..quad()
        };

        let target = Handle::new(Mesh::new("crate"));

        assert!(overwrite(&source, &target).is_err());
        assert!(target.borrow().positions.is_empty());
    }
}
