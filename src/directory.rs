//! The boundary between this crate and the host's object graph.
//!
//! Hosts don't agree on how their resident objects can be listed, and the surface a given host
//! exposes isn't guaranteed to stay the same between versions. [`ResourceDirectory`] therefore
//! has one method per listing surface we know about. A host implements whichever ones it can and
//! leaves the others returning an error.

use eyre::{eyre, Result};

use crate::{
    kind::ObjectKind,
    object::{Handle, LiveObject, Node},
};

/// A cursor-style enumerator (`move_next` followed by `current`).
pub trait ObjectCursor {
    /// Advances to the next object, returning `false` once there are no more.
    fn move_next(&mut self) -> Result<bool>;

    /// Returns the object the cursor is on.
    fn current(&self) -> Result<LiveObject>;
}

/// A collection with a length and integer indexing.
pub trait IndexedObjects {
    fn count(&self) -> Result<usize>;
    fn get(&self, index: usize) -> Result<LiveObject>;
}

fn unsupported<T>(surface: &str, kind: ObjectKind) -> Result<T> {
    Err(eyre!("{} listing is not available for {}", surface, kind))
}

/// Gives access to every resident object of a kind, whichever scene it belongs to and whether or
/// not it's visible.
pub trait ResourceDirectory {
    /// The host's own collection type, if it has one we can use directly.
    fn native(&self, kind: ObjectKind) -> Result<Vec<LiveObject>> {
        unsupported("Native", kind)
    }

    fn cursor(&self, kind: ObjectKind) -> Result<Box<dyn ObjectCursor + '_>> {
        unsupported("Cursor", kind)
    }

    fn indexed(&self, kind: ObjectKind) -> Result<Box<dyn IndexedObjects + '_>> {
        unsupported("Indexed", kind)
    }

    /// A plain iterator over objects managed by the host. This is the last resort.
    fn managed(&self, kind: ObjectKind) -> Result<Box<dyn Iterator<Item = LiveObject> + '_>> {
        unsupported("Managed", kind)
    }
}

/// A directory that tracks resident objects itself. Hosts that control their own object
/// lifecycle can register objects here as they're loaded instead of implementing the other
/// listing surfaces.
#[derive(Default)]
pub struct ResidentObjects {
    objects: Vec<LiveObject>,
}

impl ResidentObjects {
    pub fn new() -> ResidentObjects {
        ResidentObjects::default()
    }

    /// Starts tracking `object`. Tracking the same object twice has no effect.
    pub fn track(&mut self, object: impl Into<LiveObject>) {
        let object = object.into();

        if self.objects.iter().all(|tracked| tracked.id() != object.id()) {
            self.objects.push(object);
        }
    }

    /// Tracks `root` along with every node below it and all of their components.
    pub fn track_hierarchy(&mut self, root: &Handle<Node>) {
        let mut nodes = vec![];
        root.walk(&mut |node| nodes.push(node.clone()));

        for node in nodes {
            self.track(node.clone());

            let node = node.borrow();

            if let Some(mesh) = node.mesh_filter.as_ref().and_then(|filter| filter.mesh.clone()) {
                self.track(mesh);
            }

            if let Some(renderer) = &node.renderer {
                self.track(renderer.clone());

                let renderer = renderer.borrow();

                if let Some(mesh) = &renderer.skinned_mesh {
                    self.track(mesh.clone());
                }

                for material in &renderer.materials {
                    self.track(material.clone());
                }
            }
        }
    }

    /// Stops tracking every object, e.g. when the scene they belonged to is unloaded.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &LiveObject> {
        self.objects.iter().filter(move |object| object.kind() == kind)
    }
}

impl ResourceDirectory for ResidentObjects {
    fn native(&self, kind: ObjectKind) -> Result<Vec<LiveObject>> {
        Ok(self.of_kind(kind).cloned().collect())
    }

    fn managed(&self, kind: ObjectKind) -> Result<Box<dyn Iterator<Item = LiveObject> + '_>> {
        Ok(Box::new(self.of_kind(kind).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Material, Mesh, Renderer, Texture};

    #[test]
    fn tracking_is_deduplicated() {
        let texture = Handle::new(Texture::new("bg", 1, 1));

        let mut resident = ResidentObjects::new();
        resident.track(texture.clone());
        resident.track(texture);

        assert_eq!(resident.len(), 1);
    }

    #[test]
    fn hierarchies_are_tracked_with_components() {
        let material = Handle::new(Material::new("body", "Standard"));
        let renderer = Handle::new(Renderer::new("body", vec![material]));
        let mesh = Handle::new(Mesh::new("body"));

        let body = Handle::new(
            Node::new("body")
                .with_mesh(Some(mesh))
                .with_renderer(renderer),
        );

        let root = Handle::new(Node::new("robot").with_children(vec![body]));

        let mut resident = ResidentObjects::new();
        resident.track_hierarchy(&root);

        assert_eq!(resident.native(ObjectKind::Node).unwrap().len(), 2);
        assert_eq!(resident.native(ObjectKind::Mesh).unwrap().len(), 1);
        assert_eq!(resident.native(ObjectKind::Renderer).unwrap().len(), 1);
        assert_eq!(resident.managed(ObjectKind::Material).unwrap().count(), 1);
    }

    #[test]
    fn unimplemented_surfaces_are_errors() {
        let resident = ResidentObjects::new();

        assert!(resident.cursor(ObjectKind::Texture).is_err());
        assert!(resident.indexed(ObjectKind::Texture).is_err());
    }
}
