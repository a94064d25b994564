//! The live object model: resources that are already resident in the host and that other systems
//! hold references to.
//!
//! Objects are shared through [`Handle`]s. Replacing an object's content goes through a handle,
//! so every other holder of that object sees the new content without having to be told about it.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use crate::kind::ObjectKind;

/// Identifies a live object. Two handles have the same ID exactly when they refer to the same
/// object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A shared reference to a live object.
pub struct Handle<T>(Rc<RefCell<T>>);

impl<T> Handle<T> {
    pub fn new(value: T) -> Handle<T> {
        Handle(Rc::new(RefCell::new(value)))
    }

    pub fn id(&self) -> ObjectId {
        ObjectId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// Returns `true` if both handles refer to the same object.
    pub fn same(&self, other: &Handle<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Immutably borrows the object. Panics if it is currently being mutated.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrows the object. Panics if it is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => write!(f, "{} {:?}", self.id(), value),
            Err(_) => write!(f, "{} <borrowed>", self.id()),
        }
    }
}

/// Pixel layouts a texture may be stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba32,
    Rgb24,
    Alpha8,
    Dxt1,
    Dxt5,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,

    /// Whether the pixel data is accessible from the CPU. Unreadable textures can neither be
    /// written to nor copied from.
    pub readable: bool,
}

impl Texture {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Texture {
        Texture {
            name: name.into(),
            width,
            height,
            format: TextureFormat::Rgba32,
            pixels: vec![0; width as usize * height as usize * 4],
            readable: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioClip {
    pub name: String,
    pub channels: u16,
    pub frequency: u32,

    /// Interleaved samples.
    pub samples: Vec<f32>,

    /// Whether the sample data has been decompressed into memory. Clips that stream from disk
    /// can't be copied or written to.
    pub readable: bool,
}

impl AudioClip {
    pub fn new(
        name: impl Into<String>,
        channels: u16,
        frequency: u32,
        samples: Vec<f32>,
    ) -> AudioClip {
        AudioClip {
            name: name.into(),
            channels,
            frequency,
            samples,
            readable: true,
        }
    }

    /// The number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            channels => self.samples.len() / channels as usize,
        }
    }
}

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];
pub type Matrix4 = [[f32; 4]; 4];

/// The number of UV channels a mesh can carry.
pub const UV_CHANNELS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
    Points,
}

/// A range of a mesh's index buffer that is drawn with one material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
    pub index_start: usize,
    pub index_count: usize,
    pub topology: Topology,
}

/// Up to four bone influences on one vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoneWeight {
    pub bones: [u32; 4],
    pub weights: [f32; 4],
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Returns the smallest box containing every point, or an empty box at the origin if there
    /// are no points.
    pub fn enclosing(points: &[Vec3]) -> Bounds {
        let Some((first, rest)) = points.split_first() else {
            return Bounds::default();
        };

        rest.iter().fold(
            Bounds {
                min: *first,
                max: *first,
            },
            |bounds, point| Bounds {
                min: std::array::from_fn(|axis| bounds.min[axis].min(point[axis])),
                max: std::array::from_fn(|axis| bounds.max[axis].max(point[axis])),
            },
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,

    /// UV channels in order. Unused channels are empty.
    pub uvs: [Vec<Vec2>; UV_CHANNELS],

    pub colors: Vec<Vec4>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
    pub bone_weights: Vec<BoneWeight>,
    pub bind_poses: Vec<Matrix4>,
    pub bounds: Bounds,

    pub readable: bool,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Mesh {
        Mesh {
            name: name.into(),
            readable: true,
            ..Mesh::default()
        }
    }

    /// The number of triangles drawn by the triangle-topology submeshes.
    pub fn triangle_count(&self) -> usize {
        self.submeshes
            .iter()
            .filter(|submesh| submesh.topology == Topology::Triangles)
            .map(|submesh| submesh.index_count / 3)
            .sum()
    }

    pub fn recalculate_bounds(&mut self) {
        self.bounds = Bounds::enclosing(&self.positions);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Material {
    pub name: String,
    pub shader: String,
}

impl Material {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Material {
        Material {
            name: name.into(),
            shader: shader.into(),
        }
    }
}

/// A component that draws with a list of materials.
#[derive(Clone, Debug)]
pub struct Renderer {
    pub name: String,

    /// One material per submesh.
    pub materials: Vec<Handle<Material>>,

    /// Set for skinned renderers, which reference their mesh directly.
    pub skinned_mesh: Option<Handle<Mesh>>,

    pub skinned: bool,
}

impl Renderer {
    pub fn new(name: impl Into<String>, materials: Vec<Handle<Material>>) -> Renderer {
        Renderer {
            name: name.into(),
            materials,
            skinned_mesh: None,
            skinned: false,
        }
    }

    pub fn skinned(
        name: impl Into<String>,
        mesh: Handle<Mesh>,
        materials: Vec<Handle<Material>>,
    ) -> Renderer {
        Renderer {
            name: name.into(),
            materials,
            skinned_mesh: Some(mesh),
            skinned: true,
        }
    }
}

/// The component that gives a node its (non-skinned) mesh.
#[derive(Clone, Debug, Default)]
pub struct MeshFilter {
    pub mesh: Option<Handle<Mesh>>,
}

/// A hierarchical object: a named node with components and named children.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub children: Vec<Handle<Node>>,
    pub mesh_filter: Option<MeshFilter>,
    pub renderer: Option<Handle<Renderer>>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Node {
        Node {
            name: name.into(),
            children: vec![],
            mesh_filter: None,
            renderer: None,
        }
    }

    pub fn with_mesh(mut self, mesh: Option<Handle<Mesh>>) -> Node {
        self.mesh_filter = Some(MeshFilter { mesh });
        self
    }

    pub fn with_renderer(mut self, renderer: Handle<Renderer>) -> Node {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_children(mut self, children: Vec<Handle<Node>>) -> Node {
        self.children = children;
        self
    }
}

impl Handle<Node> {
    /// Returns the child called `name`, compared case-insensitively.
    pub fn child(&self, name: &str) -> Option<Handle<Node>> {
        self.borrow()
            .children
            .iter()
            .find(|child| child.borrow().name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Calls `visit` for this node and all of its descendants, depth first. Nodes that are
    /// reachable more than once are only visited once.
    pub fn walk(&self, visit: &mut impl FnMut(&Handle<Node>)) {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![self.clone()];

        while let Some(node) = stack.pop() {
            if !seen.insert(node.id()) {
                continue;
            }

            visit(&node);

            stack.extend(node.borrow().children.iter().rev().cloned());
        }
    }
}

/// Implemented by every object type so names can be read without matching on the type.
pub trait Named {
    fn name(&self) -> &str;
}

macro_rules! live_objects {
    ($($variant:ident($ty:ty) => $kind:ident, $getter:ident;)*) => {
        /// A handle to a live object of any kind.
        #[derive(Clone, Debug)]
        pub enum LiveObject {
            $($variant(Handle<$ty>),)*
        }

        impl LiveObject {
            pub fn kind(&self) -> ObjectKind {
                match self {
                    $(LiveObject::$variant(_) => ObjectKind::$kind,)*
                }
            }

            pub fn id(&self) -> ObjectId {
                match self {
                    $(LiveObject::$variant(handle) => handle.id(),)*
                }
            }

            /// Returns the name the object reports. This may be path-qualified.
            pub fn name(&self) -> String {
                match self {
                    $(LiveObject::$variant(handle) => handle.borrow().name().to_string(),)*
                }
            }

            $(
                pub fn $getter(&self) -> Option<&Handle<$ty>> {
                    match self {
                        LiveObject::$variant(handle) => Some(handle),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl Named for $ty {
                fn name(&self) -> &str {
                    &self.name
                }
            }

            impl From<Handle<$ty>> for LiveObject {
                fn from(handle: Handle<$ty>) -> LiveObject {
                    LiveObject::$variant(handle)
                }
            }
        )*
    };
}

live_objects! {
    Texture(Texture) => Texture, as_texture;
    Audio(AudioClip) => AudioClip, as_audio;
    Mesh(Mesh) => Mesh, as_mesh;
    Material(Material) => Material, as_material;
    Renderer(Renderer) => Renderer, as_renderer;
    Node(Node) => Node, as_node;
}
