//! Resource categories, both for registered replacement files and for live objects.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The kind of resource a registered replacement file provides. This is decided purely by the
/// file extension when the replacement is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ReplacementKind {
    Texture,
    Audio,
    Model,
    Material,

    /// Extension we don't know how to load from disk. These can still be satisfied by
    /// bundle-sourced objects.
    Unknown,
}

impl ReplacementKind {
    /// Returns the kind for a file extension (without the dot). Matching is case-insensitive.
    pub fn from_extension(extension: impl AsRef<str>) -> ReplacementKind {
        match extension.as_ref().to_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "tga" | "bmp" => ReplacementKind::Texture,
            "wav" | "ogg" | "mp3" => ReplacementKind::Audio,
            "glb" | "gltf" | "fbx" | "obj" => ReplacementKind::Model,
            "mat" => ReplacementKind::Material,
            _ => ReplacementKind::Unknown,
        }
    }

    /// Returns `true` if replacements of this kind can be read straight from disk.
    pub fn is_disk_loadable(self) -> bool {
        matches!(self, ReplacementKind::Texture | ReplacementKind::Audio)
    }
}

/// The category of a live object resident in the host.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Texture,
    AudioClip,
    Mesh,
    Material,

    /// A component that holds material slots (and, when skinned, a mesh reference).
    Renderer,

    /// A hierarchical object with named children.
    Node,
}
