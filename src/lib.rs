//! Replaces resources that are already loaded in a running game.
//!
//! Replacement files are registered by name in a [`ReplacementRegistry`]. Objects that were
//! loaded ahead of time by the bundle pipeline are provided through a [`BundleOverrideSource`].
//! After each scene load, the [`ReplacementOrchestrator`] lists the live objects the host has
//! resident, matches them to replacements by name and overwrites them. Objects are overwritten
//! in place wherever possible so that code already holding a reference keeps working.
//!
//! ```no_run
//! use livepatch::{
//!     BundleAssetIndex, Options, ReplacementOrchestrator, ReplacementRegistry, ResidentObjects,
//! };
//!
//! let mut registry = ReplacementRegistry::new();
//! registry.register("Textures/UI/title_bg.png", "/mods/hd/title_bg.png");
//!
//! let mut orchestrator = ReplacementOrchestrator::new(registry, Options::load("livepatch.json"));
//!
//! let resident = ResidentObjects::new();
//! let bundles = BundleAssetIndex::new();
//!
//! let report = orchestrator.apply_all(&resident, &bundles);
//! println!("replaced {} objects", report.replaced);
//! ```

pub mod bundle;
pub mod cache;
pub mod diagnostics;
pub mod directory;
pub mod enumerate;
pub mod guard;
pub mod kind;
pub mod logging;
pub mod matching;
pub mod mutate;
pub mod object;
pub mod orchestrator;
pub mod registry;
pub mod settings;

pub use bundle::{BundleAsset, BundleAssetIndex, BundleOverrideSource, NoBundles};
pub use cache::ByteCache;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use directory::{IndexedObjects, ObjectCursor, ResidentObjects, ResourceDirectory};
pub use enumerate::{ResourceEnumerator, Strategy};
pub use kind::{ObjectKind, ReplacementKind};
pub use matching::MatchResolver;
pub use mutate::Mutator;
pub use object::{Handle, LiveObject, ObjectId};
pub use orchestrator::{ApplyReport, Pass, ReplacementOrchestrator, RunState, SceneLoadScheduler};
pub use registry::{ReplacementEntry, ReplacementRegistry};
pub use settings::Options;
