//! Replacement objects that were loaded ahead of time by the bundle pipeline.

use case_insensitive_hashmap::CaseInsensitiveHashMap;
use std::collections::BTreeMap;

use crate::{kind::ObjectKind, object::LiveObject};

/// A bundle-sourced replacement object and the asset name it was registered under.
#[derive(Clone, Debug)]
pub struct BundleAsset {
    pub name: String,
    pub object: LiveObject,
}

/// Read-only view of the objects provided by the bundle loader.
pub trait BundleOverrideSource {
    /// Returns the bundle objects of `kind`, in a stable order.
    fn assets(&self, kind: ObjectKind) -> Vec<BundleAsset>;
}

/// Bundle objects keyed by kind and then by name. The bundle loader fills this in; the
/// replacement passes only read from it.
#[derive(Default)]
pub struct BundleAssetIndex {
    by_kind: BTreeMap<ObjectKind, CaseInsensitiveHashMap<LiveObject>>,
}

impl BundleAssetIndex {
    pub fn new() -> BundleAssetIndex {
        BundleAssetIndex::default()
    }

    /// Adds `object` under `name`. The object's kind decides which table it goes in. A previous
    /// object with the same name and kind is returned.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        object: impl Into<LiveObject>,
    ) -> Option<LiveObject> {
        let object = object.into();

        self.by_kind
            .entry(object.kind())
            .or_insert_with(CaseInsensitiveHashMap::new)
            .insert(name.into(), object)
    }

    pub fn get(&self, kind: ObjectKind, name: &str) -> Option<&LiveObject> {
        self.by_kind.get(&kind)?.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_kind.values().map(|table| table.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BundleOverrideSource for BundleAssetIndex {
    fn assets(&self, kind: ObjectKind) -> Vec<BundleAsset> {
        let Some(table) = self.by_kind.get(&kind) else {
            return vec![];
        };

        let mut assets: Vec<_> = table
            .iter()
            .map(|(name, object)| BundleAsset {
                name: name.as_str().to_string(),
                object: object.clone(),
            })
            .collect();

        assets.sort_by(|a, b| a.name.cmp(&b.name));

        assets
    }
}

/// A source with no bundle objects, for hosts that only use disk replacements.
pub struct NoBundles;

impl BundleOverrideSource for NoBundles {
    fn assets(&self, _: ObjectKind) -> Vec<BundleAsset> {
        vec![]
    }
}
