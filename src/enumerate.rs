//! Finds every live object of a kind, trying each listing surface of the host in turn.

use eyre::{ensure, Result};
use itertools::Itertools;
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    directory::ResourceDirectory,
    guard::guarded,
    kind::ObjectKind,
    object::LiveObject,
};

/// The listing surfaces, in the order they're tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum Strategy {
    Native,
    Cursor,
    Indexed,
    Managed,
}

impl Strategy {
    fn collect(
        self,
        directory: &dyn ResourceDirectory,
        kind: ObjectKind,
    ) -> Result<Vec<LiveObject>> {
        match self {
            Strategy::Native => directory.native(kind),

            Strategy::Cursor => {
                let mut cursor = directory.cursor(kind)?;
                let mut objects = vec![];

                while cursor.move_next()? {
                    objects.push(cursor.current()?);
                }

                Ok(objects)
            }

            Strategy::Indexed => {
                let collection = directory.indexed(kind)?;
                let count = collection.count()?;

                (0..count).map(|index| collection.get(index)).collect()
            }

            Strategy::Managed => Ok(directory.managed(kind)?.collect()),
        }
    }
}

/// Lists live objects through a [`ResourceDirectory`].
pub struct ResourceEnumerator<'dir> {
    directory: &'dir dyn ResourceDirectory,

    /// How many names to include when dumping resident objects for diagnosis.
    sample_limit: usize,
}

impl<'dir> ResourceEnumerator<'dir> {
    pub fn new(
        directory: &'dir dyn ResourceDirectory,
        sample_limit: usize,
    ) -> ResourceEnumerator<'dir> {
        ResourceEnumerator {
            directory,
            sample_limit,
        }
    }

    /// Tries `strategy`, returning only objects of the requested kind with duplicates removed.
    fn try_strategy(&self, strategy: Strategy, kind: ObjectKind) -> Result<Vec<LiveObject>> {
        let objects = guarded(|| strategy.collect(self.directory, kind))?;

        let objects = objects
            .into_iter()
            .filter(|object| object.kind() == kind)
            .unique_by(LiveObject::id)
            .collect_vec();

        ensure!(!objects.is_empty(), "no {} objects", kind);

        Ok(objects)
    }

    /// Returns every live object of `kind` using the first strategy that finds at least one, or
    /// an empty list if none of them do. Never fails.
    pub fn enumerate_quiet(&self, kind: ObjectKind) -> (Vec<LiveObject>, Option<Strategy>) {
        for strategy in Strategy::iter() {
            match self.try_strategy(strategy, kind) {
                Ok(objects) => {
                    log::debug!(
                        "Found {} live {} object(s) with the {} strategy.",
                        objects.len(),
                        kind,
                        strategy
                    );

                    return (objects, Some(strategy));
                }

                Err(err) => log::trace!("{} strategy for {}: {}", strategy, kind, err),
            }
        }

        (vec![], None)
    }

    /// Returns every live object of `kind`. Finding none isn't an error, but a warning with a
    /// sample of resident object names is recorded so that mismatches can be tracked down.
    pub fn enumerate(&self, kind: ObjectKind, diagnostics: &mut Diagnostics) -> Vec<LiveObject> {
        let (objects, _) = self.enumerate_quiet(kind);

        if objects.is_empty() {
            diagnostics.push(Diagnostic::EnumerationEmpty {
                kind,
                resident_sample: self.resident_sample(kind),
            });
        }

        objects
    }

    /// Returns the names of up to `sample_limit` resident objects that aren't of kind `excluded`.
    pub fn resident_sample(&self, excluded: ObjectKind) -> Vec<String> {
        ObjectKind::iter()
            .filter(|&kind| kind != excluded)
            .flat_map(|kind| {
                self.enumerate_quiet(kind)
                    .0
                    .into_iter()
                    .map(move |object| format!("{}:{}", kind, object.name()))
            })
            .take(self.sample_limit)
            .collect()
    }
}
