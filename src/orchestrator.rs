//! Runs the replacement passes in order and collects the results.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{
    bundle::BundleOverrideSource,
    cache::ByteCache,
    diagnostics::{Diagnostic, Diagnostics},
    directory::ResourceDirectory,
    enumerate::ResourceEnumerator,
    guard::guarded,
    mutate::{
        BundleAudioMutator, BundleMaterialMutator, BundleMeshMutator, BundlePrefabMutator,
        BundleTextureMutator, DiskAudioMutator, DiskTextureMutator, Mutator, PassContext,
    },
    registry::ReplacementRegistry,
    settings::Options,
};

/// The replacement passes, in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Pass {
    DiskTexture,
    DiskAudio,
    BundleTexture,
    BundleAudio,
    BundleMesh,
    BundleMaterial,
    BundlePrefab,
}

/// Whether replacements have been applied yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    NotRun,
    Run { runs: usize },
}

/// The outcome of one [`ReplacementOrchestrator::apply_all`] call.
#[derive(Debug)]
pub struct ApplyReport {
    /// The total number of objects replaced across every pass.
    pub replaced: usize,

    /// The number replaced by each pass that ran.
    pub passes: Vec<(Pass, usize)>,

    pub diagnostics: Vec<Diagnostic>,
}

impl ApplyReport {
    /// Returns the number of objects replaced by `pass`, or zero if it didn't run.
    pub fn replaced_by(&self, pass: Pass) -> usize {
        self.passes
            .iter()
            .find(|(ran, _)| *ran == pass)
            .map_or(0, |(_, count)| *count)
    }
}

/// Waits a number of frames after a scene loads so the scene's objects exist before
/// replacements are applied.
#[derive(Debug)]
pub struct SceneLoadScheduler {
    settle_frames: u32,

    /// Frames left before the next run, or `None` if no run is pending.
    remaining: Option<u32>,
}

impl SceneLoadScheduler {
    pub fn new(settle_frames: u32) -> SceneLoadScheduler {
        SceneLoadScheduler {
            settle_frames,
            remaining: None,
        }
    }

    /// Starts (or restarts) the countdown.
    pub fn scene_loaded(&mut self) {
        self.remaining = Some(self.settle_frames);
    }

    /// Advances one frame. Returns `true` on the frame that replacements should be applied.
    pub fn tick(&mut self) -> bool {
        match self.remaining {
            None => false,

            Some(0) => {
                self.remaining = None;
                true
            }

            Some(frames) => {
                self.remaining = Some(frames - 1);
                false
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.remaining.is_some()
    }
}

/// Owns the replacement registry and applies it (along with any bundle objects) to the live
/// objects of the host.
pub struct ReplacementOrchestrator {
    registry: ReplacementRegistry,
    cache: ByteCache,
    options: Options,
    mutators: Vec<Box<dyn Mutator>>,
    scheduler: SceneLoadScheduler,
    state: RunState,
}

impl ReplacementOrchestrator {
    pub fn new(registry: ReplacementRegistry, options: Options) -> ReplacementOrchestrator {
        // The order matters: disk files first, then bundles, with hierarchies last so that they
        // pick up meshes and materials that have already been replaced.
        let mutators: Vec<Box<dyn Mutator>> = vec![
            Box::new(DiskTextureMutator),
            Box::new(DiskAudioMutator),
            Box::new(BundleTextureMutator),
            Box::new(BundleAudioMutator),
            Box::new(BundleMeshMutator),
            Box::new(BundleMaterialMutator),
            Box::new(BundlePrefabMutator),
        ];

        ReplacementOrchestrator {
            registry,
            cache: ByteCache::new(),
            scheduler: SceneLoadScheduler::new(options.settle_frames),
            options,
            mutators,
            state: RunState::NotRun,
        }
    }

    pub fn registry(&self) -> &ReplacementRegistry {
        &self.registry
    }

    /// Gives mutable access to the registry so that a reloaded manifest can register more
    /// replacements.
    pub fn registry_mut(&mut self) -> &mut ReplacementRegistry {
        &mut self.registry
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn cache(&self) -> &ByteCache {
        &self.cache
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs every enabled pass once and returns what happened. Failures for individual objects
    /// are reported in the diagnostics; this never fails as a whole.
    pub fn apply_all(
        &mut self,
        directory: &dyn ResourceDirectory,
        bundles: &dyn BundleOverrideSource,
    ) -> ApplyReport {
        let mut diagnostics = Diagnostics::new();

        let passes = {
            let mut cx = PassContext::new(
                &self.registry,
                &mut self.cache,
                bundles,
                &self.options,
                &mut diagnostics,
                ResourceEnumerator::new(directory, self.options.resident_sample_limit),
            );

            let options = &self.options;

            let passes = self
                .mutators
                .iter()
                .filter(|mutator| options.is_enabled(mutator.pass()))
                .map(|mutator| {
                    let pass = mutator.pass();

                    log::debug!("Running {} pass.", pass);

                    // Passes handle their own per-object failures, so this only catches bugs.
                    let replaced = guarded(|| Ok(mutator.run(&mut cx))).unwrap_or_else(|err| {
                        log::error!("{} pass failed: {:?}", pass, err);
                        0
                    });

                    (pass, replaced)
                })
                .collect_vec();

            cx.report_unmatched_registrations();

            passes
        };

        let replaced: usize = passes.iter().map(|(_, count)| count).sum();

        self.state = match self.state {
            RunState::NotRun => RunState::Run { runs: 1 },
            RunState::Run { runs } => RunState::Run { runs: runs + 1 },
        };

        log::info!(
            "Replaced {} object{} ({}).",
            replaced,
            if replaced == 1 { "" } else { "s" },
            passes
                .iter()
                .map(|(pass, count)| format!("{pass}: {count}"))
                .join(", ")
        );

        ApplyReport {
            replaced,
            passes,
            diagnostics: diagnostics.into_entries(),
        }
    }

    /// Tells the orchestrator that a scene has loaded. Replacements are applied by a later
    /// [`ReplacementOrchestrator::update`] once the settle period is over.
    pub fn scene_loaded(&mut self) {
        log::debug!(
            "Scene loaded; replacing in {} frame(s).",
            self.options.settle_frames
        );

        self.scheduler.scene_loaded();
    }

    /// Call once per frame. Returns a report on the frame that replacements were applied.
    pub fn update(
        &mut self,
        directory: &dyn ResourceDirectory,
        bundles: &dyn BundleOverrideSource,
    ) -> Option<ApplyReport> {
        if self.scheduler.tick() {
            Some(self.apply_all(directory, bundles))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bundle::NoBundles, directory::ResidentObjects};

    #[test]
    fn scheduler_waits_for_the_settle_period() {
        let mut scheduler = SceneLoadScheduler::new(2);
        assert!(!scheduler.tick());

        scheduler.scene_loaded();
        assert!(!scheduler.tick());
        assert!(!scheduler.tick());
        assert!(scheduler.tick());
        assert!(!scheduler.tick());
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn reloading_restarts_the_countdown() {
        let mut scheduler = SceneLoadScheduler::new(1);

        scheduler.scene_loaded();
        assert!(!scheduler.tick());

        scheduler.scene_loaded();
        assert!(!scheduler.tick());
        assert!(scheduler.tick());
    }

    #[test]
    fn an_empty_run_is_still_a_run() {
        let mut orchestrator =
            ReplacementOrchestrator::new(ReplacementRegistry::new(), Options::default());
        assert_eq!(orchestrator.state(), RunState::NotRun);

        let report = orchestrator.apply_all(&ResidentObjects::new(), &NoBundles);

        assert_eq!(report.replaced, 0);
        assert_eq!(report.passes.len(), 7);
        assert_eq!(orchestrator.state(), RunState::Run { runs: 1 });
    }

    #[test]
    fn disabled_passes_are_skipped() {
        let options = Options {
            disabled_passes: vec![Pass::DiskAudio, Pass::BundlePrefab],
            ..Options::default()
        };

        let mut orchestrator = ReplacementOrchestrator::new(ReplacementRegistry::new(), options);
        let report = orchestrator.apply_all(&ResidentObjects::new(), &NoBundles);

        let passes = report.passes.iter().map(|(pass, _)| *pass).collect_vec();
        assert_eq!(
            passes,
            [
                Pass::DiskTexture,
                Pass::BundleTexture,
                Pass::BundleAudio,
                Pass::BundleMesh,
                Pass::BundleMaterial,
            ]
        );
    }

    #[test]
    fn updates_apply_once_the_scene_settles() {
        let options = Options {
            settle_frames: 1,
            ..Options::default()
        };

        let mut orchestrator = ReplacementOrchestrator::new(ReplacementRegistry::new(), options);
        let resident = ResidentObjects::new();

        assert!(orchestrator.update(&resident, &NoBundles).is_none());

        orchestrator.scene_loaded();
        assert!(orchestrator.update(&resident, &NoBundles).is_none());
        assert!(orchestrator.update(&resident, &NoBundles).is_some());
        assert_eq!(orchestrator.state(), RunState::Run { runs: 1 });
    }
}
