//! Audio clip passes.

use eyre::{ensure, eyre, Result};

use super::{replace_by_name, BundleMutator, Mutator, PassContext};
use crate::{
    diagnostics::Diagnostic,
    kind::{ObjectKind, ReplacementKind},
    object::{AudioClip, Handle, LiveObject},
    orchestrator::Pass,
};

/// Audio files on disk aren't decoded yet. This pass only tells the user which of their
/// replacements are being ignored.
// todo: Decode WAV/OGG/MP3 files once there's a decoder we can ship on every platform.
pub struct DiskAudioMutator;

impl Mutator for DiskAudioMutator {
    fn pass(&self) -> Pass {
        Pass::DiskAudio
    }

    fn run(&self, cx: &mut PassContext<'_>) -> usize {
        for entry in cx.registry.entries_of(ReplacementKind::Audio) {
            cx.diagnostics.push(Diagnostic::Unsupported {
                pass: Pass::DiskAudio,
                name: entry.asset_name.clone(),
                reason: format!(
                    "audio files can't be loaded from disk yet; {:?} will be ignored unless the \
                    clip is also provided by a bundle",
                    entry.disk_path
                ),
            });
        }

        0
    }
}

/// Copies the samples of `source` into `target`, keeping `target`'s identity and channel layout.
fn copy_samples(source: &AudioClip, target: &Handle<AudioClip>) -> Result<()> {
    ensure!(source.readable, "bundle clip '{}' is not loaded", source.name);

    let mut target = target.borrow_mut();

    ensure!(
        target.readable,
        "clip '{}' streams from disk and can't be written to",
        target.name
    );

    ensure!(
        source.channels == target.channels,
        "clip '{}' has {} channel(s) but its replacement has {}",
        target.name,
        target.channels,
        source.channels
    );

    target.frequency = source.frequency;
    target.samples.clear();
    target.samples.extend_from_slice(&source.samples);

    Ok(())
}

/// Copies already-decoded bundle clips over live clips.
pub struct BundleAudioMutator;

impl BundleMutator for BundleAudioMutator {
    fn pass(&self) -> Pass {
        Pass::BundleAudio
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::AudioClip
    }

    fn apply(&self, source: &LiveObject, target: &LiveObject) -> Result<()> {
        let (Some(source), Some(target)) = (source.as_audio(), target.as_audio()) else {
            return Err(eyre!("bundle audio pass was given a non-clip"));
        };

        copy_samples(&source.borrow(), target)
    }
}

impl Mutator for BundleAudioMutator {
    fn pass(&self) -> Pass {
        BundleMutator::pass(self)
    }

    fn run(&self, cx: &mut PassContext<'_>) -> usize {
        replace_by_name(self, cx)
    }
}
