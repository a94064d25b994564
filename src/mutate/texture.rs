//! Texture passes: image files from disk and textures from bundles.

use std::collections::HashMap;
use std::rc::Rc;

use eyre::{ensure, eyre, Context, Result};
use image::RgbaImage;
use itertools::Itertools;

use super::{replace_by_name, BundleMutator, Mutator, PassContext};
use crate::{
    diagnostics::Diagnostic,
    guard::guarded,
    kind::{ObjectKind, ReplacementKind},
    matching::MatchTracker,
    object::{Handle, LiveObject, Texture, TextureFormat},
    orchestrator::Pass,
    registry::ReplacementEntry,
};

/// Replaces the pixel data of `target`. The texture's dimensions and format follow the new data.
fn overwrite(
    target: &Handle<Texture>,
    width: u32,
    height: u32,
    format: TextureFormat,
    pixels: &[u8],
) -> Result<()> {
    let mut texture = target.borrow_mut();

    ensure!(
        texture.readable,
        "texture '{}' is not readable, so its pixels can't be replaced",
        texture.name
    );

    texture.width = width;
    texture.height = height;
    texture.format = format;
    texture.pixels.clear();
    texture.pixels.extend_from_slice(pixels);

    Ok(())
}

/// Decodes an image file into 8-bit RGBA.
fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)
        .wrap_err("unsupported or corrupt image data")?
        .to_rgba8())
}

/// Loads texture files from disk and writes them over live textures.
pub struct DiskTextureMutator;

impl DiskTextureMutator {
    /// Reads and decodes the file for `entry`.
    fn load(cx: &mut PassContext<'_>, entry: &ReplacementEntry) -> Result<RgbaImage> {
        let bytes = cx.cache.read(&entry.disk_path)?;
        decode(&bytes).wrap_err_with(|| format!("while decoding {:?}", entry.disk_path))
    }
}

impl Mutator for DiskTextureMutator {
    fn pass(&self) -> Pass {
        Pass::DiskTexture
    }

    fn run(&self, cx: &mut PassContext<'_>) -> usize {
        let registry = cx.registry;
        let entries = registry.entries_of(ReplacementKind::Texture);

        if entries.is_empty() {
            return 0;
        }

        let live = cx.live(ObjectKind::Texture);
        let mut tracker = MatchTracker::new(entries.iter().map(|entry| entry.asset_name.as_str()));

        // Each file is decoded once per pass, however many textures it ends up replacing. Files
        // that fail to decode are remembered as `None` so the failure is only reported once.
        let mut decoded: HashMap<String, Option<Rc<RgbaImage>>> = HashMap::new();
        let mut replaced = 0;

        for target in &live {
            let name = target.name();

            let Some(entry) = registry
                .resolve(&name)
                .filter(|entry| entry.kind == ReplacementKind::Texture)
            else {
                continue;
            };

            let Some(texture) = target.as_texture() else {
                continue;
            };

            tracker.record(&entry.asset_name);

            let key = entry.asset_name.to_lowercase();

            let image = match decoded.get(&key) {
                Some(image) => image.clone(),

                None => {
                    let image = match DiskTextureMutator::load(cx, entry) {
                        Ok(image) => Some(Rc::new(image)),

                        Err(err) => {
                            cx.diagnostics.push(Diagnostic::DecodeFailure {
                                pass: Pass::DiskTexture,
                                name: entry.asset_name.clone(),
                                target: None,
                                reason: format!("{:#}", err),
                            });

                            None
                        }
                    };

                    decoded.insert(key, image.clone());
                    image
                }
            };

            let Some(image) = image else {
                continue;
            };

            let result = guarded(|| {
                overwrite(
                    texture,
                    image.width(),
                    image.height(),
                    TextureFormat::Rgba32,
                    image.as_raw(),
                )
            });

            match result {
                Ok(()) => {
                    replaced += 1;

                    cx.diagnostics.push(Diagnostic::Replaced {
                        pass: Pass::DiskTexture,
                        name,
                        target: target.id(),
                    });
                }

                Err(err) => cx.diagnostics.push(Diagnostic::DecodeFailure {
                    pass: Pass::DiskTexture,
                    name,
                    target: Some(target.id()),
                    reason: format!("{:#}", err),
                }),
            }
        }

        let names = live.iter().map(LiveObject::name).collect_vec();
        cx.report_unmatched(Pass::DiskTexture, &tracker, names.iter().map(String::as_str));

        replaced
    }
}

/// Copies the pixels of bundle textures over live textures.
pub struct BundleTextureMutator;

impl BundleMutator for BundleTextureMutator {
    fn pass(&self) -> Pass {
        Pass::BundleTexture
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Texture
    }

    fn apply(&self, source: &LiveObject, target: &LiveObject) -> Result<()> {
        let (Some(source), Some(target)) = (source.as_texture(), target.as_texture()) else {
            return Err(eyre!("bundle texture pass was given a non-texture"));
        };

        let source = source.borrow();

        ensure!(
            source.readable,
            "bundle texture '{}' is not readable",
            source.name
        );

        overwrite(
            target,
            source.width,
            source.height,
            source.format,
            &source.pixels,
        )
    }
}

impl Mutator for BundleTextureMutator {
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

    #[test]
    fn overwriting_changes_size_and_format() {
        let texture = Handle::new(Texture {
            format: TextureFormat::Dxt1,
            ..Texture::new("bg", 4, 4)
        });

        overwrite(&texture, 1, 2, TextureFormat::Rgba32, &[1; 8]).unwrap();

        let texture = texture.borrow();
        assert_eq!((texture.width, texture.height), (1, 2));
        assert_eq!(texture.format, TextureFormat::Rgba32);
        assert_eq!(texture.pixels, [1; 8]);
    }

    #[test]
    fn unreadable_textures_are_rejected() {
        let texture = Handle::new(Texture {
            readable: false,
            ..Texture::new("bg", 1, 1)
        });

        assert!(overwrite(&texture, 1, 1, TextureFormat::Rgba32, &[0; 4]).is_err());
        assert_eq!(texture.borrow().pixels, [0; 4]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode(b"definitely not a png").is_err());
    }

    #[test]
    fn bundle_textures_copy_pixels() {
        let source = Handle::new(Texture {
            pixels: vec![9; 16],
            ..Texture::new("bg", 2, 2)
        });

        let target = Handle::new(Texture::new("bg", 8, 8));

        BundleTextureMutator
            .apply(&source.clone().into(), &target.clone().into())
            .unwrap();

        assert_eq!(target.borrow().pixels, source.borrow().pixels);
        assert_eq!(target.borrow().width, 2);
    }
}
