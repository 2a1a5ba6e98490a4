use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageFilterMode, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::engine::background::subtraction::MaskedImages;

/// Nearest sampling; the expansion stage reads these texel by texel.
fn nearest_sampler() -> ImageSampler {
    ImageSampler::Descriptor(ImageSamplerDescriptor {
        mag_filter: ImageFilterMode::Nearest,
        min_filter: ImageFilterMode::Nearest,
        ..default()
    })
}

/// Create the masked depth (`R32Float`, normalised) and colour (`Rgba8Unorm`)
/// images at sensor resolution. Both start fully transparent and at the far
/// plane so nothing is drawn before the first frame arrives.
pub fn create_masked_images(width: u32, height: u32, images: &mut Assets<Image>) -> MaskedImages {
    let size = Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let mut depth = Image::new_fill(
        size,
        TextureDimension::D2,
        &1.0f32.to_le_bytes(),
        TextureFormat::R32Float,
        RenderAssetUsages::default(),
    );
    depth.sampler = nearest_sampler();

    let mut colour = Image::new_fill(
        size,
        TextureDimension::D2,
        &[0, 0, 0, 0],
        TextureFormat::Rgba8Unorm,
        RenderAssetUsages::default(),
    );
    colour.sampler = nearest_sampler();

    println!("✓ Masked depth and colour images created ({width}x{height})");
    MaskedImages {
        depth: images.add(depth),
        colour: images.add(colour),
        width,
        height,
    }
}
