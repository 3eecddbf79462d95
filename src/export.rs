// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

// Image decode/encode boundary. The core only sees `PixelBuffer`s; file
// formats, the optional 180° flip and the export downscale all live here.

use dualfisheye_core::{ PixelBuffer, StitchError };
use image::imageops;

pub fn load_source(path: &str) -> Result<PixelBuffer, StitchError> {
    let img = image::open(path).map_err(img_err)?.to_rgba8();
    let (w, h) = img.dimensions();
    log::debug!("Loaded {} ({}x{})", path, w, h);
    PixelBuffer::from_raw(w as usize, h as usize, img.into_raw())
}

pub fn save_panorama(pano: &PixelBuffer, path: &str, rotate180: bool, downscale: Option<u32>) -> Result<(), StitchError> {
    let mut img = image::RgbaImage::from_raw(pano.width as u32, pano.height as u32, pano.data.clone())
        .ok_or_else(|| StitchError::BufferSize { expected: pano.width * pano.height * 4, got: pano.data.len() })?;

    if rotate180 {
        img = imageops::rotate180(&img);
    }
    if let Some(f) = downscale.filter(|f| *f > 1) {
        let (w, h) = img.dimensions();
        img = imageops::resize(&img, (w / f).max(2), (h / f).max(1), imageops::FilterType::Lanczos3);
    }

    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        // JPEG carries no alpha; the panorama is fully opaque so dropping
        // the channel is the same as flattening onto a background
        image::DynamicImage::ImageRgba8(img).to_rgb8().save(path).map_err(img_err)?;
    } else {
        img.save(path).map_err(img_err)?;
    }
    log::debug!("Saved {}", path);
    Ok(())
}

fn img_err(e: image::ImageError) -> StitchError {
    StitchError::IOError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
