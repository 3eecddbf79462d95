// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use argh::FromArgs;
use dualfisheye_core::*;
use indicatif::{ ProgressBar, ProgressState, ProgressStyle };
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::export;

/** Dualfisheye
Stitch dual-fisheye captures into equirectangular panoramas
*/
#[derive(FromArgs)]
struct Opts {
    /// input files: dual-fisheye images, rig profiles (.json)
    #[argh(positional)]
    input: Vec<String>,

    /// output file; by default the input name with the suffix appended
    #[argh(option, short = 'o')]
    output: Option<String>,

    /// output name suffix, default: "_equirect"
    #[argh(option, short = 't')]
    suffix: Option<String>,

    /// rig profile: a .json path or inline json, eg. "{{ 'fov_deg': 195.0 }}"
    #[argh(option, short = 'l')]
    rig: Option<String>,

    /// output width relative to the source width, default: 1.0
    #[argh(option, short = 's', default = "1.0")]
    scale: f64,

    /// rotate the whole panorama horizontally, degrees
    #[argh(option, default = "0.0")]
    yaw: f64,

    /// feather falloff exponent, default: 1.0
    #[argh(option, default = "1.0")]
    gamma: f64,

    /// disable the feather blend in the lens overlap
    #[argh(switch)]
    no_blend: bool,

    /// interpolation: bilinear, bicubic or lanczos4, default: bilinear
    #[argh(option, short = 'i')]
    interpolation: Option<String>,

    /// rotate the finished panorama by 180 degrees before encoding
    #[argh(switch)]
    rotate180: bool,

    /// downscale the encoded output by this factor, eg. 2
    #[argh(option)]
    downscale: Option<u32>,

    /// overwrite if the output file exists, default: false
    #[argh(switch, short = 'f')]
    overwrite: bool,

    /// verbose log output
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// print app version
    #[argh(switch)]
    version: bool,
}

pub fn run() -> bool {
    let opts: Opts = argh::from_env();

    if opts.version {
        println!("Dualfisheye v{}", env!("CARGO_PKG_VERSION"));
        return true;
    }

    log::set_max_level(if opts.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info });

    let (images, rig_files): (Vec<&String>, Vec<&String>) = opts.input.iter().partition(|f| !f.ends_with(".json"));
    if images.is_empty() {
        log::error!("No input images!");
        return false;
    }
    if rig_files.len() > 1 {
        log::error!("More than one rig profile!");
        return false;
    }
    if opts.output.is_some() && images.len() > 1 {
        log::error!("--output can only be used with a single input image");
        return false;
    }
    for file in images.iter().chain(rig_files.iter()) {
        if !std::path::Path::new(file.as_str()).exists() {
            log::error!("File {} doesn't exist.", file);
            return false;
        }
    }

    let mgr = StitchManager::default();

    let rig_arg = opts.rig.clone().or_else(|| rig_files.first().map(|s| s.to_string()));
    if let Some(mut rig) = rig_arg {
        let result = if rig.starts_with('{') {
            rig = rig.replace('\'', "\"");
            RigProfile::from_json(&rig).map(|p| mgr.set_rig_profile(p))
        } else {
            mgr.load_rig_profile(&rig)
        };
        if let Err(e) = result {
            log::error!("Invalid rig profile: {}", e);
            return false;
        }
        log::info!("Rig profile: {}", mgr.rig.read().get_name());
    }

    mgr.set_scale(opts.scale);
    mgr.set_global_yaw(opts.yaw);
    mgr.set_blend(!opts.no_blend);
    mgr.set_blend_gamma(opts.gamma);
    if let Some(name) = &opts.interpolation {
        match Interpolation::from_name(name) {
            Some(i) => mgr.set_interpolation(i),
            None => {
                log::error!("Unknown interpolation {:?}, expected bilinear, bicubic or lanczos4", name);
                return false;
            }
        }
    }

    let suffix = opts.suffix.as_deref().unwrap_or("_equirect");

    let mut all_ok = true;
    for file in &images {
        let out_path = opts.output.clone().unwrap_or_else(|| default_output_path(file, suffix));
        if let Err(e) = process_file(&mgr, file, &out_path, &opts) {
            log::error!("{}: {}", file, e);
            all_ok = false;
        }
    }
    all_ok
}

fn process_file(mgr: &StitchManager, input: &str, output: &str, opts: &Opts) -> Result<(), StitchError> {
    if !opts.overwrite && std::path::Path::new(output).exists() {
        return Err(StitchError::IOError(std::io::Error::new(std::io::ErrorKind::AlreadyExists, format!("{} already exists, use -f to overwrite", output))));
    }

    let time = Instant::now();
    let source = export::load_source(input)?;

    let pb = ProgressBar::new(100);
    pb.set_style(ProgressStyle::with_template("[{bar:50.cyan/blue}] {pos:>3}% {eta:11} {msg}")
        .unwrap()
        .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| write!(w, "ETA {:.1}s", state.eta().as_secs_f64()).unwrap())
        .progress_chars("#>-"));
    pb.set_message(input.to_string());

    let panorama = mgr.stitch_with_progress(
        &source,
        |p| pb.set_position((p * 100.0).round() as u64),
        Arc::new(AtomicBool::new(false))
    )?;
    pb.finish_and_clear();

    export::save_panorama(&panorama, output, opts.rotate180, opts.downscale)?;
    log::info!("{} -> {} in {:.3}s", input, output, time.elapsed().as_millis() as f64 / 1000.0);
    Ok(())
}

fn default_output_path(input: &str, suffix: &str) -> String {
    let p = std::path::Path::new(input);
    let stem = p.file_stem().map(|x| x.to_string_lossy().to_string()).unwrap_or_else(|| "panorama".to_string());
    let ext = p.extension().map(|x| x.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
    let ext = match ext.as_str() {
        "jpg" | "jpeg" | "png" => ext,
        _ => "png".to_string()
    };
    p.with_file_name(format!("{}{}.{}", stem, suffix, ext)).to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_keeps_known_extensions() {
        assert_eq!(default_output_path("clip.jpg", "_equirect"), "clip_equirect.jpg");
        assert_eq!(default_output_path("shots/pano.PNG", "_equirect"), "shots/pano_equirect.png");
        assert_eq!(default_output_path("capture.insp", "_eq"), "capture_eq.png");
    }
}
