// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

// Fixed-point interpolation coefficients for the CPU resampler, tabulated
// once per process for each kernel size.

pub const INTER_BITS: usize = 5;
pub const INTER_TAB_SIZE: usize = 1 << INTER_BITS;

lazy_static::lazy_static! {
    pub static ref COEFFS_BILINEAR: Vec<f64> = interpolation_table(2);
    pub static ref COEFFS_BICUBIC:  Vec<f64> = interpolation_table(4);
    pub static ref COEFFS_LANCZOS4: Vec<f64> = interpolation_table(8);
}

fn interpolate_linear(x: f64, coeffs: &mut [f64]) {
    coeffs[0] = 1.0 - x;
    coeffs[1] = x;
}

fn interpolate_cubic(x: f64, coeffs: &mut [f64]) {
    const A: f64 = -0.75;

    coeffs[0] = ((A * (x + 1.0) - 5.0 * A) * (x + 1.0) + 8.0 * A) * (x + 1.0) - 4.0 * A;
    coeffs[1] = ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0;
    coeffs[2] = ((A + 2.0) * (1.0 - x) - (A + 3.0)) * (1.0 - x) * (1.0 - x) + 1.0;
    coeffs[3] = 1.0 - coeffs[0] - coeffs[1] - coeffs[2];
}

fn interpolate_lanczos4(x: f64, coeffs: &mut [f64]) {
    const FLT_EPSILON: f64 = 1.19209290E-07;
    const S45: f64 = 0.70710678118654752440084436210485;
    const CS: [[f64; 2]; 8] = [[1.0, 0.0], [-S45, -S45], [0.0, 1.0], [S45, -S45], [-1.0, 0.0], [S45, S45], [0.0, -1.0], [-S45, S45]];
    use std::f64::consts::FRAC_PI_4;

    if x < FLT_EPSILON {
        coeffs.fill(0.0);
        coeffs[3] = 1.0;
        return;
    }
    if 1.0 - x < FLT_EPSILON {
        coeffs.fill(0.0);
        coeffs[4] = 1.0;
        return;
    }

    let mut sum = 0.0;
    let y0 = -(x + 3.0) * FRAC_PI_4;
    let s0 = y0.sin();
    let c0 = y0.cos();
    for i in 0..8 {
        let y = -(x + 3.0 - i as f64) * FRAC_PI_4;
        coeffs[i] = (CS[i][0] * s0 + CS[i][1] * c0) / (y * y);
        sum += coeffs[i];
    }

    sum = 1.0 / sum;
    for i in 0..8 {
        coeffs[i] *= sum;
    }
}

/// `num_coeffs` rows of coefficients, one row per fractional step of
/// 1/INTER_TAB_SIZE pixel. The extra row at fraction 1.0 is what border
/// clamping resolves to, so saturated samples stay exact.
fn interpolation_table(num_coeffs: usize) -> Vec<f64> {
    const SCALE: f64 = 1.0 / INTER_TAB_SIZE as f64;

    let mut tab: Vec<f64> = vec![0.0; (INTER_TAB_SIZE + 1) * num_coeffs];
    for i in 0..=INTER_TAB_SIZE {
        let row = &mut tab[i * num_coeffs..(i + 1) * num_coeffs];
        match num_coeffs {
            2 => interpolate_linear(i as f64 * SCALE, row),
            4 => interpolate_cubic(i as f64 * SCALE, row),
            8 => interpolate_lanczos4(i as f64 * SCALE, row),
            _ => unreachable!("unsupported kernel size")
        }
    }
    tab
}
