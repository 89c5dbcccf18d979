//! Thresholding utilities: Otsu for decoding, local-mean for segmentation.

use rig_fusion_core::GrayImageView;

/// Otsu's threshold over `samples`, as an exclusive upper bound for "black":
/// a sample is dark when `v < threshold`.
///
/// Empty input gives 127 and constant input gives that constant. With only
/// two distinct levels the (rounded-up) midpoint is returned.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let Some((&lo, &hi)) = samples.iter().min().zip(samples.iter().max()) else {
        return 127;
    };
    if lo == hi {
        return lo;
    }

    let hist = samples.iter().fold([0u32; 256], |mut hist, &v| {
        hist[v as usize] += 1;
        hist
    });
    if hist.iter().filter(|&&count| count > 0).count() == 2 {
        return (lo as u16 + hi as u16).div_ceil(2) as u8;
    }

    let n = samples.len() as f64;
    let mass: f64 = hist
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    // Dark class is `<= t`; keep the first t with the largest between-class
    // variance.
    let (mut dark_n, mut dark_mass) = (0f64, 0f64);
    let mut best: Option<(f64, usize)> = None;
    for (t, &count) in hist.iter().enumerate().take(hi as usize) {
        dark_n += count as f64;
        dark_mass += t as f64 * count as f64;
        if dark_n == 0.0 {
            continue;
        }
        let light_n = n - dark_n;
        let spread = dark_mass / dark_n - (mass - dark_mass) / light_n;
        let variance = dark_n * light_n * spread * spread;
        if best.is_none_or(|(v, _)| variance > v) {
            best = Some((variance, t));
        }
    }

    best.map_or(127, |(_, t)| (t + 1) as u8)
}

/// Binary mask of "dark" pixels: `v < mean(window) - constant`.
///
/// The window is a `(2r+1)²` box clipped at the image border; the local mean
/// comes from a summed-area table so the cost is independent of `r`.
pub(crate) fn adaptive_threshold_mask(
    img: &GrayImageView<'_>,
    window_radius: usize,
    constant: f32,
) -> Vec<bool> {
    let (w, h) = (img.width, img.height);
    let mut mask = vec![false; w * h];
    if w == 0 || h == 0 {
        return mask;
    }

    // integral[(y+1)*(w+1) + (x+1)] = sum of img[0..=y, 0..=x]
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row = 0u64;
        for x in 0..w {
            row += img.data[y * w + x] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row;
        }
    }

    let r = window_radius;
    for y in 0..h {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(r);
            let x1 = (x + r + 1).min(w);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let area = ((y1 - y0) * (x1 - x0)) as f32;
            let mean = sum as f32 / area;
            mask[y * w + x] = (img.data[y * w + x] as f32) < mean - constant;
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_two_level_samples() {
        let samples = [10u8, 10, 10, 240, 240];
        let t = otsu_threshold_from_samples(&samples);
        assert!(10 < t && t <= 240);
        assert_eq!(otsu_threshold_from_samples(&[]), 127);
        assert_eq!(otsu_threshold_from_samples(&[42, 42]), 42);
    }

    #[test]
    fn otsu_separates_noisy_classes() {
        let mut samples = Vec::new();
        for v in [20u8, 25, 30, 35] {
            samples.extend(std::iter::repeat_n(v, 10));
        }
        for v in [200u8, 210, 220] {
            samples.extend(std::iter::repeat_n(v, 10));
        }
        let t = otsu_threshold_from_samples(&samples);
        assert!(samples.iter().filter(|&&v| v < t).count() == 40);
    }

    #[test]
    fn adaptive_mask_marks_dark_square_on_white() {
        let (w, h) = (40usize, 40usize);
        let mut data = vec![255u8; w * h];
        for y in 15..25 {
            for x in 15..25 {
                data[y * w + x] = 0;
            }
        }
        let view = GrayImageView {
            width: w,
            height: h,
            data: &data,
        };
        let mask = adaptive_threshold_mask(&view, 5, 10.0);
        assert!(mask[20 * w + 20]);
        assert!(mask[15 * w + 15]);
        assert!(!mask[5 * w + 5]);
        assert!(!mask[20 * w + 30]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 100);
    }
}
