//! Small descriptive statistics over plain `f64` slices.

/// Arithmetic mean of finite values; `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        return Some(sum / n);
    }
    // The running sum overflowed; average on a reduced scale instead.
    let scale = max_abs(values.iter().copied());
    Some(values.iter().map(|v| v / scale).sum::<f64>() / n * scale)
}

fn max_abs(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |m, v| m.max(v.abs()))
}

/// Sort a copy of `values` ascending.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Quantile `q` in [0, 1] of an ascending slice, interpolating linearly
/// between the two closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    let gap = b - a;
    if gap.is_finite() {
        Some(a + gap * frac)
    } else {
        Some(a * (1.0 - frac) + b * frac)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(values), 0.5)
}

/// Pearson correlation of paired samples.
///
/// `None` with fewer than two pairs or when either side is constant.
/// Each side is divided by its largest magnitude first, which leaves r
/// unchanged and keeps the squared deviations finite for any finite input.
/// The result is clamped to [-1, 1] to absorb rounding.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let (x0, y0) = *pairs.first()?;
    if pairs.len() < 2 || pairs.iter().all(|p| p.0 == x0) || pairs.iter().all(|p| p.1 == y0) {
        return None;
    }
    let scale_x = max_abs(pairs.iter().map(|p| p.0));
    let scale_y = max_abs(pairs.iter().map(|p| p.1));
    let scaled: Vec<(f64, f64)> = pairs
        .iter()
        .map(|&(x, y)| (x / scale_x, y / scale_y))
        .collect();

    let n = scaled.len() as f64;
    let mean_x = scaled.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = scaled.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &scaled {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_count_interpolates() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[5.0]), Some(5.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn quartiles_match_linear_interpolation() {
        let v = sorted(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(quantile_sorted(&v, 0.25), Some(2.0));
        assert_eq!(quantile_sorted(&v, 0.75), Some(4.0));
        let v = sorted(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(quantile_sorted(&v, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&[-f64::MAX, f64::MAX], 0.5), Some(0.0));
    }

    #[test]
    fn pearson_detects_perfect_relationships() {
        let up: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let down: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, -(i as f64))).collect();
        assert!((pearson(&up).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&down).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_is_undefined_without_variance() {
        assert_eq!(pearson(&[(1.0, 2.0), (1.0, 3.0)]), None);
        assert_eq!(pearson(&[(1.0, 2.0)]), None);
        assert_eq!(pearson(&[(0.1, 1.0), (0.1, 2.0), (0.1, 3.0)]), None);
    }

    #[test]
    fn pearson_stays_finite_for_huge_values() {
        let pairs = [(1e200, 1e200), (2e200, 3e200), (3e200, 2e200)];
        let r = pearson(&pairs).unwrap();
        assert!((r - 0.5).abs() < 1e-12, "r = {r}");

        let extremes = [(f64::MAX, -f64::MAX), (-f64::MAX, f64::MAX), (0.0, 1.0)];
        let r = pearson(&extremes).unwrap();
        assert!((r + 1.0).abs() < 1e-9, "r = {r}");
    }

    #[test]
    fn pearson_handles_tiny_values() {
        let pairs: Vec<(f64, f64)> = (1..5).map(|i| (i as f64 * 1e-300, i as f64 * 1e-300)).collect();
        assert!((pearson(&pairs).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_survives_overflowing_sums() {
        assert_eq!(mean(&[1e308, 1e308]), Some(1e308));
        assert_eq!(mean(&[f64::MAX, -f64::MAX]), Some(0.0));
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        assert_eq!(mean(&[]), None);
    }
}
