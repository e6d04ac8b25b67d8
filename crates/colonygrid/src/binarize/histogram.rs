//! Global threshold selection on a 256-bin intensity histogram.
//!
//! Every function returns the level `t` such that foreground is `pixel > t`,
//! or `None` if the histogram does not admit a split.

use image::GrayImage;

pub type Histogram = [u64; 256];

const MINIMUM_MAX_SMOOTHING_ITERS: usize = 10_000;
const MIN_ERROR_MAX_ITERS: usize = 256;

pub fn gray_histogram(gray: &GrayImage) -> Histogram {
    let mut hist = [0u64; 256];
    for &v in gray.as_raw() {
        hist[v as usize] += 1;
    }
    hist
}

fn occupied_range(hist: &Histogram) -> Option<(usize, usize)> {
    let first = hist.iter().position(|&c| c > 0)?;
    let last = hist.iter().rposition(|&c| c > 0)?;
    Some((first, last))
}

/// Huang & Wang fuzzy-entropy threshold.
pub fn huang(hist: &Histogram) -> Option<u8> {
    let (first, last) = occupied_range(hist)?;
    if first == last {
        return None;
    }

    // Cumulative count and first moment.
    let mut s = vec![0.0f64; last + 1];
    let mut w = vec![0.0f64; last + 1];
    s[first] = hist[first] as f64;
    w[first] = first as f64 * hist[first] as f64;
    for i in (first + 1)..=last {
        s[i] = s[i - 1] + hist[i] as f64;
        w[i] = w[i - 1] + i as f64 * hist[i] as f64;
    }

    // Shannon entropy of the membership function, indexed by |i - mu|.
    let c = (last - first) as f64;
    let mut smu = vec![0.0f64; last + 1 - first];
    for (i, v) in smu.iter_mut().enumerate().skip(1) {
        let mu = 1.0 / (1.0 + i as f64 / c);
        *v = -mu * mu.ln() - (1.0 - mu) * (1.0 - mu).ln();
    }

    let mut best = first;
    let mut best_entropy = f64::MAX;
    for t in first..=last {
        let mut entropy = 0.0;
        let mu_back = (w[t] / s[t]).round() as i64;
        for i in first..=t {
            entropy += smu[(i as i64 - mu_back).unsigned_abs() as usize] * hist[i] as f64;
        }
        if t < last {
            let mu_obj = ((w[last] - w[t]) / (s[last] - s[t])).round() as i64;
            for i in (t + 1)..=last {
                entropy += smu[(i as i64 - mu_obj).unsigned_abs() as usize] * hist[i] as f64;
            }
        }
        if entropy < best_entropy {
            best_entropy = entropy;
            best = t;
        }
    }
    Some(best as u8)
}

fn is_bimodal(y: &[f64; 256]) -> bool {
    let mut modes = 0;
    for k in 1..255 {
        if y[k - 1] < y[k] && y[k + 1] < y[k] {
            modes += 1;
            if modes > 2 {
                return false;
            }
        }
    }
    modes == 2
}

/// Valley between the two peaks of an iteratively smoothed histogram.
pub fn minimum(hist: &Histogram) -> Option<u8> {
    let (_, max_bin) = occupied_range(hist)?;
    let mut y = [0.0f64; 256];
    for (dst, &c) in y.iter_mut().zip(hist.iter()) {
        *dst = c as f64;
    }

    let mut iters = 0;
    while !is_bimodal(&y) {
        let mut t = [0.0f64; 256];
        for i in 1..255 {
            t[i] = (y[i - 1] + y[i] + y[i + 1]) / 3.0;
        }
        t[0] = (y[0] + y[1]) / 3.0;
        t[255] = (y[254] + y[255]) / 3.0;
        y = t;
        iters += 1;
        if iters > MINIMUM_MAX_SMOOTHING_ITERS {
            return None;
        }
    }

    (1..max_bin)
        .find(|&i| y[i - 1] > y[i] && y[i + 1] >= y[i])
        .map(|i| i as u8)
}

/// Level whose cumulative share of pixels at or below it is closest to
/// `1 - foreground_fraction`.
pub fn percentile(hist: &Histogram, foreground_fraction: f64) -> Option<u8> {
    let total: u64 = hist.iter().sum();
    if total == 0 || !foreground_fraction.is_finite() {
        return None;
    }
    let target = 1.0 - foreground_fraction.clamp(0.0, 1.0);
    let mut best = None;
    let mut best_err = f64::MAX;
    let mut cum = 0u64;
    for (i, &c) in hist.iter().enumerate() {
        cum += c;
        let err = (cum as f64 / total as f64 - target).abs();
        if err < best_err {
            best_err = err;
            best = Some(i as u8);
        }
    }
    best
}

/// Shanbhag fuzzy-information threshold.
pub fn shanbhag(hist: &Histogram) -> Option<u8> {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return None;
    }
    let norm: Vec<f64> = hist.iter().map(|&c| c as f64 / total as f64).collect();
    let mut p1 = [0.0f64; 256];
    let mut p2 = [0.0f64; 256];
    p1[0] = norm[0];
    p2[0] = 1.0 - p1[0];
    for i in 1..256 {
        p1[i] = p1[i - 1] + norm[i];
        p2[i] = 1.0 - p1[i];
    }

    let first = (0..256).find(|&i| p1[i].abs() >= f64::EPSILON).unwrap_or(0);
    let last = (first..256)
        .rev()
        .find(|&i| p2[i].abs() >= f64::EPSILON)
        .unwrap_or(255);

    let mut best = None;
    let mut min_ent = f64::MAX;
    for t in first..=last {
        let term = 0.5 / p1[t];
        let mut ent_back = 0.0;
        for i in 1..=t {
            ent_back -= norm[i] * (1.0 - term * p1[i - 1]).ln();
        }
        ent_back *= term;

        let term = 0.5 / p2[t];
        let mut ent_obj = 0.0;
        for i in (t + 1)..256 {
            ent_obj -= norm[i] * (1.0 - term * p2[i]).ln();
        }
        ent_obj *= term;

        let total_ent = (ent_back - ent_obj).abs();
        if total_ent < min_ent {
            min_ent = total_ent;
            best = Some(t as u8);
        }
    }
    best
}

/// Iterative Kittler–Illingworth minimum-error threshold seeded at the mean.
pub fn min_error(hist: &Histogram) -> Option<u8> {
    let a = |j: usize| hist[..=j].iter().sum::<u64>() as f64;
    let b = |j: usize| {
        hist[..=j]
            .iter()
            .enumerate()
            .map(|(i, &c)| i as f64 * c as f64)
            .sum::<f64>()
    };
    let c = |j: usize| {
        hist[..=j]
            .iter()
            .enumerate()
            .map(|(i, &c)| (i * i) as f64 * c as f64)
            .sum::<f64>()
    };

    let total = a(255);
    if total == 0.0 {
        return None;
    }
    let mut threshold = (b(255) / total).floor() as usize;
    for _ in 0..MIN_ERROR_MAX_ITERS {
        let a_t = a(threshold);
        if a_t <= 0.0 || a_t >= total {
            return None;
        }
        let mu = b(threshold) / a_t;
        let nu = (b(255) - b(threshold)) / (total - a_t);
        let p = a_t / total;
        let q = (total - a_t) / total;
        let sigma2 = c(threshold) / a_t - mu * mu;
        let tau2 = (c(255) - c(threshold)) / (total - a_t) - nu * nu;
        if sigma2 <= 0.0 || tau2 <= 0.0 {
            return Some(threshold as u8);
        }

        let w0 = 1.0 / sigma2 - 1.0 / tau2;
        let w1 = mu / sigma2 - nu / tau2;
        let w2 = mu * mu / sigma2 - nu * nu / tau2 + ((sigma2 * q * q) / (tau2 * p * p)).log10();
        let sq = w1 * w1 - w0 * w2;
        if sq < 0.0 {
            return Some(threshold as u8);
        }
        let next = (w1 + sq.sqrt()) / w0;
        if !next.is_finite() {
            return Some(threshold as u8);
        }
        let next = next.floor().clamp(0.0, 254.0) as usize;
        if next == threshold {
            return Some(threshold as u8);
        }
        threshold = next;
    }
    None
}
