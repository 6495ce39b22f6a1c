//! Pure conversions from raw typing counters to display metrics.
//!
//! Everything here is stateless. Degenerate inputs (nothing typed yet, no
//! elapsed time, too few samples) map to defined fallback values instead of
//! errors because they are ordinary states at the start of a session.

use crate::time_series::Sample;

/// Characters per word used by every WPM figure
pub const CHARS_PER_WORD: f64 = 5.0;

pub fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

/// Unrounded words per minute for `chars` typed over `elapsed_secs`.
pub fn wpm_exact(chars: usize, elapsed_secs: f64) -> f64 {
    if elapsed_secs.is_nan() || elapsed_secs <= 0.0 {
        return 0.0;
    }
    (chars as f64 / CHARS_PER_WORD) / (elapsed_secs / 60.0)
}

/// Net WPM from correctly typed characters
pub fn calculate_wpm(correct_chars: usize, elapsed_secs: f64) -> u32 {
    wpm_exact(correct_chars, elapsed_secs).round() as u32
}

/// Gross WPM from every typed character, mistakes included
pub fn calculate_raw_wpm(total_chars: usize, elapsed_secs: f64) -> u32 {
    wpm_exact(total_chars, elapsed_secs).round() as u32
}

pub fn calculate_accuracy(correct: usize, incorrect: usize, extra: usize) -> u32 {
    let total = correct + incorrect + extra;
    if total == 0 {
        return 100;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

/// `100 - coefficient of variation`, clamped to `[0, 100]`.
///
/// Fewer than two samples carry no variation and count as perfectly
/// consistent. A flat series is 100 even when every sample is zero.
pub fn calculate_consistency(wpm_samples: &[f64]) -> u32 {
    if wpm_samples.len() < 2 {
        return 100;
    }
    let (Some(avg), Some(spread)) = (mean(wpm_samples), std_dev(wpm_samples)) else {
        return 100;
    };
    if spread == 0.0 {
        return 100;
    }
    if avg <= 0.0 {
        return 0;
    }
    (100.0 - (spread / avg) * 100.0).clamp(0.0, 100.0).round() as u32
}

/// Trailing moving average over the WPM of each sample.
///
/// The first entries average over however many samples exist so far. A
/// series shorter than the window is handed back untouched.
pub fn moving_average(samples: &[Sample], window_size: usize) -> Vec<Sample> {
    if window_size == 0 || samples.len() < window_size {
        return samples.to_vec();
    }

    samples
        .iter()
        .enumerate()
        .map(|(idx, sample)| {
            let from = (idx + 1).saturating_sub(window_size);
            let window = &samples[from..=idx];
            let avg = window.iter().map(|s| s.wpm).sum::<f64>() / window.len() as f64;
            Sample { wpm: avg, ..*sample }
        })
        .collect()
}
