use serde::{Deserialize, Serialize};

/// One per-second observation of a running session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// whole seconds elapsed since the session started
    pub t: f64,
    pub wpm: f64,
    /// incorrect + extra characters typed during this second
    pub errors: u32,
}

impl Sample {
    pub fn new(t: f64, wpm: f64, errors: u32) -> Self {
        Self { t, wpm, errors }
    }

    /// Characters the typist must have produced by `t` to be moving at `wpm`
    pub fn cumulative_chars(&self) -> f64 {
        self.wpm * self.t / 12.0
    }
}

impl From<(f64, f64)> for Sample {
    fn from(v: (f64, f64)) -> Self {
        Sample {
            t: v.0,
            wpm: v.1,
            errors: 0,
        }
    }
}

impl From<Sample> for (f64, f64) {
    fn from(s: Sample) -> Self {
        (s.t, s.wpm)
    }
}

/// Only one sample may be captured per whole second of elapsed time.
pub fn is_sample_due(elapsed_secs: f64, samples_taken: usize) -> bool {
    elapsed_secs.is_finite() && elapsed_secs.floor() > samples_taken as f64
}

/// WPM series extracted from a timeline, used for consistency and charts
pub fn wpm_series(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(|s| s.wpm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_chars_inverts_wpm_formula() {
        // 60 wpm for 10 seconds is 10 words, 50 characters
        assert_eq!(Sample::new(10.0, 60.0, 0).cumulative_chars(), 50.0);
        assert_eq!(Sample::new(0.0, 90.0, 0).cumulative_chars(), 0.0);
    }

    #[test]
    fn sample_due_once_per_whole_second() {
        assert!(!is_sample_due(0.4, 0));
        assert!(is_sample_due(1.0, 0));
        assert!(!is_sample_due(1.9, 1));
        assert!(is_sample_due(2.05, 1));
        assert!(!is_sample_due(f64::NAN, 0));
    }

    #[test]
    fn tuple_conversions() {
        let s: Sample = (3.0, 42.0).into();
        assert_eq!(s.errors, 0);
        let t: (f64, f64) = s.into();
        assert_eq!(t, (3.0, 42.0));
    }
}
