use keypace::metrics::moving_average;
use keypace::time_series::Sample;

/// Trailing window used to smooth the results chart
pub const SMOOTHING_WINDOW: usize = 3;

/// Compute X (seconds) and Y (WPM) bounds for the results chart
pub fn compute_chart_params(samples: &[Sample], nominal_secs: Option<f64>) -> (f64, f64) {
    let highest_wpm = samples.iter().map(|s| s.wpm).fold(0.0, f64::max);

    let overall_duration = match samples.last() {
        Some(last) => last.t,
        None => nominal_secs.unwrap_or(1.0),
    };

    (overall_duration.max(1.0), highest_wpm.round())
}

pub fn raw_points(samples: &[Sample]) -> Vec<(f64, f64)> {
    samples.iter().map(|&s| s.into()).collect()
}

pub fn smoothed_points(samples: &[Sample]) -> Vec<(f64, f64)> {
    raw_points(&moving_average(samples, SMOOTHING_WINDOW))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        let (x, y) = compute_chart_params(&[], Some(5.0));
        assert_eq!(x, 5.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_compute_chart_params_uses_last_sample_and_peak() {
        let samples = [
            Sample::new(1.0, 40.0, 0),
            Sample::new(2.0, 72.4, 1),
            Sample::new(3.0, 65.0, 0),
        ];
        assert_eq!(compute_chart_params(&samples, Some(30.0)), (3.0, 72.0));
    }

    #[test]
    fn test_smoothed_points_keep_length() {
        let samples: Vec<Sample> = (1..=5).map(|t| Sample::new(t as f64, 60.0, 0)).collect();
        let smoothed = smoothed_points(&samples);
        assert_eq!(smoothed.len(), 5);
        assert!(smoothed.iter().all(|&(_, wpm)| wpm == 60.0));
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
