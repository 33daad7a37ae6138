// src/mmp.rs
//
// Mean-maximal power: best average power sustained for a fixed duration
// across a ride, computed over every contiguous window via prefix sums.
// Samples are assumed 1 Hz; missing watt samples count as 0 W (coasting).

use serde::Serialize;

/// Duration buckets (seconds) tracked for the power curve and PRs.
pub const DURATION_BUCKETS: [u32; 8] = [5, 15, 30, 60, 300, 600, 1200, 3600];

/// The best window of a fixed length within one ride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestWindow {
    /// Sample index where the window starts.
    pub start: usize,
    /// Window length in samples.
    pub len: usize,
    /// Mean power over the window, watts.
    pub avg_power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MmpPoint {
    pub duration_s: u32,
    pub best: BestWindow,
}

/// Best average over every contiguous window of exactly `window`
/// samples. None when the ride is shorter than the window. On ties the
/// earliest window wins.
pub fn best_window(watts: &[f64], window: usize) -> Option<BestWindow> {
    if window == 0 || watts.len() < window {
        return None;
    }

    let mut sum: f64 = watts[..window].iter().sum();
    let mut best_sum = sum;
    let mut best_start = 0usize;

    for start in 1..=(watts.len() - window) {
        sum += watts[start + window - 1] - watts[start - 1];
        if sum > best_sum {
            best_sum = sum;
            best_start = start;
        }
    }

    Some(BestWindow {
        start: best_start,
        len: window,
        avg_power: best_sum / window as f64,
    })
}

/// The ride's power curve over the standard buckets, skipping buckets
/// longer than the ride.
pub fn power_curve(watts: &[f64]) -> Vec<MmpPoint> {
    DURATION_BUCKETS
        .iter()
        .filter_map(|&duration_s| {
            best_window(watts, duration_s as usize).map(|best| MmpPoint { duration_s, best })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_known_surge() {
        // 60 s easy, 10 s at 500 W, 60 s easy.
        let mut watts = vec![100.0; 60];
        watts.extend(vec![500.0; 10]);
        watts.extend(vec![100.0; 60]);

        let best = best_window(&watts, 5).unwrap();
        assert_eq!(best.avg_power, 500.0);
        assert!(best.start >= 60 && best.start + 5 <= 70);
    }

    #[test]
    fn matches_naive_scan() {
        // Pseudo-random-ish series; prefix-sum result must agree with
        // the O(n^2) definition.
        let watts: Vec<f64> = (0..400)
            .map(|i| ((i * 37 + 11) % 350) as f64)
            .collect();

        for window in [5usize, 30, 60] {
            let fast = best_window(&watts, window).unwrap();
            let naive = (0..=watts.len() - window)
                .map(|s| watts[s..s + window].iter().sum::<f64>() / window as f64)
                .fold(f64::MIN, f64::max);
            assert!((fast.avg_power - naive).abs() < 1e-9);
        }
    }

    #[test]
    fn tie_keeps_the_earliest_window() {
        let watts = vec![200.0; 120];
        let best = best_window(&watts, 60).unwrap();
        assert_eq!(best.start, 0);
    }

    #[test]
    fn ride_shorter_than_window_is_none() {
        let watts = vec![250.0; 299];
        assert!(best_window(&watts, 300).is_none());
        assert!(best_window(&watts, 0).is_none());
    }

    #[test]
    fn power_curve_skips_long_buckets() {
        let watts = vec![250.0; 90];
        let curve = power_curve(&watts);
        let durations: Vec<u32> = curve.iter().map(|p| p.duration_s).collect();
        assert_eq!(durations, vec![5, 15, 30, 60]);
        for point in curve {
            assert_eq!(point.best.avg_power, 250.0);
        }
    }
}
