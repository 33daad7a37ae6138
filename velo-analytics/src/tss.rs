// src/tss.rs
//
// Per-ride training stress.
//
// ─ Formulas ─────────────────────────────────────────────────────────────────
//
//   NP  = ( mean( rolling_mean_30s(watts)^4 ) )^(1/4)
//   IF  = NP / FTP
//   TSS = (duration_s * NP * IF) / (FTP * 3600) * 100
//
//   One hour ridden exactly at FTP scores 100.0 by construction.
//
//   HR fallback (no power recorded):
//   TSS_hr = (duration_s / 3600) * (avg_hr / LTHR)^2 * 100
//
// ────────────────────────────────────────────────────────────────────────────

/// Window for the NP rolling average, samples at 1 Hz.
const NP_WINDOW: usize = 30;

/// Normalized power over a 1 Hz watt series.
///
/// Rides shorter than the 30 s window fall back to the plain average.
/// Returns None for an empty series.
pub fn normalized_power(watts: &[f64]) -> Option<f64> {
    if watts.is_empty() {
        return None;
    }

    if watts.len() < NP_WINDOW {
        let avg = watts.iter().sum::<f64>() / watts.len() as f64;
        return Some(avg);
    }

    // Rolling 30-sample mean via a running sum, each mean taken to the
    // 4th power, averaged, then the 4th root.
    let mut window_sum: f64 = watts[..NP_WINDOW].iter().sum();
    let mut quartic_sum = (window_sum / NP_WINDOW as f64).powi(4);
    let mut count = 1usize;

    for i in NP_WINDOW..watts.len() {
        window_sum += watts[i] - watts[i - NP_WINDOW];
        quartic_sum += (window_sum / NP_WINDOW as f64).powi(4);
        count += 1;
    }

    Some((quartic_sum / count as f64).powf(0.25))
}

/// IF = NP / FTP. None when FTP is not positive.
pub fn intensity_factor(np: f64, ftp: f64) -> Option<f64> {
    if ftp <= 0.0 {
        return None;
    }
    Some(np / ftp)
}

/// Power-based TSS.
pub fn tss_from_power(duration_s: f64, np: f64, ftp: f64) -> Option<f64> {
    if duration_s <= 0.0 {
        return None;
    }
    let intensity = intensity_factor(np, ftp)?;
    Some((duration_s * np * intensity) / (ftp * 3600.0) * 100.0)
}

/// HR-based TSS estimate for rides without power.
pub fn tss_from_hr(duration_s: f64, avg_hr: f64, lthr: f64) -> Option<f64> {
    if duration_s <= 0.0 || avg_hr <= 0.0 || lthr <= 0.0 {
        return None;
    }
    let ratio = avg_hr / lthr;
    Some((duration_s / 3600.0) * ratio * ratio * 100.0)
}

/// TSS for one activity, given whatever data the ride recorded.
///
/// Preference order: watt stream (NP-based), then average power
/// (NP := avg), then average HR. Returns (tss, np).
pub fn activity_tss(
    duration_s: f64,
    watts: Option<&[f64]>,
    avg_power: Option<f64>,
    avg_hr: Option<f64>,
    ftp: f64,
    lthr: f64,
) -> (Option<f64>, Option<f64>) {
    if let Some(np) = watts.and_then(normalized_power) {
        return (tss_from_power(duration_s, np, ftp), Some(np));
    }

    if let Some(avg) = avg_power {
        return (tss_from_power(duration_s, avg, ftp), Some(avg));
    }

    if let Some(hr) = avg_hr {
        return (tss_from_hr(duration_s, hr, lthr), None);
    }

    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn np_of_constant_power_is_that_power() {
        let watts = vec![250.0; 3600];
        let np = normalized_power(&watts).unwrap();
        assert!((np - 250.0).abs() < 1e-9);
    }

    #[test]
    fn np_is_at_least_average_power() {
        // Alternating surges: NP must exceed the plain average.
        let watts: Vec<f64> = (0..600)
            .map(|i| if (i / 60) % 2 == 0 { 400.0 } else { 100.0 })
            .collect();
        let avg = watts.iter().sum::<f64>() / watts.len() as f64;
        let np = normalized_power(&watts).unwrap();
        assert!(np > avg);
    }

    #[test]
    fn np_short_ride_uses_plain_average() {
        let watts = vec![100.0, 200.0, 300.0];
        assert_eq!(normalized_power(&watts), Some(200.0));
    }

    #[test]
    fn np_empty_is_none() {
        assert_eq!(normalized_power(&[]), None);
    }

    #[test]
    fn one_hour_at_ftp_is_exactly_100() {
        let tss = tss_from_power(3600.0, 250.0, 250.0).unwrap();
        assert!((tss - 100.0).abs() < 1e-9);
    }

    #[test]
    fn half_hour_at_ftp_is_50() {
        let tss = tss_from_power(1800.0, 250.0, 250.0).unwrap();
        assert!((tss - 50.0).abs() < 1e-9);
    }

    #[test]
    fn tss_rejects_bad_inputs() {
        assert_eq!(tss_from_power(0.0, 250.0, 250.0), None);
        assert_eq!(tss_from_power(3600.0, 250.0, 0.0), None);
        assert_eq!(tss_from_hr(3600.0, 150.0, 0.0), None);
    }

    #[test]
    fn hr_fallback_at_threshold_is_100_per_hour() {
        let tss = tss_from_hr(3600.0, 170.0, 170.0).unwrap();
        assert!((tss - 100.0).abs() < 1e-9);
    }

    #[test]
    fn activity_tss_prefers_stream_over_averages() {
        let watts = vec![250.0; 3600];
        let (tss, np) = activity_tss(3600.0, Some(&watts), Some(180.0), Some(150.0), 250.0, 170.0);
        assert!((tss.unwrap() - 100.0).abs() < 1e-9);
        assert!((np.unwrap() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn activity_tss_falls_back_to_hr_without_power() {
        let (tss, np) = activity_tss(3600.0, None, None, Some(170.0), 250.0, 170.0);
        assert!((tss.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(np, None);
    }

    #[test]
    fn activity_tss_none_without_any_signal() {
        assert_eq!(activity_tss(3600.0, None, None, None, 250.0, 170.0), (None, None));
    }
}
