// src/pmc.rs
//
// Performance Management Chart: CTL / ATL / TSB over a contiguous daily
// TSS series.
//
//   y[0] = x[0]
//   y[t] = y[t-1] + (x[t] - y[t-1]) / tau
//
// CTL uses tau = 42 days (fitness), ATL tau = 7 days (fatigue), and
// TSB[t] = CTL[t-1] - ATL[t-1]: today's form is yesterday's fitness
// minus yesterday's fatigue.

use chrono::NaiveDate;
use serde::Serialize;

/// Chronic training load time constant, days.
pub const CTL_TAU: f64 = 42.0;

/// Acute training load time constant, days.
pub const ATL_TAU: f64 = 7.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PmcPoint {
    pub date: NaiveDate,
    pub tss: f64,
    pub ctl: f64,
    pub atl: f64,
    pub tsb: f64,
}

/// Exponentially weighted moving average with alpha = 1/tau, seeded on
/// the first sample.
pub fn ewma(series: &[f64], tau: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(series.len());
    let mut prev = None;

    for &x in series {
        let y = match prev {
            None => x,
            Some(p) => p + (x - p) / tau,
        };
        out.push(y);
        prev = Some(y);
    }

    out
}

/// Compute the PMC over a contiguous, ascending daily TSS series
/// (rest days must be present as 0.0 entries).
pub fn compute_pmc(daily_tss: &[(NaiveDate, f64)]) -> Vec<PmcPoint> {
    let tss: Vec<f64> = daily_tss.iter().map(|(_, t)| *t).collect();
    let ctl = ewma(&tss, CTL_TAU);
    let atl = ewma(&tss, ATL_TAU);

    daily_tss
        .iter()
        .enumerate()
        .map(|(i, &(date, tss))| {
            let tsb = if i == 0 { 0.0 } else { ctl[i - 1] - atl[i - 1] };
            PmcPoint {
                date,
                tss,
                ctl: ctl[i],
                atl: atl[i],
                tsb,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn ewma_is_seeded_on_first_sample() {
        let out = ewma(&[80.0, 0.0], 7.0);
        assert_eq!(out[0], 80.0);
    }

    #[test]
    fn ewma_follows_the_recursion() {
        let out = ewma(&[0.0, 70.0, 70.0], 7.0);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 10.0).abs() < 1e-9);
        assert!((out[2] - (10.0 + 60.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn ewma_of_constant_input_stays_constant() {
        let out = ewma(&[100.0; 50], 42.0);
        for y in out {
            assert!((y - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn ewma_converges_toward_constant_input() {
        let mut series = vec![0.0];
        series.extend(std::iter::repeat(100.0).take(500));
        let out = ewma(&series, 42.0);
        assert!((out.last().unwrap() - 100.0).abs() < 0.01);
    }

    #[test]
    fn pmc_output_matches_input_length() {
        let dates = days(90);
        let series: Vec<(NaiveDate, f64)> = dates.iter().map(|&d| (d, 50.0)).collect();
        let pmc = compute_pmc(&series);
        assert_eq!(pmc.len(), 90);
    }

    #[test]
    fn tsb_lags_one_day() {
        let dates = days(3);
        let series = vec![(dates[0], 100.0), (dates[1], 0.0), (dates[2], 0.0)];
        let pmc = compute_pmc(&series);

        assert_eq!(pmc[0].tsb, 0.0);
        // Day 1 TSB reads day 0: ctl[0] = atl[0] = 100 (seeded) -> 0.
        assert!((pmc[1].tsb - 0.0).abs() < 1e-9);
        // Day 2 reads day 1: ctl decays slower than atl, so form turns
        // positive after the rest day.
        let expected = pmc[1].ctl - pmc[1].atl;
        assert!((pmc[2].tsb - expected).abs() < 1e-9);
        assert!(pmc[2].tsb > 0.0);
    }

    #[test]
    fn rest_days_decay_fatigue_faster_than_fitness() {
        let dates = days(30);
        let mut series: Vec<(NaiveDate, f64)> = Vec::new();
        for (i, &d) in dates.iter().enumerate() {
            series.push((d, if i < 14 { 80.0 } else { 0.0 }));
        }
        let pmc = compute_pmc(&series);
        let last = pmc.last().unwrap();
        assert!(last.ctl > last.atl);
        assert!(last.tsb > 0.0);
    }
}
