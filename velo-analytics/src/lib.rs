pub mod mmp;
pub mod pmc;
pub mod tss;

pub use mmp::{best_window, power_curve, BestWindow, MmpPoint, DURATION_BUCKETS};
pub use pmc::{compute_pmc, ewma, PmcPoint, ATL_TAU, CTL_TAU};
pub use tss::{activity_tss, intensity_factor, normalized_power, tss_from_hr, tss_from_power};
