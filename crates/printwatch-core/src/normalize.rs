// Pure conversions from raw backend numbers to display-ready values.
// Everything here is deterministic and side-effect free.

/// Progress fraction to a percentage, clamped to 0-100 and rounded to
/// one decimal. Firmware occasionally reports fractions above 1.0 at
/// the tail of a job; those clamp rather than overshoot.
pub fn progress_pct(progress: f64) -> f64 {
    (progress.clamp(0.0, 1.0) * 1000.0).round() / 10.0
}

/// Remaining seconds estimated from the average rate so far.
///
/// Needs both nonzero progress and nonzero elapsed time; a job that has
/// not produced either yet has no usable rate, so the estimate is 0.
pub fn eta_seconds(progress: f64, elapsed_s: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p > 0.0 && elapsed_s > 0.0 {
        elapsed_s * (1.0 / p - 1.0)
    } else {
        0.0
    }
}

/// Duration for humans: `"H:MM:SS h"` once hours are involved,
/// `"MM:SS min"` below that. Negative and non-finite inputs render as
/// zero.
pub fn fmt_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as i64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02} h")
    } else {
        format!("{minutes:02}:{secs:02} min")
    }
}

/// One-decimal rounding for temperature display.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
