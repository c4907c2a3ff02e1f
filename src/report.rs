//! The single CSV summary line a successful run prints.
//!
//! Columns: `variant,threads,n,block_size,mean_time_seconds,gflops,relative_error`.

use std::fmt;

use crate::bench::BenchReport;

/// Formats `x` like C's `%.{digits}e`: the exponent always carries a sign
/// and at least two digits (`1.234e-05`, `0.000e+00`).
pub fn sci(x: f64, digits: usize) -> String {
    if !x.is_finite() {
        return format!("{x}");
    }
    let s = format!("{x:.digits$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, magnitude) = match exp.strip_prefix('-') {
                Some(m) => ('-', m),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{magnitude:0>2}")
        }
        None => s,
    }
}

/// Renders `report` as one CSV record (no trailing newline).
pub fn csv_line(report: &BenchReport) -> String {
    format!(
        "{},{},{},{},{:.6},{:.6},{}",
        report.variant,
        report.threads,
        report.n,
        report.block_size,
        report.mean_seconds,
        report.gflops,
        sci(report.relative_error, 3)
    )
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&csv_line(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::TimingStats;
    use crate::matmul::Variant;

    #[test]
    fn test_sci_matches_printf() {
        assert_eq!(sci(0.0, 3), "0.000e+00");
        assert_eq!(sci(1.0, 3), "1.000e+00");
        assert_eq!(sci(12345.678, 3), "1.235e+04");
        assert_eq!(sci(1.5e-17, 3), "1.500e-17");
        assert_eq!(sci(2.0e-5, 3), "2.000e-05");
        assert_eq!(sci(-3.25e120, 2), "-3.25e+120");
    }

    #[test]
    fn test_sci_non_finite() {
        assert_eq!(sci(f64::NAN, 3), "NaN");
        assert_eq!(sci(f64::INFINITY, 3), "inf");
    }

    #[test]
    fn test_csv_line() {
        let report = BenchReport {
            variant: Variant::Blocked,
            threads: 8,
            n: 128,
            block_size: 32,
            timings: TimingStats::default(),
            mean_seconds: 0.0123456789,
            best_seconds: 0.01,
            gflops: 0.339749,
            relative_error: 1.2346e-16,
        };
        assert_eq!(
            csv_line(&report),
            "blocked,8,128,32,0.012346,0.339749,1.235e-16"
        );
        assert_eq!(report.to_string(), csv_line(&report));
        assert_eq!(csv_line(&report).split(',').count(), 7);
    }
}
