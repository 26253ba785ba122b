//! Curve data extracted from execution results.

use qcal_hal::ProgramResult;
use qcal_ir::Series;

/// Posterior mean and standard deviation of a binomial probability.
///
/// Uses the Jeffreys-style estimate `p = (k + ½)/(n + 1)` and
/// `σ² = p(1 − p)/(n + 2)`, so zero and full counts still get a finite
/// error bar.
pub fn binomial_estimate(k: u64, n: u64) -> (f64, f64) {
    let (k, n) = (k as f64, n as f64);
    let p = (k + 0.5) / (n + 1.0);
    let var = p * (1.0 - p) / (n + 2.0);
    (p, var.sqrt())
}

/// One point on a curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePoint {
    /// Independent variable.
    pub x: f64,
    /// Estimated outcome probability.
    pub y: f64,
    /// Standard error of `y`.
    pub sigma: f64,
    /// Shots behind the estimate.
    pub shots: u64,
    /// Series tag.
    pub series: Option<Series>,
    /// Repetition count.
    pub nrep: Option<u32>,
}

/// An ordered collection of curve points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveData {
    /// Points in result order.
    pub points: Vec<CurvePoint>,
}

impl CurveData {
    /// Probability of `outcome` for each program result.
    pub fn from_results(results: &[ProgramResult], outcome: &str) -> Self {
        let points = results
            .iter()
            .map(|r| {
                let (y, sigma) = binomial_estimate(r.counts.get(outcome), r.counts.total());
                CurvePoint {
                    x: r.metadata.xval,
                    y,
                    sigma,
                    shots: r.counts.total(),
                    series: r.metadata.series.clone(),
                    nrep: r.metadata.nrep,
                }
            })
            .collect();
        Self { points }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if there are no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points matching a predicate.
    pub fn filter(&self, pred: impl Fn(&CurvePoint) -> bool) -> Self {
        Self {
            points: self.points.iter().filter(|p| pred(p)).cloned().collect(),
        }
    }

    /// Everything except the SPAM reference points.
    pub fn main_series(&self) -> Self {
        self.filter(|p| !p.series.as_ref().is_some_and(Series::is_spam_cal))
    }

    /// Ground and excited SPAM references `(y0, y1)`, keyed by `xval` 0 and 1.
    pub fn spam_references(&self) -> Option<(f64, f64)> {
        let spam = self.filter(|p| p.series.as_ref().is_some_and(Series::is_spam_cal));
        let at = |x: f64| spam.points.iter().find(|p| p.x == x).map(|p| p.y);
        Some((at(0.0)?, at(1.0)?))
    }

    /// Rescale so the SPAM references map to 0 and 1.
    pub fn normalized(&self, y0: f64, y1: f64) -> Self {
        let span = y1 - y0;
        Self {
            points: self
                .points
                .iter()
                .map(|p| CurvePoint {
                    y: (p.y - y0) / span,
                    sigma: p.sigma / span.abs(),
                    ..p.clone()
                })
                .collect(),
        }
    }

    /// Average points sharing an `x` (and repetition count), sorted by `x`.
    ///
    /// The error bar is the larger of the propagated shot noise and the
    /// standard error of the spread between points.
    pub fn averaged(&self) -> Self {
        let mut groups: Vec<(f64, Option<u32>, Vec<&CurvePoint>)> = Vec::new();
        for p in &self.points {
            match groups.iter_mut().find(|(x, n, _)| *x == p.x && *n == p.nrep) {
                Some((_, _, members)) => members.push(p),
                None => groups.push((p.x, p.nrep, vec![p])),
            }
        }

        let mut points: Vec<CurvePoint> = groups
            .into_iter()
            .map(|(x, nrep, members)| {
                let n = members.len() as f64;
                let mean = members.iter().map(|p| p.y).sum::<f64>() / n;
                let shot_err = members.iter().map(|p| p.sigma * p.sigma).sum::<f64>().sqrt() / n;
                let spread_err = if members.len() > 1 {
                    let var =
                        members.iter().map(|p| (p.y - mean).powi(2)).sum::<f64>() / (n - 1.0);
                    (var / n).sqrt()
                } else {
                    0.0
                };
                CurvePoint {
                    x,
                    y: mean,
                    sigma: shot_err.max(spread_err),
                    shots: members.iter().map(|p| p.shots).sum(),
                    series: members[0].series.clone(),
                    nrep,
                }
            })
            .collect();
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { points }
    }

    /// Independent variables.
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    /// Dependent variables.
    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    /// Distinct repetition counts, ascending.
    pub fn reps(&self) -> Vec<u32> {
        let mut reps: Vec<u32> = self.points.iter().filter_map(|p| p.nrep).collect();
        reps.sort_unstable();
        reps.dedup();
        reps
    }

    /// Peak-to-peak range of `x`.
    pub fn x_range(&self) -> (f64, f64) {
        let min = self.points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max = self.points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qcal_hal::Counts;
    use qcal_ir::ProgramMetadata;

    fn result(x: f64, ones: u64, shots: u64, series: Option<Series>) -> ProgramResult {
        let mut metadata = ProgramMetadata::at(x);
        metadata.series = series;
        ProgramResult {
            name: format!("p{x}"),
            metadata,
            counts: Counts::from_pairs([("0", shots - ones), ("1", ones)]),
            shots: shots as u32,
        }
    }

    #[test]
    fn test_binomial_estimate() {
        let (p, s) = binomial_estimate(0, 1024);
        assert!((p - 0.5 / 1025.0).abs() < 1e-15);
        assert!(s > 0.0);
        let (p, _) = binomial_estimate(512, 1024);
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_spam_normalization() {
        let results = vec![
            result(0.0, 50, 1000, Some(Series::spam_cal())),
            result(1.0, 950, 1000, Some(Series::spam_cal())),
            result(0.0, 500, 1000, None),
        ];
        let data = CurveData::from_results(&results, "1");
        let (y0, y1) = data.spam_references().unwrap();
        let main = data.main_series();
        assert_eq!(main.len(), 1);
        let norm = main.normalized(y0, y1);
        assert!((norm.points[0].y - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_missing_spam() {
        let data = CurveData::from_results(&[result(0.0, 1, 10, None)], "1");
        assert!(data.spam_references().is_none());
    }

    #[test]
    fn test_averaged() {
        let results = vec![
            result(5.0, 900, 1000, None),
            result(1.0, 990, 1000, None),
            result(5.0, 800, 1000, None),
        ];
        let avg = CurveData::from_results(&results, "1").averaged();
        assert_eq!(avg.xs(), vec![1.0, 5.0]);
        assert!((avg.points[1].y - 0.85).abs() < 0.01);
        assert_eq!(avg.points[1].shots, 2000);
        // spread dominates the shot noise here
        assert!(avg.points[1].sigma > 0.04);
    }

    proptest! {
        #[test]
        fn prop_binomial_estimate_is_interior(n in 1u64..100_000, frac in 0.0f64..=1.0) {
            let k = (frac * n as f64).floor() as u64;
            let (p, sigma) = binomial_estimate(k, n);
            prop_assert!(p > 0.0 && p < 1.0);
            prop_assert!(sigma > 0.0 && sigma < 0.5);
        }
    }
}
