//! Descriptive statistics and the Pearson correlation test.
//!
//! The conventions follow the usual data-analysis defaults: sample standard
//! deviation (n - 1), quantiles by linear interpolation between closest ranks,
//! two-tailed p-value from the Student t distribution.

/// Descriptive statistics of a numeric series. Values are not rounded.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Undefined for a single value.
    pub std_dev: Option<f64>,
    pub p25: f64,
    pub p75: f64,
    pub min: f64,
    pub max: f64,
}

impl NumericSummary {
    /// Returns None when there is no value to summarize. NaN values are ignored.
    pub fn compute(values: &[f64]) -> Option<NumericSummary> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let ss: f64 = sorted.iter().map(|x| (x - mean) * (x - mean)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        } else {
            None
        };
        Some(NumericSummary {
            count: n,
            mean,
            median: quantile(&sorted, 0.5),
            std_dev,
            p25: quantile(&sorted, 0.25),
            p75: quantile(&sorted, 0.75),
            min: sorted[0],
            max: sorted[n - 1],
        })
    }

    /// A copy for display. Further computations should use the unrounded values.
    pub fn rounded(&self, decimals: u32) -> NumericSummary {
        NumericSummary {
            count: self.count,
            mean: round_to(self.mean, decimals),
            median: round_to(self.median, decimals),
            std_dev: self.std_dev.map(|s| round_to(s, decimals)),
            p25: round_to(self.p25, decimals),
            p75: round_to(self.p75, decimals),
            min: round_to(self.min, decimals),
            max: round_to(self.max, decimals),
        }
    }
}

/// Quantile of an already sorted, non-empty series, by linear interpolation.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn round_to(x: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (x * factor).round() / factor
}

/// Time-based rolling mean of a series ordered by increasing time.
///
/// The mean at a point covers the points of the half-open interval
/// `(at - window, at]` up to and including this point, so a point never sees
/// the ones that come after it, even at the same time.
pub fn rolling_mean(points: &[(i64, f64)], window: i64) -> Vec<f64> {
    let mut res = Vec::with_capacity(points.len());
    let mut start = 0;
    let mut sum = 0.0;
    for (i, (at, value)) in points.iter().enumerate() {
        sum += value;
        while points[start].0 <= at - window {
            sum -= points[start].1;
            start += 1;
        }
        res.push(sum / (i + 1 - start) as f64);
    }
    res
}

/// The outcome of a Pearson test on paired samples.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Correlation {
    Defined {
        coefficient: f64,
        p_value: f64,
        sample_size: usize,
    },
    /// One of the series is constant: the coefficient does not exist.
    Undefined { sample_size: usize },
}

/// Pearson correlation coefficient between two series of the same length,
/// with the two-tailed p-value of the hypothesis of no correlation.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Correlation {
    let n = xs.len().min(ys.len());
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if n < 2 || is_constant(xs) || is_constant(ys) {
        return Correlation::Undefined { sample_size: n };
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    Correlation::Defined {
        coefficient: r,
        p_value: pearson_p_value(r, n),
        sample_size: n,
    }
}

fn is_constant(xs: &[f64]) -> bool {
    xs.windows(2).all(|w| w[0] == w[1])
}

fn pearson_p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    student_t_two_tailed(t, df)
}

/// P(|T| >= |t|) for a Student t variable with `df` degrees of freedom.
fn student_t_two_tailed(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Regularized incomplete beta function I_x(a, b).
fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

// Modified Lentz evaluation of the continued fraction for I_x(a, b).
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPS: f64 = 3e-14;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for i in 1..=MAX_ITERATIONS {
        let m = i as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

// Lanczos approximation, g = 7.
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + 7.5;
    let mut acc = COEFFS[0];
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn summary_of_one_to_five() {
        let s = NumericSummary::compute(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.p25, 2.0);
        assert_eq!(s.p75, 4.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert!(close(s.std_dev.unwrap(), 1.5811, 1e-4));
        assert_eq!(s.rounded(2).std_dev, Some(1.58));
    }

    #[test]
    fn rolling_mean_over_a_week() {
        let day = 86_400;
        let points = [
            (0, 4.0),
            (day, 2.0),
            (day, 3.0),
            (8 * day, 5.0),
            (10 * day, 1.0),
        ];
        assert_eq!(
            rolling_mean(&points, 7 * day),
            vec![4.0, 3.0, 3.0, 5.0, 3.0]
        );
        assert!(rolling_mean(&[], 7 * day).is_empty());
    }

    #[test]
    fn quantiles_interpolate() {
        let s = NumericSummary::compute(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.median, 2.5);
        assert_eq!(s.p25, 1.75);
        assert_eq!(s.p75, 3.25);
    }

    #[test]
    fn single_value_has_no_std_dev() {
        let s = NumericSummary::compute(&[4.0]).unwrap();
        assert_eq!(s.std_dev, None);
        assert_eq!(s.p25, 4.0);
        assert_eq!(NumericSummary::compute(&[]), None);
        assert_eq!(NumericSummary::compute(&[f64::NAN]), None);
    }

    #[test]
    fn gamma_and_beta_sanity() {
        // Gamma(5) = 24
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-10));
        // Gamma(1/2) = sqrt(pi)
        assert!(close(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
        // I_x(1, 1) = x
        assert!(close(incomplete_beta(1.0, 1.0, 0.3), 0.3, 1e-10));
    }

    #[test]
    fn t_distribution_with_one_degree_of_freedom() {
        // Cauchy: P(|T| >= 1) = 0.5
        assert!(close(student_t_two_tailed(1.0, 1.0), 0.5, 1e-8));
        assert!(close(student_t_two_tailed(0.0, 7.0), 1.0, 1e-12));
    }

    #[test]
    fn pearson_known_values() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [2.0, 1.0, 4.0, 3.0, 6.0, 5.0];
        match pearson(&xs, &ys) {
            Correlation::Defined {
                coefficient,
                p_value,
                sample_size,
            } => {
                assert_eq!(sample_size, 6);
                assert!(close(coefficient, 14.5 / 17.5, 1e-12));
                // t = 2.96 with 4 degrees of freedom.
                assert!(p_value > 0.03 && p_value < 0.05, "p = {}", p_value);
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn perfect_and_inverse_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys: Vec<f64> = xs.iter().map(|x| 10.0 - 2.0 * x).collect();
        match pearson(&xs, &ys) {
            Correlation::Defined {
                coefficient,
                p_value,
                ..
            } => {
                assert!(close(coefficient, -1.0, 1e-12));
                assert_eq!(p_value, 0.0);
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn constant_series_is_undefined() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [3.0; 6];
        assert_eq!(
            pearson(&xs, &ys),
            Correlation::Undefined { sample_size: 6 }
        );
    }
}
