//! Horizontal-axis resolution: the default time axis, or a per-slot
//! override signal aligned onto the plotted signal.

use crate::error::SignalError;

/// A time-stamped series, already scaled and free of non-finite samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> Self {
        Self { time, values }
    }

    /// Pairs `(time[i], values[i])`, dropping any pair with a non-finite member.
    pub fn from_pairs(time: &[f64], values: &[f64]) -> Self {
        let mut out = Series::default();
        for (&t, &v) in time.iter().zip(values) {
            if t.is_finite() && v.is_finite() {
                out.time.push(t);
                out.values.push(v);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.time.len().min(self.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for v in &mut self.values {
            *v *= factor;
        }
        self
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.time
            .iter()
            .zip(&self.values)
            .map(|(&t, &v)| [t, v])
            .collect()
    }
}

/// Linear interpolation of `(xs, ys)` at every `at`, extrapolating linearly
/// beyond both ends. `xs` must be non-decreasing.
pub fn interpolate(xs: &[f64], ys: &[f64], at: &[f64]) -> Result<Vec<f64>, SignalError> {
    if xs.is_empty() || xs.len() != ys.len() {
        return Err(SignalError::InterpolationFailed(format!(
            "{} abscissae for {} ordinates",
            xs.len(),
            ys.len()
        )));
    }
    if xs.windows(2).any(|w| !(w[0] <= w[1])) {
        return Err(SignalError::InterpolationFailed(
            "abscissae not monotonic".to_string(),
        ));
    }
    if xs.len() == 1 {
        return Ok(vec![ys[0]; at.len()]);
    }

    let n = xs.len();
    let line = |i: usize, j: usize, x: f64| {
        let dx = xs[j] - xs[i];
        if dx == 0.0 {
            ys[j]
        } else {
            ys[i] + (ys[j] - ys[i]) * (x - xs[i]) / dx
        }
    };

    Ok(at
        .iter()
        .map(|&x| {
            if x <= xs[0] {
                line(0, 1, x)
            } else if x >= xs[n - 1] {
                line(n - 2, n - 1, x)
            } else {
                // First index with xs[idx] >= x; idx is in 1..n.
                let idx = xs.partition_point(|&v| v < x);
                line(idx - 1, idx, x)
            }
        })
        .collect())
}

/// Plot `primary` against `override_x`.
///
/// When both share the same time base the override values are used directly
/// as abscissae. Otherwise `primary` is interpolated onto the override's time
/// base. Returned points are `[x, y]`.
pub fn align(primary: &Series, override_x: &Series) -> Result<Vec<[f64; 2]>, SignalError> {
    if override_x.is_empty() {
        return Err(SignalError::InterpolationFailed(
            "override signal has no samples".to_string(),
        ));
    }
    if primary.time == override_x.time {
        return Ok(override_x
            .values
            .iter()
            .zip(&primary.values)
            .map(|(&x, &y)| [x, y])
            .collect());
    }
    let ys = interpolate(&primary.time, &primary.values, &override_x.time)?;
    Ok(override_x
        .values
        .iter()
        .zip(ys)
        .map(|(&x, y)| [x, y])
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_and_extrapolates() {
        let ys = interpolate(&[0.0, 1.0, 2.0], &[0.0, 10.0, 20.0], &[-1.0, 0.5, 3.0]).unwrap();
        assert_eq!(ys, vec![-10.0, 5.0, 30.0]);
    }

    #[test]
    fn single_sample_is_constant() {
        assert_eq!(interpolate(&[1.0], &[4.0], &[0.0, 9.0]).unwrap(), vec![4.0, 4.0]);
    }

    #[test]
    fn rejects_unsorted_and_empty() {
        assert!(interpolate(&[1.0, 0.0], &[0.0, 0.0], &[0.5]).is_err());
        assert!(interpolate(&[], &[], &[0.5]).is_err());
    }

    #[test]
    fn shared_time_base_uses_values_directly() {
        let p = Series::new(vec![0.0, 1.0], vec![5.0, 6.0]);
        let x = Series::new(vec![0.0, 1.0], vec![100.0, 200.0]);
        assert_eq!(align(&p, &x).unwrap(), vec![[100.0, 5.0], [200.0, 6.0]]);
    }

    #[test]
    fn different_time_base_interpolates_primary() {
        let p = Series::new(vec![0.0, 2.0], vec![0.0, 2.0]);
        let x = Series::new(vec![1.0], vec![42.0]);
        assert_eq!(align(&p, &x).unwrap(), vec![[42.0, 1.0]]);
    }
}
