//! Central finite differences over selected entries of a vector.
//!
//! Each helper perturbs `x` in place and restores every entry to its exact
//! original value before returning, so callers can reuse one scratch copy.

use nalgebra::DMatrix;

/// Relative step for first derivatives.
pub const FIRST_ORDER_STEP: f64 = 1e-6;

/// Relative step for second derivatives.
pub const SECOND_ORDER_STEP: f64 = 1e-4;

/// Step size for perturbing `value`: `relative · max(1, |value|)`.
#[must_use]
pub fn step(value: f64, relative: f64) -> f64 {
    relative * value.abs().max(1.0)
}

/// Central-difference gradient of `f` with respect to `x[i]` for each `i` in
/// `indices`.
///
/// # Errors
///
/// Returns the first error produced by `f`.
pub fn gradient<F, E>(f: F, x: &mut [f64], indices: &[usize]) -> Result<Vec<f64>, E>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    let mut grad = Vec::with_capacity(indices.len());
    for &i in indices {
        let original = x[i];
        let h = step(original, FIRST_ORDER_STEP);

        x[i] = original + h;
        let plus = f(x);
        let forward = x[i];
        x[i] = original - h;
        let minus = f(x);
        let backward = x[i];
        x[i] = original;

        grad.push((plus? - minus?) / (forward - backward));
    }
    Ok(grad)
}

/// Central-difference Hessian of `f` with respect to the entries of `x`
/// listed in `indices`.
///
/// Row and column `a` of the result correspond to `x[indices[a]]`. The result
/// is symmetric by construction.
///
/// # Errors
///
/// Returns the first error produced by `f`.
pub fn hessian<F, E>(f: F, x: &mut [f64], indices: &[usize]) -> Result<DMatrix<f64>, E>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    let k = indices.len();
    let mut hess = DMatrix::zeros(k, k);
    if k == 0 {
        return Ok(hess);
    }

    let center = f(x)?;
    let steps: Vec<f64> = indices.iter().map(|&i| step(x[i], SECOND_ORDER_STEP)).collect();

    for a in 0..k {
        let (i, h) = (indices[a], steps[a]);
        let original = x[i];

        x[i] = original + h;
        let plus = f(x);
        x[i] = original - h;
        let minus = f(x);
        x[i] = original;

        hess[(a, a)] = (plus? - 2.0 * center + minus?) / (h * h);
    }

    for a in 0..k {
        for b in (a + 1)..k {
            let (i, j) = (indices[a], indices[b]);
            let (hi, hj) = (steps[a], steps[b]);
            let (xi, xj) = (x[i], x[j]);

            let mut corner = |si: f64, sj: f64| {
                x[i] = xi + si * hi;
                x[j] = xj + sj * hj;
                let value = f(x);
                x[i] = xi;
                x[j] = xj;
                value
            };
            let pp = corner(1.0, 1.0)?;
            let pm = corner(1.0, -1.0)?;
            let mp = corner(-1.0, 1.0)?;
            let mm = corner(-1.0, -1.0)?;

            let value = (pp - pm - mp + mm) / (4.0 * hi * hj);
            hess[(a, b)] = value;
            hess[(b, a)] = value;
        }
    }

    Ok(hess)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;

    fn cubic(x: &[f64]) -> Result<f64, Infallible> {
        // f = x0² x1 + 3 x1³ + x2
        Ok(x[0] * x[0] * x[1] + 3.0 * x[1].powi(3) + x[2])
    }

    #[test]
    fn gradient_of_selected_entries() {
        let mut x = vec![1.5, -2.0, 7.0];

        let grad = gradient(cubic, &mut x, &[1, 0]).unwrap();

        assert_relative_eq!(grad[0], 1.5 * 1.5 + 9.0 * 4.0, max_relative = 1e-8);
        assert_relative_eq!(grad[1], 2.0 * 1.5 * -2.0, max_relative = 1e-8);
        assert_eq!(x, vec![1.5, -2.0, 7.0]);
    }

    #[test]
    fn hessian_is_symmetric_and_accurate() {
        let mut x = vec![1.5, -2.0, 7.0];

        let hess = hessian(cubic, &mut x, &[0, 1, 2]).unwrap();

        assert_relative_eq!(hess[(0, 0)], 2.0 * -2.0, epsilon = 1e-5);
        assert_relative_eq!(hess[(0, 1)], 2.0 * 1.5, epsilon = 1e-5);
        assert_relative_eq!(hess[(1, 0)], hess[(0, 1)]);
        assert_relative_eq!(hess[(1, 1)], 18.0 * -2.0, epsilon = 1e-4);
        assert_relative_eq!(hess[(2, 2)], 0.0, epsilon = 1e-5);
        assert_eq!(x, vec![1.5, -2.0, 7.0]);
    }

    #[test]
    fn errors_propagate() {
        let mut x = vec![0.0];
        let result = gradient(|_: &[f64]| Err::<f64, _>("bad"), &mut x, &[0]);

        assert_eq!(result, Err("bad"));
        assert_eq!(x, vec![0.0]);
    }
}
