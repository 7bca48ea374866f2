//! Central finite differences for checking operator gradients.
//!
//! The function under test is usually "run forward, reduce the output to a
//! scalar", which can fail, so both helpers work with [`Result`].

use dense_core::{Error, Result};

/// Numerical gradient of `f` at `point`:
/// `(f(x + eps·eᵢ) - f(x - eps·eᵢ)) / 2eps` for every coordinate `i`.
///
/// ```
/// use dense_op::finite_diff::finite_diff_grad;
///
/// let f = |v: &[f64]| Ok(v[0] * v[0] + 3.0 * v[1]);
/// let g = finite_diff_grad(f, &[2.0, 5.0], 1e-6).unwrap();
/// assert!((g[0] - 4.0).abs() < 1e-6);
/// assert!((g[1] - 3.0).abs() < 1e-6);
/// ```
pub fn finite_diff_grad<F>(f: F, point: &[f64], eps: f64) -> Result<Vec<f64>>
where
    F: Fn(&[f64]) -> Result<f64>,
{
    let mut grads = Vec::with_capacity(point.len());
    let mut perturbed = point.to_vec();

    for i in 0..point.len() {
        perturbed[i] = point[i] + eps;
        let f_plus = f(&perturbed)?;

        perturbed[i] = point[i] - eps;
        let f_minus = f(&perturbed)?;

        perturbed[i] = point[i];
        grads.push((f_plus - f_minus) / (2.0 * eps));
    }

    Ok(grads)
}

/// Largest absolute element-wise difference between two gradients.
pub fn max_grad_error(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::msg(format!(
            "gradient length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max))
}
