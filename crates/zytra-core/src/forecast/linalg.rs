//! Small numeric helpers for model fitting

/// Solve `a * x = b` for a dense row-major `n x n` matrix.
///
/// Gaussian elimination with partial pivoting. Returns `None` when the system
/// is singular.
pub(crate) fn solve(mut a: Vec<f64>, mut b: Vec<f64>, n: usize) -> Option<Vec<f64>> {
    debug_assert_eq!(a.len(), n * n);
    debug_assert_eq!(b.len(), n);

    for col in 0..n {
        // Find pivot
        let mut pivot_row = col;
        for row in (col + 1)..n {
            if a[row * n + col].abs() > a[pivot_row * n + col].abs() {
                pivot_row = row;
            }
        }
        if a[pivot_row * n + col].abs() < 1e-12 {
            return None;
        }

        if pivot_row != col {
            for j in 0..n {
                a.swap(col * n + j, pivot_row * n + j);
            }
            b.swap(col, pivot_row);
        }

        // Eliminate below
        for row in (col + 1)..n {
            let factor = a[row * n + col] / a[col * n + col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row * n + j] -= factor * a[col * n + j];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for j in (row + 1)..n {
            sum -= a[row * n + j] * x[j];
        }
        x[row] = sum / a[row * n + row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Ridge-regularised least squares.
///
/// Minimises `|y - X b|^2 + sum_j penalty[j] * b[j]^2` through the normal
/// equations. `rows` holds the design matrix one observation per entry.
pub(crate) fn ridge(rows: &[Vec<f64>], y: &[f64], penalty: &[f64]) -> Option<Vec<f64>> {
    let p = penalty.len();
    let mut xtx = vec![0.0; p * p];
    let mut xty = vec![0.0; p];

    for (row, &target) in rows.iter().zip(y) {
        for i in 0..p {
            xty[i] += row[i] * target;
            for j in i..p {
                xtx[i * p + j] += row[i] * row[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            xtx[i * p + j] = xtx[j * p + i];
        }
        xtx[i * p + i] += penalty[i];
    }

    solve(xtx, xty, p)
}

/// Settings for [`nelder_mead`]
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimplexOptions {
    /// Initial simplex edge length
    pub step: f64,
    pub max_iterations: usize,
    /// Stop once the spread of objective values falls below this
    pub tolerance: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            step: 0.1,
            max_iterations: 2000,
            tolerance: 1e-10,
        }
    }
}

/// Derivative-free minimisation (Nelder-Mead simplex).
///
/// Deterministic for a given start point. Returns the best vertex found and
/// its objective value.
pub(crate) fn nelder_mead<F>(objective: F, start: &[f64], options: SimplexOptions) -> (Vec<f64>, f64)
where
    F: Fn(&[f64]) -> f64,
{
    const ALPHA: f64 = 1.0; // reflection
    const GAMMA: f64 = 2.0; // expansion
    const RHO: f64 = 0.5; // contraction
    const SIGMA: f64 = 0.5; // shrink

    let dim = start.len();
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::MAX
        }
    };

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
    simplex.push((start.to_vec(), eval(start)));
    for i in 0..dim {
        let mut vertex = start.to_vec();
        vertex[i] += options.step;
        let value = eval(&vertex);
        simplex.push((vertex, value));
    }

    for _ in 0..options.max_iterations {
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let best = simplex[0].1;
        let worst = simplex[dim].1;
        if (worst - best).abs() <= options.tolerance * (1.0 + best.abs()) {
            break;
        }

        // Centroid of all but the worst vertex
        let mut centroid = vec![0.0; dim];
        for (vertex, _) in simplex.iter().take(dim) {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v / dim as f64;
            }
        }

        let toward = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[dim].0)
                .map(|(c, w)| c + coef * (w - c))
                .collect()
        };

        let reflected = toward(-ALPHA);
        let reflected_value = eval(&reflected);

        if reflected_value < simplex[0].1 {
            let expanded = toward(-GAMMA);
            let expanded_value = eval(&expanded);
            simplex[dim] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < simplex[dim - 1].1 {
            simplex[dim] = (reflected, reflected_value);
            continue;
        }

        let contracted = toward(RHO);
        let contracted_value = eval(&contracted);
        if contracted_value < simplex[dim].1 {
            simplex[dim] = (contracted, contracted_value);
            continue;
        }

        // Shrink toward the best vertex
        let best_vertex = simplex[0].0.clone();
        for (vertex, value) in simplex.iter_mut().skip(1) {
            for (v, b) in vertex.iter_mut().zip(&best_vertex) {
                *v = b + SIGMA * (*v - b);
            }
            *value = eval(vertex);
        }
    }

    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let (vertex, value) = simplex.swap_remove(0);
    (vertex, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_2x2() {
        // 2x + y = 5, x + 3y = 10
        let x = solve(vec![2.0, 1.0, 1.0, 3.0], vec![5.0, 10.0], 2).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let x = solve(vec![0.0, 1.0, 1.0, 0.0], vec![2.0, 3.0], 2).unwrap();
        assert_eq!(x, vec![3.0, 2.0]);
    }

    #[test]
    fn test_solve_singular() {
        assert!(solve(vec![1.0, 2.0, 2.0, 4.0], vec![1.0, 2.0], 2).is_none());
    }

    #[test]
    fn test_ridge_recovers_line() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let b = ridge(&rows, &y, &[1e-9, 1e-9]).unwrap();
        assert!((b[0] - 3.0).abs() < 1e-6);
        assert!((b[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_nelder_mead_quadratic() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + 2.0 * (x[1] + 0.5).powi(2);
        let (best, value) = nelder_mead(f, &[0.0, 0.0], SimplexOptions::default());
        assert!((best[0] - 1.0).abs() < 1e-3);
        assert!((best[1] + 0.5).abs() < 1e-3);
        assert!(value < 1e-6);
    }

    #[test]
    fn test_nelder_mead_is_deterministic() {
        let f = |x: &[f64]| (x[0] * x[0] - 2.0).powi(2) + x[1].powi(2);
        let a = nelder_mead(f, &[1.0, 1.0], SimplexOptions::default());
        let b = nelder_mead(f, &[1.0, 1.0], SimplexOptions::default());
        assert_eq!(a.0, b.0);
    }
}
