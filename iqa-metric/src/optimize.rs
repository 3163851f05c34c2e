//! Levenberg–Marquardt least squares for small parametric models.
//!
//! Minimizes `Σ (f(x_i; β) − y_i)²` using an analytic Jacobian, Marquardt's
//! diagonal scaling of the damping term and MINPACK's default tolerances.

use nalgebra::{SMatrix, SVector};

use crate::error::{MetricError, MetricResult};

/// MINPACK default for `ftol`, `xtol` and `gtol` (square root of machine epsilon).
pub const DEFAULT_TOLERANCE: f64 = 1.490_116_119_384_765_6e-8;

const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e16;
const DAMPING_FLOOR: f64 = 1e-12;

/// A scalar model `f(x; β)` with `N` parameters.
pub trait Model<const N: usize> {
    fn eval(&self, x: f64, params: &[f64; N]) -> f64;

    /// Partial derivatives of `f` with respect to each parameter at `x`.
    fn gradient(&self, x: f64, params: &[f64; N]) -> [f64; N];
}

/// Solver settings.
#[derive(Debug, Clone, Copy)]
pub struct LevenbergMarquardt {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Maximum number of model evaluations; `None` uses `200 · (N + 1)`.
    pub max_evaluations: Option<usize>,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            ftol: DEFAULT_TOLERANCE,
            xtol: DEFAULT_TOLERANCE,
            gtol: DEFAULT_TOLERANCE,
            max_evaluations: None,
        }
    }
}

/// Result of a converged fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport<const N: usize> {
    pub params: [f64; N],
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub evaluations: usize,
}

impl LevenbergMarquardt {
    /// Fit `model` to `(x, y)` starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::FitFailed`] when the residuals are not finite or
    /// the evaluation budget runs out before any convergence test passes.
    pub fn minimize<M: Model<N>, const N: usize>(
        &self,
        model: &M,
        x: &[f64],
        y: &[f64],
        initial: [f64; N],
    ) -> MetricResult<FitReport<N>> {
        let max_evaluations = self.max_evaluations.unwrap_or(200 * (N + 1));
        let mut params = initial;
        let mut cost = sum_of_squares(model, x, y, &params);
        let mut evaluations = 1;
        let mut damping = INITIAL_DAMPING;

        if !cost.is_finite() {
            return Err(MetricError::FitFailed {
                evaluations,
                reason: "residuals are not finite at the initial guess".to_owned(),
            });
        }

        loop {
            let (normal, gradient) = normal_equations(model, x, y, &params);

            let max_gradient = gradient.amax();
            if cost == 0.0 || max_gradient <= self.gtol * cost.max(f64::MIN_POSITIVE).sqrt() {
                return Ok(FitReport {
                    params,
                    cost,
                    evaluations,
                });
            }

            // Raise the damping until a step reduces the cost.
            loop {
                if evaluations >= max_evaluations {
                    return Err(MetricError::FitFailed {
                        evaluations,
                        reason: "evaluation budget exhausted".to_owned(),
                    });
                }

                let Some(step) = damped_step(&normal, &gradient, damping) else {
                    damping *= 10.0;
                    if damping > MAX_DAMPING {
                        return Err(MetricError::FitFailed {
                            evaluations,
                            reason: "normal equations are singular".to_owned(),
                        });
                    }
                    continue;
                };

                let candidate: [f64; N] = core::array::from_fn(|j| params[j] + step[j]);
                let candidate_cost = sum_of_squares(model, x, y, &candidate);
                evaluations += 1;

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let reduction = (cost - candidate_cost) / cost;
                    let predicted = predicted_reduction(&normal, &gradient, &step) / cost;
                    let step_norm = step.norm();
                    let param_norm = SVector::from(candidate).norm();

                    params = candidate;
                    cost = candidate_cost;
                    damping = (damping / 10.0).max(f64::EPSILON);

                    if (reduction <= self.ftol && predicted <= self.ftol)
                        || step_norm <= self.xtol * (param_norm + self.xtol)
                    {
                        return Ok(FitReport {
                            params,
                            cost,
                            evaluations,
                        });
                    }
                    break;
                }

                damping *= 10.0;
                if damping > MAX_DAMPING {
                    // No representable step lowers the cost: this is a minimum
                    // to machine precision.
                    return Ok(FitReport {
                        params,
                        cost,
                        evaluations,
                    });
                }
            }
        }
    }
}

fn sum_of_squares<M: Model<N>, const N: usize>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64; N],
) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = model.eval(xi, params) - yi;
            r * r
        })
        .sum()
}

/// Returns `(JᵀJ, Jᵀr)` at `params`.
fn normal_equations<M: Model<N>, const N: usize>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64; N],
) -> (SMatrix<f64, N, N>, SVector<f64, N>) {
    let mut jtj = SMatrix::<f64, N, N>::zeros();
    let mut jtr = SVector::<f64, N>::zeros();

    for (&xi, &yi) in x.iter().zip(y) {
        let r = model.eval(xi, params) - yi;
        let row = SVector::from(model.gradient(xi, params));
        jtr += row * r;
        jtj += row * row.transpose();
    }

    (jtj, jtr)
}

/// Solve `(JᵀJ + λ·diag(JᵀJ)) · s = −Jᵀr` by Cholesky factorization.
///
/// Returns `None` when the damped matrix is not positive definite or the
/// step is not finite.
fn damped_step<const N: usize>(
    normal: &SMatrix<f64, N, N>,
    gradient: &SVector<f64, N>,
    damping: f64,
) -> Option<SVector<f64, N>> {
    let mut damped = *normal;
    for j in 0..N {
        damped[(j, j)] += damping * normal[(j, j)].max(DAMPING_FLOOR);
    }

    let step = damped.cholesky()?.solve(&(-gradient));
    step.iter().all(|v| v.is_finite()).then_some(step)
}

/// Cost decrease predicted by the linearized model for `step`: `−(2·sᵀg + sᵀAs)`.
fn predicted_reduction<const N: usize>(
    normal: &SMatrix<f64, N, N>,
    gradient: &SVector<f64, N>,
    step: &SVector<f64, N>,
) -> f64 {
    -(2.0 * step.dot(gradient) + step.dot(&(normal * step)))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    /// `f(x) = β0 · exp(β1 · x)`
    struct Exponential;

    impl Model<2> for Exponential {
        fn eval(&self, x: f64, p: &[f64; 2]) -> f64 {
            p[0] * (p[1] * x).exp()
        }

        fn gradient(&self, x: f64, p: &[f64; 2]) -> [f64; 2] {
            let e = (p[1] * x).exp();
            [e, p[0] * x * e]
        }
    }

    /// `f(x) = β0 + β1 · x`
    struct Line;

    impl Model<2> for Line {
        fn eval(&self, x: f64, p: &[f64; 2]) -> f64 {
            p[0] + p[1] * x
        }

        fn gradient(&self, x: f64, _p: &[f64; 2]) -> [f64; 2] {
            [1.0, x]
        }
    }

    #[test]
    fn recovers_exponential_parameters() {
        let x: Vec<f64> = (0..20).map(|i| f64::from(i) * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|&xi| 2.5 * (0.8 * xi).exp()).collect();

        let report = LevenbergMarquardt::default()
            .minimize(&Exponential, &x, &y, [1.0, 0.1])
            .unwrap();

        assert_abs_diff_eq!(report.params[0], 2.5, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[1], 0.8, epsilon = 1e-6);
        assert!(report.cost < 1e-12);
    }

    #[test]
    fn noisy_line_matches_least_squares_solution() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.9, 5.2, 6.9];

        let report = LevenbergMarquardt::default()
            .minimize(&Line, &x, &y, [0.0, 0.0])
            .unwrap();

        // Closed form: slope = Sxy / Sxx = 10 / 5, intercept = 4 - 2 * 1.5.
        assert_abs_diff_eq!(report.params[1], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn non_finite_start_fails() {
        let result = LevenbergMarquardt::default().minimize(
            &Line,
            &[0.0, 1.0],
            &[1.0, 2.0],
            [f64::NAN, 0.0],
        );
        assert!(matches!(result, Err(MetricError::FitFailed { .. })));
    }

    #[test]
    fn tiny_budget_fails() {
        let x: Vec<f64> = (0..20).map(|i| f64::from(i) * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|&xi| 2.5 * (0.8 * xi).exp()).collect();
        let solver = LevenbergMarquardt {
            max_evaluations: Some(2),
            ..Default::default()
        };

        match solver.minimize(&Exponential, &x, &y, [1.0, 0.1]) {
            Err(MetricError::FitFailed { evaluations, .. }) => assert_eq!(evaluations, 2),
            other => panic!("Expected FitFailed error, got {other:?}"),
        }
    }

    #[test]
    fn damped_step_solves_diagonal_system() {
        let normal = SMatrix::<f64, 2, 2>::new(2.0, 0.0, 0.0, 4.0);
        let gradient = SVector::<f64, 2>::new(-2.0, -2.0);

        let step = damped_step(&normal, &gradient, 0.0).unwrap();
        assert_abs_diff_eq!(step[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(step[1], 0.5, epsilon = 1e-12);

        // Damping shrinks the step along each axis by 1 / (1 + λ).
        let damped = damped_step(&normal, &gradient, 1.0).unwrap();
        assert_abs_diff_eq!(damped[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(damped[1], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn damped_step_rejects_singular_systems() {
        let normal = SMatrix::<f64, 2, 2>::new(1.0, 2.0, 2.0, 4.0);
        let gradient = SVector::<f64, 2>::new(-1.0, -2.0);
        assert!(damped_step(&normal, &gradient, 0.0).is_none());

        let nan = SMatrix::<f64, 2, 2>::new(f64::NAN, 0.0, 0.0, 1.0);
        assert!(damped_step(&nan, &gradient, 1e-3).is_none());
    }

    #[test]
    fn collinear_samples_still_converge() {
        // Every sample sits at x = 1, so JᵀJ of the line model is singular;
        // the damping keeps each step solvable.
        let x = [1.0; 4];
        let y = [3.0; 4];

        let report = LevenbergMarquardt::default()
            .minimize(&Line, &x, &y, [0.0, 0.0])
            .unwrap();

        assert_abs_diff_eq!(report.params[0] + report.params[1], 3.0, epsilon = 1e-6);
        assert!(report.cost < 1e-10);
    }
}
