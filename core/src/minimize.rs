use nalgebra::{DMatrix, DVector};

use crate::{
    energy::EnergyTerm,
    trajectory::{Frame, Trajectory},
    util,
};

/// Sufficient decrease constant of the Armijo condition
const ARMIJO_C1: f64 = 1e-4;
/// Maximum number of step halvings per line search
const MAX_BACKTRACKS: usize = 60;
/// Curvature `y.s` below which the inverse Hessian update is skipped
const MIN_CURVATURE: f64 = 1e-12;

/// Where the minimizer gets gradients from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GradientMethod {
    /// [`EnergyTerm::gradient`]
    #[default]
    Analytic,
    /// Central differences of the energy with step [`BfgsMinimizer::epsilon`]
    Numerical,
}

/// Quasi-Newton (BFGS) structure minimizer.
#[derive(Clone, Debug)]
pub struct BfgsMinimizer {
    /// converged once the largest gradient component drops below this
    pub gtol: f64,
    /// finite difference step for [`GradientMethod::Numerical`]
    pub epsilon: f64,
    pub max_iterations: usize,
    pub gradient: GradientMethod,
}

impl Default for BfgsMinimizer {
    fn default() -> Self {
        Self {
            gtol: 1e-6,
            epsilon: 0.01,
            max_iterations: 200,
            gradient: GradientMethod::Analytic,
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub struct MinimizationOutput {
    /// minimized flat coordinates
    pub coords: DVector<f64>,
    pub energy: f64,
    pub initial_energy: f64,
    pub iterations: usize,
    pub converged: bool,
    /// the initial structure followed by the structure after every iteration, if requested
    pub trajectory: Option<Trajectory>,
}

impl BfgsMinimizer {
    fn gradient(&self, energy: &dyn EnergyTerm, x: &DVector<f64>) -> DVector<f64> {
        match self.gradient {
            GradientMethod::Analytic => energy.gradient(x),
            GradientMethod::Numerical => {
                util::numerical_gradient(|x| energy.energy(x), x, self.epsilon)
            }
        }
    }

    /// Minimizes `energy` starting from the flat coordinates `x0`.
    ///
    /// Running out of iterations or a failing line search is not an error; the best
    /// structure found so far is returned with `converged` set to false.
    pub fn run_minimization(
        &self,
        energy: &dyn EnergyTerm,
        x0: &DVector<f64>,
        save_trajectory: bool,
    ) -> MinimizationOutput {
        let n = x0.len();
        let mut trajectory = save_trajectory.then(|| {
            let mut trajectory = Trajectory::new();
            trajectory.add_frame(Frame::from_flat(x0).coords);
            trajectory
        });

        let mut x = x0.clone();
        let mut f = energy.energy(&x);
        let initial_energy = f;
        let mut g = self.gradient(energy, &x);
        let mut inverse_hessian = DMatrix::<f64>::identity(n, n);

        let mut converged = g.amax() < self.gtol;
        let mut iterations = 0;

        while !converged && iterations < self.max_iterations {
            let mut direction = -(&inverse_hessian * &g);
            let mut slope = g.dot(&direction);
            if slope >= 0.0 {
                log::debug!("not a descent direction, resetting inverse hessian");
                inverse_hessian.fill_with_identity();
                direction = -g.clone();
                slope = g.dot(&direction);
            }

            let Some((step, x_new, f_new)) = line_search(energy, &x, f, &direction, slope) else {
                log::warn!("line search failed after {iterations} iterations");
                break;
            };
            iterations += 1;

            let g_new = self.gradient(energy, &x_new);
            let s = &direction * step;
            let y = &g_new - &g;
            let curvature = y.dot(&s);

            if curvature > MIN_CURVATURE {
                if iterations == 1 {
                    // scale the initial guess to the curvature seen along the first step
                    inverse_hessian *= curvature / y.norm_squared();
                }
                let rho = curvature.recip();
                let identity = DMatrix::<f64>::identity(n, n);
                let left = &identity - rho * &s * y.transpose();
                let right = &identity - rho * &y * s.transpose();
                inverse_hessian = &left * &inverse_hessian * &right + rho * &s * s.transpose();
            }

            x = x_new;
            f = f_new;
            g = g_new;
            converged = g.amax() < self.gtol;

            log::info!(
                "iteration {iterations:<4} - energy {f:1.6}. max gradient {:1.4e}",
                g.amax()
            );

            if let Some(trajectory) = trajectory.as_mut() {
                trajectory.add_frame(Frame::from_flat(&x).coords);
            }
        }

        if converged {
            log::info!(
                "minimization converged after {iterations} iterations: {initial_energy:1.6} -> {f:1.6}"
            );
        } else {
            log::warn!(
                "minimization did not converge after {iterations} iterations (max gradient {:1.4e})",
                g.amax()
            );
        }

        MinimizationOutput {
            coords: x,
            energy: f,
            initial_energy,
            iterations,
            converged,
            trajectory,
        }
    }
}

/// Backtracking line search along `direction`. Returns the accepted step length with the
/// new coordinates and their energy.
fn line_search(
    energy: &dyn EnergyTerm,
    x: &DVector<f64>,
    f: f64,
    direction: &DVector<f64>,
    slope: f64,
) -> Option<(f64, DVector<f64>, f64)> {
    let mut step = 1.0;
    for _ in 0..MAX_BACKTRACKS {
        let candidate = x + direction * step;
        let f_candidate = energy.energy(&candidate);
        if f_candidate.is_finite() && f_candidate <= f + ARMIJO_C1 * step * slope {
            return Some((step, candidate, f_candidate));
        }
        step *= 0.5;
    }
    None
}
