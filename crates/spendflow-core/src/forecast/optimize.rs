//! Derivative-free minimisation (Nelder–Mead simplex)

/// Stopping and step settings
#[derive(Debug, Clone)]
pub struct NelderMeadOptions {
    /// Edge length of the initial simplex along each axis
    pub initial_step: f64,
    /// Stop once `max f - min f` over the simplex falls below this
    pub f_tolerance: f64,
    /// Iteration limit; `None` scales with the dimension
    pub max_iterations: Option<usize>,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            initial_step: 0.1,
            f_tolerance: 1e-10,
            max_iterations: None,
        }
    }
}

/// Best point found
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub fx: f64,
    pub iterations: usize,
    /// False when the iteration limit was hit first
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimise `f` starting from `x0`
///
/// Non-finite objective values are treated as +inf.
pub fn nelder_mead<F>(f: F, x0: &[f64], options: &NelderMeadOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    if n == 0 {
        return Minimum {
            x: Vec::new(),
            fx: eval(x0),
            iterations: 0,
            converged: true,
        };
    }

    let max_iterations = options.max_iterations.unwrap_or(500 * n);

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((x0.to_vec(), eval(x0)));
    for i in 0..n {
        let mut x = x0.to_vec();
        x[i] += options.initial_step;
        let fx = eval(&x);
        simplex.push((x, fx));
    }

    let mut iterations = 0;
    let mut converged = false;
    loop {
        // Stable sort keeps the incumbent first on ties
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let best = simplex[0].1;
        let worst = simplex[n].1;
        if (worst - best).abs() <= options.f_tolerance
            || (best.is_infinite() && worst.is_infinite() && best == worst)
        {
            converged = true;
            break;
        }
        if iterations >= max_iterations {
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
            .collect();
        let worst_x = simplex[n].0.clone();
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst_x)
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = along(REFLECT);
        let f_reflected = eval(&reflected);

        if f_reflected < simplex[0].1 {
            let expanded = along(EXPAND);
            let f_expanded = eval(&expanded);
            simplex[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }

        if f_reflected < simplex[n - 1].1 {
            simplex[n] = (reflected, f_reflected);
            continue;
        }

        // Outside contraction when the reflection improved on the worst point
        let (contracted, f_contracted) = if f_reflected < simplex[n].1 {
            let x = along(CONTRACT * REFLECT);
            let fx = eval(&x);
            (x, fx)
        } else {
            let x = along(-CONTRACT);
            let fx = eval(&x);
            (x, fx)
        };
        if f_contracted < simplex[n].1.min(f_reflected) {
            simplex[n] = (contracted, f_contracted);
            continue;
        }

        let anchor = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let x: Vec<f64> = anchor
                .iter()
                .zip(&vertex.0)
                .map(|(a, v)| a + SHRINK * (v - a))
                .collect();
            let fx = eval(&x);
            *vertex = (x, fx);
        }
    }

    let (x, fx) = simplex.swap_remove(0);
    Minimum {
        x,
        fx,
        iterations,
        converged,
    }
}
