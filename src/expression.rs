//! The expression type: chromosome bounds (component C), activity analysis
//! (D), the polymorphic evaluator (E), the differentiator (F) and the
//! mutator (G), tied together the way `original_source/src/expression.h`
//! ties together its own `expression` class.
use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::basis::BasisFunction;
use crate::da::Da;
use crate::error::Error;
use crate::function_set::FunctionSet;

/// A d-CGP expression: a fixed-topology chromosome plus the bounds and
/// active-set bookkeeping needed to evaluate, differentiate, and mutate it.
pub struct Expression {
    n: u32,
    m: u32,
    r: u32,
    c: u32,
    l: u32,
    f: FunctionSet,
    lb: Vec<u32>,
    ub: Vec<u32>,
    x: Vec<u32>,
    active_nodes: Vec<u32>,
    active_genes: Vec<u32>,
    rng: StdRng,
}

impl Expression {
    /// Builds an expression with a random chromosome. `n, m, r, c, l` must
    /// all be non-zero and `f` must be non-empty; any violation raises
    /// [`Error::InvalidInput`].
    pub fn new(
        n: u32,
        m: u32,
        r: u32,
        c: u32,
        l: u32,
        f: FunctionSet,
        seed: u64,
    ) -> Result<Expression, Error> {
        if n == 0 {
            return Err(Error::InvalidInput("number of inputs is 0".into()));
        }
        if m == 0 {
            return Err(Error::InvalidInput("number of outputs is 0".into()));
        }
        if r == 0 {
            return Err(Error::InvalidInput("number of rows is 0".into()));
        }
        if c == 0 {
            return Err(Error::InvalidInput("number of columns is 0".into()));
        }
        if l == 0 {
            return Err(Error::InvalidInput("number of levels-back is 0".into()));
        }
        if f.is_empty() {
            return Err(Error::InvalidInput("function set is empty".into()));
        }

        let (lb, ub) = compute_bounds(n, m, r, c, l, f.len() as u32);
        let mut rng = StdRng::seed_from_u64(seed);
        let x: Vec<u32> = lb
            .iter()
            .zip(ub.iter())
            .map(|(&lo, &hi)| rng.gen_range(lo..=hi))
            .collect();

        let mut expr = Expression {
            n,
            m,
            r,
            c,
            l,
            f,
            lb,
            ub,
            x,
            active_nodes: Vec::new(),
            active_genes: Vec::new(),
            rng,
        };
        expr.update_active();
        log::trace!(
            "dcgp::Expression::new(n={n}, m={m}, r={r}, c={c}, l={l}, |f|={}) -> {} active nodes",
            expr.f.len(),
            expr.active_nodes.len()
        );
        Ok(expr)
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn m(&self) -> u32 {
        self.m
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn c(&self) -> u32 {
        self.c
    }

    pub fn l(&self) -> u32 {
        self.l
    }

    pub fn function_set(&self) -> &FunctionSet {
        &self.f
    }

    pub fn lb(&self) -> &[u32] {
        &self.lb
    }

    pub fn ub(&self) -> &[u32] {
        &self.ub
    }

    pub fn get(&self) -> &[u32] {
        &self.x
    }

    pub fn active_nodes(&self) -> &[u32] {
        &self.active_nodes
    }

    pub fn active_genes(&self) -> &[u32] {
        &self.active_genes
    }

    fn is_valid(&self, x: &[u32]) -> bool {
        x.len() == self.lb.len()
            && x.iter()
                .zip(self.lb.iter())
                .zip(self.ub.iter())
                .all(|((&v, &lo), &hi)| v >= lo && v <= hi)
    }

    /// Replaces the chromosome after validating its length and per-gene
    /// bounds. Leaves the expression unchanged and raises
    /// [`Error::InvalidInput`] if `x` is invalid.
    pub fn set(&mut self, x: Vec<u32>) -> Result<(), Error> {
        if !self.is_valid(&x) {
            log::debug!("dcgp::Expression::set rejected a chromosome of length {}", x.len());
            return Err(Error::InvalidInput(
                "chromosome is incompatible with this expression's bounds".into(),
            ));
        }
        self.x = x;
        self.update_active();
        Ok(())
    }

    /// Recomputes `active_nodes` and `active_genes` from the current
    /// chromosome, per `spec.md` §4.2.
    fn update_active(&mut self) {
        let mut current: Vec<u32> = (0..self.m)
            .map(|i| self.x[(3 * self.r * self.c + i) as usize])
            .collect();
        self.active_nodes.clear();
        loop {
            self.active_nodes.extend_from_slice(&current);
            let mut next = Vec::new();
            for &node_id in &current {
                if node_id >= self.n {
                    let idx = ((node_id - self.n) * 3) as usize;
                    let fn_idx = self.x[idx] as usize;
                    match self.f.get(fn_idx).map(|bf| bf.arity) {
                        Some(crate::basis::Arity::Binary) => {
                            next.push(self.x[idx + 2]);
                            next.push(self.x[idx + 1]);
                        }
                        Some(crate::basis::Arity::Unary) => {
                            next.push(self.x[idx + 1]);
                        }
                        Some(crate::basis::Arity::Const) | None => {}
                    }
                }
            }
            next.sort_unstable();
            next.dedup();
            if next.is_empty() {
                break;
            }
            current = next;
        }
        self.active_nodes.sort_unstable();
        self.active_nodes.dedup();

        self.active_genes.clear();
        for &node_id in &self.active_nodes {
            if node_id >= self.n {
                let idx = (node_id - self.n) * 3;
                self.active_genes.push(idx);
                self.active_genes.push(idx + 1);
                self.active_genes.push(idx + 2);
            }
        }
        for i in 0..self.m {
            self.active_genes.push(self.r * self.c * 3 + i);
        }
    }

    /// Core of the polymorphic evaluator (§4.3): walks `active_nodes` in
    /// ascending order (a valid topological order, since levels-back
    /// guarantees an operand's id is always less than its user's) and
    /// applies `apply` at every internal node. A node referenced by an
    /// operand slot the basis function's arity ignores may be inactive and
    /// therefore never computed; such slots read `T::default()`, mirroring
    /// a missing key in the original implementation's node map.
    fn run_active<T, Apply>(&self, input: &[T], apply: Apply) -> Result<Vec<T>, Error>
    where
        T: Clone + Default,
        Apply: Fn(&BasisFunction, &T, &T) -> Result<T, Error>,
    {
        if input.len() != self.n as usize {
            return Err(Error::InvalidInput(format!(
                "expected {} inputs, got {}",
                self.n,
                input.len()
            )));
        }
        let mut node: HashMap<u32, T> = HashMap::with_capacity(self.active_nodes.len());
        for &k in &self.active_nodes {
            if k < self.n {
                node.insert(k, input[k as usize].clone());
            } else {
                let idx = ((k - self.n) * 3) as usize;
                let fn_idx = self.x[idx] as usize;
                let bf = self.f.get(fn_idx).ok_or_else(|| {
                    Error::InvalidInput(format!("function index {fn_idx} out of range"))
                })?;
                let a = node.get(&self.x[idx + 1]).cloned().unwrap_or_default();
                let b = node.get(&self.x[idx + 2]).cloned().unwrap_or_default();
                node.insert(k, apply(bf, &a, &b)?);
            }
        }
        (0..self.m)
            .map(|i| {
                let out_id = self.x[(self.r * self.c * 3 + i) as usize];
                Ok(node.get(&out_id).cloned().unwrap_or_default())
            })
            .collect()
    }

    /// Numeric evaluation. Total over every valid chromosome: `log`/`sqrt`
    /// operate on `|x|` and `div` performs unchecked IEEE-754 division, so
    /// this never raises on a domain error (only on a wrong-sized `input`).
    pub fn eval_f64(&self, input: &[f64]) -> Result<Vec<f64>, Error> {
        self.run_active(input, |bf, &a, &b| Ok(bf.apply_num(a, b)))
    }

    /// Derivative evaluation: evaluates over `T = Da`, propagating
    /// [`Error::DerivativeUndefined`] from any basis function applied at a
    /// non-differentiable point.
    pub fn eval_da(&self, input: &[Da]) -> Result<Vec<Da>, Error> {
        self.run_active(input, |bf, a, b| bf.apply_da(a, b))
    }

    /// Symbolic evaluation, producing one string per output.
    pub fn eval_symbolic(&self, input: &[String], simplify: bool) -> Result<Vec<String>, Error> {
        self.run_active(input, move |bf, a, b| Ok(bf.apply_sym(a, b, simplify)))
    }

    /// Seeds each input as a DA identity series and evaluates over `Da`,
    /// yielding the `m` output expansions around `input`. Cache the result
    /// and call [`Expression::differentiate_wrt`] repeatedly when several
    /// derivatives are needed at the same point.
    pub fn differentiate(&self, input: &[f64]) -> Result<Vec<Da>, Error> {
        if input.len() != self.n as usize {
            return Err(Error::InvalidInput(format!(
                "expected {} inputs, got {}",
                self.n,
                input.len()
            )));
        }
        let in_da: Vec<Da> = input
            .iter()
            .enumerate()
            .map(|(i, &v)| Da::seed(v, i + 1))
            .collect::<Result<_, _>>()?;
        self.eval_da(&in_da)
    }

    /// Extracts `∂^|wrt| f / ∂x_{wrt[0]} … ∂x_{wrt[k]}` at the expansion
    /// point baked into `exp` (as produced by [`Expression::differentiate`]).
    /// Each entry of `wrt` must be `< n`.
    pub fn differentiate_wrt(&self, wrt: &[u32], exp: &[Da]) -> Result<Vec<f64>, Error> {
        let mut exp: Vec<Da> = exp.to_vec();
        for &i in wrt {
            if i >= self.n {
                return Err(Error::InvalidInput(format!(
                    "derivative index {i} is not less than the number of inputs {}",
                    self.n
                )));
            }
            for e in exp.iter_mut() {
                *e = e.deriv((i + 1) as usize)?;
            }
        }
        Ok(exp.iter().map(Da::cons).collect())
    }

    /// The composition of [`Expression::differentiate`] and
    /// [`Expression::differentiate_wrt`], for callers who only need a
    /// single derivative at a single point.
    pub fn differentiate_at(&self, wrt: &[u32], input: &[f64]) -> Result<Vec<f64>, Error> {
        let exp = self.differentiate(input)?;
        self.differentiate_wrt(wrt, &exp)
    }

    /// Mutates exactly one active gene in place. A no-op if the chosen
    /// gene's bounds collapse to a single value. Recomputes the active set
    /// afterwards, so a single call may grow or shrink it.
    pub fn mutate_active(&mut self) {
        let pick = self.rng.gen_range(0..self.active_genes.len());
        let idx = self.active_genes[pick] as usize;
        let (lo, hi) = (self.lb[idx], self.ub[idx]);
        if lo >= hi {
            return;
        }
        let old = self.x[idx];
        let mut new_value = old;
        while new_value == old {
            new_value = self.rng.gen_range(lo..=hi);
        }
        log::debug!("dcgp::Expression::mutate_active: gene {idx} {old} -> {new_value}");
        self.x[idx] = new_value;
        self.update_active();
    }

    /// Textual report matching `spec.md` §6.2: dimensions, bounds,
    /// chromosome, active sets, and function-set names.
    pub fn human_readable(&self) -> String {
        let names: Vec<&str> = self.f.iter().map(|bf| bf.name).collect();
        format!(
            "d-CGP Expression:\n\
             \tNumber of inputs:\t\t{}\n\
             \tNumber of outputs:\t\t{}\n\
             \tNumber of rows:\t\t\t{}\n\
             \tNumber of columns:\t\t{}\n\
             \tNumber of levels-back allowed:\t{}\n\
             \n\tResulting lower bounds:\t{:?}\n\
             \tResulting upper bounds:\t{:?}\n\
             \n\tCurrent expression (encoded):\t{:?}\n\
             \tActive nodes:\t\t\t{:?}\n\
             \tActive genes:\t\t\t{:?}\n\
             \n\tFunction set:\t\t\t{:?}\n",
            self.n, self.m, self.r, self.c, self.l, self.lb, self.ub, self.x, self.active_nodes, self.active_genes, names
        )
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.human_readable())
    }
}

/// Per-gene lower/upper bounds, per `spec.md` §3.
fn compute_bounds(n: u32, m: u32, r: u32, c: u32, l: u32, num_functions: u32) -> (Vec<u32>, Vec<u32>) {
    let len = (3 * r * c + m) as usize;
    let mut lb = vec![0u32; len];
    let mut ub = vec![0u32; len];

    for i in 0..c {
        let upper = n + i * r - 1;
        let lower = if i >= l { n + r * (i - l) } else { 0 };
        for j in 0..r {
            let idx = ((i * r + j) * 3) as usize;
            ub[idx] = num_functions - 1;
            lb[idx + 1] = lower;
            ub[idx + 1] = upper;
            lb[idx + 2] = lower;
            ub[idx + 2] = upper;
        }
    }

    let out_upper = n + r * c - 1;
    let out_lower = if l <= c { n + r * (c - l) } else { 0 };
    for i in 0..m {
        let idx = (3 * r * c + i) as usize;
        lb[idx] = out_lower;
        ub[idx] = out_upper;
    }

    (lb, ub)
}
