//! End-to-end scenarios against the public API, exercised as the crate's
//! consumers would use it (construct, set a chromosome, evaluate).
use std::sync::Mutex;

use approx::assert_relative_eq;
use dcgp::{da, Expression, FunctionSet};
use lazy_static::lazy_static;

lazy_static! {
    // The Da backend is process-wide; serialize scenarios that call `da::init`.
    static ref DA_LOCK: Mutex<()> = Mutex::new(());
}

#[test]
fn sum_of_two_inputs() {
    let _ = env_logger::builder().is_test(true).try_init();
    let f = FunctionSet::from_names(&["sum"]).unwrap();
    let mut e = Expression::new(2, 1, 1, 1, 1, f, 0).unwrap();
    e.set(vec![0, 0, 1, 2]).unwrap();

    assert_eq!(e.eval_f64(&[3.0, 4.0]).unwrap(), vec![7.0]);
    let symbolic = e
        .eval_symbolic(&["in0".to_string(), "in1".to_string()], false)
        .unwrap();
    assert_eq!(symbolic, vec!["(in0+in1)".to_string()]);
}

#[test]
fn levels_back_bounds_reject_a_too_close_operand() {
    let f = FunctionSet::from_names(&["sum", "mul"]).unwrap();
    let mut e = Expression::new(1, 1, 1, 3, 1, f, 0).unwrap();
    let mut x = e.get().to_vec();
    let col2_operand_a = (2 * 1) * 3 + 1;
    assert_eq!(e.lb()[col2_operand_a], 2);
    x[col2_operand_a] = 1;
    assert!(e.set(x).is_err());
}

#[test]
fn inactive_trailing_node_is_excluded_from_the_active_set() {
    let f = FunctionSet::from_names(&["sum"]).unwrap();
    let mut e = Expression::new(2, 1, 1, 2, 2, f, 0).unwrap();
    e.set(vec![0, 0, 1, 0, 2, 0, 2]).unwrap();

    let mut nodes = e.active_nodes().to_vec();
    nodes.sort_unstable();
    assert_eq!(nodes, vec![0, 1, 2]);
}

#[test]
fn derivative_of_a_product() {
    let _g = DA_LOCK.lock().unwrap();
    da::init(2, 2);
    let f = FunctionSet::from_names(&["mul"]).unwrap();
    let mut e = Expression::new(2, 1, 1, 1, 1, f, 0).unwrap();
    e.set(vec![0, 0, 1, 2]).unwrap();

    assert_eq!(e.differentiate_at(&[0, 1], &[2.0, 3.0]).unwrap(), vec![1.0]);
    assert_eq!(e.differentiate_at(&[0, 0], &[2.0, 3.0]).unwrap(), vec![0.0]);
}

#[test]
fn pow_derivative_is_undefined_at_a_zero_base_but_numeric_eval_is_total() {
    let _g = DA_LOCK.lock().unwrap();
    da::init(1, 2);
    let f = FunctionSet::from_names(&["pow"]).unwrap();
    let mut e = Expression::new(2, 1, 1, 1, 1, f, 0).unwrap();
    e.set(vec![0, 0, 1, 2]).unwrap();

    assert_eq!(e.eval_f64(&[0.0, 2.0]).unwrap(), vec![0.0]);
    assert!(e.differentiate(&[0.0, 2.0]).is_err());
}

#[test]
fn ten_thousand_mutations_never_touch_an_inactive_gene() {
    let f = FunctionSet::from_names(&["sum", "mul"]).unwrap();
    let mut e = Expression::new(2, 1, 2, 2, 2, f, 1234).unwrap();

    for _ in 0..10_000 {
        let pre_active = e.active_genes().to_vec();
        let pre_x = e.get().to_vec();
        e.mutate_active();
        let changed: Vec<usize> = pre_x
            .iter()
            .zip(e.get())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        assert!(changed.len() <= 1);
        if let Some(&i) = changed.first() {
            assert!(pre_active.contains(&(i as u32)));
        }
    }
}

#[test]
fn differentiate_then_differentiate_wrt_round_trips_through_the_convenience_overload() {
    let _g = DA_LOCK.lock().unwrap();
    da::init(2, 2);
    let f = FunctionSet::from_names(&["sum", "mul"]).unwrap();
    let mut e = Expression::new(2, 1, 2, 2, 2, f, 99).unwrap();
    e.set(e.get().to_vec()).unwrap();

    let input = [0.6, -1.4];
    let cached = e.differentiate(&input).unwrap();
    for wrt in [vec![0], vec![1], vec![0, 1]] {
        let via_cache = e.differentiate_wrt(&wrt, &cached).unwrap();
        let direct = e.differentiate_at(&wrt, &input).unwrap();
        for (a, b) in via_cache.iter().zip(direct.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }
}

#[test]
fn set_then_get_round_trips_a_valid_chromosome() {
    let f = FunctionSet::from_names(&["sum"]).unwrap();
    let mut e = Expression::new(2, 1, 1, 1, 1, f, 3).unwrap();
    let x = vec![0, 0, 1, 2];
    e.set(x.clone()).unwrap();
    assert_eq!(e.get(), x.as_slice());
}

#[test]
fn out_of_bounds_chromosome_is_rejected_and_state_is_unchanged() {
    let f = FunctionSet::from_names(&["sum"]).unwrap();
    let mut e = Expression::new(2, 1, 1, 1, 1, f, 3).unwrap();
    let before = e.get().to_vec();
    let mut bad = before.clone();
    bad[0] = e.function_set().len() as u32 + 5;
    assert!(e.set(bad).is_err());
    assert_eq!(e.get(), before.as_slice());
}
