//! Property-based checks of invariants that should hold for any well-shaped
//! input, not just the hand-picked scenarios in `end_to_end.rs`.

use proptest::collection::vec;
use proptest::prelude::*;

use parmat::{ComputationNode, Engine, OperatorKind, SharedMatrix, SharedVector, Worker};

fn matrix_strategy(max_rows: usize, max_cols: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1..=max_rows, 1..=max_cols).prop_flat_map(|(rows, cols)| {
        vec(vec(-100.0f64..100.0, cols), rows)
    })
}

proptest! {
    #[test]
    fn row_major_round_trips_through_shared_matrix(rows in matrix_strategy(6, 6)) {
        let m = SharedMatrix::from_row_major(&rows).unwrap();
        prop_assert_eq!(m.read_row_major().unwrap(), rows);
    }

    #[test]
    fn double_transpose_is_identity(rows in matrix_strategy(6, 6)) {
        let mut root = ComputationNode::operator(
            OperatorKind::Transpose,
            vec![ComputationNode::operator(
                OperatorKind::Transpose,
                vec![ComputationNode::leaf(rows.clone()).unwrap()],
            ).unwrap()],
        ).unwrap();
        let (result, _) = Engine::run(&mut root, 3).unwrap();
        prop_assert_eq!(result, rows);
    }

    #[test]
    fn double_negate_is_identity(rows in matrix_strategy(6, 6)) {
        let mut root = ComputationNode::operator(
            OperatorKind::Negate,
            vec![ComputationNode::operator(
                OperatorKind::Negate,
                vec![ComputationNode::leaf(rows.clone()).unwrap()],
            ).unwrap()],
        ).unwrap();
        let (result, _) = Engine::run(&mut root, 3).unwrap();
        prop_assert_eq!(result, rows);
    }

    #[test]
    fn add_is_commutative(rows in matrix_strategy(5, 5)) {
        let other: Vec<Vec<f64>> = rows.iter().map(|r| r.iter().map(|v| v * 2.0 + 1.0).collect()).collect();

        let mut lhs = ComputationNode::operator(
            OperatorKind::Add,
            vec![ComputationNode::leaf(rows.clone()).unwrap(), ComputationNode::leaf(other.clone()).unwrap()],
        ).unwrap();
        let mut rhs = ComputationNode::operator(
            OperatorKind::Add,
            vec![ComputationNode::leaf(other).unwrap(), ComputationNode::leaf(rows).unwrap()],
        ).unwrap();

        let (a, _) = Engine::run(&mut lhs, 3).unwrap();
        let (b, _) = Engine::run(&mut rhs, 3).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn concurrent_adds_never_deadlock(len in 1usize..20, seed in vec(-50.0f64..50.0, 20)) {
        use std::sync::Arc;
        use std::time::{Duration, Instant};

        let values1: Vec<f64> = seed[..len].to_vec();
        let values2: Vec<f64> = seed[..len].iter().map(|v| v * 2.0 + 1.0).collect();

        let v1 = Arc::new(SharedVector::new(values1, parmat::Orientation::Row));
        let v2 = Arc::new(SharedVector::new(values2, parmat::Orientation::Row));

        let (a, b) = (Arc::clone(&v1), Arc::clone(&v2));
        let t1 = std::thread::spawn(move || { let _ = a.add(&b); });
        let (a, b) = (Arc::clone(&v2), Arc::clone(&v1));
        let t2 = std::thread::spawn(move || { let _ = a.add(&b); });

        let start = Instant::now();
        t1.join().unwrap();
        t2.join().unwrap();
        prop_assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn worker_ordering_is_antisymmetric_and_consistent_with_fatigue(
        busy_millis_a in 0u64..5, busy_millis_b in 0u64..5,
    ) {
        fn run_and_wait(w: &Worker, millis: u64) {
            use std::sync::atomic::{AtomicBool, Ordering};
            use std::sync::Arc;
            let done = Arc::new(AtomicBool::new(false));
            let d = Arc::clone(&done);
            w.submit(
                move || std::thread::sleep(std::time::Duration::from_millis(millis)),
                move || d.store(true, Ordering::SeqCst),
            ).unwrap();
            while !done.load(Ordering::SeqCst) {
                std::thread::yield_now();
            }
        }

        let a = Worker::spawn(0);
        let b = Worker::spawn(1);
        run_and_wait(&a, busy_millis_a);
        run_and_wait(&b, busy_millis_b);

        prop_assert_eq!(a.cmp(&a), std::cmp::Ordering::Equal);
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        prop_assert_eq!(a.cmp(&b), a.fatigue().total_cmp(&b.fatigue()));

        a.shutdown();
        b.shutdown();
    }
}
