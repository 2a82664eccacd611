use cosine_sim::cpu::cosine_similarity_cpu;
use cosine_sim::threads::cosine_similarity_threads;
use cosine_sim::utils::compare_results;
use cosine_sim::VectorSet;
use proptest::prelude::*;

const EPSILON: f64 = 1e-9;

/// Two sets sharing a dimensionality, with components bounded away from
/// overflow.
fn paired_sets() -> impl Strategy<Value = (VectorSet, VectorSet)> {
    (1usize..8, 1usize..6, 1usize..6).prop_flat_map(|(dim, m, n)| {
        (
            prop::collection::vec(-100.0f64..100.0, dim * m),
            prop::collection::vec(-100.0f64..100.0, dim * n),
        )
            .prop_map(move |(a, b)| {
                (
                    VectorSet::from_flat(dim, a).unwrap(),
                    VectorSet::from_flat(dim, b).unwrap(),
                )
            })
    })
}

fn nonzero_vector(dim: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0f64..100.0, dim)
        .prop_filter("non-zero norm", |v| v.iter().map(|x| x * x).sum::<f64>() > 1e-6)
}

fn close(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() <= EPSILON
}

proptest! {
    #[test]
    fn shape_is_m_by_n((a, b) in paired_sets()) {
        let m = cosine_similarity_cpu(&a, &b);
        prop_assert_eq!(m.shape(), (a.len(), b.len()));
    }

    #[test]
    fn swapping_inputs_transposes((a, b) in paired_sets()) {
        let ab = cosine_similarity_cpu(&a, &b);
        let ba = cosine_similarity_cpu(&b, &a).transpose();
        prop_assert_eq!(ba.shape(), ab.shape());
        prop_assert_eq!(compare_results(&ab, &ba, EPSILON), Ok(()));
    }

    #[test]
    fn self_similarity_is_one(v in (1usize..10).prop_flat_map(nonzero_vector)) {
        let set = VectorSet::new(vec![v]).unwrap();
        let m = cosine_similarity_cpu(&set, &set);
        prop_assert!((m.get(0, 0) - 1.0).abs() <= EPSILON);
    }

    #[test]
    fn positive_scaling_is_invariant(
        (v, w) in (1usize..10).prop_flat_map(|d| (nonzero_vector(d), nonzero_vector(d))),
        c in 0.001f64..1000.0,
    ) {
        let scaled: Vec<f64> = v.iter().map(|x| x * c).collect();
        let w = VectorSet::new(vec![w]).unwrap();
        let base = cosine_similarity_cpu(&VectorSet::new(vec![v]).unwrap(), &w);
        let after = cosine_similarity_cpu(&VectorSet::new(vec![scaled]).unwrap(), &w);
        prop_assert!(close(base.get(0, 0), after.get(0, 0)));
    }

    #[test]
    fn matrix_matches_itself(
        (a, b) in paired_sets(),
        tolerance in 0.0f64..1.0,
    ) {
        let m = cosine_similarity_cpu(&a, &b);
        prop_assert!(compare_results(&m, &m, tolerance).is_ok());
    }

    #[test]
    fn threads_agree_with_sequential((a, b) in paired_sets()) {
        let parallel = cosine_similarity_threads(&a, &b);
        let sequential = cosine_similarity_cpu(&a, &b);
        prop_assert!(compare_results(&parallel, &sequential, EPSILON).is_ok());
    }
}
