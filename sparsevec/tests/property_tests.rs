use proptest::prelude::*;
use sparsevec::{Dissimilarity, SparseVector};

fn sparse_vector() -> impl Strategy<Value = SparseVector> {
    prop::collection::btree_map("[a-f]{1,2}", 0.0f64..10.0, 0..8)
        .prop_map(|weights| weights.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_dot_self_is_squared_norm(u in sparse_vector()) {
        let norm = u.l2norm();
        prop_assert!((SparseVector::dot(&u, &u) - norm * norm).abs() < 1e-9);
    }

    #[test]
    fn prop_normalize_unit_or_unchanged(u in sparse_vector()) {
        let mut v = u.clone();
        v.normalize();
        if u.l2norm() < sparsevec::EPSILON {
            prop_assert_eq!(v, u);
        } else {
            prop_assert!((v.l2norm() - 1.).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_interp_equal_sizes_is_average(a in sparse_vector(), b in sparse_vector()) {
        let mid = SparseVector::interp(&a, &b, 1., 1.);
        for key in a.keys().chain(b.keys()) {
            prop_assert!((mid.get(key) - (a.get(key) + b.get(key)) / 2.).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_dissimilarity_symmetric_and_nonnegative(a in sparse_vector(), b in sparse_vector()) {
        for sim in Dissimilarity::ALL {
            let ab = sim.distance(&a, &b);
            let ba = sim.distance(&b, &a);
            prop_assert!(ab >= 0.);
            prop_assert!((ab - ba).abs() < 1e-12);
        }
    }

    #[test]
    fn prop_identical_vectors_are_close(a in sparse_vector()) {
        for sim in Dissimilarity::ALL {
            prop_assert!(sim.distance(&a, &a) < 1e-9, "{} {:?}", sim, a);
        }
    }

    #[test]
    fn prop_disjoint_jaccard_is_one(
        a in prop::collection::btree_map("[a-c]{2}", 0.5f64..10.0, 1..5),
        b in prop::collection::btree_map("[x-z]{2}", 0.5f64..10.0, 1..5),
    ) {
        let a: SparseVector = a.into_iter().collect();
        let b: SparseVector = b.into_iter().collect();
        prop_assert_eq!(Dissimilarity::Jaccard.distance(&a, &b), 1.);
    }
}
