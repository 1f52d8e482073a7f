use agglomerative::{DissimilarityMatrix, Hclust, Linkage};
use proptest::prelude::*;
use sparsevec::{Dissimilarity, SparseVector};

fn sparse_vectors() -> impl Strategy<Value = Vec<SparseVector>> {
    prop::collection::vec(
        prop::collection::btree_map("[a-e]", 1.0f64..5.0, 1..5)
            .prop_map(|weights| weights.into_iter().collect::<SparseVector>()),
        0..12,
    )
}

fn linkage() -> impl Strategy<Value = Linkage> {
    prop_oneof![Just(Linkage::Single), Just(Linkage::Average)]
}

proptest! {
    #[test]
    fn prop_merge_count(vectors in sparse_vectors(), linkage in linkage()) {
        let merges = Hclust::new(linkage)
            .cluster(&vectors, |x, y| Dissimilarity::Jaccard.distance(x, y));
        prop_assert_eq!(merges.len(), vectors.len().saturating_sub(1));
    }

    #[test]
    fn prop_sizes_sum_up(vectors in sparse_vectors(), linkage in linkage()) {
        let merges = Hclust::new(linkage)
            .cluster(&vectors, |x, y| Dissimilarity::Cosine.distance(x, y));
        if let Some(last) = merges.last() {
            prop_assert_eq!(last.sizes[0] + last.sizes[1], vectors.len());
        }
        for merge in &merges {
            prop_assert!(merge.pair[0] < merge.pair[1]);
        }
    }

    #[test]
    fn prop_single_linkage_is_monotone(vectors in sparse_vectors()) {
        let merges = Hclust::new(Linkage::Single)
            .cluster(&vectors, |x, y| Dissimilarity::CosineInf.distance(x, y));
        for w in merges.windows(2) {
            prop_assert!(w[0].dist <= w[1].dist);
        }
    }

    #[test]
    fn prop_parallel_matches_sequential(vectors in sparse_vectors(), linkage in linkage()) {
        let dissim = |x: &SparseVector, y: &SparseVector| Dissimilarity::CosineJaccard.distance(x, y);
        let hclust = Hclust::new(linkage);
        prop_assert_eq!(
            hclust.cluster(&vectors, dissim),
            hclust.cluster_in_parallel(&vectors, dissim)
        );
    }

    #[test]
    fn prop_two_items_merge_at_their_distance(vectors in sparse_vectors(), linkage in linkage()) {
        if vectors.len() >= 2 {
            let pair = &vectors[..2];
            let merges = Hclust::new(linkage)
                .cluster_matrix(DissimilarityMatrix::new(pair, |x, y| Dissimilarity::Cosine.distance(x, y)));
            prop_assert_eq!(merges.len(), 1);
            prop_assert_eq!(merges[0].dist, Dissimilarity::Cosine.distance(&pair[1], &pair[0]));
        }
    }
}
