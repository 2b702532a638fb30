use rand::{Rng, seq::IndexedRandom};

use crate::crd::S3BucketClass;

/// Picks a class uniformly at random among `candidates`, the classes matching
/// the class selector of a claim.
///
/// Returns [`None`] if no class matches.
pub fn schedule<'a, R>(candidates: &'a [S3BucketClass], rng: &mut R) -> Option<&'a S3BucketClass>
where
    R: Rng + ?Sized,
{
    candidates.choose(rng)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use kube::ResourceExt;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::crd::{ObjectReference, S3BucketClassSpec, S3BucketParameters};

    fn class(name: &str) -> S3BucketClass {
        S3BucketClass::new(
            name,
            S3BucketClassSpec {
                for_provider: S3BucketParameters {
                    region: "lpg".to_owned(),
                    ..Default::default()
                },
                provider_ref: ObjectReference {
                    name: "cloudscale".to_owned(),
                    namespace: None,
                },
                reclaim_policy: None,
                write_connection_secrets_to_namespace: None,
            },
        )
    }

    fn candidates() -> Vec<S3BucketClass> {
        vec![class("fast-lpg"), class("fast-rma"), class("slow-lpg")]
    }

    #[test]
    fn every_candidate_is_picked_eventually() {
        let candidates = candidates();
        let mut rng = StdRng::seed_from_u64(42);

        let picked: BTreeSet<String> = (0..64)
            .filter_map(|_| schedule(&candidates, &mut rng))
            .map(|class| class.name_any())
            .collect();

        assert_eq!(
            picked,
            BTreeSet::from([
                "fast-lpg".to_owned(),
                "fast-rma".to_owned(),
                "slow-lpg".to_owned()
            ])
        );
    }

    #[test]
    fn single_candidate_is_always_picked() {
        let candidates = vec![class("slow-lpg")];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..8 {
            assert_eq!(schedule(&candidates, &mut rng), Some(&candidates[0]));
        }
    }

    #[test]
    fn no_matching_class_leaves_claim_unbound() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(schedule(&[], &mut rng), None);
    }

    #[test]
    fn same_seed_picks_same_class() {
        let candidates = candidates();

        let first = schedule(&candidates, &mut StdRng::seed_from_u64(7));
        let second = schedule(&candidates, &mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
    }
}
