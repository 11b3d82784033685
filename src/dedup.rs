//! Collapsing near-duplicate entries.
//!
//! Every ordered pair of live entries is compared by title. When two titles are
//! similar one of them is dropped: a scraped entry always loses to a curated
//! one, and between two curated entries the one being scanned against loses.
//!
//! Clusters collapse pair by pair, not as connected components. With a
//! non-transitive chain (A~B, B~C, A≁C) the survivors can depend on the order
//! entries were pooled in.

use crate::{
    entry::{Entry, Method},
    similarity,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Ingestion is supposed to filter these out; reaching the resolver is a bug upstream.
    #[error("entry #{index} ({key}) has an empty title")]
    EmptyTitle { index: usize, key: String },
}

/// Drop near-duplicate entries, keeping survivors in their original order.
pub fn resolve(entries: Vec<Entry>, threshold: f64) -> Result<Vec<Entry>, ResolveError> {
    if let Some((index, e)) = entries
        .iter()
        .enumerate()
        .find(|(_, e)| e.title.trim().is_empty())
    {
        return Err(ResolveError::EmptyTitle {
            index,
            key: e.key.clone(),
        });
    }

    let n = entries.len();
    let mut alive = vec![true; n];

    for i in 0..n {
        for j in 0..n {
            if !alive[i] {
                break;
            }
            if i == j || !alive[j] {
                continue;
            }
            let (a, b) = (&entries[i], &entries[j]);
            if !similarity::is_similar(&a.title, &b.title, threshold) {
                continue;
            }

            let loser = if a.method == Method::Scraped { i } else { j };
            let winner = if loser == i { j } else { i };
            alive[loser] = false;
            tracing::info!(
                first = %a.title,
                second = %b.title,
                kept = %entries[winner].key,
                dropped = %entries[loser].key,
                "duplicate titles"
            );
        }
    }

    let survivors: Vec<Entry> = entries
        .into_iter()
        .zip(alive)
        .filter_map(|(e, keep)| keep.then_some(e))
        .collect();
    tracing::debug!(before = n, after = survivors.len(), "resolved duplicates");
    Ok(survivors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entry::tests::entry, similarity::DEFAULT_THRESHOLD};
    use Method::{Curated, Scraped};

    fn keys(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    fn run(entries: Vec<Entry>) -> Vec<Entry> {
        resolve(entries, DEFAULT_THRESHOLD).expect("valid pool")
    }

    #[test]
    fn empty_and_singleton_pools_are_unchanged() {
        assert!(run(vec![]).is_empty());
        let one = vec![entry("a", "Only", Scraped)];
        assert_eq!(run(one.clone()), one);
    }

    #[test]
    fn curated_beats_scraped() {
        let out = run(vec![entry("a", "Foo Bar", Scraped), entry("b", "foo bar", Curated)]);
        assert_eq!(keys(&out), ["b"]);

        let out = run(vec![entry("a", "Foo Bar", Curated), entry("b", "foo bar", Scraped)]);
        assert_eq!(keys(&out), ["a"]);
    }

    #[test]
    fn earlier_curated_entry_survives() {
        let out = run(vec![entry("a", "Foo", Curated), entry("b", "foo", Curated)]);
        assert_eq!(keys(&out), ["a"]);
    }

    #[test]
    fn later_scraped_entry_survives_between_scraped() {
        let out = run(vec![entry("a", "Foo", Scraped), entry("b", "foo", Scraped)]);
        assert_eq!(keys(&out), ["b"]);
    }

    #[test]
    fn distinct_titles_are_all_kept_in_order() {
        let pool = vec![
            entry("a", "Deep Learning for Vision", Scraped),
            entry("b", "Reinforcement Learning for Control", Curated),
            entry("c", "A Survey of Graph Neural Networks", Scraped),
            entry("d", "Probabilistic Programming in Practice", Curated),
            entry("e", "Sparse Matrix Kernels on GPUs", Scraped),
        ];
        assert_eq!(run(pool.clone()), pool);
    }

    #[test]
    fn cluster_collapses_to_curated_entry() {
        let out = run(vec![
            entry("s1", "Attention Is All You Need", Scraped),
            entry("c", "Attention is all you need.", Curated),
            entry("s2", "Attention Is All You Need!", Scraped),
        ]);
        assert_eq!(keys(&out), ["c"]);
    }

    #[test]
    fn survivors_keep_relative_order() {
        let out = run(vec![
            entry("x", "Sparse Matrix Kernels on GPUs", Curated),
            entry("a", "Deep Learning for Vision", Scraped),
            entry("y", "Probabilistic Programming in Practice", Scraped),
            entry("b", "Deep learning for vision.", Curated),
        ]);
        assert_eq!(keys(&out), ["x", "y", "b"]);
    }

    #[test]
    fn non_transitive_chain_depends_on_pool_order() {
        // on~tpu and tpu~in, but on≁in
        let on = entry("on", "Kernels on GPUs", Curated);
        let tpu = entry("tpu", "Kernels on TPUs", Curated);
        let inside = entry("in", "Kernels in TPUs", Curated);
        assert!(!similarity::is_similar(&on.title, &inside.title, DEFAULT_THRESHOLD));

        let out = run(vec![on.clone(), tpu.clone(), inside.clone()]);
        assert_eq!(keys(&out), ["on", "in"]);

        let out = run(vec![tpu, on, inside]);
        assert_eq!(keys(&out), ["tpu"]);
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut bad = entry("bad", "placeholder", Curated);
        bad.title = " ".into();
        let err = resolve(vec![entry("a", "Foo", Curated), bad], DEFAULT_THRESHOLD).unwrap_err();
        assert_eq!(
            err,
            ResolveError::EmptyTitle {
                index: 1,
                key: "bad".into()
            }
        );
    }

    fn arb_pool() -> impl proptest::strategy::Strategy<Value = Vec<Entry>> {
        use proptest::strategy::Strategy;
        let titles = vec![
            "Deep Learning for Vision",
            "Deep Learning for Vision.",
            "deep learning for vision",
            "Reinforcement Learning for Control",
            "Reinforcement learning for control!",
            "A Survey of Graph Neural Networks",
            "Sparse Matrix Kernels on GPUs",
        ];
        proptest::collection::vec(
            (proptest::sample::select(titles), proptest::bool::ANY),
            0..8,
        )
        .prop_map(|items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (title, curated))| {
                    entry(&format!("k{i}"), title, if curated { Curated } else { Scraped })
                })
                .collect()
        })
    }

    #[test]
    fn resolve_is_idempotent() {
        proptest::proptest!(|(pool in arb_pool())| {
            let once = run(pool);
            let twice = run(once.clone());
            proptest::prop_assert_eq!(once, twice);
        })
    }

    #[test]
    fn survivors_are_an_ordered_subsequence() {
        proptest::proptest!(|(pool in arb_pool())| {
            let out = run(pool.clone());
            let mut rest = pool.iter();
            for kept in &out {
                proptest::prop_assert!(rest.any(|e| e == kept));
            }
        })
    }

    #[test]
    fn survivors_are_pairwise_distinct() {
        proptest::proptest!(|(pool in arb_pool())| {
            let out = run(pool);
            for (i, a) in out.iter().enumerate() {
                for b in &out[i + 1..] {
                    proptest::prop_assert!(!similarity::is_similar(&a.title, &b.title, DEFAULT_THRESHOLD));
                }
            }
        })
    }

    #[test]
    fn curated_entry_survives_when_it_has_no_curated_duplicate() {
        proptest::proptest!(|(pool in arb_pool())| {
            let out = run(pool.clone());
            for (i, c) in pool.iter().enumerate().filter(|(_, e)| e.method == Curated) {
                let curated_twin = pool
                    .iter()
                    .enumerate()
                    .any(|(j, o)| j != i && o.method == Curated
                        && similarity::is_similar(&o.title, &c.title, DEFAULT_THRESHOLD));
                if !curated_twin {
                    proptest::prop_assert!(out.contains(c));
                }
            }
        })
    }
}
