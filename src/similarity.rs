//! Title similarity scoring.
//!
//! The score is the Ratcliff/Obershelp "gestalt" ratio: find the longest common
//! substring, recurse on the pieces to its left and right, and sum the sizes of
//! every block found. The ratio is `2 * matched / (len(a) + len(b))`.
//!
//! Block search is greedy and ties go to the earliest block, with no junk
//! elements except the "popular" ones of long sequences. The duplicate
//! threshold was tuned against exactly these scores, so an LCS or edit-distance
//! ratio is not a drop-in replacement.

use std::collections::HashMap;

/// Titles scoring strictly above this ratio are considered the same work.
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Sequences at least this long get their most frequent elements excluded from
/// match seeding.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Case-insensitive similarity check between two titles.
pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    ratio(a, b) > threshold
}

/// Case-insensitive similarity ratio in `[0, 1]`.
///
/// Ratcliff/Obershelp is not symmetric in general (the longest-match tie-break
/// and the junk heuristic both look at which side is which), so the two
/// lower-cased strings are always fed to the matcher in lexicographic order.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let (first, second) = if a <= b { (&a, &b) } else { (&b, &a) };

    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();
    let total = first.len() + second.len();
    if total == 0 {
        return 1.0;
    }

    let matched = Matcher::new(&first, &second).matched();
    2.0 * matched as f64 / total as f64
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each element of `b`, minus popular elements.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }

        Matcher { a, b, b2j }
    }

    /// Total size of all matching blocks.
    fn matched(&self) -> usize {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given window.
    ///
    /// Among equally long blocks the one starting earliest in `a` wins, then the
    /// one starting earliest in `b`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (a, b) = (self.a, self.b);
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);

        // j2len[j] = length of the longest match ending at a[i-1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular elements never seed a match, but they may still extend one.
        while besti > alo && bestj > blo && a[besti - 1] == b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi && bestj + bestsize < bhi && a[besti + bestsize] == b[bestj + bestsize] {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }
}
