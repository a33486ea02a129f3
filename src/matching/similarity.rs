//! Ratcliff/Obershelp sequence similarity.
//!
//! The ratio is `2 * M / T`, where `T` is the total number of characters in
//! both strings and `M` the number of characters in matching blocks. Blocks
//! are found by taking the longest common substring, then recursing on the
//! pieces to its left and right. Strings are compared per Unicode scalar
//! value so accented names count one character per letter.

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
///
/// Among blocks of equal size the one starting earliest in `a` wins, then
/// the one starting earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // prev[j + 1] = length of the common run ending at a[i - 1], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for i in alo..ahi {
        for slot in curr.iter_mut() {
            *slot = 0;
        }
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = prev[j] + 1;
                curr[j + 1] = k;
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}

/// Number of characters covered by matching blocks.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

/// Similarity ratio between two strings, in `[0.0, 1.0]`.
///
/// Two empty strings are identical (1.0). Comparison is case-sensitive;
/// callers normalize case first.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let length = a.len() + b.len();
    if length == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / length as f64
}

/// Up to `n` candidates whose ratio to `word` is at least `cutoff`, best first.
///
/// Equal scores keep the order of `candidates`, so earlier entries win ties.
pub fn close_matches<'a, S: AsRef<str>>(
    word: &str,
    candidates: &'a [S],
    n: usize,
    cutoff: f64,
) -> Vec<(&'a str, f64)> {
    if n == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(&'a str, f64)> = candidates
        .iter()
        .map(|c| c.as_ref())
        .map(|c| (c, ratio(word, c)))
        .filter(|(_, score)| *score >= cutoff)
        .collect();

    // sort_by is stable, preserving candidate order between equal scores
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(n);
    scored
}
