//! Ratcliff/Obershelp similarity over normalized text.
//!
//! The ratio is `2 * M / (len(a) + len(b))`, where `M` is the number of
//! characters in the matching blocks found by repeatedly taking the longest
//! common substring and recursing on both sides of it. Lengths are counted in
//! Unicode scalar values.

use std::collections::HashMap;

/// A string prepared once for repeated scoring
///
/// Holds the character vector and, for every character, the ascending list of
/// positions where it occurs. Candidate texts are prepared when the index is
/// built; the running transcript is prepared once per segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedText {
    text: String,
    chars: Vec<char>,
    positions: HashMap<char, Vec<usize>>,
}

impl PreparedText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let chars: Vec<char> = text.chars().collect();
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (i, &c) in chars.iter().enumerate() {
            positions.entry(c).or_default().push(i);
        }
        Self {
            text,
            chars,
            positions,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// Reusable scorer that keeps its scratch buffers between calls
#[derive(Debug, Default)]
pub struct Scorer {
    j2len: Vec<usize>,
    new_j2len: Vec<usize>,
    touched: Vec<usize>,
    new_touched: Vec<usize>,
    queue: Vec<(usize, usize, usize, usize)>,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Similarity ratio in [0, 1] between two prepared texts
    ///
    /// Both empty is 1.0, exactly one empty is 0.0.
    pub fn ratio(&mut self, a: &PreparedText, b: &PreparedText) -> f64 {
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a.chars == b.chars {
            return 1.0;
        }

        let matches = self.matching_characters(a, b);
        2.0 * matches as f64 / total as f64
    }

    /// Total size of all matching blocks between `a` and `b`
    fn matching_characters(&mut self, a: &PreparedText, b: &PreparedText) -> usize {
        self.reset(b.len());
        self.queue.clear();
        self.queue.push((0, a.len(), 0, b.len()));

        let mut matched = 0;
        while let Some((alo, ahi, blo, bhi)) = self.queue.pop() {
            let (i, j, k) = self.longest_match(a, b, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                self.queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                self.queue.push((i + k, ahi, j + k, bhi));
            }
        }
        matched
    }

    /// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`
    ///
    /// Among blocks of maximal size, returns the one starting earliest in `a`,
    /// then earliest in `b`.
    fn longest_match(
        &mut self,
        a: &PreparedText,
        b: &PreparedText,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        // j2len[j + 1] holds the length of the match ending at a[i - 1], b[j]
        for i in alo..ahi {
            if let Some(positions) = b.positions.get(&a.chars[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = self.j2len[j] + 1;
                    self.new_j2len[j + 1] = k;
                    self.new_touched.push(j + 1);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }

            for &slot in &self.touched {
                self.j2len[slot] = 0;
            }
            self.touched.clear();
            std::mem::swap(&mut self.j2len, &mut self.new_j2len);
            std::mem::swap(&mut self.touched, &mut self.new_touched);
        }

        for &slot in &self.touched {
            self.j2len[slot] = 0;
        }
        self.touched.clear();

        (best_i, best_j, best_size)
    }

    fn reset(&mut self, b_len: usize) {
        for buf in [&mut self.j2len, &mut self.new_j2len] {
            buf.clear();
            buf.resize(b_len + 1, 0);
        }
        self.touched.clear();
        self.new_touched.clear();
    }
}

/// Similarity ratio between two strings
///
/// Convenience wrapper that prepares both sides; hot loops should prepare once
/// and reuse a [`Scorer`].
pub fn similarity(a: &str, b: &str) -> f64 {
    Scorer::new().ratio(&PreparedText::new(a), &PreparedText::new(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_strings() {
        assert!(approx(similarity("", ""), 1.0));
        assert!(approx(similarity("", "abc"), 0.0));
        assert!(approx(similarity("abc", ""), 0.0));
    }

    #[test]
    fn test_identical() {
        assert!(approx(similarity("قل هو الله احد", "قل هو الله احد"), 1.0));
        assert!(approx(similarity("x", "x"), 1.0));
    }

    #[test]
    fn test_no_common_characters() {
        assert!(approx(similarity("abc", "xyz"), 0.0));
    }

    #[test]
    fn test_known_ratios() {
        // Single block "bcd"
        assert!(approx(similarity("abcd", "bcde"), 0.75));
        // Blocks "ab" and "cd"
        assert!(approx(similarity("abxcd", "abcd"), 8.0 / 9.0));
    }

    #[test]
    fn test_unicode_lengths_in_chars() {
        // "ا ل" against "ا ل ه": 3 matched of 3 + 5 characters
        assert!(approx(similarity("ا ل", "ا ل ه"), 6.0 / 8.0));
    }

    #[test]
    fn test_bounds() {
        let pairs = [
            ("الحمد لله", "رب العالمين"),
            ("aaaa", "aa"),
            ("abab", "baba"),
            ("قل اعوذ برب الناس", "قل اعوذ برب الفلق"),
        ];
        for (a, b) in pairs {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "{a} vs {b} = {s}");
        }
    }

    #[test]
    fn test_scorer_reuse_is_stable() {
        let mut scorer = Scorer::new();
        let a = PreparedText::new("abxcd");
        let b = PreparedText::new("abcd");
        let c = PreparedText::new("bcde");
        let first = scorer.ratio(&a, &b);
        let _ = scorer.ratio(&c, &a);
        assert!(approx(scorer.ratio(&a, &b), first));
    }
}
