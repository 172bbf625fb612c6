//! Text normalization and comparison used for answer grading.

use std::collections::BTreeSet;

/// Assumed speaking rate used to bound the length of recorded answers.
pub const WORDS_PER_MINUTE: u64 = 40;

/// Punctuation outside the ASCII range that learners commonly type.
const EXTRA_PUNCTUATION: &[char] = &[
    '¿', '¡', '«', '»', '“', '”', '‘', '’', '…', '。', '，', '！', '？', '、', '；', '：',
];

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || EXTRA_PUNCTUATION.contains(&c)
}

/// Lowercase, strip punctuation, collapse whitespace and trim.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !is_punctuation(*c))
        .collect::<String>()
        .to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Element-wise [`normalize`], order preserved.
pub fn normalize_all<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|item| normalize(item.as_ref())).collect()
}

/// Character-level Levenshtein distance, without normalization.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    sequence_distance(&a, &b)
}

/// Levenshtein distance between the normalized forms of `a` and `b`.
pub fn edit_distance(a: &str, b: &str) -> usize {
    levenshtein_distance(&normalize(a), &normalize(b))
}

/// Single-row edit distance over any comparable sequence.
fn sequence_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    // row[j] is the distance between the prefix of `a` seen so far and b[..j]
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, x) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let replace = diagonal + usize::from(x != y);
            diagonal = row[j + 1];
            row[j + 1] = replace.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// Indices of words in `actual` that do not line up with `expected`.
///
/// Both strings are split on whitespace and normalized token by token, then
/// aligned with a longest common subsequence. Every token of `actual` outside
/// the alignment (extra, substituted or out of order) is reported.
pub fn word_diff(expected: &str, actual: &str) -> BTreeSet<usize> {
    let expected_words = normalize_all(&expected.split_whitespace().collect::<Vec<_>>());
    let actual_words = normalize_all(&actual.split_whitespace().collect::<Vec<_>>());

    let m = expected_words.len();
    let n = actual_words.len();

    // lcs[i][j] = LCS length of expected[i..] and actual[j..]
    let mut lcs = vec![vec![0usize; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            lcs[i][j] = if expected_words[i] == actual_words[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut unmatched: BTreeSet<usize> = (0..n).collect();
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if expected_words[i] == actual_words[j] {
            unmatched.remove(&j);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }

    unmatched
}

/// Upper bound, in whole seconds, for reading `text` aloud.
pub fn estimate_speech_seconds(text: &str) -> u64 {
    let words = normalize(text).split_whitespace().count() as u64;
    (words * 60).div_ceil(WORDS_PER_MINUTE)
}
