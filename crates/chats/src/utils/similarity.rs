//! Token-level fuzzy phrase similarity used by the FAQ matcher.

/// Split text into lowercase alphanumeric tokens.
///
/// Punctuation acts as a separator, so `"Hi!"` and `"hi"` tokenize the same.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score of a token pair that differs only by a typo
const TYPO_SCORE: f64 = 0.95;

/// Edits tolerated as a typo for tokens of this length
fn typo_budget(longest: usize) -> usize {
    match longest {
        0..=2 => 0,
        3..=7 => 1,
        _ => 2,
    }
}

/// Similarity of two tokens.
///
/// A pair within the typo budget (transpositions count as one edit) scores
/// [`TYPO_SCORE`], so a slip on a short word does not sink the phrase.
fn token_similarity(token: &str, candidate: &str) -> f64 {
    if token == candidate {
        return 1.0;
    }

    let normalized = strsim::normalized_levenshtein(token, candidate);
    let longest = token.chars().count().max(candidate.chars().count());
    if strsim::damerau_levenshtein(token, candidate) <= typo_budget(longest) {
        return normalized.max(TYPO_SCORE);
    }
    normalized
}

/// Best similarity of `token` against any of `candidates`
fn best_token_match(token: &str, candidates: &[String]) -> f64 {
    candidates
        .iter()
        .map(|candidate| token_similarity(token, candidate))
        .fold(0.0, f64::max)
}

/// Sum of best matches of every token in `from` against `to`
fn directional_score(from: &[String], to: &[String]) -> f64 {
    from.iter().map(|token| best_token_match(token, to)).sum()
}

/// Similarity of two phrases in `[0, 1]`.
///
/// Each token is paired with its closest token on the other side, in both
/// directions, and the matches are averaged over all tokens. Word order is
/// ignored and a typo costs a small fixed fraction of one token.
///
/// ```
/// use concierge_chats::utils::phrase_similarity;
///
/// assert_eq!(phrase_similarity("Hi!", "hi"), 1.0);
/// assert!(phrase_similarity("wat is the rent", "what is the rent") > 0.9);
/// assert!(phrase_similarity("helo", "hello") > 0.9);
/// assert!(phrase_similarity("can I paint the walls", "are pets allowed") < 0.5);
/// ```
pub fn phrase_similarity(left: &str, right: &str) -> f64 {
    let left = tokenize(left);
    let right = tokenize(right);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let total = directional_score(&left, &right) + directional_score(&right, &left);
    total / (left.len() + right.len()) as f64
}
