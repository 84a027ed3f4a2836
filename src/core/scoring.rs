use crate::models::{Profile, RankingWeights};

/// Calculate the similarity score of `candidate` as seen from `me`
///
/// Lower is closer. Scoring formula:
/// score = (
///     |hours diff| * 0.5 +         # Similar experience
///     |age diff| * 0.5 +           # Similar age
///     verified_bonus +             # -20 when the candidate is verified
///     keyword_bonus                # -10 when the bio mentions an affinity keyword
/// )
pub fn calculate_similarity_score(
    me: &Profile,
    candidate: &Profile,
    weights: &RankingWeights,
) -> f64 {
    let hours_diff = (candidate.hours as f64 - me.hours as f64).abs();
    let age_diff = (candidate.age as f64 - me.age as f64).abs();

    let verified = if candidate.verified() { weights.verified_bonus } else { 0.0 };
    let keyword = if mentions_keyword(&candidate.bio, &weights.keywords) {
        weights.keyword_bonus
    } else {
        0.0
    };

    hours_diff * weights.hours + age_diff * weights.age + verified + keyword
}

/// Case-insensitive substring match against the affinity keyword set
#[inline]
pub fn mentions_keyword(bio: &str, keywords: &[String]) -> bool {
    if bio.is_empty() || keywords.is_empty() {
        return false;
    }

    let bio = bio.to_lowercase();
    keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && bio.contains(keyword.to_lowercase().as_str()))
}
