use crate::core::scoring::calculate_similarity_score;
use crate::models::{Profile, RankingWeights, ScoredCandidate};
use std::cmp::Ordering;

/// Similarity ranker - orders candidates by closeness to the requesting player
///
/// Pure: the output depends only on the inputs. Equal scores keep the
/// order in which the profile store returned the candidates.
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: RankingWeights,
}

impl Ranker {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: RankingWeights::default(),
        }
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Rank candidates for `me`, closest first
    pub fn rank(&self, me: &Profile, candidates: Vec<Profile>) -> Vec<Profile> {
        self.rank_scored(me, candidates)
            .into_iter()
            .map(|scored| scored.profile)
            .collect()
    }

    /// Rank candidates for `me` and keep the scores
    ///
    /// The requesting player is dropped if the store returned them.
    pub fn rank_scored(&self, me: &Profile, candidates: Vec<Profile>) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|profile| profile.user_id != me.user_id)
            .map(|profile| {
                let score = calculate_similarity_score(me, &profile, &self.weights);
                ScoredCandidate { profile, score }
            })
            .collect();

        // sort_by is stable, so ties keep store order
        scored.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));

        scored
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_candidate(id: &str, hours: u32, age: u8, verified: bool) -> Profile {
        Profile {
            user_id: id.into(),
            name: format!("Player {}", id),
            username: None,
            hours,
            age,
            bio: String::new(),
            is_verified: Some(verified),
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_verified_outranks_slightly_closer() {
        let ranker = Ranker::with_default_weights();
        let me = create_candidate("a", 100, 20, false);

        let candidates = vec![
            create_candidate("c", 500, 40, false),
            create_candidate("b", 110, 22, true),
        ];

        let ranked = ranker.rank(&me, candidates);
        let ids: Vec<&str> = ranked.iter().map(|p| p.user_id.as_str()).collect();

        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranker = Ranker::with_default_weights();
        let me = create_candidate("me", 100, 20, false);

        let first = vec![
            create_candidate("x", 110, 20, false),
            create_candidate("y", 90, 20, false),
        ];
        let swapped = vec![
            create_candidate("y", 90, 20, false),
            create_candidate("x", 110, 20, false),
        ];

        let ranked: Vec<String> = ranker
            .rank(&me, first)
            .into_iter()
            .map(|p| p.user_id.to_string())
            .collect();
        assert_eq!(ranked, vec!["x", "y"]);

        let ranked: Vec<String> = ranker
            .rank(&me, swapped)
            .into_iter()
            .map(|p| p.user_id.to_string())
            .collect();
        assert_eq!(ranked, vec!["y", "x"]);
    }

    #[test]
    fn test_scores_are_non_decreasing() {
        let ranker = Ranker::with_default_weights();
        let me = create_candidate("me", 250, 25, false);

        let candidates: Vec<Profile> = (0..30)
            .map(|i| create_candidate(&i.to_string(), (i * 37) % 900, 18 + (i % 20) as u8, i % 4 == 0))
            .collect();

        let ranked = ranker.rank_scored(&me, candidates);

        assert_eq!(ranked.len(), 30);
        for i in 1..ranked.len() {
            assert!(ranked[i - 1].score <= ranked[i].score, "Candidates not sorted by score");
        }
    }

    #[test]
    fn test_self_is_excluded() {
        let ranker = Ranker::with_default_weights();
        let me = create_candidate("me", 100, 20, false);

        let ranked = ranker.rank(&me, vec![me.clone(), create_candidate("b", 100, 20, false)]);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].user_id.as_str(), "b");
    }
}
