use log::debug;

use std::collections::HashSet;

pub use crate::config::*;

/// A builder for collecting the rankings of a voting round.
///
/// Each voter submits an ordered list of candidates. The builder turns it into
/// one [`Ballot`] entry per candidate.
///
/// ```
/// use ballot_tally::builder::Builder;
/// use ballot_tally::TallyRules;
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES);
/// builder.add_ranking("liam", &[(2, "Up".to_string()), (1, "Heat".to_string())]);
/// builder.add_ranking("noah", &[(2, "Up".to_string())]);
///
/// let leaderboard = builder.score();
/// assert_eq!(leaderboard.candidates[0].candidate_id, 2);
/// ```
pub struct Builder<C, L> {
    pub(crate) _rules: TallyRules,
    pub(crate) _ballots: Vec<Ballot<C, L>>,
}

impl<C: CandidateKey, L: Clone> Builder<C, L> {
    pub fn new(rules: &TallyRules) -> Builder<C, L> {
        Builder {
            _rules: rules.clone(),
            _ballots: Vec::new(),
        }
    }

    /// Records the ranking of a voter, most preferred first.
    ///
    /// The candidate at position `i` gets the preference `i + 1`. A candidate
    /// listed again further down is ignored, but its position still counts.
    /// Submitting a ranking again for the same voter replaces the previous one.
    ///
    /// Returns the number of entries recorded.
    pub fn add_ranking(&mut self, voter: &str, ranking: &[(C, L)]) -> usize {
        let before = self._ballots.len();
        self._ballots.retain(|b| b.voter_id != voter);
        if self._ballots.len() != before {
            debug!(
                "add_ranking: {}: replacing {} previous entries",
                voter,
                before - self._ballots.len()
            );
        }

        let mut seen: HashSet<C> = HashSet::new();
        let mut added = 0;
        for (idx, (cid, label)) in ranking.iter().enumerate() {
            if !seen.insert(cid.clone()) {
                debug!("add_ranking: {}: skipping repeated choice at rank {}", voter, idx + 1);
                continue;
            }
            self._ballots.push(Ballot {
                candidate_id: cid.clone(),
                voter_id: voter.to_string(),
                preference: (idx + 1) as u32,
                display_label: label.clone(),
            });
            added += 1;
        }
        added
    }

    /// Adds a single entry as is.
    pub fn add_ballot(&mut self, ballot: Ballot<C, L>) {
        self._ballots.push(ballot);
    }

    pub fn ballots(&self) -> &[Ballot<C, L>] {
        &self._ballots
    }

    pub fn score(&self) -> Leaderboard<C, L> {
        crate::score_with_rules(&self._ballots, &self._rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(ids: &[u32]) -> Vec<(u32, String)> {
        ids.iter().map(|id| (*id, format!("movie {}", id))).collect()
    }

    #[test]
    fn preferences_follow_positions() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES);
        assert_eq!(builder.add_ranking("liam", &ranking(&[3, 1, 2])), 3);
        let prefs: Vec<(u32, u32)> = builder
            .ballots()
            .iter()
            .map(|b| (b.candidate_id, b.preference))
            .collect();
        assert_eq!(prefs, vec![(3, 1), (1, 2), (2, 3)]);
        assert!(builder.ballots().iter().all(|b| b.voter_id == "liam"));
    }

    #[test]
    fn repeated_choice_is_skipped() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES);
        assert_eq!(builder.add_ranking("liam", &ranking(&[3, 3, 2])), 2);
        let prefs: Vec<(u32, u32)> = builder
            .ballots()
            .iter()
            .map(|b| (b.candidate_id, b.preference))
            .collect();
        assert_eq!(prefs, vec![(3, 1), (2, 3)]);
    }

    #[test]
    fn resubmission_replaces_ranking() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES);
        builder.add_ranking("liam", &ranking(&[1, 2]));
        builder.add_ranking("noah", &ranking(&[2]));
        builder.add_ranking("liam", &ranking(&[2, 1]));
        let liam: Vec<(u32, u32)> = builder
            .ballots()
            .iter()
            .filter(|b| b.voter_id == "liam")
            .map(|b| (b.candidate_id, b.preference))
            .collect();
        assert_eq!(liam, vec![(2, 1), (1, 2)]);
        assert_eq!(builder.ballots().len(), 3);
    }

    #[test]
    fn builder_scores_its_ballots() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES);
        builder.add_ranking("liam", &ranking(&[1, 2]));
        builder.add_ranking("noah", &ranking(&[1]));
        builder.add_ballot(Ballot::new(2, "emma", 1, "movie 2".to_string()));
        let lb = builder.score();
        assert_eq!(lb, crate::score(builder.ballots()));
        // Tied on the first pass, the first-seen candidate is eliminated.
        assert_eq!(lb.total_passes, 2);
        assert_eq!(lb.current_pass, 2);
        assert_eq!(lb.candidates[0].candidate_id, 2);
        assert_eq!(lb.candidates[0].display_label, "movie 2");
    }
}
