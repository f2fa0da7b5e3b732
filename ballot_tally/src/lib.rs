/*!
Sequential-elimination tally for ranked ballots.

The entry point is [`score`]. It takes a flat list of [`Ballot`] entries (one entry per
voter and ranked candidate) and returns a [`Leaderboard`].

```
use ballot_tally::{score, Ballot};

let ballots = vec![
    Ballot::new(1, "liam", 1, "Shrek"),
    Ballot::new(1, "noah", 1, "Shrek"),
    Ballot::new(2, "emma", 1, "Up"),
];
let leaderboard = score(&ballots);
assert_eq!(leaderboard.current_pass, 1);
assert_eq!(leaderboard.candidates[0].display_label, "Shrek");
```

See the [manual] for the details of the counting rules.
*/
pub mod builder;
mod config;
pub mod manual;

use log::{debug, info};

use std::collections::{HashMap, HashSet};

pub use crate::config::*;

// **** Private structures ****

type PassId = u32;

// Position of a candidate in the table, in first-seen order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateIdx(usize);

// A ballot entry with its candidate already resolved.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct Entry {
    candidate: CandidateIdx,
    preference: u32,
}

impl Entry {
    fn is_eligible(&self, pass: PassId, disqualified: &HashSet<CandidateIdx>) -> bool {
        self.preference >= pass && !disqualified.contains(&self.candidate)
    }
}

struct CandidateTable<C, L> {
    candidates: Vec<Candidate<C, L>>,
    entries: Vec<Entry>,
}

impl<C: CandidateKey, L: Clone> CandidateTable<C, L> {
    fn build(ballots: &[Ballot<C, L>]) -> CandidateTable<C, L> {
        let mut index: HashMap<C, CandidateIdx> = HashMap::new();
        let mut candidates: Vec<Candidate<C, L>> = Vec::new();
        let mut entries: Vec<Entry> = Vec::with_capacity(ballots.len());
        for b in ballots.iter() {
            let candidate = *index.entry(b.candidate_id.clone()).or_insert_with(|| {
                candidates.push(Candidate {
                    candidate_id: b.candidate_id.clone(),
                    display_label: b.display_label.clone(),
                    votes: 0,
                    percent: 0.0,
                });
                CandidateIdx(candidates.len() - 1)
            });
            entries.push(Entry {
                candidate,
                preference: b.preference,
            });
        }
        CandidateTable {
            candidates,
            entries,
        }
    }
}

/// Tallies the ballots of one voting round with the default rules.
///
/// The function is total: any list of ballots, including an empty one, gives a
/// leaderboard.
pub fn score<C: CandidateKey, L: Clone>(ballots: &[Ballot<C, L>]) -> Leaderboard<C, L> {
    score_with_rules(ballots, &TallyRules::DEFAULT_RULES)
}

/// Tallies the ballots of one voting round.
///
/// Arguments:
/// * `ballots` the entries of the round, in any order
/// * `rules` the rules that govern the tally
pub fn score_with_rules<C: CandidateKey, L: Clone>(
    ballots: &[Ballot<C, L>],
    rules: &TallyRules,
) -> Leaderboard<C, L> {
    info!(
        "score: processing {} ballot entries, rules: {:?}",
        ballots.len(),
        rules
    );
    let CandidateTable {
        mut candidates,
        entries,
    } = CandidateTable::build(ballots);

    let total_passes = pass_count(candidates.len());
    if total_passes == 0 {
        info!("score: no candidates, nothing to tally");
        return Leaderboard::empty();
    }
    debug!("score: {} distinct candidates", total_passes);

    let mut disqualified: HashSet<CandidateIdx> = HashSet::new();
    let mut pass: PassId = 1;
    let termination = loop {
        let total_votes_for_pass = entries
            .iter()
            .filter(|e| e.is_eligible(pass, &disqualified))
            .count() as u64;

        if total_votes_for_pass == 0 {
            info!("Pass {}: no eligible ballot left", pass);
            break Termination::BallotsExhausted;
        }

        for e in entries.iter().filter(|e| e.is_eligible(pass, &disqualified)) {
            let c = &mut candidates[e.candidate.0];
            c.votes += 1;
            c.percent = c.votes as f64 / total_votes_for_pass as f64;
        }

        let (top, bottom) = find_extremum(&candidates, &disqualified, rules.extremum_scan);
        info!(
            "Pass {} ({} eligible ballots): top {:?} with {} votes ({:.3}), bottom {:?} with {} votes",
            pass,
            total_votes_for_pass,
            top,
            candidates[top.0].votes,
            candidates[top.0].percent,
            bottom,
            candidates[bottom.0].votes
        );
        for (idx, c) in candidates.iter().enumerate() {
            debug!(
                "Pass {}: candidate {:?}: {} votes, {:.4} disqualified: {}",
                pass,
                idx,
                c.votes,
                c.percent,
                disqualified.contains(&CandidateIdx(idx))
            );
        }

        if candidates[top.0].percent > 0.5 {
            break Termination::Majority;
        }
        if pass >= total_passes {
            break Termination::PassesExhausted;
        }

        debug!("Pass {}: disqualifying {:?}", pass, bottom);
        disqualified.insert(bottom);
        pass += 1;
    };
    info!("score: stopped at pass {}/{}: {:?}", pass, total_passes, termination);

    // Stable: candidates with the same percent stay in first-seen order.
    candidates.sort_by(|a, b| b.percent.total_cmp(&a.percent));

    Leaderboard {
        current_pass: pass,
        total_passes,
        candidates,
        termination,
    }
}

// One pass per candidate, saturating at u32::MAX: with more candidates than
// that the tally stops with PassesExhausted on the last representable pass.
fn pass_count(num_candidates: usize) -> PassId {
    PassId::try_from(num_candidates).unwrap_or(PassId::MAX)
}

// Returns the (top, bottom) candidates of the pass.
fn find_extremum<C, L>(
    candidates: &[Candidate<C, L>],
    disqualified: &HashSet<CandidateIdx>,
    mode: ExtremumScan,
) -> (CandidateIdx, CandidateIdx) {
    match mode {
        ExtremumScan::BottomAnchored => {
            let mut top = CandidateIdx(0);
            let mut bottom = CandidateIdx(0);
            for (idx, c) in candidates.iter().enumerate().skip(1) {
                let bottom_votes = candidates[bottom.0].votes;
                if c.votes > bottom_votes {
                    top = CandidateIdx(idx);
                }
                if c.votes < bottom_votes {
                    bottom = CandidateIdx(idx);
                }
            }
            (top, bottom)
        }
        ExtremumScan::Independent => {
            let mut top: Option<CandidateIdx> = None;
            let mut bottom: Option<CandidateIdx> = None;
            for (idx, c) in candidates.iter().enumerate() {
                let cidx = CandidateIdx(idx);
                if disqualified.contains(&cidx) {
                    continue;
                }
                if top.map_or(true, |t| c.votes > candidates[t.0].votes) {
                    top = Some(cidx);
                }
                if bottom.map_or(true, |b| c.votes < candidates[b.0].votes) {
                    bottom = Some(cidx);
                }
            }
            // At most pass - 1 < N candidates are disqualified when this runs.
            let fallback = CandidateIdx(0);
            (top.unwrap_or(fallback), bottom.unwrap_or(fallback))
        }
    }
}
