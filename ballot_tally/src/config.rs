// ********* Input data structures ***********

use std::hash::Hash;

/// One entry of a voter's ranking: this voter put this candidate at this rank.
///
/// A voter contributes one ballot entry per ranked candidate. Entries are not
/// expected to be grouped, sorted or deduplicated.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Ballot<C, L> {
    pub candidate_id: C,
    /// Who cast this entry. Not used by the tally.
    pub voter_id: String,
    /// 1 is the most preferred rank.
    pub preference: u32,
    /// Carried unmodified into the leaderboard.
    pub display_label: L,
}

impl<C, L> Ballot<C, L> {
    pub fn new(candidate_id: C, voter_id: &str, preference: u32, display_label: L) -> Self {
        Ballot {
            candidate_id,
            voter_id: voter_id.to_string(),
            preference,
            display_label,
        }
    }
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone)]
pub struct Candidate<C, L> {
    pub candidate_id: C,
    pub display_label: L,
    /// Cumulative over every pass this candidate took part in.
    pub votes: u64,
    pub percent: f64,
}

/// The reason the elimination loop stopped.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Termination {
    /// There was nothing to tally.
    NoCandidates,
    /// The selected top candidate went over half of the pass's ballots.
    Majority,
    /// As many passes as candidates were run.
    PassesExhausted,
    /// A pass had no eligible ballot left to count.
    BallotsExhausted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::NoCandidates => "noCandidates",
            Termination::Majority => "majority",
            Termination::PassesExhausted => "passesExhausted",
            Termination::BallotsExhausted => "ballotsExhausted",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Leaderboard<C, L> {
    pub current_pass: u32,
    pub total_passes: u32,
    /// Sorted by decreasing percent. Disqualified candidates are included.
    pub candidates: Vec<Candidate<C, L>>,
    pub termination: Termination,
}

impl<C, L> Leaderboard<C, L> {
    pub fn empty() -> Self {
        Leaderboard {
            current_pass: 0,
            total_passes: 0,
            candidates: Vec::new(),
            termination: Termination::NoCandidates,
        }
    }

    /// The first candidate of the leaderboard, if any.
    pub fn leader(&self) -> Option<&Candidate<C, L>> {
        self.candidates.first()
    }
}

// ********* Configuration **********

/// How the top and bottom candidates of a pass are picked.
///
/// - BottomAnchored compares every candidate against the current bottom
/// candidate, for both picks. With three or more distinct vote totals, the
/// top pick is the last candidate (in first-seen order) that beat the bottom
/// at the time it was compared, which is not always the maximum. This is the
/// behaviour existing leaderboards were computed with.
///
/// - Independent tracks the maximum and the minimum separately. Ties keep the
/// earliest candidate. Disqualified candidates are not considered.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ExtremumScan {
    BottomAnchored,
    Independent,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub extremum_scan: ExtremumScan,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        extremum_scan: ExtremumScan::BottomAnchored,
    };
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}

/// Bounds required on candidate identifiers.
pub trait CandidateKey: Eq + Hash + Clone {}

impl<T: Eq + Hash + Clone> CandidateKey for T {}
