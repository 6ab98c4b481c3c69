// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! Tie resolution. The statute first looks at earlier rounds; when every
//! earlier round also has the candidates level, someone (historically the
//! Australian Electoral Officer for the state) must make a decision. That
//! decision maker is modelled as an injected oracle so the count stays a pure
//! function of its inputs plus the oracle's table of answers.

use crate::ballot_metadata::CandidateIndex;
use crate::transcript::{RoundIndex, RoundRecord};
use num::BigRational;
use serde::{Serialize,Deserialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Why the oracle is being consulted.
#[derive(Copy,Clone,Debug,Eq,PartialEq,Hash,Serialize,Deserialize)]
pub enum TieContext {
    /// which of the equal-lowest candidates is excluded.
    ExclusionTie,
    /// in which order equal-tallied candidates are taken to be elected.
    ElectionOrderTie,
    /// which of the last two standing takes the final vacancy.
    LastVacancyTie,
    /// which of two equal surpluses is distributed first.
    SurplusOrderTie,
    /// the relative order of equal-tallied candidates in a bulk exclusion.
    BulkExclusionOrderTie,
}

impl Display for TieContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TieContext::ExclusionTie => "exclusion",
            TieContext::ElectionOrderTie => "election order",
            TieContext::LastVacancyTie => "last vacancy",
            TieContext::SurplusOrderTie => "surplus order",
            TieContext::BulkExclusionOrderTie => "bulk exclusion order",
        };
        f.write_str(s)
    }
}

/// The injected decision maker. `resolve` singles out one candidate from the
/// tied set: the one to exclude for an exclusion tie, the one taken first for
/// an ordering tie, the winner for a last vacancy tie. Returning None means
/// the oracle declines, which is fatal to the count.
pub trait TieBreakOracle {
    fn resolve(&self,round:RoundIndex,context:TieContext,candidates:&[CandidateIndex]) -> Option<CandidateIndex>;
}

/// Deterministic rule: always single out the candidate standing earliest on
/// the ballot paper. Useful when no official decision record is available and
/// repeatability matters more than fidelity.
pub struct LowestIndexOracle {}

impl TieBreakOracle for LowestIndexOracle {
    fn resolve(&self,_round:RoundIndex,_context:TieContext,candidates:&[CandidateIndex]) -> Option<CandidateIndex> {
        candidates.iter().min().copied()
    }
}

/// One recorded decision, for replaying a known count.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct Decision {
    /// restrict to a particular round, if present.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub round : Option<RoundIndex>,
    /// restrict to a particular kind of tie, if present.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub context : Option<TieContext>,
    /// the tied candidates this decision covers (order irrelevant).
    pub candidates : Vec<CandidateIndex>,
    pub chosen : CandidateIndex,
}

/// A lookup table of decisions, typically loaded from an election
/// specification file so a historical count replays byte for byte.
#[derive(Clone,Debug,Serialize,Deserialize,Default)]
pub struct DecisionTable {
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub decisions : Vec<Decision>,
}

impl TieBreakOracle for DecisionTable {
    fn resolve(&self,round:RoundIndex,context:TieContext,candidates:&[CandidateIndex]) -> Option<CandidateIndex> {
        let as_set : HashSet<CandidateIndex> = candidates.iter().copied().collect();
        for decision in &self.decisions {
            if let Some(r) = decision.round { if r!=round { continue; } }
            if let Some(c) = decision.context { if c!=context { continue; } }
            if decision.candidates.len()!=as_set.len() { continue; }
            if !decision.candidates.iter().all(|c|as_set.contains(c)) { continue; }
            if as_set.contains(&decision.chosen) { return Some(decision.chosen); }
        }
        None
    }
}

/// The statutory walk back through the count: find the most recent prior round
/// at which the tied candidates all held different tallies, and return them
/// sorted ascending by their tallies at that round, together with the round it
/// came from. None if no such round exists and the oracle must be consulted.
pub fn order_by_prior_round_tallies(tied:&[CandidateIndex],rounds:&[RoundRecord]) -> Option<(Vec<CandidateIndex>,RoundIndex)> {
    for record in rounds.iter().rev() {
        let mut observed : HashSet<BigRational> = HashSet::new();
        for candidate in tied {
            observed.insert(record.tallies_after[candidate.0].0.clone());
        }
        if observed.len()==tied.len() { // all different at this round
            let mut ordered = tied.to_vec();
            ordered.sort_by(|a,b|record.tallies_after[a.0].0.cmp(&record.tallies_after[b.0].0));
            return Some((ordered,record.number));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot_pile::BallotPaperCount;
    use crate::transcript::ExhaustedPortion;
    use crate::transfer_value::StringSerializedRational;
    use num::BigInt;

    fn record(number:usize,tallies:&[i64]) -> RoundRecord {
        RoundRecord{
            number: RoundIndex(number),
            note: vec![],
            elected: vec![],
            excluded: vec![],
            created_transfer_value: None,
            transfers: vec![],
            tie_breaks: vec![],
            tallies_after: tallies.iter().map(|&t|StringSerializedRational(BigRational::from_integer(BigInt::from(t)))).collect(),
            papers_after: tallies.iter().map(|&t|BallotPaperCount(t as usize)).collect(),
            atl_papers_after: vec![],
            exhausted_after: ExhaustedPortion::default(),
            exhausted_atl_after: BallotPaperCount(0),
            set_aside_after: None,
        }
    }

    #[test]
    fn prior_round_walk_takes_most_recent_discriminating_round() {
        let rounds = vec![
            record(1,&[6,5,9]),
            record(2,&[5,5,10]),
        ];
        let tied = [CandidateIndex(0),CandidateIndex(1)];
        let (ordered,from) = order_by_prior_round_tallies(&tied,&rounds).unwrap();
        assert_eq!(from,RoundIndex(1));
        assert_eq!(ordered,vec![CandidateIndex(1),CandidateIndex(0)]);
    }

    #[test]
    fn prior_round_walk_fails_when_always_level() {
        let rounds = vec![ record(1,&[5,5,9]), record(2,&[5,5,10]) ];
        let tied = [CandidateIndex(0),CandidateIndex(1)];
        assert!(order_by_prior_round_tallies(&tied,&rounds).is_none());
    }

    #[test]
    fn decision_table_matches_candidate_set_exactly() {
        let table = DecisionTable{ decisions: vec![Decision{
            round: None,
            context: Some(TieContext::ExclusionTie),
            candidates: vec![CandidateIndex(1),CandidateIndex(3)],
            chosen: CandidateIndex(3),
        }]};
        let tied = [CandidateIndex(3),CandidateIndex(1)];
        assert_eq!(table.resolve(RoundIndex(4),TieContext::ExclusionTie,&tied),Some(CandidateIndex(3)));
        assert_eq!(table.resolve(RoundIndex(4),TieContext::ElectionOrderTie,&tied),None);
        let wider = [CandidateIndex(1),CandidateIndex(2),CandidateIndex(3)];
        assert_eq!(table.resolve(RoundIndex(4),TieContext::ExclusionTie,&wider),None);
    }
}
