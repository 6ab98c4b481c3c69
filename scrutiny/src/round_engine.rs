// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! The state machine that advances a Senate count one round at a time. Each
//! call to `step` performs exactly one primary action - the first preference
//! distribution, one surplus distribution, or one (possibly bulk) exclusion -
//! and emits exactly one round record. The statutory clauses are cited where
//! they are enforced.

use crate::ballot_metadata::{CandidateIndex, NumberOfCandidates};
use crate::ballot_pile::{BallotPaperCount, DistributedBallots, Parcel, ParcelLedger, PartiallyDistributedVote};
use crate::election_data::{AtlExpansion, ElectionData};
use crate::errors::CountError;
use crate::tie_resolution::{order_by_prior_round_tallies, TieBreakOracle, TieContext};
use crate::transcript::{CandidateElected, CandidateExcluded, ElectionReason, ExhaustedPortion, ParcelMoved, QuotaInfo, RoundIndex, RoundRecord, TieBreakRecord, Transcript, Transfer, TransferValueCreation};
use crate::transfer_value::{StringSerializedRational, TransferValue};
use num::{BigInt, BigRational, Zero};
use std::cmp::min;
use std::collections::HashSet;
use std::marker::PhantomData;

/// Which parcels a surplus distribution takes from the elected candidate.
#[derive(Copy, Clone,Debug,Eq, PartialEq)]
pub enum SurplusParcels {
    /// every parcel the candidate holds, the pre 2016 practice.
    AllParcels,
    /// only the parcel whose arrival put the candidate over quota.
    LastParcelReceived,
}

/// When the shortcut election clauses, s273(17) last vacancy and s273(18) as
/// many continuing as vacancies, are applied. The interaction with a still
/// undistributed surplus is a matter of interpretation, so it is configuration
/// rather than something hard coded in the engine.
#[derive(Copy, Clone,Debug,Eq, PartialEq)]
pub enum ShortcutElectionTiming {
    Always,
    OnlyIfNoUndistributedSurplus,
}

/// The knobs that distinguish one reading of Section 273 from another. The
/// engine is generic over these; the concrete variants live with the
/// legislation specific crate.
pub trait CountRules {
    /// Name recorded in the transcript so a reader knows what produced it.
    fn name() -> String;
    fn atl_expansion() -> AtlExpansion;
    fn surplus_parcels() -> SurplusParcels;
    /// The denominator of the statutory transfer value formula, given the
    /// papers considered for the transfer and how many of them have a
    /// continuing candidate to go to.
    fn surplus_denominator(considered:BallotPaperCount,transferable:BallotPaperCount,elected_on_first_preferences:bool) -> BallotPaperCount;
    /// Whether the s273(13) bulk exclusion shortcut is attempted.
    fn uses_bulk_exclusion() -> bool;
    fn when_to_apply_last_vacancy_rule() -> ShortcutElectionTiming;
    fn when_to_elect_all_remaining() -> ShortcutElectionTiming;
}

/// What has happened to a candidate so far. Transitions are one way.
#[derive(Copy, Clone,Debug,Eq, PartialEq)]
pub enum CandidateState {
    Hopeful,
    Elected{ order : usize, round : RoundIndex },
    Excluded{ order : usize, round : RoundIndex },
}

impl CandidateState {
    pub fn is_hopeful(&self) -> bool { matches!(self,CandidateState::Hopeful) }
}

/// Where the state machine is up to.
#[derive(Copy, Clone,Debug,Eq, PartialEq)]
pub enum EngineState {
    AwaitingStart,
    InRound(RoundIndex),
    Completed,
}

/// What has accumulated towards the round record currently being built.
#[derive(Default)]
struct PendingRound {
    note : Vec<String>,
    elected : Vec<CandidateElected>,
    excluded : Vec<CandidateExcluded>,
    created_transfer_value : Option<TransferValueCreation>,
    transfers : Vec<Transfer>,
    tie_breaks : Vec<TieBreakRecord>,
}

/// The main workhorse that executes the count.
pub struct RoundEngine<'a,Rules:CountRules> {
    data : &'a ElectionData,
    oracle : &'a dyn TieBreakOracle,
    original_votes : &'a [PartiallyDistributedVote<'a>],
    num_candidates : usize,
    vacancies : NumberOfCandidates,
    total_papers : BallotPaperCount,
    quota : usize,
    quota_value : BigRational,
    /// The exact tally, by candidate.
    tallies : Vec<BigRational>,
    /// the parcels each candidate currently holds.
    papers : Vec<ParcelLedger<'a>>,
    candidate_state : Vec<CandidateState>,
    continuing : HashSet<CandidateIndex>,
    /// Continuing candidates sorted lowest tally first, highest last.
    continuing_sorted_by_tally : Vec<CandidateIndex>,
    exhausted_papers : BallotPaperCount,
    exhausted_atl_papers : BallotPaperCount,
    exhausted_worth : BigRational,
    set_aside_papers : BallotPaperCount,
    set_aside_worth : BigRational,
    pending_surplus : Vec<CandidateIndex>,
    elected_candidates : Vec<CandidateIndex>,
    excluded_candidates : Vec<CandidateIndex>,
    current_round : RoundIndex,
    engine_state : EngineState,
    in_this_round : PendingRound,
    transcript : Transcript,
    _rules : PhantomData<Rules>,
}

impl <'a,Rules:CountRules> RoundEngine<'a,Rules> {
    /// Validate the input and set up round zero. All input level problems are
    /// rejected here, before the first round runs.
    pub fn new(data : &'a ElectionData,original_votes:&'a [PartiallyDistributedVote<'a>],vacancies:NumberOfCandidates,oracle:&'a dyn TieBreakOracle) -> Result<Self,CountError> {
        let num_candidates = data.metadata.candidates.len();
        if num_candidates==0 { return Err(CountError::InputRejected("no candidates".to_string())); }
        if vacancies.0==0 { return Err(CountError::InputRejected("no vacancies to fill".to_string())); }
        if vacancies.0>=num_candidates { return Err(CountError::InputRejected(format!("{} vacancies but only {} candidates",vacancies,num_candidates))); }
        let mut total_papers = BallotPaperCount(0);
        for vote in original_votes {
            if vote.prefs.is_empty() { return Err(CountError::InputRejected("a ballot with no preferences".to_string())); }
            let mut seen : HashSet<CandidateIndex> = HashSet::with_capacity(vote.prefs.len());
            for &c in vote.prefs {
                if c.0>=num_candidates { return Err(CountError::InputRejected(format!("unknown candidate {} in a preference list",c))); }
                if !seen.insert(c) { return Err(CountError::InputRejected(format!("candidate {} repeated in a preference list",c))); }
            }
            total_papers+=vote.n;
        }
        if total_papers.0==0 { return Err(CountError::InputRejected("no formal ballots".to_string())); }
        let continuing : HashSet<CandidateIndex> = (0..num_candidates).map(CandidateIndex).collect();
        let continuing_sorted_by_tally : Vec<CandidateIndex> = (0..num_candidates).map(CandidateIndex).collect();
        Ok(RoundEngine{
            data,
            oracle,
            original_votes,
            num_candidates,
            vacancies,
            total_papers,
            quota : 0,
            quota_value : BigRational::zero(),
            tallies : vec![BigRational::zero();num_candidates],
            papers : (0..num_candidates).map(|_|ParcelLedger::default()).collect(),
            candidate_state : vec![CandidateState::Hopeful;num_candidates],
            continuing,
            continuing_sorted_by_tally,
            exhausted_papers : BallotPaperCount(0),
            exhausted_atl_papers : BallotPaperCount(0),
            exhausted_worth : BigRational::zero(),
            set_aside_papers : BallotPaperCount(0),
            set_aside_worth : BigRational::zero(),
            pending_surplus : vec![],
            elected_candidates : vec![],
            excluded_candidates : vec![],
            current_round : RoundIndex(0),
            engine_state : EngineState::AwaitingStart,
            in_this_round : PendingRound::default(),
            transcript : Transcript::new(Rules::name()),
            _rules : PhantomData,
        })
    }

    pub fn state(&self) -> EngineState { self.engine_state }
    pub fn transcript(&self) -> &Transcript { &self.transcript }
    pub fn into_transcript(self) -> Transcript { self.transcript }
    pub fn candidate_state(&self,candidate:CandidateIndex) -> CandidateState { self.candidate_state[candidate.0] }

    /// Execute one round. Deterministic given the current state and the
    /// oracle's answers; emits exactly one round record.
    pub fn step(&mut self) -> Result<EngineState,CountError> {
        match self.engine_state {
            EngineState::Completed => Ok(EngineState::Completed),
            EngineState::AwaitingStart => {
                self.current_round=RoundIndex(1);
                self.engine_state=EngineState::InRound(self.current_round);
                self.distribute_first_preferences()?;
                self.end_of_round()?;
                Ok(self.engine_state)
            }
            EngineState::InRound(_) => {
                self.current_round=RoundIndex(self.current_round.0+1);
                self.engine_state=EngineState::InRound(self.current_round);
                if let Some(candidate) = self.choose_surplus_to_distribute()? {
                    self.distribute_surplus(candidate)?;
                } else {
                    let batch = if Rules::uses_bulk_exclusion() { self.find_bulk_exclusion()? } else { None };
                    match batch {
                        Some(candidates) => self.exclude(candidates)?,
                        None => {
                            let lowest = self.choose_lowest_for_exclusion()?;
                            self.exclude(vec![lowest])?;
                        }
                    }
                }
                self.end_of_round()?;
                Ok(self.engine_state)
            }
        }
    }

    /// Run rounds until the count completes or fails.
    pub fn run(&mut self) -> Result<(),CountError> {
        while self.engine_state!=EngineState::Completed { self.step()?; }
        Ok(())
    }

    fn tally(&self,candidate:CandidateIndex) -> BigRational { self.tallies[candidate.0].clone() }

    fn remaining_to_elect(&self) -> usize { self.vacancies.0-self.elected_candidates.len() }

    fn resort_candidates(&mut self) {
        let tallies = &self.tallies;
        self.continuing_sorted_by_tally.sort_by(|a,b|tallies[a.0].cmp(&tallies[b.0]));
    }

    fn no_longer_continuing(&mut self,candidate:CandidateIndex) {
        self.continuing_sorted_by_tally.retain(|&e|e!=candidate);
        self.continuing.remove(&candidate);
    }

    fn declare_elected(&mut self,who:CandidateIndex,why:ElectionReason) {
        let order = self.elected_candidates.len()+1;
        log::info!("Elected {}",self.data.metadata.candidate(who).name);
        self.candidate_state[who.0]=CandidateState::Elected{ order, round: self.current_round };
        self.elected_candidates.push(who);
        self.transcript.elected.push(who);
        self.in_this_round.elected.push(CandidateElected{ who, order, why });
        self.no_longer_continuing(who);
        if self.tallies[who.0]>self.quota_value { self.pending_surplus.push(who); }
    }

    /// Ask the oracle. The answer is recorded; a refusal or a nonsense answer
    /// is fatal.
    fn consult_oracle(&mut self,context:TieContext,candidates:&[CandidateIndex]) -> Result<CandidateIndex,CountError> {
        match self.oracle.resolve(self.current_round,context,candidates) {
            Some(chosen) if candidates.contains(&chosen) => {
                self.in_this_round.tie_breaks.push(TieBreakRecord{ context, candidates: candidates.to_vec(), chosen });
                Ok(chosen)
            }
            _ => Err(CountError::TieUnresolved{ round: self.current_round, context, candidates: candidates.to_vec() }),
        }
    }

    fn note_statutory_resolution(&mut self,tied:&[CandidateIndex],from:RoundIndex) {
        let names : Vec<String> = tied.iter().map(|&c|self.data.metadata.candidate(c).name.clone()).collect();
        self.in_this_round.note.push(format!("tie between {} resolved on totals at count {}",names.join(", "),from));
    }

    /// Order the given equal-tallied candidates ascending, statute first (the
    /// most recent prior round at which they all differed), then the oracle,
    /// consulted repeatedly for the candidate taking the next lowest place.
    fn order_tied_ascending(&mut self,tied:&[CandidateIndex],context:TieContext) -> Result<Vec<CandidateIndex>,CountError> {
        if let Some((ordered,from)) = order_by_prior_round_tallies(tied,&self.transcript.rounds) {
            self.note_statutory_resolution(tied,from);
            return Ok(ordered);
        }
        let mut remaining : Vec<CandidateIndex> = tied.to_vec();
        let mut ordered = vec![];
        while remaining.len()>1 {
            let chosen = self.consult_oracle(context,&remaining)?;
            ordered.push(chosen);
            remaining.retain(|&c|c!=chosen);
        }
        ordered.push(remaining[0]);
        Ok(ordered)
    }

    /// Given candidates sorted descending by tally, fix the relative order of
    /// any equal-tallied runs: statute first, then the oracle, consulted for
    /// the candidate taking the next highest place.
    fn order_tied_descending(&mut self,descending:&[CandidateIndex],context:TieContext) -> Result<Vec<CandidateIndex>,CountError> {
        let mut result = vec![];
        let mut i = 0;
        while i<descending.len() {
            let mut j = i+1;
            while j<descending.len() && self.tallies[descending[i].0]==self.tallies[descending[j].0] { j+=1; }
            if j>i+1 {
                let tied = descending[i..j].to_vec();
                if let Some((ordered,from)) = order_by_prior_round_tallies(&tied,&self.transcript.rounds) {
                    self.note_statutory_resolution(&tied,from);
                    result.extend(ordered.into_iter().rev());
                } else {
                    let mut remaining = tied;
                    while remaining.len()>1 {
                        let chosen = self.consult_oracle(context,&remaining)?;
                        result.push(chosen);
                        remaining.retain(|&c|c!=chosen);
                    }
                    result.push(remaining[0]);
                }
            } else {
                result.push(descending[i]);
            }
            i=j;
        }
        Ok(result)
    }

    /// Round 1: everything lands on its first preference at a transfer value of one.
    fn distribute_first_preferences(&mut self) -> Result<(),CountError> {
        let distributed = DistributedBallots::distribute(self.original_votes,&self.continuing,self.num_candidates);
        if distributed.exhausted.0>0 {
            // cannot happen: every formal ballot names at least one candidate and everyone is continuing.
            return Err(CountError::invariant("first_preferences_all_land",format!("{} papers had no first preference",distributed.exhausted)));
        }
        for (i,votes) in distributed.by_candidate.into_iter().enumerate() {
            if votes.num_ballots.0>0 {
                let worth = TransferValue::one().mul(votes.num_ballots);
                self.tallies[i]+=worth.clone();
                self.papers[i].append(Parcel{ votes, transfer_value: TransferValue::one(), worth, received_in: self.current_round });
            }
        }
        self.quota = self.total_papers.0/(1+self.vacancies.0)+1;
        self.quota_value = BigRational::from_integer(BigInt::from(self.quota));
        self.transcript.quota = Some(QuotaInfo{ papers: self.total_papers, vacancies: self.vacancies, quota: self.quota });
        log::info!("Quota = {}",self.quota);
        Ok(())
    }

    /// The pending surplus with the most votes goes first; s273 breaks ties on
    /// prior round totals, and the oracle settles what the statute cannot.
    fn choose_surplus_to_distribute(&mut self) -> Result<Option<CandidateIndex>,CountError> {
        if self.pending_surplus.is_empty() { return Ok(None); }
        let largest = self.pending_surplus.iter().map(|&c|self.tally(c)).max().unwrap();
        let tied : Vec<CandidateIndex> = self.pending_surplus.iter().filter(|&&c|self.tallies[c.0]==largest).cloned().collect();
        let chosen = if tied.len()==1 { tied[0] }
            else if let Some((ordered,from)) = order_by_prior_round_tallies(&tied,&self.transcript.rounds) {
                self.note_statutory_resolution(&tied,from);
                *ordered.last().unwrap()
            }
            else { self.consult_oracle(TieContext::SurplusOrderTie,&tied)? };
        self.pending_surplus.retain(|&c|c!=chosen);
        Ok(Some(chosen))
    }

    /// Transfer an elected candidate's surplus to the continuing candidates.
    ///
    /// The statutory transfer value is the surplus divided by a paper count
    /// that depends on the rules variant; whatever the arithmetic says, a
    /// parcel never leaves at a higher value than it arrived with. The elected
    /// candidate is left holding exactly the quota; any part of the surplus
    /// that cannot travel (no continuing preference, or the cap) leaves the
    /// count through the exhausted pile.
    fn distribute_surplus(&mut self,candidate:CandidateIndex) -> Result<(),CountError> {
        log::info!("Distributing surplus for {}",self.data.metadata.candidate(candidate).name);
        let votes_held = self.tally(candidate);
        let surplus = votes_held.clone()-self.quota_value.clone();
        if surplus<BigRational::zero() {
            return Err(CountError::invariant("surplus_not_negative",format!("candidate {} has surplus {}",candidate,surplus)));
        }
        let elected_on_first_preferences = match self.candidate_state[candidate.0] {
            CandidateState::Elected{round,..} => round==RoundIndex(1),
            _ => return Err(CountError::invariant("surplus_only_from_elected",format!("candidate {} is not elected",candidate))),
        };
        let parcels : Vec<Parcel<'a>> = match Rules::surplus_parcels() {
            // every parcel moves regardless, so receipt order serves here.
            SurplusParcels::AllParcels => self.papers[candidate.0].drain_all(),
            SurplusParcels::LastParcelReceived => self.papers[candidate.0].drain_last().into_iter().collect(),
        };
        if parcels.is_empty() {
            return Err(CountError::invariant("surplus_has_papers",format!("candidate {} has a surplus but holds no papers",candidate)));
        }
        let ballots_considered : BallotPaperCount = parcels.iter().map(|p|p.num_ballots()).sum();
        let mut distributions = vec![];
        let mut transferable = BallotPaperCount(0);
        for parcel in &parcels {
            let d = DistributedBallots::distribute(&parcel.votes.votes,&self.continuing,self.num_candidates);
            transferable+=parcel.num_ballots()-d.exhausted;
            distributions.push(d);
        }
        let denominator = Rules::surplus_denominator(ballots_considered,transferable,elected_on_first_preferences);
        let raw_tv = if denominator.0>0 { TransferValue::from_surplus(&surplus,denominator) } else { TransferValue::new(BigInt::from(0),BigInt::from(1)) };
        let single_parcel = parcels.len()==1;
        for (parcel,dist) in parcels.into_iter().zip(distributions.into_iter()) {
            let outgoing = raw_tv.capped_at(&parcel.transfer_value);
            if outgoing!=raw_tv {
                self.in_this_round.note.push(format!("transfer value capped at the parcel's incoming value {}",parcel.transfer_value));
            }
            // This parcel's share of the surplus. When several parcels move,
            // the denominator is their combined paper count, so the shares sum
            // to the surplus exactly.
            let budget : BigRational = if single_parcel { surplus.clone() } else { raw_tv.mul(parcel.num_ballots()) };
            let mut parcels_moved = vec![];
            let mut moved_worth = BigRational::zero();
            for (to,votes) in dist.by_candidate.into_iter().enumerate() {
                if votes.num_ballots.0>0 {
                    let worth = outgoing.mul(votes.num_ballots);
                    self.tallies[to]+=worth.clone();
                    moved_worth+=worth.clone();
                    parcels_moved.push(ParcelMoved{ to: CandidateIndex(to), ballots: votes.num_ballots, weighted: worth.clone().into() });
                    self.papers[to].append(Parcel{ votes, transfer_value: outgoing.clone(), worth, received_in: self.current_round });
                }
            }
            let exhausted_worth = budget-moved_worth; // the untransferable remainder leaves the count
            self.exhausted_papers+=dist.exhausted;
            self.exhausted_atl_papers+=dist.exhausted_atl;
            self.exhausted_worth+=exhausted_worth.clone();
            self.in_this_round.transfers.push(Transfer{
                from: candidate,
                transfer_value: outgoing,
                parcels_moved,
                exhausted: ExhaustedPortion{ ballots: dist.exhausted, weighted: exhausted_worth.into() },
            });
        }
        self.tallies[candidate.0]=self.quota_value.clone();
        self.in_this_round.created_transfer_value=Some(TransferValueCreation{
            surplus: surplus.into(),
            votes: votes_held.into(),
            ballots_considered,
            continuing_ballots: transferable,
            transfer_value: raw_tv,
        });
        Ok(())
    }

    /// The continuing candidate lowest in the poll; s273(22) breaks ties on
    /// prior round totals, and the oracle settles what the statute cannot.
    fn choose_lowest_for_exclusion(&mut self) -> Result<CandidateIndex,CountError> {
        let lowest_tally = self.tally(self.continuing_sorted_by_tally[0]);
        let tied : Vec<CandidateIndex> = self.continuing_sorted_by_tally.iter().take_while(|&&c|self.tallies[c.0]==lowest_tally).cloned().collect();
        let chosen = if tied.len()==1 { tied[0] }
            else if let Some((ordered,from)) = order_by_prior_round_tallies(&tied,&self.transcript.rounds) {
                self.note_statutory_resolution(&tied,from);
                ordered[0]
            }
            else { self.consult_oracle(TieContext::ExclusionTie,&tied)? };
        if let Some(&next) = self.continuing_sorted_by_tally.iter().find(|&&c|self.tallies[c.0]>lowest_tally) {
            let margin = self.tally(next)-lowest_tally.clone();
            self.in_this_round.note.push(format!("{} excluded with {} votes, margin {} to the next lowest candidate",
                self.data.metadata.candidate(chosen).name,StringSerializedRational(lowest_tally),StringSerializedRational(margin)));
        }
        Ok(chosen)
    }

    /// The s273(13) bulk exclusion shortcut, in the reading adopted here: the
    /// largest k of at least 2 such that the combined tally of the k lowest
    /// continuing candidates is strictly below the tally of the next lowest
    /// candidate and strictly below every undistributed surplus, clamped so
    /// that enough continuing candidates survive to fill the remaining
    /// vacancies (s273(13B)). Returns the candidates in exclusion order.
    fn find_bulk_exclusion(&mut self) -> Result<Option<Vec<CandidateIndex>>,CountError> {
        let n = self.continuing_sorted_by_tally.len();
        if n<3 || self.remaining_to_elect()==0 { return Ok(None); }
        let max_k = min(n-1,n-self.remaining_to_elect());
        if max_k<2 { return Ok(None); }
        let min_pending_surplus : Option<BigRational> = self.pending_surplus.iter().map(|&c|self.tally(c)-self.quota_value.clone()).min();
        let mut prefix_sums : Vec<BigRational> = vec![];
        let mut running = BigRational::zero();
        for &c in &self.continuing_sorted_by_tally {
            running+=self.tallies[c.0].clone();
            prefix_sums.push(running.clone());
        }
        let mut chosen_k = None;
        for k in (2..=max_k).rev() {
            let sum = &prefix_sums[k-1];
            let below_next = *sum<self.tallies[self.continuing_sorted_by_tally[k].0];
            let below_surpluses = min_pending_surplus.as_ref().map_or(true,|s|sum<s);
            if below_next && below_surpluses { chosen_k=Some(k); break; }
        }
        let k = match chosen_k { Some(k)=>k, None=>return Ok(None) };
        // Equal tallies cannot straddle the cut (the combined tally of the
        // bottom k is at least the k-th tally), so membership is settled; only
        // the relative order of equal-tallied members needs resolving.
        let group = self.continuing_sorted_by_tally[0..k].to_vec();
        let mut ordered = vec![];
        let mut i = 0;
        while i<group.len() {
            let mut j = i+1;
            while j<group.len() && self.tallies[group[i].0]==self.tallies[group[j].0] { j+=1; }
            if j>i+1 {
                let run = self.order_tied_ascending(&group[i..j],TieContext::BulkExclusionOrderTie)?;
                ordered.extend(run);
            } else {
                ordered.push(group[i]);
            }
            i=j;
        }
        self.in_this_round.note.push(format!(
            "bulk exclusion applied (s273(13)): the combined tally of the {} lowest candidates is below the next candidate's tally and below any undistributed surplus",k));
        Ok(Some(ordered))
    }

    /// Exclude the given candidates (in exclusion order) and redistribute
    /// every parcel they hold, ascending by transfer value, receipt order
    /// breaking ties. Each parcel is a checkpointed sub transfer: quota is
    /// rechecked after every parcel, and anyone elected mid exclusion receives
    /// nothing further. Should the last vacancy be filled mid exclusion the
    /// remaining parcels are set aside untransferred.
    fn exclude(&mut self,to_exclude:Vec<CandidateIndex>) -> Result<(),CountError> {
        for &candidate in &to_exclude {
            log::info!("Excluding {}",self.data.metadata.candidate(candidate).name);
            let order = self.excluded_candidates.len()+1;
            self.candidate_state[candidate.0]=CandidateState::Excluded{ order, round: self.current_round };
            self.excluded_candidates.push(candidate);
            self.in_this_round.excluded.push(CandidateExcluded{ who: candidate, order });
            self.no_longer_continuing(candidate);
        }
        let mut parcels : Vec<(CandidateIndex,Parcel<'a>)> = vec![];
        for &candidate in &to_exclude {
            for parcel in self.papers[candidate.0].drain_all_ascending_value() { parcels.push((candidate,parcel)); }
        }
        // A bulk exclusion merges several candidates' already-ordered parcels
        // by value; the sort is stable, so parcels of equal value keep
        // exclusion order and, within one candidate, order of receipt.
        parcels.sort_by(|a,b|a.1.transfer_value.cmp(&b.1.transfer_value));
        if parcels.is_empty() {
            self.in_this_round.note.push("excluded candidate held no papers; nothing to transfer".to_string());
            return Ok(());
        }
        let mut set_aside_any = false;
        for (from,parcel) in parcels {
            self.tallies[from.0]-=parcel.worth.clone();
            if self.remaining_to_elect()==0 {
                self.set_aside_papers+=parcel.num_ballots();
                self.set_aside_worth+=parcel.worth.clone();
                set_aside_any=true;
                continue;
            }
            let tv = parcel.transfer_value.clone();
            let dist = DistributedBallots::distribute(&parcel.votes.votes,&self.continuing,self.num_candidates);
            let mut parcels_moved = vec![];
            for (to,votes) in dist.by_candidate.into_iter().enumerate() {
                if votes.num_ballots.0>0 {
                    let worth = tv.mul(votes.num_ballots);
                    self.tallies[to]+=worth.clone();
                    parcels_moved.push(ParcelMoved{ to: CandidateIndex(to), ballots: votes.num_ballots, weighted: worth.clone().into() });
                    self.papers[to].append(Parcel{ votes, transfer_value: tv.clone(), worth, received_in: self.current_round });
                }
            }
            let exhausted_worth = tv.mul(dist.exhausted);
            self.exhausted_papers+=dist.exhausted;
            self.exhausted_atl_papers+=dist.exhausted_atl;
            self.exhausted_worth+=exhausted_worth.clone();
            self.in_this_round.transfers.push(Transfer{
                from,
                transfer_value: tv,
                parcels_moved,
                exhausted: ExhaustedPortion{ ballots: dist.exhausted, weighted: exhausted_worth.into() },
            });
            // the mandatory mid exclusion checkpoint.
            self.resort_candidates();
            self.check_elected_by_quota()?;
        }
        if set_aside_any {
            self.in_this_round.note.push("count complete; remaining papers of the excluded candidates set aside untransferred".to_string());
        }
        Ok(())
    }

    /// s273(8): anyone with quota is elected, highest tally first.
    fn check_elected_by_quota(&mut self) -> Result<(),CountError> {
        if self.remaining_to_elect()==0 { return Ok(()); }
        let over : Vec<CandidateIndex> = self.continuing_sorted_by_tally.iter().rev().take_while(|&&c|self.tallies[c.0]>=self.quota_value).cloned().collect();
        if over.is_empty() { return Ok(()); }
        let in_order = self.order_tied_descending(&over,TieContext::ElectionOrderTie)?;
        for c in in_order {
            self.declare_elected(c,ElectionReason::ReachedQuota);
            if self.remaining_to_elect()==0 { break; }
        }
        Ok(())
    }

    fn timing_permits(&self,timing:ShortcutElectionTiming) -> bool {
        match timing {
            ShortcutElectionTiming::Always => true,
            ShortcutElectionTiming::OnlyIfNoUndistributedSurplus => self.pending_surplus.is_empty(),
        }
    }

    /// s273(17): one vacancy, two continuing candidates; the higher is elected
    /// without reaching quota. A tie goes straight to the oracle, standing in
    /// for the Australian Electoral Officer's casting vote.
    fn check_last_vacancy_rule(&mut self) -> Result<(),CountError> {
        if self.remaining_to_elect()==1 && self.continuing_sorted_by_tally.len()==2 && self.timing_permits(Rules::when_to_apply_last_vacancy_rule()) {
            let lower = self.continuing_sorted_by_tally[0];
            let higher = self.continuing_sorted_by_tally[1];
            let winner = if self.tallies[lower.0]==self.tallies[higher.0] {
                self.consult_oracle(TieContext::LastVacancyTie,&[lower,higher])?
            } else { higher };
            self.in_this_round.note.push("last vacancy rule invoked (s273(17))".to_string());
            self.declare_elected(winner,ElectionReason::HighestOfLastTwoStanding);
        }
        Ok(())
    }

    /// s273(18): as many continuing candidates as unfilled vacancies; all are
    /// elected, highest tally first.
    fn check_elect_all_remaining(&mut self) -> Result<(),CountError> {
        if self.remaining_to_elect()>0 && self.continuing_sorted_by_tally.len()==self.remaining_to_elect() && self.timing_permits(Rules::when_to_elect_all_remaining()) {
            self.in_this_round.note.push("all remaining continuing candidates elected (s273(18))".to_string());
            let descending : Vec<CandidateIndex> = self.continuing_sorted_by_tally.iter().rev().cloned().collect();
            let in_order = self.order_tied_descending(&descending,TieContext::ElectionOrderTie)?;
            for c in in_order {
                self.declare_elected(c,ElectionReason::AllRemainingMustBeElected);
            }
        }
        Ok(())
    }

    /// The invariants that must hold at every round boundary. A violation
    /// means the count cannot be trusted and is fatal.
    fn check_invariants(&self) -> Result<(),CountError> {
        let mut total = self.exhausted_worth.clone()+self.set_aside_worth.clone();
        for t in &self.tallies { total+=t.clone(); }
        let expected = BigRational::from_integer(BigInt::from(self.total_papers.0));
        if total!=expected {
            return Err(CountError::invariant("conservation_of_vote_value",format!("votes in the count total {} but {} formal votes were cast",total,expected)));
        }
        let held_papers : usize = self.papers.iter().map(|l|l.num_ballots().0).sum();
        let paper_total = held_papers+self.exhausted_papers.0+self.set_aside_papers.0;
        if paper_total!=self.total_papers.0 {
            return Err(CountError::invariant("conservation_of_papers",format!("papers in the count total {} but {} formal papers were cast",paper_total,self.total_papers)));
        }
        for &c in &self.continuing_sorted_by_tally {
            if self.papers[c.0].worth()!=self.tallies[c.0] {
                return Err(CountError::invariant("hopeful_ledger_matches_tally",format!("candidate {} holds parcels worth {} but is tallied at {}",c,self.papers[c.0].worth(),self.tallies[c.0])));
            }
        }
        for i in 0..self.num_candidates {
            if matches!(self.candidate_state[i],CandidateState::Excluded{..}) && !self.papers[i].is_empty() {
                return Err(CountError::invariant("excluded_holds_no_papers",format!("excluded candidate {} still holds parcels",CandidateIndex(i))));
            }
        }
        if self.remaining_to_elect()>0 && self.continuing_sorted_by_tally.len()<self.remaining_to_elect() {
            return Err(CountError::invariant("continuing_candidates_cover_vacancies",format!("{} continuing candidates for {} unfilled vacancies",self.continuing_sorted_by_tally.len(),self.remaining_to_elect())));
        }
        Ok(())
    }

    /// Close out the round: elect anyone over quota, apply the shortcut
    /// clauses, verify the invariants, emit the round record.
    fn end_of_round(&mut self) -> Result<(),CountError> {
        self.resort_candidates();
        self.check_elected_by_quota()?;
        self.check_last_vacancy_rule()?;
        self.check_elect_all_remaining()?;
        self.check_invariants()?;
        let pending = std::mem::take(&mut self.in_this_round);
        log::debug!("Count {}: tallies {}",self.current_round,self.tallies.iter().map(|t|t.to_string()).collect::<Vec<_>>().join("\t"));
        self.transcript.rounds.push(RoundRecord{
            number: self.current_round,
            note: pending.note,
            elected: pending.elected,
            excluded: pending.excluded,
            created_transfer_value: pending.created_transfer_value,
            transfers: pending.transfers,
            tie_breaks: pending.tie_breaks,
            tallies_after: self.tallies.iter().map(|t|StringSerializedRational(t.clone())).collect(),
            papers_after: self.papers.iter().map(|l|l.num_ballots()).collect(),
            atl_papers_after: self.papers.iter().map(|l|l.num_atl_ballots()).collect(),
            exhausted_after: ExhaustedPortion{ ballots: self.exhausted_papers, weighted: StringSerializedRational(self.exhausted_worth.clone()) },
            exhausted_atl_after: self.exhausted_atl_papers,
            set_aside_after: if self.set_aside_papers.0>0 { Some(ExhaustedPortion{ ballots: self.set_aside_papers, weighted: StringSerializedRational(self.set_aside_worth.clone()) }) } else { None },
        });
        if self.remaining_to_elect()==0 { self.engine_state=EngineState::Completed; }
        Ok(())
    }
}

/// A finished (or fatally stopped) count. The transcript accumulated so far is
/// always available, error or not, for post mortem inspection.
pub struct CountOutcome {
    pub transcript : Transcript,
    pub error : Option<CountError>,
}

impl CountOutcome {
    pub fn is_complete(&self) -> bool { self.error.is_none() }
}

/// Count the election from scratch under the given rules, running rounds until
/// the count completes or fails.
pub fn distribute_preferences<Rules:CountRules>(data:&ElectionData,vacancies:NumberOfCandidates,oracle:&dyn TieBreakOracle) -> CountOutcome {
    let arena = typed_arena::Arena::<CandidateIndex>::new();
    let votes = match data.resolve_votes(&arena,Rules::atl_expansion()) {
        Ok(votes) => votes,
        Err(e) => return CountOutcome{ transcript: Transcript::new(Rules::name()), error: Some(CountError::InputRejected(e.to_string())) },
    };
    match RoundEngine::<Rules>::new(data,&votes,vacancies,oracle) {
        Err(e) => CountOutcome{ transcript: Transcript::new(Rules::name()), error: Some(e) },
        Ok(mut engine) => {
            let error = engine.run().err();
            CountOutcome{ transcript: engine.into_transcript(), error }
        }
    }
}
