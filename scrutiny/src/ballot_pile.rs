//! Piles of ballot papers: partially distributed votes, parcels tagged with the
//! transfer value they arrived at, and the per candidate parcel ledger.

use crate::ballot_metadata::CandidateIndex;
use crate::ballot_paper::VoteSource;
use crate::transcript::RoundIndex;
use crate::transfer_value::TransferValue;
use num::BigRational;
use std::collections::HashSet;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use serde::Deserialize;
use serde::Serialize;

/// A number representing a count of pieces of paper.
/// This is distinct from votes, which are fractional once papers carry a transfer value.
#[derive(Copy,Clone,Eq, PartialEq,Ord,PartialOrd,Hash,Debug,Serialize,Deserialize)]
pub struct BallotPaperCount(pub usize);

impl AddAssign for BallotPaperCount {
    fn add_assign(&mut self, rhs: Self) { self.0+=rhs.0; }
}
impl SubAssign for BallotPaperCount {
    fn sub_assign(&mut self, rhs: Self) { self.0-=rhs.0; }
}
impl Add for BallotPaperCount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self { BallotPaperCount(self.0+rhs.0) }
}
impl Sub for BallotPaperCount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self { BallotPaperCount(self.0-rhs.0) }
}
impl Sum for BallotPaperCount {
    fn sum<I: Iterator<Item=Self>>(iter: I) -> Self { BallotPaperCount(iter.map(|c|c.0).sum()) }
}
impl fmt::Display for BallotPaperCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}

/// A vote that is somewhere through being distributed.
/// Preferences with index less than upto have already been passed over.
/// May consist of multiple independent identical votes.
#[derive(Copy, Clone,Debug)]
pub struct PartiallyDistributedVote<'a> {
    upto : usize,
    /// The number of voters who wrote this preference list.
    pub n : BallotPaperCount,
    /// Preferred candidates, with index 0 being the most favoured candidate.
    pub prefs : &'a[CandidateIndex],
    pub source : VoteSource<'a>,
}

impl<'a>  PartiallyDistributedVote<'a> {
    pub fn new(n:usize,prefs : &'a[CandidateIndex],source : VoteSource<'a>) -> Self {
        PartiallyDistributedVote{
            upto: 0,
            n: BallotPaperCount(n),
            prefs,
            source
        }
    }
    /// The candidate this vote currently sits with.
    pub fn candidate(&self) -> CandidateIndex { self.prefs[self.upto] }
    /// Move to the first preference at or after the current one that is still
    /// a continuing candidate. None means the vote is exhausted.
    pub fn advanced_to_continuing(&self,continuing:&HashSet<CandidateIndex>) -> Option<Self> {
        for i in self.upto .. self.prefs.len() {
            if continuing.contains(&self.prefs[i]) {
                return Some(PartiallyDistributedVote{upto:i,n:self.n,prefs:self.prefs,source:self.source})
            }
        }
        None
    }
    /// true iff it is an above the line vote
    pub fn is_atl(&self) -> bool {
        match self.source {
            VoteSource::Btl(_) => false,
            VoteSource::Atl(_) => true
        }
    }
}

/// A pile of votes all moving at the same transfer value, before the value is
/// attached. In a physical count this would be a single (metaphorical) pile.
pub struct VotesWithSameTransferValue<'a> {
    pub votes : Vec<PartiallyDistributedVote<'a>>,
    pub num_ballots : BallotPaperCount,
    pub num_atl_ballots : BallotPaperCount,
}

impl <'a> Default for VotesWithSameTransferValue<'a> {
    fn default() -> Self {
        VotesWithSameTransferValue{
            votes: vec![],
            num_ballots: BallotPaperCount(0),
            num_atl_ballots: BallotPaperCount(0)
        }
    }
}

impl <'a> VotesWithSameTransferValue<'a> {
    pub fn add_vote(&mut self,vote : PartiallyDistributedVote<'a>) {
        self.num_ballots+=vote.n;
        if vote.is_atl() { self.num_atl_ballots+=vote.n; }
        self.votes.push(vote);
    }
}

/// The result of pushing a pile of votes one step further along their
/// preference lists: a sub-pile for each continuing candidate, plus the votes
/// that ran out of continuing preferences.
pub struct DistributedBallots<'a> {
    pub by_candidate : Vec<VotesWithSameTransferValue<'a>>,
    pub exhausted : BallotPaperCount,
    pub exhausted_atl : BallotPaperCount,
}

impl <'a> DistributedBallots<'a> {
    pub fn distribute(votes:&[PartiallyDistributedVote<'a>],continuing:&HashSet<CandidateIndex>,num_candidates:usize) -> Self {
        let mut res = DistributedBallots{
            by_candidate: (0..num_candidates).map(|_|VotesWithSameTransferValue::default()).collect(),
            exhausted: BallotPaperCount(0),
            exhausted_atl: BallotPaperCount(0),
        };
        for vote in votes {
            match vote.advanced_to_continuing(continuing) {
                Some(advanced) => res.by_candidate[advanced.candidate().0].add_vote(advanced),
                None => {
                    res.exhausted+=vote.n;
                    if vote.is_atl() { res.exhausted_atl+=vote.n; }
                }
            }
        }
        res
    }
}

/// A bundle of papers received by one candidate in one transfer, all at one
/// transfer value. Worth is exact; papers times value, nothing truncated.
pub struct Parcel<'a> {
    pub votes : VotesWithSameTransferValue<'a>,
    pub transfer_value : TransferValue,
    pub worth : BigRational,
    pub received_in : RoundIndex,
}

impl <'a> Parcel<'a> {
    pub fn num_ballots(&self) -> BallotPaperCount { self.votes.num_ballots }
}

/// The ordered parcels a candidate currently holds. Order of receipt is
/// first-class; surplus distribution may take just the last parcel, and an
/// exclusion empties the lot in ascending order of transfer value with receipt
/// order breaking ties.
pub struct ParcelLedger<'a> {
    parcels : Vec<Parcel<'a>>,
}

impl <'a> Default for ParcelLedger<'a> {
    fn default() -> Self { ParcelLedger{ parcels: vec![] } }
}

impl <'a> ParcelLedger<'a> {
    pub fn append(&mut self,parcel:Parcel<'a>) { self.parcels.push(parcel); }

    /// Take the last parcel received, leaving the rest undisturbed.
    pub fn drain_last(&mut self) -> Option<Parcel<'a>> { self.parcels.pop() }

    /// Take every parcel, ordered ascending by transfer value; parcels of equal
    /// value stay in order of receipt.
    pub fn drain_all_ascending_value(&mut self) -> Vec<Parcel<'a>> {
        let mut parcels : Vec<Parcel<'a>> = self.parcels.drain(..).collect();
        parcels.sort_by(|a,b|a.transfer_value.cmp(&b.transfer_value)); // stable, preserves receipt order on ties
        parcels
    }

    /// Take every parcel in order of receipt, ignoring transfer value.
    pub fn drain_all(&mut self) -> Vec<Parcel<'a>> { self.parcels.drain(..).collect() }

    pub fn is_empty(&self) -> bool { self.parcels.is_empty() }
    pub fn num_parcels(&self) -> usize { self.parcels.len() }
    pub fn num_ballots(&self) -> BallotPaperCount { self.parcels.iter().map(|p|p.num_ballots()).sum() }
    pub fn num_atl_ballots(&self) -> BallotPaperCount { self.parcels.iter().map(|p|p.votes.num_atl_ballots).sum() }
    pub fn worth(&self) -> BigRational {
        let mut total = num::zero::<BigRational>();
        for p in &self.parcels { total+=p.worth.clone(); }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot_paper::BTL;
    use num::Zero;

    fn vote<'a>(btl:&'a BTL) -> PartiallyDistributedVote<'a> {
        PartiallyDistributedVote::new(btl.n,&btl.candidates,VoteSource::Btl(btl))
    }

    #[test]
    fn advancing_skips_non_continuing() {
        let btl = BTL{ candidates: vec![CandidateIndex(0),CandidateIndex(1),CandidateIndex(2)], n: 5 };
        let v = vote(&btl);
        let continuing : HashSet<CandidateIndex> = [CandidateIndex(2)].into_iter().collect();
        let advanced = v.advanced_to_continuing(&continuing).unwrap();
        assert_eq!(advanced.candidate(),CandidateIndex(2));
        let nobody : HashSet<CandidateIndex> = HashSet::new();
        assert!(v.advanced_to_continuing(&nobody).is_none());
    }

    #[test]
    fn drain_all_orders_by_value_then_receipt() {
        let btl = BTL{ candidates: vec![CandidateIndex(0)], n: 1 };
        let mut ledger = ParcelLedger::default();
        let mk = |tv:TransferValue,round:usize| {
            let mut votes = VotesWithSameTransferValue::default();
            votes.add_vote(vote(&btl));
            let worth = tv.mul(votes.num_ballots);
            Parcel{ votes, transfer_value: tv, worth, received_in: RoundIndex(round) }
        };
        let half = TransferValue::new(1.into(),2.into());
        ledger.append(mk(TransferValue::one(),1));
        ledger.append(mk(half.clone(),2));
        ledger.append(mk(half.clone(),3));
        ledger.append(mk(TransferValue::one(),4));
        let drained = ledger.drain_all_ascending_value();
        let order : Vec<(String,usize)> = drained.iter().map(|p|(p.transfer_value.to_string(),p.received_in.0)).collect();
        assert_eq!(order,vec![("1/2".to_string(),2),("1/2".to_string(),3),("1".to_string(),1),("1".to_string(),4)]);
        assert!(ledger.is_empty());
        assert!(ledger.worth().is_zero());
    }

    #[test]
    fn last_parcel_is_the_most_recent() {
        let btl = BTL{ candidates: vec![CandidateIndex(0)], n: 3 };
        let mut ledger = ParcelLedger::default();
        for round in 1..=3 {
            let mut votes = VotesWithSameTransferValue::default();
            votes.add_vote(vote(&btl));
            ledger.append(Parcel{ worth: TransferValue::one().mul(votes.num_ballots), votes, transfer_value: TransferValue::one(), received_in: RoundIndex(round) });
        }
        assert_eq!(ledger.drain_last().unwrap().received_in,RoundIndex(3));
        assert_eq!(ledger.num_parcels(),2);
    }
}
