// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! The round by round record of the distribution of preferences. This is the
//! only persisted artefact of a count; every rational in it serialises as an
//! exact "p/q" string.

use crate::ballot_metadata::{CandidateIndex, ElectionMetadata, NumberOfCandidates};
use crate::ballot_pile::BallotPaperCount;
use crate::tie_resolution::TieContext;
use crate::transfer_value::{StringSerializedRational, TransferValue};
use serde::{Serialize,Deserialize};
use std::fmt::{Display, Formatter};

/// The 1-based number of a count round. 1 is the first preference distribution.
#[derive(Copy,Clone,Debug,Ord, PartialOrd, Eq, PartialEq,Hash,Serialize,Deserialize)]
pub struct RoundIndex(pub usize);

impl Display for RoundIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}",self.0)
    }
}

/// Why a candidate was declared elected.
#[derive(Copy, Clone,Debug,Serialize,Deserialize,Eq, PartialEq)]
pub enum ElectionReason {
    ReachedQuota,
    /// Commonwealth Electoral Act s273(17), the last vacancy rule.
    HighestOfLastTwoStanding,
    /// Commonwealth Electoral Act s273(18), as many continuing candidates as vacancies.
    AllRemainingMustBeElected,
}

#[derive(Copy, Clone,Debug,Serialize,Deserialize,Eq, PartialEq)]
pub struct CandidateElected {
    pub who : CandidateIndex,
    /// 1-based order of election over the whole count.
    pub order : usize,
    pub why : ElectionReason,
}

#[derive(Copy, Clone,Debug,Serialize,Deserialize,Eq, PartialEq)]
pub struct CandidateExcluded {
    pub who : CandidateIndex,
    /// 1-based order of exclusion over the whole count.
    pub order : usize,
}

/// Papers landing on one candidate in one transfer.
#[derive(Clone,Debug,Serialize,Deserialize,PartialEq,Eq)]
pub struct ParcelMoved {
    pub to : CandidateIndex,
    pub ballots : BallotPaperCount,
    /// the exact vote value those ballots carried.
    pub weighted : StringSerializedRational,
}

/// Papers (and vote value) leaving the count.
#[derive(Clone,Debug,Serialize,Deserialize,PartialEq,Eq)]
pub struct ExhaustedPortion {
    pub ballots : BallotPaperCount,
    pub weighted : StringSerializedRational,
}

impl Default for ExhaustedPortion {
    fn default() -> Self { ExhaustedPortion{ ballots: BallotPaperCount(0), weighted: StringSerializedRational::zero() } }
}

/// One parcel moved from one candidate during a round. An exclusion spanning
/// several transfer values produces several of these in the one round.
#[derive(Clone,Debug,Serialize,Deserialize,PartialEq,Eq)]
pub struct Transfer {
    pub from : CandidateIndex,
    pub transfer_value : TransferValue,
    pub parcels_moved : Vec<ParcelMoved>,
    pub exhausted : ExhaustedPortion,
}

/// How a transfer value was worked out, shown as exact fractions.
#[derive(Clone,Debug,Serialize,Deserialize,PartialEq,Eq)]
pub struct TransferValueCreation {
    pub surplus : StringSerializedRational,
    pub votes : StringSerializedRational,
    /// The number of ballot papers considered for redistribution. May be all papers or a last parcel.
    pub ballots_considered : BallotPaperCount,
    /// The number of the considered ballots that had a continuing candidate to go to.
    pub continuing_ballots : BallotPaperCount,
    pub transfer_value : TransferValue,
}

/// A consultation of the tie-break oracle, and its answer.
#[derive(Clone,Debug,Serialize,Deserialize,PartialEq,Eq)]
pub struct TieBreakRecord {
    pub context : TieContext,
    pub candidates : Vec<CandidateIndex>,
    pub chosen : CandidateIndex,
}

/// Everything that happened in one round of the count.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct RoundRecord {
    pub number : RoundIndex,
    /// human readable statutory notes, e.g. which subsection forced an action.
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub note : Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub elected : Vec<CandidateElected>,
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub excluded : Vec<CandidateExcluded>,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub created_transfer_value : Option<TransferValueCreation>,
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub transfers : Vec<Transfer>,
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub tie_breaks : Vec<TieBreakRecord>,
    /// exact tally per candidate at the end of the round.
    pub tallies_after : Vec<StringSerializedRational>,
    /// papers held per candidate at the end of the round.
    pub papers_after : Vec<BallotPaperCount>,
    /// of the papers held, how many arrived as above the line votes.
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub atl_papers_after : Vec<BallotPaperCount>,
    pub exhausted_after : ExhaustedPortion,
    /// of the exhausted papers, how many arrived as above the line votes.
    pub exhausted_atl_after : BallotPaperCount,
    /// papers set aside when the count terminated mid-distribution, if any.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub set_aside_after : Option<ExhaustedPortion>,
}

#[derive(Clone,Copy,Serialize,Deserialize,Debug)]
pub struct QuotaInfo {
    pub papers : BallotPaperCount,
    pub vacancies : NumberOfCandidates,
    pub quota : usize,
}

impl Display for QuotaInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f,"({} papers)/({} vacancies+1) -> quota {}",self.papers,self.vacancies,self.quota)
    }
}

/// The headline result of a count.
#[derive(Clone,Serialize,Deserialize,Debug)]
pub struct CountSummary {
    pub total_formal : BallotPaperCount,
    pub quota : usize,
    pub vacancies : NumberOfCandidates,
    /// candidates in order of election.
    pub elected : Vec<CandidateIndex>,
}

#[derive(Clone,Serialize,Deserialize)]
pub struct Transcript {
    /// The rules that were used to compute this transcript.
    pub rules : String,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub quota : Option<QuotaInfo>,
    pub rounds : Vec<RoundRecord>,
    /// candidates in order of election.
    pub elected : Vec<CandidateIndex>,
}

impl Transcript {
    pub fn new(rules:String) -> Self {
        Transcript{ rules, quota: None, rounds: vec![], elected: vec![] }
    }
    pub fn round(&self,index:RoundIndex) -> &RoundRecord {
        &self.rounds[index.0-1]
    }
    pub fn summary(&self) -> Option<CountSummary> {
        self.quota.map(|q|CountSummary{
            total_formal: q.papers,
            quota: q.quota,
            vacancies: q.vacancies,
            elected: self.elected.clone(),
        })
    }
}

/// A transcript bundled with the metadata of the contest it describes, so the
/// persisted file is self describing.
#[derive(Clone,Serialize,Deserialize)]
pub struct TranscriptWithMetadata {
    pub metadata : ElectionMetadata,
    pub transcript : Transcript,
}
