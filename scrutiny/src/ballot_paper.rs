// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! The formal votes the counter works on. Formality adjudication of raw ballot
//! markings is the job of the ingestion layer; by the time a vote reaches these
//! types it is known formal.

use crate::ballot_metadata::{CandidateIndex, GroupIndex};
use serde::{Deserialize,Serialize};

/// A formal vote, may be above the line or below the line.
#[derive(Clone,Debug)]
pub enum FormalVote {
    Btl(BTL),
    Atl(ATL)
}

/// Where a vote came from.
#[derive(Clone, Copy,Debug)]
pub enum VoteSource<'a> {
    Btl(&'a BTL),
    Atl(&'a ATL)
}

/// Below the line vote. Many voters write the same preference list; they share
/// one of these with a multiplicity, which matters enormously for ticket
/// elections where hundreds of thousands of papers are identical.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct BTL {
    /// Candidates, in preference order
    pub candidates : Vec<CandidateIndex>,
    /// Number of people who voted in this way.
    pub n : usize,
}

/// Above the line vote, for one or more groups.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct ATL {
    /// Groups, in preference order. A group voting ticket vote has exactly one.
    pub groups : Vec<GroupIndex>,
    /// Number of people who voted in this way.
    pub n : usize,
}
