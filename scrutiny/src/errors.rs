// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

use crate::ballot_metadata::CandidateIndex;
use crate::tie_resolution::TieContext;
use crate::transcript::RoundIndex;

/// Everything that can fatally end a count. Nothing is retried; the transcript
/// accumulated so far is kept alongside the error for post mortem inspection.
#[derive(thiserror::Error, Debug)]
pub enum CountError {
    /// An arithmetic invariant of the count no longer holds. The count cannot
    /// be trusted past this point.
    #[error("invariant {invariant} violated: {detail}")]
    InvariantViolation {
        invariant : &'static str,
        detail : String,
    },
    /// The input was malformed and the count never started.
    #[error("input rejected: {0}")]
    InputRejected(String),
    /// The statute could not break a tie and the oracle declined to.
    #[error("unresolved {context} tie in round {round} between candidates {candidates:?}")]
    TieUnresolved {
        round : RoundIndex,
        context : TieContext,
        candidates : Vec<CandidateIndex>,
    },
}

impl CountError {
    pub fn invariant(invariant:&'static str,detail:String) -> Self {
        CountError::InvariantViolation{ invariant, detail }
    }
}
