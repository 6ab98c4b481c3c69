// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! The election specification file: everything needed to run (or re-run) a
//! count. Doubles as the fixture format for tests, so a historical count with
//! known electoral commission decisions replays byte for byte. The votes may
//! be carried already adjudicated, or as raw square by square markings that
//! still need formality adjudication.

use crate::formality::{BallotInterpreter, RawPaper};
use scrutiny::ballot_metadata::{ElectionMetadata, NumberOfCandidates};
use scrutiny::election_data::ElectionData;
use scrutiny::tie_resolution::DecisionTable;
use serde::{Deserialize,Serialize};
use std::fs::File;
use std::path::Path;

/// The votes in a specification file: either formal votes ready to count, or
/// raw papers as scanned.
#[derive(Clone,Serialize,Deserialize)]
#[serde(untagged)]
pub enum BallotPapers {
    Formal(ElectionData),
    Raw(RawBallots),
}

/// Raw papers before formality adjudication.
#[derive(Clone,Serialize,Deserialize)]
pub struct RawBallots {
    pub metadata : ElectionMetadata,
    pub papers : Vec<RawPaper>,
}

impl BallotPapers {
    pub fn metadata(&self) -> &ElectionMetadata {
        match self {
            BallotPapers::Formal(data) => &data.metadata,
            BallotPapers::Raw(raw) => &raw.metadata,
        }
    }

    /// The formal votes, adjudicating raw papers with the given interpreter if
    /// that is what the file carried.
    pub fn resolve(&self,interpreter:&BallotInterpreter) -> ElectionData {
        match self {
            BallotPapers::Formal(data) => data.clone(),
            BallotPapers::Raw(raw) => interpreter.adjudicate(&raw.metadata,&raw.papers),
        }
    }
}

#[derive(Clone,Serialize,Deserialize)]
pub struct ElectionSpecification {
    pub election : BallotPapers,
    pub vacancies : NumberOfCandidates,
    /// decisions the electoral officer made (or would make), for replaying a known count.
    #[serde(default)]
    pub decisions : DecisionTable,
}

impl ElectionSpecification {
    pub fn load(path:&Path) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save(&self,path:&Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file,self)?;
        Ok(())
    }
}
