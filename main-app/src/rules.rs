// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use scrutiny::ballot_metadata::{ElectionMetadata, NumberOfCandidates};
use scrutiny::election_data::ElectionData;
use scrutiny::round_engine::{distribute_preferences, CountOutcome};
use scrutiny::tie_resolution::TieBreakOracle;
use senate273::formality::BallotInterpreter;
use senate273::{FederalPost2016, FederalPre2016};

/// The counting rules supported on the command line.
#[derive(Copy, Clone)]
pub enum Rules {
    FederalPre2016,
    FederalPost2016,
}

impl FromStr for Rules {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FederalPre2016" => Ok(Rules::FederalPre2016),
            "FederalPost2016" => Ok(Rules::FederalPost2016),
            _ => Err("No such rule supported")
        }
    }
}

impl Display for Rules {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rules::FederalPre2016 => "FederalPre2016",
            Rules::FederalPost2016 => "FederalPost2016",
        };
        f.write_str(s)
    }
}

impl Rules {
    pub fn count(&self,data:&ElectionData,vacancies:NumberOfCandidates,oracle:&dyn TieBreakOracle) -> CountOutcome {
        match self {
            Rules::FederalPre2016 => distribute_preferences::<FederalPre2016>(data,vacancies,oracle),
            Rules::FederalPost2016 => distribute_preferences::<FederalPost2016>(data,vacancies,oracle),
        }
    }

    /// The formality rules that go with the counting rules, should the
    /// specification file carry raw papers.
    pub fn interpreter(&self,metadata:&ElectionMetadata) -> BallotInterpreter {
        match self {
            Rules::FederalPre2016 => BallotInterpreter::fully_numbered_btl(metadata),
            Rules::FederalPost2016 => BallotInterpreter::post2016(metadata),
        }
    }
}
