// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! The two historical forms of Section 273 of the Commonwealth Electoral Act
//! 1918 supported by the engine: the pre 2016 group voting ticket form and the
//! 2016 on optional preferential form.

use scrutiny::ballot_pile::BallotPaperCount;
use scrutiny::election_data::AtlExpansion;
use scrutiny::round_engine::{CountRules, ShortcutElectionTiming, SurplusParcels};

pub mod formality;
pub mod specification;

/// The act as it stood before the 2016 reform. Above the line votes follow the
/// party's registered ticket; a surplus takes every parcel the candidate
/// holds, divided over their combined paper count; the s273(13) bulk exclusion
/// shortcut is in play.
pub struct FederalPre2016 {}

impl CountRules for FederalPre2016 {
    fn name() -> String { "FederalPre2016".to_string() }
    fn atl_expansion() -> AtlExpansion { AtlExpansion::GroupVotingTickets }
    fn surplus_parcels() -> SurplusParcels { SurplusParcels::AllParcels }
    fn surplus_denominator(considered:BallotPaperCount,_transferable:BallotPaperCount,_elected_on_first_preferences:bool) -> BallotPaperCount {
        considered
    }
    fn uses_bulk_exclusion() -> bool { true }
    fn when_to_apply_last_vacancy_rule() -> ShortcutElectionTiming { ShortcutElectionTiming::OnlyIfNoUndistributedSurplus }
    fn when_to_elect_all_remaining() -> ShortcutElectionTiming { ShortcutElectionTiming::OnlyIfNoUndistributedSurplus }
}

/// The act since the 2016 reform. Optional preferential voting above and below
/// the line; a surplus from a mid count election takes only the last parcel
/// received, divided over its transferable papers; bulk exclusion is not used.
pub struct FederalPost2016 {}

impl CountRules for FederalPost2016 {
    fn name() -> String { "FederalPost2016".to_string() }
    fn atl_expansion() -> AtlExpansion { AtlExpansion::GroupOrder }
    fn surplus_parcels() -> SurplusParcels { SurplusParcels::LastParcelReceived }
    fn surplus_denominator(considered:BallotPaperCount,transferable:BallotPaperCount,elected_on_first_preferences:bool) -> BallotPaperCount {
        if elected_on_first_preferences { considered } else { transferable }
    }
    fn uses_bulk_exclusion() -> bool { false }
    fn when_to_apply_last_vacancy_rule() -> ShortcutElectionTiming { ShortcutElectionTiming::OnlyIfNoUndistributedSurplus }
    fn when_to_elect_all_remaining() -> ShortcutElectionTiming { ShortcutElectionTiming::OnlyIfNoUndistributedSurplus }
}
