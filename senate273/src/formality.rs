// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! Formality adjudication: deciding which raw ballot papers are formal votes
//! and what preferences they express. The savings provisions are deliberately
//! generous; a paper is only informal if no reading saves it.

use scrutiny::ballot_metadata::{CandidateIndex, ElectionMetadata, GroupIndex};
use scrutiny::ballot_paper::{ATL, BTL, FormalVote};
use scrutiny::election_data::ElectionData;
use serde::{Deserialize,Serialize};
use std::collections::{BTreeMap, HashMap};

/// A marking in a particular square on a ballot. This may or may not be a number.
#[derive(Copy,Clone,Debug,Eq, PartialEq)]
pub enum RawBallotMarking {
    Number(u16),
    /// A marking that is legislatively considered the same as a 1, such as a tick or a cross.
    OneEquivalent,
    Blank,
    Other,
}

pub fn parse_marking(marking:&str) -> RawBallotMarking {
    match marking.trim() {
        "" => RawBallotMarking::Blank,
        "X" | "x" | "*" | "/" => RawBallotMarking::OneEquivalent,
        written => match written.parse::<u16>() {
            Ok(number) => RawBallotMarking::Number(number),
            Err(_) => {
                log::warn!("Found other marking : {}",written);
                RawBallotMarking::Other
            }
        }
    }
}

/// Since the 2016 reform: at least this many preferences above the line make a formal ATL vote.
pub const POST2016_MIN_ATL_PREFS : usize = 1;
/// Since the 2016 reform: at least this many preferences below the line make a formal BTL vote.
pub const POST2016_MIN_BTL_PREFS : usize = 6;

/// One scanned ballot paper: what is written in each square, above the line
/// squares first (one per group that may take an ATL vote, in ballot paper
/// order) followed by one square per candidate.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct RawPaper {
    pub squares : Vec<String>,
    /// number of identical papers.
    #[serde(default="one_paper")]
    pub n : usize,
}

fn one_paper() -> usize { 1 }

/// Interprets the raw papers of one contest: knows the column layout and the
/// formality thresholds in force.
pub struct BallotInterpreter {
    /// the groups with a square above the line, in ballot paper order.
    atl_groups : Vec<GroupIndex>,
    num_candidates : usize,
    min_atl_prefs : usize,
    min_btl_prefs : usize,
}

impl BallotInterpreter {
    /// The savings provisions since the 2016 reform: one or more squares
    /// numbered above the line, or six or more below.
    pub fn post2016(metadata:&ElectionMetadata) -> Self {
        Self::with_thresholds(metadata,POST2016_MIN_ATL_PREFS,POST2016_MIN_BTL_PREFS)
    }

    /// The ticket era: a single square above the line, or every candidate
    /// numbered below it.
    pub fn fully_numbered_btl(metadata:&ElectionMetadata) -> Self {
        Self::with_thresholds(metadata,1,metadata.candidates.len())
    }

    pub fn with_thresholds(metadata:&ElectionMetadata,min_atl_prefs:usize,min_btl_prefs:usize) -> Self {
        BallotInterpreter{
            atl_groups: (0..metadata.groups.len()).map(GroupIndex).filter(|&g|metadata.group(g).atl_allowed).collect(),
            num_candidates: metadata.candidates.len(),
            min_atl_prefs,
            min_btl_prefs,
        }
    }

    /// Decide formality of a single paper. A formal below the line vote beats
    /// an above the line vote on the same paper; a paper formal neither way is
    /// informal (None).
    pub fn interpret(&self,squares:&[RawBallotMarking]) -> Option<FormalVote> {
        let cut = self.atl_groups.len().min(squares.len());
        let (atl_squares,btl_squares) = squares.split_at(cut);
        let btl_entries : Vec<CandidateIndex> = (0..self.num_candidates).map(CandidateIndex).collect();
        let btl_prefs = preference_run(btl_squares,&btl_entries);
        if btl_prefs.len()>=self.min_btl_prefs {
            return Some(FormalVote::Btl(BTL{ candidates: btl_prefs, n: 1 }));
        }
        let atl_prefs = preference_run(atl_squares,&self.atl_groups);
        if atl_prefs.len()>=self.min_atl_prefs {
            return Some(FormalVote::Atl(ATL{ groups: atl_prefs, n: 1 }));
        }
        None
    }

    /// Adjudicate a whole pile of papers: formal votes merge into equivalence
    /// classes with multiplicities, the representation the counter wants, and
    /// informal papers are counted and go no further.
    pub fn adjudicate(&self,metadata:&ElectionMetadata,papers:&[RawPaper]) -> ElectionData {
        let mut atl : BTreeMap<Vec<GroupIndex>,usize> = BTreeMap::new();
        let mut btl : BTreeMap<Vec<CandidateIndex>,usize> = BTreeMap::new();
        let mut informal = 0;
        for paper in papers {
            let squares : Vec<RawBallotMarking> = paper.squares.iter().map(|s|parse_marking(s)).collect();
            match self.interpret(&squares) {
                Some(FormalVote::Btl(vote)) => { *btl.entry(vote.candidates).or_insert(0)+=paper.n; }
                Some(FormalVote::Atl(vote)) => { *atl.entry(vote.groups).or_insert(0)+=paper.n; }
                None => { informal+=paper.n; }
            }
        }
        if informal>0 {
            log::info!("{} papers are informal and take no part in the count",informal);
        }
        ElectionData{
            metadata: metadata.clone(),
            atl: atl.into_iter().map(|(groups,n)|ATL{ groups, n }).collect(),
            btl: btl.into_iter().map(|(candidates,n)|BTL{ candidates, n }).collect(),
            informal,
        }
    }
}

/// Read one run of squares as preferences: the number written in square i
/// claims entries[i] as that preference. Gather which squares carry each
/// number, then walk the numbers upward from 1; the run ends at the first
/// number that is missing or written in more than one square, and whatever
/// was gathered to that point is the vote.
fn preference_run<T:Copy>(squares:&[RawBallotMarking],entries:&[T]) -> Vec<T> {
    let mut at_number : HashMap<usize,Vec<T>> = HashMap::new();
    for (square,&entry) in squares.iter().zip(entries.iter()) {
        let number = match square {
            RawBallotMarking::Number(n) => Some(*n as usize),
            // ticks and crosses read as a first preference.
            RawBallotMarking::OneEquivalent => Some(1),
            RawBallotMarking::Blank | RawBallotMarking::Other => None,
        };
        if let Some(number) = number {
            at_number.entry(number).or_default().push(entry);
        }
    }
    let mut prefs = vec![];
    for number in 1.. {
        match at_number.get(&number) {
            Some(claimants) if claimants.len()==1 => prefs.push(claimants[0]),
            _ => break, // a gap or a duplicate ends the run
        }
    }
    prefs
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrutiny::ballot_metadata::{Candidate, ElectionName, Group};

    /// three groups, each allowed an ATL square; seven candidates.
    fn metadata() -> ElectionMetadata {
        let group = |column:&str,candidates:Vec<CandidateIndex>| Group{
            column_id: column.to_string(),
            name: format!("Group {}",column),
            abbreviation: None,
            atl_allowed: true,
            candidates,
            tickets: vec![],
        };
        ElectionMetadata{
            name: ElectionName{ year: "2022".to_string(), authority: "AEC".to_string(), name: "Federal".to_string(), electorate: "Testland".to_string() },
            candidates: (0..7).map(|i|Candidate{ name: format!("Candidate {}",i), group: None, position: None }).collect(),
            groups: vec![
                group("A",vec![CandidateIndex(0),CandidateIndex(1),CandidateIndex(2)]),
                group("B",vec![CandidateIndex(3),CandidateIndex(4)]),
                group("C",vec![CandidateIndex(5),CandidateIndex(6)]),
            ],
        }
    }

    fn interpret(squares:&[&str]) -> Option<FormalVote> {
        let parsed : Vec<RawBallotMarking> = squares.iter().map(|s|parse_marking(s)).collect();
        BallotInterpreter::post2016(&metadata()).interpret(&parsed)
    }

    #[test]
    fn btl_needs_six_continuous_preferences() {
        // 3 atl squares then 7 btl squares
        match interpret(&["","","","1","2","3","4","5","6","7"]) {
            Some(FormalVote::Btl(btl)) => {
                assert_eq!(btl.candidates.len(),7);
                assert_eq!(btl.candidates[0],CandidateIndex(0));
            }
            _ => panic!("should be formal below the line"),
        }
        // only five btl preferences is not enough, but the single atl 1 saves it
        match interpret(&["1","","","1","2","3","4","5","",""]) {
            Some(FormalVote::Atl(atl)) => assert_eq!(atl.groups,vec![GroupIndex(0)]),
            _ => panic!("should be saved as an above the line vote"),
        }
    }

    #[test]
    fn repeated_and_gapped_numbers_end_the_run() {
        let parse = |squares:&[&str]| squares.iter().map(|s|parse_marking(s)).collect::<Vec<_>>();
        let candidates = [CandidateIndex(0),CandidateIndex(1),CandidateIndex(2)];
        // 1 2 2 : the duplicated 2 ends the run after the 1
        assert_eq!(preference_run(&parse(&["1","2","2"]),&candidates),vec![CandidateIndex(0)]);
        // 1 3 4 : the gap at 2 ends the run
        assert_eq!(preference_run(&parse(&["1","3","4"]),&candidates),vec![CandidateIndex(0)]);
        // 2 3 1 : a complete numbering in any square order is fine
        assert_eq!(preference_run(&parse(&["2","3","1"]),&candidates),
            vec![CandidateIndex(2),CandidateIndex(0),CandidateIndex(1)]);
    }

    #[test]
    fn a_cross_counts_as_a_first_preference_above_the_line() {
        match interpret(&["X","2","","","","","","","",""]) {
            Some(FormalVote::Atl(atl)) => assert_eq!(atl.groups,vec![GroupIndex(0),GroupIndex(1)]),
            _ => panic!("cross should read as a 1"),
        }
    }

    #[test]
    fn blank_paper_is_informal() {
        assert!(interpret(&["","","","","","","","","",""]).is_none());
    }

    #[test]
    fn adjudication_merges_identical_votes_and_counts_informals() {
        let atl_for = |column:usize,n:usize| {
            let mut squares = vec![String::new();10];
            squares[column]="1".to_string();
            RawPaper{ squares, n }
        };
        let papers = vec![
            atl_for(0,60),
            atl_for(1,30),
            atl_for(0,10), // merges with the first
            RawPaper{ squares: vec!["1".to_string(),"1".to_string()], n: 5 }, // duplicated 1: informal
        ];
        let metadata = metadata();
        let data = BallotInterpreter::post2016(&metadata).adjudicate(&metadata,&papers);
        assert_eq!(data.informal,5);
        assert_eq!(data.num_votes(),100);
        assert_eq!(data.atl.len(),2);
        let by_group : Vec<(Vec<GroupIndex>,usize)> = data.atl.iter().map(|a|(a.groups.clone(),a.n)).collect();
        assert!(by_group.contains(&(vec![GroupIndex(0)],70)));
        assert!(by_group.contains(&(vec![GroupIndex(1)],30)));
        assert!(data.btl.is_empty());
    }

    #[test]
    fn ticket_era_thresholds_require_full_numbering_below_the_line() {
        let metadata = metadata();
        let interpreter = BallotInterpreter::fully_numbered_btl(&metadata);
        let parse = |squares:&[&str]| squares.iter().map(|s|parse_marking(s)).collect::<Vec<_>>();
        // six of seven candidates numbered is informal in the ticket era...
        assert!(interpreter.interpret(&parse(&["","","","1","2","3","4","5","6",""])).is_none());
        // ...all seven is formal.
        assert!(matches!(interpreter.interpret(&parse(&["","","","1","2","3","4","5","6","7"])),Some(FormalVote::Btl(_))));
    }
}
