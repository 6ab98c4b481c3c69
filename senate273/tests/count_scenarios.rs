// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

//! End to end counts of small hand checkable elections, one per statutory
//! behaviour: quota election, surplus transfer, statutory tie break, bulk
//! exclusion, the last vacancy rule, and exhaustion.

use num::{BigInt, BigRational};
use scrutiny::ballot_metadata::{Candidate, CandidateIndex, ElectionMetadata, ElectionName, NumberOfCandidates};
use scrutiny::ballot_paper::BTL;
use scrutiny::election_data::ElectionData;
use scrutiny::errors::CountError;
use scrutiny::round_engine::{distribute_preferences, CountOutcome};
use scrutiny::tie_resolution::{DecisionTable, LowestIndexOracle};
use scrutiny::transcript::{ElectionReason, Transcript};
use senate273::{FederalPost2016, FederalPre2016};

fn metadata(names:&[&str]) -> ElectionMetadata {
    ElectionMetadata{
        name: ElectionName{ year: "2022".to_string(), authority: "AEC".to_string(), name: "Federal".to_string(), electorate: "Testland".to_string() },
        candidates: names.iter().map(|n|Candidate{ name: n.to_string(), group: None, position: None }).collect(),
        groups: vec![],
    }
}

fn btl_data(names:&[&str],votes:&[(&[usize],usize)]) -> ElectionData {
    ElectionData{
        metadata: metadata(names),
        atl: vec![],
        btl: votes.iter().map(|(prefs,n)|BTL{ candidates: prefs.iter().map(|&c|CandidateIndex(c)).collect(), n: *n }).collect(),
        informal: 0,
    }
}

fn rational(n:i64) -> BigRational { BigRational::from_integer(BigInt::from(n)) }

/// Check the fundamental invariant on the final record of a finished count:
/// everything that entered the count is still accounted for.
fn assert_conserved(transcript:&Transcript) {
    let total = rational(transcript.quota.unwrap().papers.0 as i64);
    let last = transcript.rounds.last().unwrap();
    let mut sum = last.exhausted_after.weighted.0.clone();
    if let Some(set_aside) = &last.set_aside_after { sum += set_aside.weighted.0.clone(); }
    for t in &last.tallies_after { sum += t.0.clone(); }
    assert_eq!(sum,total,"vote value not conserved");
}

fn completed(outcome:CountOutcome) -> Transcript {
    if let Some(e) = &outcome.error { panic!("count failed: {}",e); }
    assert_conserved(&outcome.transcript);
    outcome.transcript
}

#[test]
fn single_vacancy_majority_elected_in_round_one() {
    let data = btl_data(&["Alto","Bass"],&[(&[0],60),(&[1],40)]);
    let transcript = completed(distribute_preferences::<FederalPost2016>(&data,NumberOfCandidates(1),&DecisionTable::default()));
    assert_eq!(transcript.quota.unwrap().quota,51);
    assert_eq!(transcript.elected,vec![CandidateIndex(0)]);
    assert_eq!(transcript.rounds.len(),1);
    assert!(transcript.rounds[0].transfers.is_empty(),"no transfers should occur");
    assert_eq!(transcript.rounds[0].elected[0].why,ElectionReason::ReachedQuota);
}

#[test]
fn surplus_transfer_elects_second_candidate() {
    // 70 x [A,B], 20 x [C,A], 10 x [B,C]; two vacancies; quota 34.
    let data = btl_data(&["Alto","Bass","Corno"],&[(&[0,1],70),(&[2,0],20),(&[1,2],10)]);
    let transcript = completed(distribute_preferences::<FederalPost2016>(&data,NumberOfCandidates(2),&DecisionTable::default()));
    assert_eq!(transcript.quota.unwrap().quota,34);
    assert_eq!(transcript.elected,vec![CandidateIndex(0),CandidateIndex(1)]);
    assert_eq!(transcript.rounds.len(),2);
    // round 2 is the surplus distribution: 70 papers move to B at 36/70, worth exactly 36.
    let round2 = &transcript.rounds[1];
    let creation = round2.created_transfer_value.as_ref().unwrap();
    assert_eq!(creation.transfer_value.to_string(),"18/35");
    assert_eq!(creation.surplus.0,rational(36));
    assert_eq!(round2.transfers.len(),1);
    assert_eq!(round2.transfers[0].parcels_moved.len(),1);
    assert_eq!(round2.transfers[0].parcels_moved[0].to,CandidateIndex(1));
    assert_eq!(round2.transfers[0].parcels_moved[0].weighted.0,rational(36));
    assert_eq!(round2.tallies_after[1].0,rational(46));
}

#[test]
fn exclusion_tie_broken_by_prior_round_totals_without_the_oracle() {
    // Alto and Bass end up level on 5; at count 1 Alto had only 4, so Alto
    // goes. The default decision table refuses to answer anything, so the
    // count itself proves the oracle was never needed.
    let data = btl_data(&["Alto","Bass","Corno","Drum","Echo"],&[
        (&[0,2],4),
        (&[1,2],5),
        (&[2],6),
        (&[3,0],1),
        (&[4],10),
    ]);
    let transcript = completed(distribute_preferences::<FederalPost2016>(&data,NumberOfCandidates(1),&DecisionTable::default()));
    // count 1: first preferences. count 2: Drum excluded, paper flows to Alto.
    // count 3: Alto and Bass tied on 5, broken by count 1 totals.
    let round3 = &transcript.rounds[2];
    assert_eq!(round3.excluded.len(),1);
    assert_eq!(round3.excluded[0].who,CandidateIndex(0));
    assert!(round3.note.iter().any(|n|n.contains("resolved on totals at count 1")),"statutory resolution should be noted: {:?}",round3.note);
    for round in &transcript.rounds { assert!(round.tie_breaks.is_empty(),"oracle should never be consulted"); }
    assert_eq!(transcript.elected,vec![CandidateIndex(2)]);
}

#[test]
fn bulk_exclusion_removes_several_candidates_in_one_round() {
    // A, B and C on 1 vote each sum to 3, below Drum's 10; s273(13) lets all
    // three go at once under the pre 2016 rules.
    let data = btl_data(&["Alto","Bass","Corno","Drum","Echo"],&[
        (&[0,3],1),
        (&[1,3],1),
        (&[2,3],1),
        (&[3],10),
        (&[4],12),
    ]);
    let transcript = completed(distribute_preferences::<FederalPre2016>(&data,NumberOfCandidates(1),&LowestIndexOracle{}));
    assert_eq!(transcript.quota.unwrap().quota,13);
    let round2 = &transcript.rounds[1];
    assert_eq!(round2.excluded.len(),3,"all three should go in the one round");
    let orders : Vec<(CandidateIndex,usize)> = round2.excluded.iter().map(|e|(e.who,e.order)).collect();
    assert_eq!(orders,vec![(CandidateIndex(0),1),(CandidateIndex(1),2),(CandidateIndex(2),3)]);
    assert!(round2.note.iter().any(|n|n.contains("bulk exclusion")),"the reading of s273(13) must be named in the round note");
    // Drum picks up all three papers and reaches quota exactly.
    assert_eq!(transcript.elected,vec![CandidateIndex(3)]);
    assert_eq!(transcript.rounds.len(),2);
}

#[test]
fn last_vacancy_goes_to_the_higher_of_the_last_two_standing() {
    let data = btl_data(&["Alto","Bass","Corno"],&[(&[0],50),(&[1],40),(&[2],15)]);
    let transcript = completed(distribute_preferences::<FederalPost2016>(&data,NumberOfCandidates(1),&DecisionTable::default()));
    assert_eq!(transcript.quota.unwrap().quota,53);
    // round 2 excludes Corno, whose papers exhaust; the last vacancy rule then
    // elects Alto on 50 without a quota.
    let round2 = &transcript.rounds[1];
    assert_eq!(round2.excluded[0].who,CandidateIndex(2));
    assert_eq!(round2.elected.len(),1);
    assert_eq!(round2.elected[0].who,CandidateIndex(0));
    assert_eq!(round2.elected[0].why,ElectionReason::HighestOfLastTwoStanding);
    assert!(round2.note.iter().any(|n|n.contains("last vacancy")),"the statutory note must mention the last vacancy rule");
    assert_eq!(round2.exhausted_after.ballots.0,15);
    assert_eq!(round2.exhausted_after.weighted.0,rational(15));
}

#[test]
fn surplus_with_no_onward_preferences_exhausts_with_its_weight() {
    // Alto's 70 papers have no later preferences; the whole surplus leaves the
    // count through the exhausted pile, and the total is still conserved.
    let data = btl_data(&["Alto","Bass","Corno"],&[(&[0],70),(&[1],20),(&[2,1],10)]);
    let transcript = completed(distribute_preferences::<FederalPost2016>(&data,NumberOfCandidates(2),&DecisionTable::default()));
    assert_eq!(transcript.quota.unwrap().quota,34);
    let round2 = &transcript.rounds[1];
    assert_eq!(round2.transfers.len(),1);
    assert!(round2.transfers[0].parcels_moved.is_empty());
    assert_eq!(round2.transfers[0].exhausted.ballots.0,70);
    assert_eq!(round2.transfers[0].exhausted.weighted.0,rational(36));
    assert_eq!(round2.tallies_after[0].0,rational(34));
}

#[test]
fn mid_exclusion_election_stops_later_parcels_reaching_the_new_senator() {
    // Bass's exclusion moves 5 papers to Corno, who reaches quota on that very
    // parcel; the checkpoint elects Corno at once and the count ends.
    let data = btl_data(&["Alto","Bass","Corno","Drum"],&[
        (&[0],4),
        (&[1,2],5),
        (&[2],9),
        (&[3],8),
    ]);
    // 26 papers, 1 vacancy, quota 14.
    let transcript = completed(distribute_preferences::<FederalPost2016>(&data,NumberOfCandidates(1),&DecisionTable::default()));
    assert_eq!(transcript.quota.unwrap().quota,14);
    // count 2: Alto excluded, 4 papers exhaust. count 3: Bass excluded, Corno elected mid exclusion.
    let final_round = transcript.rounds.last().unwrap();
    assert_eq!(transcript.elected,vec![CandidateIndex(2)]);
    assert_eq!(final_round.elected[0].why,ElectionReason::ReachedQuota);
    assert_eq!(final_round.tallies_after[2].0,rational(14));
}

#[test]
fn group_voting_tickets_flow_above_the_line_votes() {
    use scrutiny::ballot_metadata::{Group, GroupIndex};
    use scrutiny::ballot_paper::ATL;
    let mut metadata = metadata(&["Alto 1","Alto 2","Bass 1","Bass 2"]);
    metadata.groups = vec![
        Group{ column_id: "A".to_string(), name: "Altos".to_string(), abbreviation: None, atl_allowed: true,
            candidates: vec![CandidateIndex(0),CandidateIndex(1)],
            tickets: vec![vec![CandidateIndex(0),CandidateIndex(1),CandidateIndex(2),CandidateIndex(3)]] },
        Group{ column_id: "B".to_string(), name: "Basses".to_string(), abbreviation: None, atl_allowed: true,
            candidates: vec![CandidateIndex(2),CandidateIndex(3)],
            tickets: vec![vec![CandidateIndex(2),CandidateIndex(3),CandidateIndex(0),CandidateIndex(1)]] },
    ];
    for (i,c) in metadata.candidates.iter_mut().enumerate() { c.group = Some(GroupIndex(i/2)); }
    let data = ElectionData{
        metadata,
        atl: vec![ATL{ groups: vec![GroupIndex(0)], n: 60 },ATL{ groups: vec![GroupIndex(1)], n: 40 }],
        btl: vec![],
        informal: 0,
    };
    let transcript = completed(distribute_preferences::<FederalPre2016>(&data,NumberOfCandidates(2),&DecisionTable::default()));
    assert_eq!(transcript.quota.unwrap().quota,34);
    // both lead candidates over quota on first preferences.
    assert_eq!(transcript.elected,vec![CandidateIndex(0),CandidateIndex(2)]);
    assert_eq!(transcript.rounds[0].tallies_after[0].0,rational(60));
    assert_eq!(transcript.rounds[0].tallies_after[2].0,rational(40));
    assert_eq!(transcript.rounds[0].atl_papers_after[0].0,60);
}

#[test]
fn raw_papers_are_adjudicated_then_counted() {
    use senate273::formality::{BallotInterpreter, RawPaper};
    let metadata = metadata(&["Alto","Bass","Corno","Drum","Echo","Flute","Gong"]);
    // a fully numbered paper putting `first` first and the rest in ballot paper order.
    let paper = |first:usize,n:usize| {
        let mut order : Vec<usize> = (0..7).filter(|&c|c!=first).collect();
        order.insert(0,first);
        let mut squares = vec![String::new();7];
        for (rank,&c) in order.iter().enumerate() { squares[c]=(rank+1).to_string(); }
        RawPaper{ squares, n }
    };
    let papers = vec![
        paper(0,60),
        paper(1,40),
        // the duplicated 2 ends the run after one preference: informal.
        RawPaper{ squares: vec!["1".to_string(),"2".to_string(),"2".to_string()], n: 5 },
    ];
    let data = BallotInterpreter::post2016(&metadata).adjudicate(&metadata,&papers);
    assert_eq!(data.informal,5);
    assert_eq!(data.num_votes(),100);
    let transcript = completed(distribute_preferences::<FederalPost2016>(&data,NumberOfCandidates(1),&DecisionTable::default()));
    assert_eq!(transcript.quota.unwrap().quota,51);
    assert_eq!(transcript.elected,vec![CandidateIndex(0)]);
}

#[test]
fn degenerate_inputs_are_rejected_before_round_one() {
    let names = ["Alto","Bass","Corno"];
    let reject = |data:&ElectionData,vacancies:usize| {
        let outcome = distribute_preferences::<FederalPost2016>(data,NumberOfCandidates(vacancies),&DecisionTable::default());
        match outcome.error {
            Some(CountError::InputRejected(_)) => {}
            other => panic!("expected InputRejected, got {:?}",other.map(|e|e.to_string())),
        }
        assert!(outcome.transcript.rounds.is_empty());
    };
    // no ballots
    reject(&btl_data(&names,&[]),1);
    // as many vacancies as candidates
    reject(&btl_data(&names,&[(&[0],10)]),3);
    // unknown candidate in a preference list
    reject(&btl_data(&names,&[(&[0,7],10)]),1);
    // repeated candidate in a preference list
    reject(&btl_data(&names,&[(&[0,1,0],10)]),1);
    // no vacancies
    reject(&btl_data(&names,&[(&[0],10)]),0);
}
