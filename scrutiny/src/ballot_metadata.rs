//! Information about the contest, such as candidates and the groups they stand in.

use serde::{Serialize,Deserialize};
use std::fmt;
use std::collections::HashMap;

/// a candidate, referred to by position on the ballot paper, 0 being first
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateIndex(pub usize);
// type alias really, don't want long display
impl fmt::Display for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// a group (party column), referred to by position on the ballot paper, 0 being first
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupIndex(pub usize);

impl fmt::Display for GroupIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
impl fmt::Debug for GroupIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// The number of candidates to be elected, or some other count of candidates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct NumberOfCandidates(pub usize);

impl fmt::Display for NumberOfCandidates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Information about the election
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct ElectionMetadata {
    pub name : ElectionName,
    pub candidates : Vec<Candidate>,
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub groups : Vec<Group>,
}

impl ElectionMetadata {
    pub fn group(&self,index:GroupIndex) -> &Group { &self.groups[index.0] }
    pub fn candidate(&self,index:CandidateIndex) -> &Candidate { &self.candidates[index.0] }
    pub fn num_candidates(&self) -> usize { self.candidates.len() }
    pub fn get_candidate_name_lookup(&self) -> HashMap<String,CandidateIndex> {
        let mut res = HashMap::default();
        for i in 0..self.candidates.len() {
            res.insert(self.candidates[i].name.clone(),CandidateIndex(i));
        }
        res
    }
}

/// Which election it was.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct ElectionName {
    /// The year this election was held
    pub year : String,
    /// The name of the authority running the election, e.g. AEC
    pub authority : String,
    /// the overall name of the election, e.g. Federal
    pub name : String,
    /// region in this contest, e.g. Vic
    pub electorate : String,
}

impl ElectionName {
    pub fn human_readable_name(&self) -> String {
        format!("{} {} election for {}",self.year,self.name,self.electorate)
    }
}

/// information about a group (column) on the ballot paper. This may be a pseudo-group, such as "ungrouped".
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct Group {
    /// The name of the column on the ballot paper, typically a letter.
    pub column_id : String,
    /// The name of the party
    pub name : String,
    /// an abbreviation for the party
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub abbreviation : Option<String>,
    /// true if one is allowed to vote atl for this group. False for "ungrouped", also conceivably a group that did not register a ticket in a ticket election.
    pub atl_allowed : bool,
    /// the candidates in this group, in ballot paper order.
    pub candidates : Vec<CandidateIndex>,
    /// the registered group voting tickets for this group, if any.
    #[serde(skip_serializing_if = "Vec::is_empty",default)]
    pub tickets : Vec<Vec<CandidateIndex>>
}

/// information about a candidate in the contest.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct Candidate {
    pub name : String,
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub group : Option<GroupIndex>,
    // position on the group ticket. 1 means first place.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub position : Option<usize>,
}
