use crate::ballot_metadata::{CandidateIndex, ElectionMetadata};
use crate::ballot_paper::{ATL, BTL, VoteSource};
use crate::ballot_pile::PartiallyDistributedVote;
use anyhow::bail;
use serde::{Deserialize,Serialize};

/// How an above the line vote turns into a candidate preference list.
#[derive(Copy,Clone,Debug,Eq,PartialEq)]
pub enum AtlExpansion {
    /// Pre 2016: the vote follows the group's registered voting ticket(s).
    GroupVotingTickets,
    /// 2016 on: each preferenced group expands to its candidates in ballot paper order.
    GroupOrder,
}

/// Formal votes for the election.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct ElectionData {
    pub metadata : ElectionMetadata,
    pub atl : Vec<ATL>,
    pub btl : Vec<BTL>,
    /// number of informal votes, kept for reporting only.
    #[serde(default)]
    pub informal : usize,
}

impl ElectionData {
    /// Number of formal above the line votes
    pub fn num_atl(&self) -> usize {
        self.atl.iter().map(|v|v.n).sum()
    }
    /// Number of formal below the line votes
    pub fn num_btl(&self) -> usize {
        self.btl.iter().map(|v|v.n).sum()
    }
    /// Number of formal votes
    pub fn num_votes(&self) -> usize {
        self.num_atl()+self.num_btl()
    }

    /// Get a list of all votes with ATL votes converted to the corresponding BTL
    /// equivalent. Requires an arena to hold the expanded preference lists so the
    /// votes can borrow slices rather than copy ballots.
    pub fn resolve_votes<'a>(&'a self,arena : &'a typed_arena::Arena<CandidateIndex>,expansion:AtlExpansion) -> anyhow::Result<Vec<PartiallyDistributedVote<'a>>> {
        let mut votes : Vec<PartiallyDistributedVote<'a>> = vec![];
        for a in &self.atl {
            match expansion {
                AtlExpansion::GroupOrder => {
                    let mut v : Vec<CandidateIndex> = vec![];
                    for &g in &a.groups {
                        if g.0>=self.metadata.groups.len() { bail!("unknown group {} in an above the line vote",g); }
                        v.extend(self.metadata.group(g).candidates.iter().cloned());
                    }
                    let slice = arena.alloc_extend(v);
                    votes.push(PartiallyDistributedVote::new(a.n,slice,VoteSource::Atl(a)));
                }
                AtlExpansion::GroupVotingTickets => {
                    // A ticket vote names exactly one group; the group's
                    // registered ticket(s) supply the preferences. A group with
                    // multiple tickets splits its votes as evenly as possible,
                    // remainders going to the earlier tickets.
                    if a.groups.len()!=1 { bail!("a group voting ticket vote must name exactly one group, found {}",a.groups.len()); }
                    if a.groups[0].0>=self.metadata.groups.len() { bail!("unknown group {} in an above the line vote",a.groups[0]); }
                    let group = self.metadata.group(a.groups[0]);
                    if group.tickets.is_empty() { bail!("group {} has above the line votes but no registered ticket",group.column_id); }
                    let num_tickets = group.tickets.len();
                    let share = a.n/num_tickets;
                    let remainder = a.n%num_tickets;
                    for (ticket_index,ticket) in group.tickets.iter().enumerate() {
                        let n = share + if ticket_index<remainder {1} else {0};
                        if n>0 {
                            let slice = arena.alloc_extend(ticket.iter().cloned());
                            votes.push(PartiallyDistributedVote::new(n,slice,VoteSource::Atl(a)));
                        }
                    }
                }
            }
        }
        for b in &self.btl {
            votes.push(PartiallyDistributedVote::new(b.n,b.candidates.as_slice(),VoteSource::Btl(b)));
        }
        Ok(votes)
    }

    pub fn print_summary(&self) {
        log::info!("Summary for {}",self.metadata.name.human_readable_name());
        log::info!("{} formal votes, {} informal",self.num_votes(),self.informal);
        log::info!("{} ATL formal votes, {} unique preference lists",self.num_atl(),self.atl.len());
        log::info!("{} BTL formal votes, {} unique preference lists",self.num_btl(),self.btl.len());
    }
}
