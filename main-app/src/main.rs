// Copyright 2024 Andrew Conway.
// This file is part of Scrutiny.
// Scrutiny is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// Scrutiny is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with Scrutiny.  If not, see <https://www.gnu.org/licenses/>.

mod rules;

use anyhow::anyhow;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use scrutiny::ballot_metadata::CandidateIndex;
use scrutiny::tie_resolution::{DecisionTable, LowestIndexOracle, TieBreakOracle, TieContext};
use scrutiny::transcript::{RoundIndex, TranscriptWithMetadata};
use senate273::specification::ElectionSpecification;
use crate::rules::Rules;

/// Count an Australian Senate election and write the distribution of
/// preferences transcript. Exits 0 on a completed count; non zero on a fatal
/// invariant violation or an unresolvable tie (the partial transcript is still
/// written for post mortem inspection).
#[derive(Parser)]
#[command(version, author = "Andrew Conway")]
struct Opts {
    /// The counting rules to use.
    /// Currently supported FederalPre2016, FederalPost2016
    #[arg(short, long)]
    rules : Rules,

    /// The name of the election specification file to get votes from
    spec : PathBuf,

    /// An optional .transcript file to store the output in.
    /// If not specified, defaults to spec_rules.transcript where spec and rules are from above.
    #[arg(short, long)]
    transcript : Option<PathBuf>,

    /// Break any tie the statute and the specification's decision table cannot
    /// by ballot paper order, instead of aborting the count.
    #[arg(long)]
    ties_by_ballot_paper_order : bool,
}

/// The specification's decision table, falling back to ballot paper order if allowed.
struct CommandLineOracle<'a> {
    table : &'a DecisionTable,
    fall_back_to_ballot_paper_order : bool,
}

impl<'a> TieBreakOracle for CommandLineOracle<'a> {
    fn resolve(&self,round:RoundIndex,context:TieContext,candidates:&[CandidateIndex]) -> Option<CandidateIndex> {
        self.table.resolve(round,context,candidates).or_else(||
            if self.fall_back_to_ballot_paper_order { LowestIndexOracle{}.resolve(round,context,candidates) } else { None })
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt : Opts = Opts::parse();

    let specification = ElectionSpecification::load(&opt.spec)?;
    // raw papers get formality adjudication under the thresholds that match the counting rules.
    let election = specification.election.resolve(&opt.rules.interpreter(specification.election.metadata()));
    election.print_summary();

    let oracle = CommandLineOracle{ table: &specification.decisions, fall_back_to_ballot_paper_order: opt.ties_by_ballot_paper_order };
    let outcome = opt.rules.count(&election,specification.vacancies,&oracle);

    let transcript_file = match &opt.transcript {
        None => {
            let specname = opt.spec.file_name().map(|o|o.to_string_lossy()).unwrap_or_default();
            let specname = specname.trim_end_matches(".json");
            let combined = specname.to_string()+"_"+&opt.rules.to_string()+".transcript";
            opt.spec.with_file_name(combined)
        }
        Some(tf) => tf.clone(),
    };

    if let Some(parent) = transcript_file.parent() { std::fs::create_dir_all(parent)? }
    let with_metadata = TranscriptWithMetadata{ metadata: election.metadata.clone(), transcript: outcome.transcript };
    serde_json::to_writer_pretty(File::create(&transcript_file)?,&with_metadata)?;

    match outcome.error {
        None => {
            if let Some(summary) = with_metadata.transcript.summary() {
                log::info!("Count complete. Quota {}. Elected in order: {}",summary.quota,
                    summary.elected.iter().map(|&c|with_metadata.metadata.candidate(c).name.clone()).collect::<Vec<_>>().join(", "));
            }
            Ok(())
        }
        Some(e) => Err(anyhow!("count failed: {e}. Partial transcript written to {}",transcript_file.display())),
    }
}
