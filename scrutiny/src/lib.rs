pub mod ballot_paper;
pub mod ballot_metadata;
pub mod election_data;
pub mod ballot_pile;
pub mod transfer_value;
pub mod transcript;
pub mod tie_resolution;
pub mod round_engine;
pub mod errors;
