/// Transaction preparation and submission
pub mod signer;

pub use signer::{SignedTransaction, SigningContext, SubmitOutcome, SubmitSettings};
