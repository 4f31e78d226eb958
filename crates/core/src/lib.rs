pub mod grounding;
pub mod models;
pub mod normalize;
pub mod similarity;

pub use models::{
    Diagnosis, MatchCandidate, MismatchType, ModelError, ReceiptData, Transaction,
    TransactionRow, DATE_INCOMPARABLE,
};
