pub mod circuit_breaker;
pub mod error;
pub mod keys;
pub mod scripts;
pub mod store;
pub mod trait_def;
pub mod types;

pub use {
    error::{Error, Result},
    store::{FailurePolicy, HotState},
    trait_def::HotStore,
    types::{Counters, DispatchOutcome, RateLimitDecision, RecipientRecord, RecordOutcomeResult},
};
