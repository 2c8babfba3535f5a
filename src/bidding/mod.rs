pub mod engine;

pub use engine::{BidDecisionEngine, Decision, NO_BID_REASON};
