//! 压测客户端：合成 BidRequest，按批并发发送并统计吞吐

pub mod bidder_client;
pub mod driver;
pub mod stats;
pub mod synthesizer;

pub use driver::{LoadDriver, StopHandle};
pub use stats::{ProgressReport, RunStatistics};
pub use synthesizer::RequestSynthesizer;
