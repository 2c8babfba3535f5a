pub mod config_manager;

pub use config_manager::{
    BidderConfig, DEFAULT_MAX_BODY_BYTES, LatencyRange, LoadConfig, PriceRange, RequestTemplate,
};
