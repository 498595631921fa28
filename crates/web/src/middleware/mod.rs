pub mod base_url;
pub mod cors;
pub mod pipeline;
pub mod rate_limit;
