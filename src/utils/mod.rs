pub mod dirs;
pub mod progress;
pub mod rate_limit;
