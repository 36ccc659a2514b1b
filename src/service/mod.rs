pub mod attendance;
pub mod export;
pub mod overlap;
pub mod report;
pub mod schedule;
