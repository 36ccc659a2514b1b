pub mod attendance;
pub mod device;
pub mod report;
pub mod schedule;
