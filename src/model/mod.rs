pub mod academic;
pub mod attendance;
pub mod device;
pub mod role;
pub mod schedule;
pub mod user;
