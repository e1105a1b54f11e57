pub mod auth;
pub mod enrollment;
pub mod login_throttle;
pub mod scheduling;
