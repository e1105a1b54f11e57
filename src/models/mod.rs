pub mod availability;
pub mod booking;
pub mod class;
pub mod columns;
pub mod enrollment;
pub mod location;
pub mod service;
pub mod user;
pub mod validation;

pub use availability::{DayHours, DaySchedule, OperatingHours};
pub use booking::{Booking, BookingStatus, BookingSummary, NewBooking, PaymentStatus, StatusUpdate};
pub use class::{Class, ClassPatch, NewClass};
pub use enrollment::{Enrollment, EnrollmentSummary, NewEnrollment};
pub use location::{Location, LocationPatch, NewLocation};
pub use service::{CategoryCount, NewService, Service, ServicePatch};
pub use user::{ChangePasswordRequest, LoginRequest, RegisterRequest, User};
pub use validation::Validate;
