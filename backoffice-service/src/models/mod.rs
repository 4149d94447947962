pub mod access_log;
pub mod booking;
pub mod employee;
pub mod establishment;
pub mod invoice;
pub mod user;

pub use access_log::{AccessAction, AccessLogEntry};
pub use booking::{Booking, BookingStatus};
pub use employee::Employee;
pub use establishment::Establishment;
pub use invoice::{Invoice, InvoiceStatus};
pub use user::{SanitizedUser, User};
