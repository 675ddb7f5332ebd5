// Application layer: wires adapters and the sync core into a user session.

pub mod session;

pub use session::EnrollmentSession;
