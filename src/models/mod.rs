pub mod park;
pub mod ride;

pub use park::Park;
pub use ride::{RideStatus, RideStatusKind, StatusTransition};
