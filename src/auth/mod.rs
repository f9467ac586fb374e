//! Bearer-token authentication.

pub mod gate;
pub mod middleware;
pub mod password;
pub mod token;

pub use gate::{AuthGate, AuthenticatedUser, Identity};
pub use middleware::{authenticate, CurrentUser};
