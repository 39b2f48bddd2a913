pub mod gate;

pub use gate::{AuthorizationTicket, PermissionGate};
