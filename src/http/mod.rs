//! HTTP surfaces: the administrative cache router.

mod admin;

pub use admin::{AdminState, admin_router};
