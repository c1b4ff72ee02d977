//! Feature modules. Each has a `controller` (HTTP handlers), a `service`
//! (store calls and scoping rules) and a `router`.

pub mod auth;
pub mod faculties;
pub mod institutes;
pub mod roles;
