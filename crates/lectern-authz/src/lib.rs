//! # Lectern Authz
//!
//! The authorization core of the Lectern API.
//!
//! - [`resolver`]: reads a principal's held permissions from the role graph
//! - [`gate`]: the per-route enforcement point and its denial taxonomy
//! - [`selector`]: login across the identity tables and bearer-token guards
//!
//! # Example
//!
//! ```ignore
//! use lectern_authz::{Gate, Resolver};
//!
//! let gate = Gate::new(catalog, Resolver::new(store, &authz_config));
//! let decision = gate.authorize(Some(&ctx), &["lecture_list"]).await?;
//! ```

pub mod gate;
pub mod resolver;
pub mod selector;

#[cfg(test)]
mod testing;

pub use gate::{AuthzError, Gate};
pub use resolver::{AuthContext, Decision, ResolveError, Resolver};
pub use selector::{AuthFailure, Authenticated, Selector};
