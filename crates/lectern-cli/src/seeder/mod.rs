//! Demo data for local development.
//!
//! Institutes and faculty members are generated in parallel with Rayon and
//! inserted through the directory store, linked to the default `institute`
//! and `faculty` roles when those exist.

pub mod directory;
pub mod models;

pub use directory::{generate_faculties, generate_institutes, seed_demo};
pub use models::{FacultySeed, InstituteSeed, SeedConfig, SeedSummary};

/// Password every seeded institute and faculty account logs in with.
pub const DEMO_PASSWORD: &str = "password123";
