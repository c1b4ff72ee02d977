//! Data models for demo seeding configuration.

/// Seed data for creating an institute.
pub struct InstituteSeed {
    pub name: String,
    pub email: String,
    pub mobile: String,
}

/// Seed data for creating a faculty member.
pub struct FacultySeed {
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    /// Index into the institute's seeded departments.
    pub department_idx: Option<usize>,
}

/// How much demo data `seed-demo` writes.
#[derive(Clone)]
pub struct SeedConfig {
    pub num_institutes: usize,
    pub departments_per_institute: usize,
    pub faculties_per_institute: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            num_institutes: 3,
            departments_per_institute: 4,
            faculties_per_institute: 10,
        }
    }
}

impl SeedConfig {
    pub fn new(num_institutes: usize) -> Self {
        Self {
            num_institutes,
            ..Default::default()
        }
    }

    pub fn with_departments(mut self, departments_per_institute: usize) -> Self {
        self.departments_per_institute = departments_per_institute;
        self
    }

    pub fn with_faculties(mut self, faculties_per_institute: usize) -> Self {
        self.faculties_per_institute = faculties_per_institute;
        self
    }

    pub fn total_faculties(&self) -> usize {
        self.num_institutes * self.faculties_per_institute
    }
}

/// Counts of what a seeding run inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub institutes: usize,
    pub departments: usize,
    pub faculties: usize,
}
