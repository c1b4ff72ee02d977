//! Institute, department and faculty seeding.

use std::time::Instant;

use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::{FirstName, LastName};
use rayon::prelude::*;
use uuid::Uuid;

use lectern_core::hash_password;
use lectern_db::{DirectoryStore, NewFaculty, NewInstitute, RoleStore};
use lectern_models::DepartmentId;

use super::DEMO_PASSWORD;
use super::models::{FacultySeed, InstituteSeed, SeedConfig, SeedSummary};

const DEPARTMENT_NAMES: [&str; 8] = [
    "Computer Science",
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "History",
    "Economics",
    "Literature",
];

/// Generates institute data in parallel using Rayon.
///
/// `run_tag` keeps emails unique across repeated runs.
pub fn generate_institutes(count: usize, run_tag: &str) -> Vec<InstituteSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let company: String = CompanyName().fake();
            InstituteSeed {
                name: format!("{} Institute", company),
                email: format!("registrar+{}@{}.example.edu", idx, run_tag),
                mobile: format!("+1555{:07}", idx),
            }
        })
        .collect()
}

/// Generates faculty members for one institute, spread over its departments.
pub fn generate_faculties(
    institute_idx: usize,
    count: usize,
    departments: usize,
    run_tag: &str,
) -> Vec<FacultySeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let first_name: String = FirstName().fake();
            let last_name: String = LastName().fake();
            let email_local: String = format!("{}.{}", first_name, last_name)
                .to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
                .collect();

            FacultySeed {
                name: format!("{} {}", first_name, last_name),
                email: format!(
                    "{}+faculty{}@{}.example.edu",
                    email_local,
                    institute_idx * 1000 + idx,
                    run_tag
                ),
                mobile: None,
                department_idx: (departments > 0).then(|| idx % departments),
            }
        })
        .collect()
}

/// Seeds institutes, their departments and faculty members.
///
/// The password is hashed once and shared by every seeded account.
pub async fn seed_demo(
    directory: &dyn DirectoryStore,
    roles: &dyn RoleStore,
    config: SeedConfig,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "🏫 Seeding {} institutes ({} departments, {} faculty members each)...",
        config.num_institutes, config.departments_per_institute, config.faculties_per_institute
    );

    let password_hash =
        hash_password(DEMO_PASSWORD).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let institute_role = roles.find_role_by_key("institute").await?.map(|r| r.id);
    let faculty_role = roles.find_role_by_key("faculty").await?.map(|r| r.id);
    if institute_role.is_none() || faculty_role.is_none() {
        println!("   ⚠ Default roles missing, seeded accounts will hold no permissions");
    }

    let run_tag = Uuid::new_v4().simple().to_string()[..8].to_string();
    let mut summary = SeedSummary::default();

    for (institute_idx, seed) in generate_institutes(config.num_institutes, &run_tag)
        .into_iter()
        .enumerate()
    {
        let institute = directory
            .create_institute(NewInstitute {
                name: seed.name,
                email: seed.email,
                mobile: Some(seed.mobile),
                password_hash: password_hash.clone(),
                role_id: institute_role,
            })
            .await?;
        summary.institutes += 1;

        let mut departments: Vec<DepartmentId> =
            Vec::with_capacity(config.departments_per_institute);
        for idx in 0..config.departments_per_institute {
            let name = DEPARTMENT_NAMES[idx % DEPARTMENT_NAMES.len()];
            departments.push(directory.create_department(institute.id, name).await?);
        }
        summary.departments += departments.len();

        let faculties = generate_faculties(
            institute_idx,
            config.faculties_per_institute,
            departments.len(),
            &run_tag,
        );
        for seed in faculties {
            directory
                .create_faculty(NewFaculty {
                    institute_id: institute.id,
                    department_id: seed.department_idx.map(|i| departments[i]),
                    name: seed.name,
                    email: seed.email,
                    mobile: seed.mobile,
                    password_hash: password_hash.clone(),
                    role_id: faculty_role,
                })
                .await?;
            summary.faculties += 1;
        }
    }

    println!(
        "   ✓ Inserted {} institutes, {} departments, {} faculty members in {:?}",
        summary.institutes,
        summary.departments,
        summary.faculties,
        start_time.elapsed()
    );

    Ok(summary)
}
