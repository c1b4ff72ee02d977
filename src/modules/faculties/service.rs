use anyhow::anyhow;
use tracing::{info, instrument, warn};

use lectern_core::{AppError, PaginationMeta, hash_password};
use lectern_db::{DirectoryStore, NewFaculty, StoreError};
use lectern_models::{
    CreateFacultyDto, Faculty, FacultyFilterParams, FacultyId, InstituteId, LinkRoleDto,
    PaginatedFacultiesResponse,
};

fn faculty_not_found() -> AppError {
    AppError::not_found(anyhow!("Faculty not found"))
}

/// Picks the institute a new faculty member belongs to.
///
/// Scoped principals always create under their own institute and may not
/// name another one.
fn target_institute(
    requested: Option<InstituteId>,
    scope: Option<InstituteId>,
) -> Result<InstituteId, AppError> {
    match (scope, requested) {
        (Some(own), Some(other)) if own != other => {
            warn!(%own, %other, "Cross-institute faculty creation refused");
            Err(AppError::forbidden(
                "Faculties can only be created in your own institute".to_string(),
            ))
        }
        (Some(own), _) => Ok(own),
        (None, Some(requested)) => Ok(requested),
        (None, None) => Err(AppError::bad_request(anyhow!("institute_id is required"))),
    }
}

#[instrument(skip(store, dto), fields(email = %dto.email))]
pub async fn create_faculty(
    store: &dyn DirectoryStore,
    dto: CreateFacultyDto,
    scope: Option<InstituteId>,
) -> Result<Faculty, AppError> {
    let institute_id = target_institute(dto.institute_id, scope)?;
    let password_hash = hash_password(&dto.password)?;

    let faculty = store
        .create_faculty(NewFaculty {
            institute_id,
            department_id: dto.department_id,
            name: dto.name.trim().to_string(),
            email: dto.email.trim().to_lowercase(),
            mobile: dto.mobile,
            password_hash,
            role_id: dto.role_id,
        })
        .await
        .map_err(StoreError::into_app_error)?;

    info!(faculty_id = %faculty.id, %institute_id, "Faculty created");
    Ok(faculty)
}

/// Scoped principals list their own institute's faculty regardless of the
/// `institute_id` filter.
#[instrument(skip(store))]
pub async fn list_faculties(
    store: &dyn DirectoryStore,
    params: FacultyFilterParams,
    scope: Option<InstituteId>,
) -> Result<PaginatedFacultiesResponse, AppError> {
    let institute_id = scope.or(params.institute_id);
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (data, total) = store
        .list_faculties(
            institute_id,
            search,
            params.pagination.limit(),
            params.pagination.offset(),
        )
        .await
        .map_err(StoreError::into_app_error)?;

    let meta = PaginationMeta::for_page(&params.pagination, total, data.len());
    Ok(PaginatedFacultiesResponse { data, meta })
}

async fn scoped_faculty(
    store: &dyn DirectoryStore,
    id: FacultyId,
    scope: Option<InstituteId>,
) -> Result<Faculty, AppError> {
    store
        .get_faculty(id)
        .await
        .map_err(StoreError::into_app_error)?
        .filter(|faculty| scope.is_none_or(|own| own == faculty.institute_id))
        .ok_or_else(faculty_not_found)
}

#[instrument(skip(store))]
pub async fn get_faculty(
    store: &dyn DirectoryStore,
    id: FacultyId,
    scope: Option<InstituteId>,
) -> Result<Faculty, AppError> {
    scoped_faculty(store, id, scope).await
}

#[instrument(skip(store))]
pub async fn link_role(
    store: &dyn DirectoryStore,
    id: FacultyId,
    dto: LinkRoleDto,
    scope: Option<InstituteId>,
) -> Result<Faculty, AppError> {
    scoped_faculty(store, id, scope).await?;

    let faculty = store
        .link_faculty_role(id, dto.role_id)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(faculty_not_found)?;

    info!(faculty_id = %id, role_id = ?dto.role_id, "Faculty role linked");
    Ok(faculty)
}
