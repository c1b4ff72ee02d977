use anyhow::anyhow;
use tracing::{info, instrument};

use lectern_core::{AppError, PaginationMeta, hash_password};
use lectern_db::{DirectoryStore, NewInstitute, StoreError};
use lectern_models::{
    CreateInstituteDto, Institute, InstituteFilterParams, InstituteId, LinkRoleDto,
    PaginatedInstitutesResponse,
};

fn institute_not_found() -> AppError {
    AppError::not_found(anyhow!("Institute not found"))
}

/// An institute principal only ever sees its own record.
fn in_scope(scope: Option<InstituteId>, id: InstituteId) -> bool {
    scope.is_none_or(|own| own == id)
}

#[instrument(skip(store, dto), fields(email = %dto.email))]
pub async fn create_institute(
    store: &dyn DirectoryStore,
    dto: CreateInstituteDto,
) -> Result<Institute, AppError> {
    let password_hash = hash_password(&dto.password)?;

    let institute = store
        .create_institute(NewInstitute {
            name: dto.name.trim().to_string(),
            email: dto.email.trim().to_lowercase(),
            mobile: dto.mobile,
            password_hash,
            role_id: dto.role_id,
        })
        .await
        .map_err(StoreError::into_app_error)?;

    info!(institute_id = %institute.id, "Institute created");
    Ok(institute)
}

#[instrument(skip(store))]
pub async fn list_institutes(
    store: &dyn DirectoryStore,
    params: InstituteFilterParams,
    scope: Option<InstituteId>,
) -> Result<PaginatedInstitutesResponse, AppError> {
    let (data, total) = match scope {
        Some(own) => {
            let institute = store
                .get_institute(own)
                .await
                .map_err(StoreError::into_app_error)?;
            let data: Vec<Institute> = institute.into_iter().collect();
            let total = data.len() as i64;
            (data, total)
        }
        None => {
            let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
            store
                .list_institutes(search, params.pagination.limit(), params.pagination.offset())
                .await
                .map_err(StoreError::into_app_error)?
        }
    };

    let meta = PaginationMeta::for_page(&params.pagination, total, data.len());
    Ok(PaginatedInstitutesResponse { data, meta })
}

#[instrument(skip(store))]
pub async fn get_institute(
    store: &dyn DirectoryStore,
    id: InstituteId,
    scope: Option<InstituteId>,
) -> Result<Institute, AppError> {
    if !in_scope(scope, id) {
        return Err(institute_not_found());
    }
    store
        .get_institute(id)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(institute_not_found)
}

/// Links `dto.role_id` to the institute, or unlinks when it is `null`.
#[instrument(skip(store))]
pub async fn link_role(
    store: &dyn DirectoryStore,
    id: InstituteId,
    dto: LinkRoleDto,
    scope: Option<InstituteId>,
) -> Result<Institute, AppError> {
    if !in_scope(scope, id) {
        return Err(institute_not_found());
    }
    let institute = store
        .link_institute_role(id, dto.role_id)
        .await
        .map_err(StoreError::into_app_error)?
        .ok_or_else(institute_not_found)?;

    info!(institute_id = %id, role_id = ?dto.role_id, "Institute role linked");
    Ok(institute)
}
