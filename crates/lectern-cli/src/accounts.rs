//! Account creation for platform admins and standalone users.

use lectern_core::hash_password;
use lectern_db::{AccountStore, NewAdmin, NewUser};
use lectern_models::{AdminPrincipal, AdminType, UserPrincipal, UserType};

/// Hashes `password` and inserts a platform admin.
pub async fn create_admin(
    store: &dyn AccountStore,
    name: &str,
    email: &str,
    password: &str,
    user_type: AdminType,
) -> Result<AdminPrincipal, Box<dyn std::error::Error>> {
    let password_hash =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let admin = store
        .create_admin(NewAdmin {
            name: name.to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            user_type,
        })
        .await?;

    Ok(admin)
}

/// Hashes `password` and inserts a standalone user.
///
/// Users created here are not linked to any institute or faculty and start
/// without roles.
pub async fn create_user(
    store: &dyn AccountStore,
    name: &str,
    email: &str,
    password: &str,
    user_type: UserType,
) -> Result<UserPrincipal, Box<dyn std::error::Error>> {
    if matches!(user_type, UserType::Institute | UserType::Faculty) {
        return Err(format!(
            "{} users are created by logging in as an institute or faculty",
            user_type.as_str()
        )
        .into());
    }

    let password_hash =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let user = store
        .create_user(NewUser {
            name: name.to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            user_type,
            email_verified: true,
        })
        .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_db::{CredentialStore, MemoryStore};

    #[tokio::test]
    async fn test_create_admin_normalizes_email() {
        let store = MemoryStore::new();
        let admin = create_admin(
            &store,
            "Root",
            "  Root@Lectern.dev ",
            "s3cret-pass",
            AdminType::SuperAdmin,
        )
        .await
        .unwrap();

        assert_eq!(admin.email, "root@lectern.dev");
        let stored = store
            .find_admin_by_email("root@lectern.dev")
            .await
            .unwrap()
            .unwrap();
        assert!(lectern_core::verify_password("s3cret-pass", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_user_rejects_shadow_kinds() {
        let store = MemoryStore::new();
        let result = create_user(
            &store,
            "Registrar",
            "registrar@northfield.edu",
            "s3cret-pass",
            UserType::Institute,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.user_count().await, 0);
    }
}
