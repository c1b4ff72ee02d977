//! Shared fixtures for the unit tests in this crate.

use std::sync::Arc;
use std::time::Duration;

use lectern_auth::Guard;
use lectern_config::{AuthzConfig, JwtConfig};
use lectern_core::PermissionCatalog;
use lectern_db::{
    AccountStore, CredentialStore, DirectoryStore, MemoryStore, NewAdmin, NewFaculty,
    NewInstitute, NewRole, NewUser, RoleStore, ShadowUser,
};
use lectern_models::{
    AdminType, FacultyPrincipal, Institute, InstitutePrincipal, PermissionId, Principal, RoleId,
    UserType,
};

use crate::gate::Gate;
use crate::resolver::{AuthContext, Resolver};
use crate::selector::Selector;

pub const PASSWORD: &str = "correct-horse-battery";

pub fn hash(password: &str) -> String {
    bcrypt::hash(password, 4).unwrap()
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::with_catalog().await),
        }
    }

    pub fn config(&self) -> AuthzConfig {
        AuthzConfig {
            store_timeout: Duration::from_millis(100),
        }
    }

    pub fn jwt(&self) -> JwtConfig {
        JwtConfig::for_testing("authz-test-secret")
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.store.clone(), &self.config())
    }

    pub fn gate(&self) -> Gate {
        Gate::new(Arc::new(PermissionCatalog::standard().unwrap()), self.resolver())
    }

    pub fn selector(&self) -> Selector {
        Selector::new(self.store.clone(), self.jwt(), &self.config())
    }

    pub async fn permission(&self, key: &str) -> PermissionId {
        self.store.permission_id(key).await.unwrap()
    }

    pub async fn role_with_ids(
        &self,
        role_key: &str,
        permission_ids: Vec<PermissionId>,
    ) -> RoleId {
        self.store
            .create_role(NewRole {
                role_name: role_key.to_string(),
                role_key: role_key.to_string(),
                role_description: None,
                is_default: false,
                permission_ids,
            })
            .await
            .unwrap()
            .role
            .id
    }

    pub async fn role(&self, role_key: &str, keys: &[&str]) -> RoleId {
        let mut ids = Vec::new();
        for key in keys {
            ids.push(self.permission(key).await);
        }
        self.role_with_ids(role_key, ids).await
    }

    pub async fn admin(&self) -> AuthContext {
        let admin = self
            .store
            .create_admin(NewAdmin {
                name: "Platform Root".to_string(),
                email: format!("root-{}@lectern.dev", uuid::Uuid::new_v4()),
                password_hash: hash(PASSWORD),
                user_type: AdminType::SuperAdmin,
            })
            .await
            .unwrap();
        AuthContext::new(Guard::Admin, Principal::Admin(admin))
    }

    pub async fn user_with_roles(&self, roles: &[RoleId]) -> AuthContext {
        self.user_of_type(UserType::Default, roles).await
    }

    pub async fn user_of_type(&self, user_type: UserType, roles: &[RoleId]) -> AuthContext {
        let user = self
            .store
            .create_user(NewUser {
                name: "Jane Learner".to_string(),
                email: format!("jane-{}@example.com", uuid::Uuid::new_v4()),
                password_hash: hash(PASSWORD),
                user_type,
                email_verified: true,
            })
            .await
            .unwrap();
        self.store.assign_user_roles(user.id, roles).await.unwrap();
        AuthContext::new(Guard::User, Principal::User(user))
    }

    pub async fn user_with_keys(&self, keys: &[&str]) -> AuthContext {
        let role = self
            .role(&format!("role-{}", uuid::Uuid::new_v4()), keys)
            .await;
        self.user_with_roles(&[role]).await
    }

    pub async fn new_institute(&self, email: &str, role_id: Option<RoleId>) -> Institute {
        self.store
            .create_institute(NewInstitute {
                name: "Northfield College".to_string(),
                email: email.to_string(),
                mobile: Some("+15550100".to_string()),
                password_hash: hash(PASSWORD),
                role_id,
            })
            .await
            .unwrap()
    }

    pub async fn institute(&self, role_id: Option<RoleId>) -> AuthContext {
        let email = format!("registrar-{}@northfield.edu", uuid::Uuid::new_v4());
        let institute = self.new_institute(&email, role_id).await;
        let shadow_user_id = self
            .store
            .upsert_shadow_user(&ShadowUser::of_institute(&institute))
            .await
            .unwrap();

        AuthContext::new(
            Guard::User,
            Principal::Institute(InstitutePrincipal {
                id: institute.id,
                name: institute.name,
                email: institute.email,
                mobile: institute.mobile,
                is_active: institute.is_active,
                role_id,
                role_revoked_at: None,
                shadow_user_id,
            }),
        )
    }

    pub async fn faculty(&self, role_id: Option<RoleId>) -> AuthContext {
        let email = format!("dean-{}@northfield.edu", uuid::Uuid::new_v4());
        let institute = self.new_institute(&email, None).await;
        let faculty = self
            .store
            .create_faculty(NewFaculty {
                institute_id: institute.id,
                department_id: None,
                name: "Dr. Ada".to_string(),
                email: format!("ada-{}@northfield.edu", uuid::Uuid::new_v4()),
                mobile: None,
                password_hash: hash(PASSWORD),
                role_id,
            })
            .await
            .unwrap();
        let shadow_user_id = self
            .store
            .upsert_shadow_user(&ShadowUser::of_faculty(&faculty))
            .await
            .unwrap();

        AuthContext::new(
            Guard::User,
            Principal::Faculty(FacultyPrincipal {
                id: faculty.id,
                institute_id: faculty.institute_id,
                department_id: faculty.department_id,
                name: faculty.name,
                email: faculty.email,
                mobile: faculty.mobile,
                is_active: faculty.is_active,
                role_id: faculty.role_id,
                role_revoked_at: None,
                shadow_user_id,
            }),
        )
    }
}
