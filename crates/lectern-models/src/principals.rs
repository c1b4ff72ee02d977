//! The four identity kinds that can make a request.
//!
//! A request carries exactly one [`Principal`]. It is loaded fresh from the
//! identity store for every request and never cached between requests.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use lectern_auth::PrincipalKind;

use crate::ids::{AdminId, DepartmentId, FacultyId, InstituteId, RoleId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeTag(pub String);

impl fmt::Display for UnknownTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown type tag: {}", self.0)
    }
}

impl std::error::Error for UnknownTypeTag {}

/// Tier of a platform administrator. Stored as text in `admins.user_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminType {
    SuperAdmin,
    Admin,
    Editor,
}

impl AdminType {
    pub const fn as_str(self) -> &'static str {
        match self {
            AdminType::SuperAdmin => "super_admin",
            AdminType::Admin => "admin",
            AdminType::Editor => "editor",
        }
    }
}

impl FromStr for AdminType {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(AdminType::SuperAdmin),
            "admin" => Ok(AdminType::Admin),
            "editor" => Ok(AdminType::Editor),
            other => Err(UnknownTypeTag(other.to_string())),
        }
    }
}

impl TryFrom<String> for AdminType {
    type Error = UnknownTypeTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Tag on a generic user row. Stored as text in `users.user_type`.
///
/// `Institute` and `Faculty` mark shadow rows written by login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Institute,
    Faculty,
    SuperAdmin,
    Default,
}

impl UserType {
    pub const fn as_str(self) -> &'static str {
        match self {
            UserType::Institute => "institute",
            UserType::Faculty => "faculty",
            UserType::SuperAdmin => "super_admin",
            UserType::Default => "default",
        }
    }
}

impl FromStr for UserType {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "institute" => Ok(UserType::Institute),
            "faculty" => Ok(UserType::Faculty),
            "super_admin" => Ok(UserType::SuperAdmin),
            "default" | "user" => Ok(UserType::Default),
            other => Err(UnknownTypeTag(other.to_string())),
        }
    }
}

impl TryFrom<String> for UserType {
    type Error = UnknownTypeTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub id: AdminId,
    pub name: String,
    pub email: String,
    pub user_type: AdminType,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutePrincipal {
    pub id: InstituteId,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub is_active: bool,
    pub role_id: Option<RoleId>,
    /// When a role linked to this institute was last deleted.
    pub role_revoked_at: Option<DateTime<Utc>>,
    /// The generic user row this institute is projected into.
    pub shadow_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacultyPrincipal {
    pub id: FacultyId,
    pub institute_id: InstituteId,
    pub department_id: Option<DepartmentId>,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub is_active: bool,
    pub role_id: Option<RoleId>,
    pub role_revoked_at: Option<DateTime<Utc>>,
    pub shadow_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub is_active: bool,
    pub email_verified: bool,
}

/// The authenticated identity of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Admin(AdminPrincipal),
    Institute(InstitutePrincipal),
    Faculty(FacultyPrincipal),
    User(UserPrincipal),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::Admin(_) => PrincipalKind::Admin,
            Principal::Institute(_) => PrincipalKind::Institute,
            Principal::Faculty(_) => PrincipalKind::Faculty,
            Principal::User(_) => PrincipalKind::User,
        }
    }

    /// Id of the record in the principal's own identity table.
    pub fn id(&self) -> Uuid {
        match self {
            Principal::Admin(p) => p.id.into_inner(),
            Principal::Institute(p) => p.id.into_inner(),
            Principal::Faculty(p) => p.id.into_inner(),
            Principal::User(p) => p.id.into_inner(),
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::Admin(p) => &p.email,
            Principal::Institute(p) => &p.email,
            Principal::Faculty(p) => &p.email,
            Principal::User(p) => &p.email,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Principal::Admin(p) => p.is_active,
            Principal::Institute(p) => p.is_active,
            Principal::Faculty(p) => p.is_active,
            Principal::User(p) => p.is_active,
        }
    }

    /// When the role this principal was linked to was deleted, if it was.
    ///
    /// Sessions issued at or before this instant no longer resolve.
    pub fn role_revoked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Principal::Institute(p) => p.role_revoked_at,
            Principal::Faculty(p) => p.role_revoked_at,
            Principal::Admin(_) | Principal::User(_) => None,
        }
    }

    /// The institute this principal acts within, if any.
    pub fn institute_scope(&self) -> Option<InstituteId> {
        match self {
            Principal::Institute(p) => Some(p.id),
            Principal::Faculty(p) => Some(p.institute_id),
            Principal::Admin(_) | Principal::User(_) => None,
        }
    }

    pub fn display_profile(&self) -> PrincipalProfile {
        match self {
            Principal::Admin(p) => PrincipalProfile {
                kind: PrincipalKind::Admin,
                id: p.id.into_inner(),
                name: p.name.clone(),
                email: p.email.clone(),
                mobile: None,
                user_type: Some(p.user_type.as_str().to_string()),
                institute_id: None,
            },
            Principal::Institute(p) => PrincipalProfile {
                kind: PrincipalKind::Institute,
                id: p.id.into_inner(),
                name: p.name.clone(),
                email: p.email.clone(),
                mobile: p.mobile.clone(),
                user_type: Some(UserType::Institute.as_str().to_string()),
                institute_id: Some(p.id),
            },
            Principal::Faculty(p) => PrincipalProfile {
                kind: PrincipalKind::Faculty,
                id: p.id.into_inner(),
                name: p.name.clone(),
                email: p.email.clone(),
                mobile: p.mobile.clone(),
                user_type: Some(UserType::Faculty.as_str().to_string()),
                institute_id: Some(p.institute_id),
            },
            Principal::User(p) => PrincipalProfile {
                kind: PrincipalKind::User,
                id: p.id.into_inner(),
                name: p.name.clone(),
                email: p.email.clone(),
                mobile: None,
                user_type: Some(p.user_type.as_str().to_string()),
                institute_id: None,
            },
        }
    }
}

/// What a client sees about the signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrincipalProfile {
    pub kind: PrincipalKind,
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institute_id: Option<InstituteId>,
}
