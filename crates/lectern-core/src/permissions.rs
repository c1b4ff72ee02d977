//! The permission catalog for the Lectern API.
//!
//! Every capability the platform checks is a [`PermissionKey`]. The set is
//! closed: stored permission rows, route declarations and role payloads are all
//! parsed against it, and anything outside it is rejected or dropped.
//!
//! Route declarations may use a shorthand instead of the canonical key. Those
//! are looked up case-insensitively through [`PermissionAliases`], which the
//! [`PermissionCatalog`] owns.
//!
//! # Example
//!
//! ```ignore
//! use lectern_core::permissions::{PermissionCatalog, PermissionKey};
//!
//! let catalog = PermissionCatalog::standard()?;
//! assert_eq!(catalog.canonicalize("lecture_list"), Some(PermissionKey::LectureList));
//! assert_eq!(catalog.canonicalize("Lectures:List"), Some(PermissionKey::LectureList));
//! assert_eq!(catalog.canonicalize("totally_bogus"), None);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Resource family a permission belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionModule {
    Institute,
    Faculty,
    Department,
    Student,
    Event,
    Lecture,
    Role,
    Permission,
    User,
}

impl PermissionModule {
    pub const ALL: [PermissionModule; 9] = [
        PermissionModule::Institute,
        PermissionModule::Faculty,
        PermissionModule::Department,
        PermissionModule::Student,
        PermissionModule::Event,
        PermissionModule::Lecture,
        PermissionModule::Role,
        PermissionModule::Permission,
        PermissionModule::User,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PermissionModule::Institute => "institute",
            PermissionModule::Faculty => "faculty",
            PermissionModule::Department => "department",
            PermissionModule::Student => "student",
            PermissionModule::Event => "event",
            PermissionModule::Lecture => "lecture",
            PermissionModule::Role => "role",
            PermissionModule::Permission => "permission",
            PermissionModule::User => "user",
        }
    }

    /// Plural resource name, as used in REST paths (`faculties`, `lectures`).
    pub const fn plural(self) -> &'static str {
        match self {
            PermissionModule::Institute => "institutes",
            PermissionModule::Faculty => "faculties",
            PermissionModule::Department => "departments",
            PermissionModule::Student => "students",
            PermissionModule::Event => "events",
            PermissionModule::Lecture => "lectures",
            PermissionModule::Role => "roles",
            PermissionModule::Permission => "permissions",
            PermissionModule::User => "users",
        }
    }
}

impl fmt::Display for PermissionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a permission allows on its module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Create,
    List,
    View,
    Update,
    Delete,
    Assign,
    Sync,
}

impl PermissionAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            PermissionAction::Create => "create",
            PermissionAction::List => "list",
            PermissionAction::View => "view",
            PermissionAction::Update => "update",
            PermissionAction::Delete => "delete",
            PermissionAction::Assign => "assign",
            PermissionAction::Sync => "sync",
        }
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! permission_keys {
    ($( $variant:ident => $key:literal, $module:ident, $action:ident, $name:literal; )+) => {
        /// A canonical permission key.
        ///
        /// Variants are declared in catalog order; `Ord` follows that order so
        /// sets of keys iterate the same way the catalog lists them.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        pub enum PermissionKey {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl PermissionKey {
            /// Every key in the catalog, in catalog order.
            pub const ALL: &'static [PermissionKey] = &[$(PermissionKey::$variant),+];

            /// The canonical string form stored in `permissions.permission_key`.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(PermissionKey::$variant => $key,)+
                }
            }

            pub const fn module(self) -> PermissionModule {
                match self {
                    $(PermissionKey::$variant => PermissionModule::$module,)+
                }
            }

            pub const fn action(self) -> PermissionAction {
                match self {
                    $(PermissionKey::$variant => PermissionAction::$action,)+
                }
            }

            /// Human readable name used when seeding `permissions.permission_name`.
            pub const fn display_name(self) -> &'static str {
                match self {
                    $(PermissionKey::$variant => $name,)+
                }
            }
        }
    };
}

permission_keys! {
    // =========================================================================
    // Institutes
    // =========================================================================
    InstituteCreate => "institute_create", Institute, Create, "Create Institute";
    InstituteList => "institute_list", Institute, List, "List Institutes";
    InstituteView => "institute_view", Institute, View, "View Institute";
    InstituteUpdate => "institute_update", Institute, Update, "Update Institute";
    InstituteDelete => "institute_delete", Institute, Delete, "Delete Institute";

    // =========================================================================
    // Faculties
    // =========================================================================
    FacultyCreate => "faculty_create", Faculty, Create, "Create Faculty";
    FacultyList => "faculty_list", Faculty, List, "List Faculties";
    FacultyView => "faculty_view", Faculty, View, "View Faculty";
    FacultyUpdate => "faculty_update", Faculty, Update, "Update Faculty";
    FacultyDelete => "faculty_delete", Faculty, Delete, "Delete Faculty";

    // =========================================================================
    // Departments
    // =========================================================================
    DepartmentCreate => "department_create", Department, Create, "Create Department";
    DepartmentList => "department_list", Department, List, "List Departments";
    DepartmentView => "department_view", Department, View, "View Department";
    DepartmentUpdate => "department_update", Department, Update, "Update Department";
    DepartmentDelete => "department_delete", Department, Delete, "Delete Department";

    // =========================================================================
    // Students
    // =========================================================================
    StudentCreate => "student_create", Student, Create, "Create Student";
    StudentList => "student_list", Student, List, "List Students";
    StudentView => "student_view", Student, View, "View Student";
    StudentUpdate => "student_update", Student, Update, "Update Student";
    StudentDelete => "student_delete", Student, Delete, "Delete Student";

    // =========================================================================
    // Events
    // =========================================================================
    EventCreate => "event_create", Event, Create, "Create Event";
    EventList => "event_list", Event, List, "List Events";
    EventView => "event_view", Event, View, "View Event";
    EventUpdate => "event_update", Event, Update, "Update Event";
    EventDelete => "event_delete", Event, Delete, "Delete Event";

    // =========================================================================
    // Lectures
    // =========================================================================
    LectureCreate => "lecture_create", Lecture, Create, "Create Lecture";
    LectureList => "lecture_list", Lecture, List, "List Lectures";
    LectureView => "lecture_view", Lecture, View, "View Lecture";
    LectureUpdate => "lecture_update", Lecture, Update, "Update Lecture";
    LectureDelete => "lecture_delete", Lecture, Delete, "Delete Lecture";

    // =========================================================================
    // Roles
    // =========================================================================
    RoleCreate => "role_create", Role, Create, "Create Role";
    RoleList => "role_list", Role, List, "List Roles";
    RoleView => "role_view", Role, View, "View Role";
    RoleUpdate => "role_update", Role, Update, "Update Role";
    RoleDelete => "role_delete", Role, Delete, "Delete Role";
    RoleAssign => "role_assign", Role, Assign, "Assign Roles";

    // =========================================================================
    // Permissions
    // =========================================================================
    PermissionList => "permission_list", Permission, List, "List Permissions";
    PermissionView => "permission_view", Permission, View, "View Permission";
    PermissionSync => "permission_sync", Permission, Sync, "Sync Role Permissions";

    // =========================================================================
    // Users
    // =========================================================================
    UserCreate => "user_create", User, Create, "Create User";
    UserList => "user_list", User, List, "List Users";
    UserView => "user_view", User, View, "View User";
    UserUpdate => "user_update", User, Update, "Update User";
    UserDelete => "user_delete", User, Delete, "Delete User";
}

impl PermissionKey {
    /// The `_view` key of the same module, for `_list` keys only.
    ///
    /// This is the whole of the list/view equivalence: no other action has a
    /// counterpart and the mapping never crosses modules.
    pub fn view_counterpart(self) -> Option<PermissionKey> {
        if self.action() != PermissionAction::List {
            return None;
        }
        PermissionKey::ALL
            .iter()
            .copied()
            .find(|k| k.module() == self.module() && k.action() == PermissionAction::View)
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission key: {0}")]
pub struct UnknownPermissionKey(pub String);

impl FromStr for PermissionKey {
    type Err = UnknownPermissionKey;

    /// Exact match against the canonical key. Aliases are not consulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownPermissionKey(s.to_string()))
    }
}

/// Raised when a shorthand is registered for two different keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("alias '{alias}' already maps to {existing}, cannot remap to {attempted}")]
pub struct AliasConflict {
    pub alias: String,
    pub existing: PermissionKey,
    pub attempted: PermissionKey,
}

/// Lower-cased shorthand to canonical key lookup.
#[derive(Debug, Clone, Default)]
pub struct PermissionAliases {
    entries: HashMap<String, PermissionKey>,
}

impl PermissionAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default alias set: for every key its canonical form, `module:action`
    /// and `modules:action`.
    pub fn standard() -> Result<Self, AliasConflict> {
        let mut aliases = Self::new();
        for &key in PermissionKey::ALL {
            let module = key.module();
            let action = key.action();
            aliases.register(key.as_str(), key)?;
            aliases.register(&format!("{}:{}", module.as_str(), action.as_str()), key)?;
            aliases.register(&format!("{}:{}", module.plural(), action.as_str()), key)?;
        }
        Ok(aliases)
    }

    /// Adds a shorthand. Re-registering the same pair is a no-op.
    pub fn register(&mut self, alias: &str, key: PermissionKey) -> Result<(), AliasConflict> {
        let alias = alias.trim().to_lowercase();
        match self.entries.get(&alias) {
            Some(&existing) if existing != key => Err(AliasConflict {
                alias,
                existing,
                attempted: key,
            }),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(alias, key);
                Ok(())
            }
        }
    }

    pub fn resolve(&self, identifier: &str) -> Option<PermissionKey> {
        self.entries
            .get(&identifier.trim().to_lowercase())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of canonicalizing a route's declared permission identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canonicalized {
    pub keys: BTreeSet<PermissionKey>,
    pub dropped: Vec<String>,
}

/// The read-only catalog: keys grouped by module plus the alias table.
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    modules: BTreeMap<PermissionModule, Vec<PermissionKey>>,
    aliases: PermissionAliases,
}

impl PermissionCatalog {
    /// The catalog with the [`PermissionAliases::standard`] shorthands.
    ///
    /// A conflicting alias set is returned as an error so startup fails
    /// instead of serving routes whose shorthands no longer resolve.
    pub fn standard() -> Result<Self, AliasConflict> {
        Ok(Self::with_aliases(PermissionAliases::standard()?))
    }

    pub fn with_aliases(aliases: PermissionAliases) -> Self {
        let mut modules: BTreeMap<PermissionModule, Vec<PermissionKey>> = BTreeMap::new();
        for &key in PermissionKey::ALL {
            modules.entry(key.module()).or_default().push(key);
        }
        Self { modules, aliases }
    }

    pub fn keys(&self) -> &'static [PermissionKey] {
        PermissionKey::ALL
    }

    pub fn modules(&self) -> &BTreeMap<PermissionModule, Vec<PermissionKey>> {
        &self.modules
    }

    pub fn keys_in(&self, module: PermissionModule) -> &[PermissionKey] {
        self.modules.get(&module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn aliases(&self) -> &PermissionAliases {
        &self.aliases
    }

    pub fn is_canonical(&self, value: &str) -> bool {
        value.parse::<PermissionKey>().is_ok()
    }

    pub fn module_of(&self, value: &str) -> Option<PermissionModule> {
        value.parse::<PermissionKey>().ok().map(PermissionKey::module)
    }

    /// Exact canonical match first, then a case-insensitive alias lookup.
    pub fn canonicalize(&self, identifier: &str) -> Option<PermissionKey> {
        identifier
            .parse::<PermissionKey>()
            .ok()
            .or_else(|| self.aliases.resolve(identifier))
    }

    pub fn canonicalize_all<S: AsRef<str>>(&self, identifiers: &[S]) -> Canonicalized {
        let mut result = Canonicalized::default();
        for identifier in identifiers {
            let identifier = identifier.as_ref();
            match self.canonicalize(identifier) {
                Some(key) => {
                    result.keys.insert(key);
                }
                None => result.dropped.push(identifier.to_string()),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let unique: BTreeSet<&str> = PermissionKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(unique.len(), PermissionKey::ALL.len());
    }

    #[test]
    fn test_key_string_is_module_underscore_action() {
        for key in PermissionKey::ALL {
            assert_eq!(
                key.as_str(),
                format!("{}_{}", key.module().as_str(), key.action().as_str())
            );
        }
    }

    #[test]
    fn test_standard_aliases_have_no_conflicts() {
        let aliases = PermissionAliases::standard().expect("standard aliases conflict");
        assert_eq!(aliases.len(), PermissionKey::ALL.len() * 3);
    }

    #[test]
    fn test_standard_catalog_keeps_every_alias() {
        let catalog = PermissionCatalog::standard().unwrap();
        assert_eq!(catalog.aliases().len(), PermissionKey::ALL.len() * 3);
        assert_eq!(
            catalog.canonicalize("roles:assign"),
            Some(PermissionKey::RoleAssign)
        );
    }

    #[test]
    fn test_conflicting_aliases_surface_as_error() {
        let mut aliases = PermissionAliases::standard().unwrap();
        let err = aliases
            .register("Lectures:List", PermissionKey::LectureView)
            .unwrap_err();

        assert_eq!(err.alias, "lectures:list");
        assert_eq!(
            err.to_string(),
            "alias 'lectures:list' already maps to lecture_list, cannot remap to lecture_view"
        );
    }

    #[test]
    fn test_from_str_is_exact() {
        assert_eq!(
            "lecture_create".parse::<PermissionKey>(),
            Ok(PermissionKey::LectureCreate)
        );
        assert!("LECTURE_CREATE".parse::<PermissionKey>().is_err());
        assert!("lectures:create".parse::<PermissionKey>().is_err());
    }

    #[test]
    fn test_canonicalize_accepts_aliases_case_insensitively() {
        let catalog = PermissionCatalog::standard().unwrap();
        assert_eq!(
            catalog.canonicalize("LECTURE_LIST"),
            Some(PermissionKey::LectureList)
        );
        assert_eq!(
            catalog.canonicalize("lecture:list"),
            Some(PermissionKey::LectureList)
        );
        assert_eq!(
            catalog.canonicalize("Faculties:Update"),
            Some(PermissionKey::FacultyUpdate)
        );
        assert_eq!(catalog.canonicalize("nonexistent_permission"), None);
    }

    #[test]
    fn test_canonicalize_is_stable() {
        let catalog = PermissionCatalog::standard().unwrap();
        for _ in 0..3 {
            assert_eq!(
                catalog.canonicalize("students:view"),
                Some(PermissionKey::StudentView)
            );
            assert_eq!(catalog.canonicalize("students:fly"), None);
        }
    }

    #[test]
    fn test_canonicalize_all_splits_known_and_dropped() {
        let catalog = PermissionCatalog::standard().unwrap();
        let result = catalog.canonicalize_all(&["event_view", "EVENTS:VIEW", "bogus"]);
        assert_eq!(
            result.keys.into_iter().collect::<Vec<_>>(),
            vec![PermissionKey::EventView]
        );
        assert_eq!(result.dropped, vec!["bogus".to_string()]);
    }

    #[test]
    fn test_register_conflict_is_rejected() {
        let mut aliases = PermissionAliases::new();
        aliases
            .register("read_lectures", PermissionKey::LectureList)
            .unwrap();
        aliases
            .register("READ_LECTURES", PermissionKey::LectureList)
            .unwrap();

        let err = aliases
            .register("read_lectures", PermissionKey::LectureView)
            .unwrap_err();
        assert_eq!(err.existing, PermissionKey::LectureList);
        assert_eq!(err.attempted, PermissionKey::LectureView);
    }

    #[test]
    fn test_view_counterpart_only_for_list() {
        assert_eq!(
            PermissionKey::LectureList.view_counterpart(),
            Some(PermissionKey::LectureView)
        );
        assert_eq!(
            PermissionKey::PermissionList.view_counterpart(),
            Some(PermissionKey::PermissionView)
        );
        assert_eq!(PermissionKey::LectureCreate.view_counterpart(), None);
        assert_eq!(PermissionKey::LectureView.view_counterpart(), None);
    }

    #[test]
    fn test_every_list_key_has_a_view_counterpart_in_same_module() {
        for key in PermissionKey::ALL
            .iter()
            .filter(|k| k.action() == PermissionAction::List)
        {
            let view = key.view_counterpart().expect("list without view");
            assert_eq!(view.module(), key.module());
        }
    }

    #[test]
    fn test_module_grouping_covers_all_keys() {
        let catalog = PermissionCatalog::standard().unwrap();
        let grouped: usize = catalog.modules().values().map(Vec::len).sum();
        assert_eq!(grouped, PermissionKey::ALL.len());
        assert_eq!(catalog.modules().len(), PermissionModule::ALL.len());
        assert_eq!(catalog.keys_in(PermissionModule::Role).len(), 6);
        assert_eq!(
            catalog.module_of("permission_sync"),
            Some(PermissionModule::Permission)
        );
        assert!(catalog.is_canonical("user_delete"));
        assert!(!catalog.is_canonical("users:delete"));
    }

    #[test]
    fn test_serde_uses_canonical_key() {
        let json = serde_json::to_string(&PermissionKey::RoleAssign).unwrap();
        assert_eq!(json, "\"role_assign\"");
        let back: PermissionKey = serde_json::from_str("\"department_delete\"").unwrap();
        assert_eq!(back, PermissionKey::DepartmentDelete);
    }
}
