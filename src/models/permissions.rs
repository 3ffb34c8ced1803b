use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use crate::models::users::Role;

/// Doctor directory permission constants
pub mod doctor_permissions {
    pub const CREATE: &str = "doctors:create";
    pub const READ: &str = "doctors:read";
    pub const UPDATE_OWN: &str = "doctors:update_own";
    pub const UPDATE_ALL: &str = "doctors:update_all";
    pub const DELETE: &str = "doctors:delete";
    pub const VIEW_STATS: &str = "doctors:view_stats";
}

/// Patient record permission constants
pub mod patient_permissions {
    pub const CREATE: &str = "patients:create";
    pub const READ_OWN: &str = "patients:read_own";
    pub const READ_ALL: &str = "patients:read_all";
    pub const SEARCH: &str = "patients:search";
    pub const UPDATE_OWN: &str = "patients:update_own";
    pub const UPDATE_ALL: &str = "patients:update_all";
    pub const DELETE: &str = "patients:delete";
}

/// Appointment permission constants
pub mod appointment_permissions {
    pub const BOOK_OWN: &str = "appointments:book_own";
    pub const BOOK_ALL: &str = "appointments:book_all";
    pub const READ_OWN: &str = "appointments:read_own";
    pub const READ_ALL: &str = "appointments:read_all";
    /// Read any patient's appointments (clinical staff)
    pub const READ_PATIENTS: &str = "appointments:read_patients";
    pub const UPDATE_OWN: &str = "appointments:update_own";
    pub const UPDATE_ALL: &str = "appointments:update_all";
    pub const SET_STATUS: &str = "appointments:set_status";
    pub const DELETE: &str = "appointments:delete";
    pub const VIEW_AVAILABILITY: &str = "appointments:view_availability";
}

/// Account management permission constants
pub mod user_permissions {
    pub const MANAGE: &str = "users:manage";
}

/// All available permissions
pub const ALL_PERMISSIONS: &[&str] = &[
    // Doctor permissions
    doctor_permissions::CREATE,
    doctor_permissions::READ,
    doctor_permissions::UPDATE_OWN,
    doctor_permissions::UPDATE_ALL,
    doctor_permissions::DELETE,
    doctor_permissions::VIEW_STATS,
    // Patient permissions
    patient_permissions::CREATE,
    patient_permissions::READ_OWN,
    patient_permissions::READ_ALL,
    patient_permissions::SEARCH,
    patient_permissions::UPDATE_OWN,
    patient_permissions::UPDATE_ALL,
    patient_permissions::DELETE,
    // Appointment permissions
    appointment_permissions::BOOK_OWN,
    appointment_permissions::BOOK_ALL,
    appointment_permissions::READ_OWN,
    appointment_permissions::READ_ALL,
    appointment_permissions::READ_PATIENTS,
    appointment_permissions::UPDATE_OWN,
    appointment_permissions::UPDATE_ALL,
    appointment_permissions::SET_STATUS,
    appointment_permissions::DELETE,
    appointment_permissions::VIEW_AVAILABILITY,
    // User permissions
    user_permissions::MANAGE,
];

/// Role-to-permission mappings
///
/// Admin holds everything. Doctors and patients get the `_OWN` variants,
/// which still have to be paired with an ownership check.
pub static ROLE_PERMISSIONS: LazyLock<HashMap<Role, HashSet<&'static str>>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    map.insert(Role::Admin, ALL_PERMISSIONS.iter().copied().collect::<HashSet<_>>());

    // Doctor: sees the patient roster, manages own schedule and profile
    let doctor_permissions = vec![
        doctor_permissions::READ,
        doctor_permissions::UPDATE_OWN,
        patient_permissions::READ_ALL,
        patient_permissions::SEARCH,
        appointment_permissions::BOOK_OWN,
        appointment_permissions::READ_OWN,
        appointment_permissions::READ_PATIENTS,
        appointment_permissions::UPDATE_OWN,
        appointment_permissions::SET_STATUS,
        appointment_permissions::VIEW_AVAILABILITY,
    ].into_iter().collect::<HashSet<_>>();
    map.insert(Role::Doctor, doctor_permissions);

    // Patient: own record and own bookings only
    let patient_permissions = vec![
        doctor_permissions::READ,
        patient_permissions::CREATE,
        patient_permissions::READ_OWN,
        patient_permissions::UPDATE_OWN,
        appointment_permissions::BOOK_OWN,
        appointment_permissions::READ_OWN,
        appointment_permissions::UPDATE_OWN,
        appointment_permissions::VIEW_AVAILABILITY,
    ].into_iter().collect::<HashSet<_>>();
    map.insert(Role::Patient, patient_permissions);

    map
});

/// Permission validation utilities
pub struct PermissionValidator;

impl PermissionValidator {
    /// Check if a role has a specific permission
    pub fn role_has_permission(role: Role, permission: &str) -> bool {
        ROLE_PERMISSIONS
            .get(&role)
            .map(|permissions| permissions.contains(permission))
            .unwrap_or(false)
    }

    /// Check if any of the given roles grants the permission
    pub fn roles_have_permission(roles: &[Role], permission: &str) -> bool {
        roles
            .iter()
            .any(|role| Self::role_has_permission(*role, permission))
    }

    /// Get the combined permissions of a set of roles, sorted
    pub fn get_permissions(roles: &[Role]) -> Vec<&'static str> {
        let mut permissions: Vec<&'static str> = roles
            .iter()
            .filter_map(|role| ROLE_PERMISSIONS.get(role))
            .flat_map(|permissions| permissions.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        permissions.sort_unstable();
        permissions
    }
}
