//! Authorization policy: role, department and consistency gates.
//!
//! Gates are declared once as [`AccessRule`] values and evaluated against
//! an explicit [`Caller`] before any side effect.

use uuid::Uuid;

use crate::error::{DocTrackError, DocTrackResult};
use crate::models::department::Department;
use crate::models::user::{User, UserRole};
use crate::repository::RecordScope;

/// The intake desk department. Its members see every record.
pub const INTAKE_DESK: &str = "receiving";

/// The authenticated principal for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub department: Option<String>,
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            department: user.department.clone(),
        }
    }
}

impl Caller {
    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    pub fn in_department(&self, department: &str) -> bool {
        self.department
            .as_deref()
            .is_some_and(|d| d.trim().eq_ignore_ascii_case(department.trim()))
    }

    pub fn is_intake_desk(&self) -> bool {
        self.in_department(INTAKE_DESK)
    }

    /// Super admins and the intake desk see every record.
    pub fn has_universal_visibility(&self) -> bool {
        self.is_super_admin() || self.is_intake_desk()
    }

    /// Pages the caller's UI may open: its own department when that is a
    /// known one.
    pub fn accessible_pages(&self) -> Vec<String> {
        self.department
            .as_deref()
            .and_then(Department::parse)
            .map(|d| vec![d.as_str().to_owned()])
            .unwrap_or_default()
    }
}

/// A reusable access requirement. `None` means the gate is open.
#[derive(Debug, Clone, Copy)]
pub struct AccessRule {
    pub roles: Option<&'static [UserRole]>,
    pub departments: Option<&'static [&'static str]>,
}

impl AccessRule {
    /// Any authenticated caller.
    pub const AUTHENTICATED: AccessRule = AccessRule {
        roles: None,
        departments: None,
    };

    /// Intake desk members (plus super admins).
    pub const INTAKE_DESK: AccessRule = AccessRule {
        roles: None,
        departments: Some(&[INTAKE_DESK]),
    };

    /// Admins and super admins.
    pub const ADMINS: AccessRule = AccessRule {
        roles: Some(&[UserRole::Admin, UserRole::SuperAdmin]),
        departments: None,
    };

    /// Evaluate both gates. Super admins pass unconditionally.
    pub fn check(&self, caller: &Caller) -> DocTrackResult<()> {
        if caller.is_super_admin() {
            return Ok(());
        }

        if let Some(roles) = self.roles {
            if !roles.contains(&caller.role) {
                return Err(DocTrackError::denied(
                    "Unauthorized. Insufficient role permissions.",
                ));
            }
        }

        if let Some(departments) = self.departments {
            if !departments.iter().any(|d| caller.in_department(d)) {
                return Err(DocTrackError::denied(
                    "Access denied. Your department does not have access to this resource.",
                ));
            }
        }

        Ok(())
    }
}

/// Which kind of write the consistency gate is guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Record,
    User,
}

/// A write that sets `department` must target the caller's own
/// department. Super admins are exempt, and the intake desk is exempt for
/// record writes since routing records is its job.
pub fn ensure_department_consistency(
    caller: &Caller,
    target: WriteTarget,
    department: Option<&str>,
) -> DocTrackResult<()> {
    let Some(department) = department else {
        return Ok(());
    };
    if caller.is_super_admin() {
        return Ok(());
    }
    if target == WriteTarget::Record && caller.is_intake_desk() {
        return Ok(());
    }
    if caller.in_department(department) {
        Ok(())
    } else {
        Err(DocTrackError::CrossDepartmentAssignment)
    }
}

/// Visibility scope for department-scoped record endpoints.
pub fn record_scope(caller: &Caller) -> DocTrackResult<RecordScope> {
    if caller.has_universal_visibility() {
        return Ok(RecordScope::All);
    }
    match caller.department.as_deref() {
        Some(d) if !d.trim().is_empty() => Ok(RecordScope::department(d)),
        _ => Err(DocTrackError::denied(
            "Access denied. No department assigned.",
        )),
    }
}
