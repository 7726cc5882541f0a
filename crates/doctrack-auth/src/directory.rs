//! Administrative user directory.
//!
//! Admins manage users of their own department; super admins manage
//! everyone. Every operation checks [`AccessRule::ADMINS`] first.

use doctrack_core::error::{DocTrackError, DocTrackResult, FieldErrors};
use doctrack_core::models::department::Department;
use doctrack_core::models::user::{CreateUser, UpdateUser, User, UserRole, UserStatus};
use doctrack_core::policy::{AccessRule, Caller, WriteTarget, ensure_department_consistency};
use doctrack_core::repository::{
    PaginatedResult, Pagination, SessionRepository, UserFilter, UserRepository,
};
use doctrack_core::validation;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// User fields as they arrive from a request. Every field is optional so
/// the same shape serves create, update and register.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub middle_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    #[validate(length(max = 255))]
    pub extension: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    #[validate(length(max = 255))]
    pub position: Option<String>,
    #[validate(length(max = 255))]
    pub employee_id: Option<String>,
    pub status: Option<String>,
}

impl UserInput {
    /// Trim text fields and lowercase the email. Passwords are kept as
    /// sent; an empty one counts as absent.
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.first_name,
            &mut self.middle_name,
            &mut self.last_name,
            &mut self.extension,
            &mut self.email,
            &mut self.role,
            &mut self.department,
            &mut self.position,
            &mut self.employee_id,
            &mut self.status,
        ] {
            validation::trim(field);
        }
        self.email = self.email.map(|e| e.to_lowercase());
        self.password = self.password.filter(|p| !p.is_empty());
        self
    }

    /// Structural checks shared by every operation.
    fn check(&self, errors: &mut FieldErrors, min_password: usize) {
        validation::collect(errors, self.validate());
        validation::min_length(errors, "password", self.password.as_deref(), min_password);
    }
}

/// Listing parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    /// A role name, or `all`.
    pub role: Option<String>,
    /// Honoured for super admins only.
    pub department: Option<String>,
    pub page: Option<u64>,
}

/// Canonical department name, validated against the enumeration.
fn department_field(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    validation::one_of(errors, "department", value, Department::parse).map(|d| d.to_string())
}

/// Validate a full user payload for creation.
pub(crate) fn validate_new_user(input: UserInput, min_password: usize) -> DocTrackResult<CreateUser> {
    let input = input.normalized();
    let mut errors = FieldErrors::new();
    input.check(&mut errors, min_password);
    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
        ("email", &input.email),
        ("password", &input.password),
        ("role", &input.role),
    ] {
        validation::require(&mut errors, field, value);
    }

    let role = validation::one_of(&mut errors, "role", input.role.as_deref(), UserRole::parse);
    let department = department_field(&mut errors, input.department.as_deref());
    let status = validation::one_of(&mut errors, "status", input.status.as_deref(), UserStatus::parse)
        .unwrap_or(UserStatus::Active);
    errors.into_result()?;

    let UserInput {
        first_name: Some(first_name),
        middle_name,
        last_name: Some(last_name),
        extension,
        email: Some(email),
        password: Some(password),
        position,
        employee_id,
        ..
    } = input
    else {
        return Err(DocTrackError::Internal("validated fields missing".into()));
    };
    let Some(role) = role else {
        return Err(DocTrackError::Internal("validated fields missing".into()));
    };

    Ok(CreateUser {
        first_name,
        middle_name,
        last_name,
        extension,
        email,
        password,
        role,
        department,
        position,
        employee_id,
        status,
    })
}

/// Validate a partial user payload. Absent fields are left untouched; a
/// name sent blank is an error rather than a clear.
fn validate_patch(input: UserInput, min_password: usize) -> DocTrackResult<UpdateUser> {
    let blanks: Vec<&str> = [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
        ("email", &input.email),
    ]
    .into_iter()
    .filter(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
    .map(|(field, _)| field)
    .collect();

    let input = input.normalized();
    let mut errors = FieldErrors::new();
    input.check(&mut errors, min_password);
    for field in blanks {
        validation::require(&mut errors, field, &None::<String>);
    }

    let patch = UpdateUser {
        role: validation::one_of(&mut errors, "role", input.role.as_deref(), UserRole::parse),
        department: department_field(&mut errors, input.department.as_deref()),
        status: validation::one_of(&mut errors, "status", input.status.as_deref(), UserStatus::parse),
        first_name: input.first_name,
        middle_name: input.middle_name,
        last_name: input.last_name,
        extension: input.extension,
        email: input.email,
        password: input.password,
        position: input.position,
        employee_id: input.employee_id,
        ..Default::default()
    };
    errors.into_result()?;
    Ok(patch)
}

/// User management over the user and session repositories.
pub struct UserDirectory<U: UserRepository, S: SessionRepository> {
    user_repo: U,
    session_repo: S,
    min_password_length: usize,
}

impl<U: UserRepository, S: SessionRepository> UserDirectory<U, S> {
    pub fn new(user_repo: U, session_repo: S, min_password_length: usize) -> Self {
        Self {
            user_repo,
            session_repo,
            min_password_length,
        }
    }

    /// Non-super admins may only touch users of their own department.
    fn ensure_same_department(caller: &Caller, target: &User) -> DocTrackResult<()> {
        if caller.is_super_admin() {
            return Ok(());
        }
        match target.department.as_deref() {
            Some(d) if caller.in_department(d) => Ok(()),
            _ => Err(DocTrackError::denied(
                "You can only manage users in your own department.",
            )),
        }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        query: UserQuery,
    ) -> DocTrackResult<PaginatedResult<User>> {
        AccessRule::ADMINS.check(caller)?;

        let department = if caller.is_super_admin() {
            validation::non_blank(query.department.as_deref())
        } else {
            let own = validation::non_blank(caller.department.as_deref())
                .ok_or_else(|| DocTrackError::denied("Access denied. No department assigned."))?;
            Some(own)
        };

        let role = match validation::non_blank(query.role.as_deref()) {
            Some(r) if r.eq_ignore_ascii_case("all") => None,
            Some(r) => Some(
                UserRole::parse(&r)
                    .ok_or_else(|| DocTrackError::invalid("role", "The selected role is invalid."))?,
            ),
            None => None,
        };

        self.user_repo
            .list(
                UserFilter {
                    department,
                    role,
                    search: validation::non_blank(query.search.as_deref()),
                },
                Pagination::page(query.page.unwrap_or(1)),
            )
            .await
    }

    pub async fn create(&self, caller: &Caller, input: UserInput) -> DocTrackResult<User> {
        AccessRule::ADMINS.check(caller)?;

        let mut create = validate_new_user(input, self.min_password_length)?;

        if !caller.is_super_admin() {
            if create.role == UserRole::SuperAdmin {
                return Err(DocTrackError::denied("You cannot create a Super Admin."));
            }
            match create.department.as_deref() {
                Some(d) if caller.in_department(d) => {}
                Some(_) => {
                    return Err(DocTrackError::denied(
                        "You can only create users in your own department.",
                    ));
                }
                None => create.department = caller.department.clone(),
            }
        }

        let user = self.user_repo.create(create).await?;
        info!(user_id = %user.id, created_by = %caller.user_id, "User created");
        Ok(user)
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> DocTrackResult<User> {
        AccessRule::ADMINS.check(caller)?;
        let user = self.user_repo.get_by_id(id).await?;
        Self::ensure_same_department(caller, &user)?;
        Ok(user)
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, input: UserInput) -> DocTrackResult<User> {
        AccessRule::ADMINS.check(caller)?;
        let patch = validate_patch(input, self.min_password_length)?;

        let target = self.user_repo.get_by_id(id).await?;
        Self::ensure_same_department(caller, &target)?;
        if !caller.is_super_admin() && patch.role == Some(UserRole::SuperAdmin) {
            return Err(DocTrackError::denied("You cannot promote a user to Super Admin."));
        }
        ensure_department_consistency(caller, WriteTarget::User, patch.department.as_deref())?;

        let revoke = patch.password.is_some() || patch.status == Some(UserStatus::Inactive);
        let user = self.user_repo.update(id, patch).await?;

        if revoke {
            self.session_repo.invalidate_user_sessions(id).await?;
            info!(user_id = %id, "User sessions revoked");
        }
        info!(user_id = %id, updated_by = %caller.user_id, "User updated");
        Ok(user)
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> DocTrackResult<()> {
        AccessRule::ADMINS.check(caller)?;
        if caller.user_id == id {
            return Err(DocTrackError::denied("You cannot delete your own account."));
        }

        let target = self.user_repo.get_by_id(id).await?;
        Self::ensure_same_department(caller, &target)?;

        self.session_repo.invalidate_user_sessions(id).await?;
        self.user_repo.delete(id).await?;
        info!(user_id = %id, deleted_by = %caller.user_id, "User deleted");
        Ok(())
    }
}
