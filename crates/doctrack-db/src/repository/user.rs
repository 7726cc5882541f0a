//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashing uses Argon2id (memory: 19 MiB, iterations: 2,
//! parallelism: 1) with a random salt per hash and an optional
//! server-side pepper.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use doctrack_core::error::DocTrackResult;
use doctrack_core::models::user::{CreateUser, UpdateUser, User, UserRole, UserStatus};
use doctrack_core::repository::{PaginatedResult, Pagination, UserFilter, UserRepository};
use rust_decimal::Decimal;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, where_clause};
use crate::error::DbError;

const ENTITY: &str = "user";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    extension: Option<String>,
    email: String,
    password_hash: String,
    role: String,
    department: Option<String>,
    position: Option<String>,
    employee_id: Option<String>,
    status: String,
    sms_credits: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let role = UserRole::parse(&self.role)
            .ok_or_else(|| DbError::InvalidRow(format!("unknown user role: {}", self.role)))?;
        let status = UserStatus::parse(&self.status)
            .ok_or_else(|| DbError::InvalidRow(format!("unknown user status: {}", self.status)))?;
        Ok(User {
            id: parse_uuid(&self.record_id, ENTITY)?,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            extension: self.extension,
            email: self.email,
            password_hash: self.password_hash,
            role,
            department: self.department,
            position: self.position,
            employee_id: self.employee_id,
            status,
            sms_credits: self.sms_credits,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn peppered<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// Hash a password with Argon2id.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Hash(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a password against an Argon2id hash.
///
/// Public for use by the auth layer.
pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> Result<bool, DbError> {
    use argon2::PasswordVerifier;

    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| DbError::Hash(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DbError::Hash(e.to_string())),
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    async fn fetch(&self, id: Uuid) -> Result<User, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, id_str))?
            .try_into_user()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> DocTrackResult<User> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        self.db
            .query(
                "CREATE type::record('user', $id) SET \
                 first_name = $first_name, middle_name = $middle_name, \
                 last_name = $last_name, extension = $extension, \
                 email = $email, password_hash = $password_hash, \
                 role = $role, department = $department, \
                 position = $position, employee_id = $employee_id, \
                 status = $status",
            )
            .bind(("id", id.to_string()))
            .bind(("first_name", input.first_name))
            .bind(("middle_name", input.middle_name))
            .bind(("last_name", input.last_name))
            .bind(("extension", input.extension))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("department", input.department))
            .bind(("position", input.position))
            .bind(("employee_id", input.employee_id))
            .bind(("status", input.status.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        Ok(self.fetch(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> DocTrackResult<User> {
        Ok(self.fetch(id).await?)
    }

    async fn get_by_email(&self, email: &str) -> DocTrackResult<User> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE email = $email")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found(ENTITY, format!("email={email}")))?;

        Ok(row.try_into_user()?)
    }

    async fn get_many(&self, ids: &[Uuid]) -> DocTrackResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE meta::id(id) IN $ids")
            .bind(("ids", ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let users = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(users)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> DocTrackResult<User> {
        self.fetch(id).await?;

        let password_hash = input
            .password
            .as_deref()
            .map(|p| hash_password(p, self.pepper.as_deref()))
            .transpose()?;

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.middle_name.is_some() {
            sets.push("middle_name = $middle_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.extension.is_some() {
            sets.push("extension = $extension");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.department.is_some() {
            sets.push("department = $department");
        }
        if input.position.is_some() {
            sets.push("position = $position");
        }
        if input.employee_id.is_some() {
            sets.push("employee_id = $employee_id");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.sms_credits.is_some() {
            sets.push("sms_credits = $sms_credits");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(v) = input.first_name {
            builder = builder.bind(("first_name", v));
        }
        if let Some(v) = input.middle_name {
            builder = builder.bind(("middle_name", v));
        }
        if let Some(v) = input.last_name {
            builder = builder.bind(("last_name", v));
        }
        if let Some(v) = input.extension {
            builder = builder.bind(("extension", v));
        }
        if let Some(v) = input.email {
            builder = builder.bind(("email", v));
        }
        if let Some(v) = password_hash {
            builder = builder.bind(("password_hash", v));
        }
        if let Some(v) = input.role {
            builder = builder.bind(("role", v.as_str().to_string()));
        }
        if let Some(v) = input.department {
            builder = builder.bind(("department", v));
        }
        if let Some(v) = input.position {
            builder = builder.bind(("position", v));
        }
        if let Some(v) = input.employee_id {
            builder = builder.bind(("employee_id", v));
        }
        if let Some(v) = input.status {
            builder = builder.bind(("status", v.as_str().to_string()));
        }
        if let Some(v) = input.sms_credits {
            builder = builder.bind(("sms_credits", v));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        Ok(self.fetch(id).await?)
    }

    async fn delete(&self, id: Uuid) -> DocTrackResult<()> {
        self.db
            .query("DELETE type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(ENTITY, e))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> DocTrackResult<PaginatedResult<User>> {
        let mut conditions = Vec::new();
        if filter.department.is_some() {
            conditions.push("string::lowercase(department ?? '') = $department");
        }
        if filter.role.is_some() {
            conditions.push("role = $role");
        }
        if filter.search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(email), $search) \
                 OR string::contains(string::lowercase(first_name), $search) \
                 OR string::contains(string::lowercase(last_name), $search))",
            );
        }
        let where_sql = where_clause(&conditions);

        let department = filter.department.map(|d| d.trim().to_lowercase());
        let role = filter.role.map(|r| r.as_str().to_string());
        let search = filter.search.map(|s| s.trim().to_lowercase());

        let query = format!(
            "SELECT count() AS total FROM user{where_sql} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM user{where_sql} \
             ORDER BY created_at DESC LIMIT $limit START $offset"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("department", department))
            .bind(("role", role))
            .bind(("search", search))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
