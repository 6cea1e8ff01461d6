use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use bigdecimal::BigDecimal;
use diesel::{delete, insert_into, prelude::*, update};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{NewUser, Role, User, UserChangeset};
use crate::schema::users;

use super::map_unique_violation;

#[derive(Debug, Clone)]
pub struct NewStaffInput {
    pub name: String,
    pub email: String,
    pub passphrase: String,
    pub contact: String,
    pub total_salary: BigDecimal,
    pub role: Role,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StaffFilter {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub total_salary: Option<BigDecimal>,
    pub role: Option<Role>,
}

impl StaffFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn hash_passphrase(passphrase: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::PassphraseHash(err.to_string()))
}

pub fn verify_passphrase(passphrase: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(passphrase.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub struct StaffStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> StaffStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    pub async fn register(&mut self, input: NewStaffInput) -> Result<User, ServiceError> {
        let existing = users::table
            .filter(users::email.eq(&input.email))
            .select(users::id)
            .first::<Uuid>(self.conn)
            .await
            .optional()?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyExists("User"));
        }

        let user = NewUser {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            passphrase_hash: hash_passphrase(&input.passphrase)?,
            contact: input.contact,
            total_salary: input.total_salary,
            role: input.role,
        };

        let created = insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(self.conn)
            .await
            .map_err(map_unique_violation("User"))?;

        info!(user_id = %created.id, role = %created.role, "user registered");
        Ok(created)
    }

    /// Returns the user registered under `email` when `passphrase` matches.
    pub async fn authenticate(&mut self, email: &str, passphrase: &str) -> Result<User, ServiceError> {
        let user = users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(self.conn)
            .await
            .optional()?;

        match user {
            Some(user) if verify_passphrase(passphrase, &user.passphrase_hash) => Ok(user),
            _ => {
                warn!(email, "rejected login");
                Err(ServiceError::InvalidCredentials)
            }
        }
    }

    pub async fn list(&mut self) -> Result<Vec<User>, ServiceError> {
        Ok(users::table
            .select(User::as_select())
            .order(users::created_at.asc())
            .load(self.conn)
            .await?)
    }

    pub async fn list_by_role(&mut self, role: Role) -> Result<Vec<User>, ServiceError> {
        Ok(users::table
            .filter(users::role.eq(role))
            .select(User::as_select())
            .order(users::created_at.asc())
            .load(self.conn)
            .await?)
    }

    pub async fn find(&mut self, id: Uuid) -> Result<User, ServiceError> {
        users::table
            .find(id)
            .select(User::as_select())
            .first(self.conn)
            .await
            .optional()?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn filter(&mut self, filter: &StaffFilter) -> Result<Vec<User>, ServiceError> {
        let mut query = users::table.select(User::as_select()).into_boxed();

        if let Some(id) = filter.id {
            query = query.filter(users::id.eq(id));
        }
        if let Some(name) = &filter.name {
            query = query.filter(users::name.eq(name.clone()));
        }
        if let Some(email) = &filter.email {
            query = query.filter(users::email.eq(email.clone()));
        }
        if let Some(contact) = &filter.contact {
            query = query.filter(users::contact.eq(contact.clone()));
        }
        if let Some(salary) = &filter.total_salary {
            query = query.filter(users::total_salary.eq(salary.clone()));
        }
        if let Some(role) = filter.role {
            query = query.filter(users::role.eq(role));
        }

        Ok(query.order(users::created_at.asc()).load(self.conn).await?)
    }

    pub async fn update(&mut self, id: Uuid, changes: UserChangeset) -> Result<User, ServiceError> {
        if changes.is_empty() {
            return self.find(id).await;
        }

        update(users::table.find(id))
            .set(&changes)
            .returning(User::as_returning())
            .get_result(self.conn)
            .await
            .optional()
            .map_err(map_unique_violation("User"))?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    pub async fn remove(&mut self, id: Uuid) -> Result<(), ServiceError> {
        let removed = delete(users::table.find(id)).execute(self.conn).await?;
        if removed == 0 {
            return Err(ServiceError::not_found("User"));
        }
        info!(user_id = %id, "user removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passphrase_round_trip() {
        let hash = hash_passphrase("s3cret-tiffin").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_passphrase("s3cret-tiffin", &hash));
        assert!(!verify_passphrase("wrong", &hash));
        assert!(!verify_passphrase("s3cret-tiffin", "not-a-hash"));
    }
}
