use chrono::NaiveDateTime;
use diesel::prelude::*;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

use crate::db::schema::users;
use crate::types::ApiError;

// PBKDF2-SHA256; the stored PHC string carries its own salt and round count.
const PASSWORD_ROUNDS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users, check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_admin: bool,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn make_password(password: &str) -> Result<String, ApiError> {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|_| ApiError::Internal)?;
        let params = Params {
            rounds: PASSWORD_ROUNDS,
            ..Params::default()
        };
        Pbkdf2
            .hash_password_customized(password.as_bytes(), None, None, params, &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| ApiError::Internal)
    }

    pub fn verify_password(&self, password_to_verify: &str) -> Result<bool, ApiError> {
        let hash = PasswordHash::new(&self.password).map_err(|_| ApiError::Internal)?;
        Ok(Pbkdf2
            .verify_password(password_to_verify.as_bytes(), &hash)
            .is_ok())
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial update of a user row. `None` fields are left untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}
