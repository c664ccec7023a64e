use argon2::Variant;
use rand::RngCore;
use tokio_postgres::{Error as PgError};
use deadpool_postgres::GenericClient;

use crate::error::api::ApiError;

pub const SALT_LEN: usize = 32;

pub type Salt = [u8; SALT_LEN];

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error(transparent)]
    Rand(#[from] rand::Error),

    #[error(transparent)]
    Argon2(#[from] argon2::Error),

    #[error(transparent)]
    Db(#[from] PgError)
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::new().source(err)
    }
}

pub fn gen_salt() -> Result<Salt, rand::Error> {
    let mut salt = [0u8; SALT_LEN];

    rand::thread_rng().try_fill_bytes(&mut salt)?;

    Ok(salt)
}

pub fn gen_hash(password: &str, salt: &[u8]) -> Result<String, argon2::Error> {
    let mut config = argon2::Config::default();
    config.mem_cost = 19456;
    config.variant = Variant::Argon2id;

    argon2::hash_encoded(
        password.as_bytes(),
        salt,
        &config
    )
}

pub struct Password {
    pub hash: String,
}

impl Password {
    pub async fn retrieve(
        conn: &impl GenericClient,
        user_id: &i64,
    ) -> Result<Option<Password>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select users.hash \
            from users \
            where users.id = $1",
            &[user_id]
        ).await? {
            Ok(Some(Password {
                hash: row.get(0),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn verify<C>(&self, check: C) -> Result<bool, PasswordError>
    where
        C: AsRef<[u8]>
    {
        Ok(argon2::verify_encoded(&self.hash, check.as_ref())?)
    }
}

pub fn create_hash(password: &str) -> Result<String, PasswordError> {
    let salt = gen_salt()?;

    Ok(gen_hash(password, &salt)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_verifies_and_rejects() {
        let hash = create_hash("a strong password").unwrap();

        let password = Password { hash };

        assert!(password.verify("a strong password").unwrap());
        assert!(!password.verify("a wrong password").unwrap());
    }

    #[test]
    fn salts_make_hashes_unique() {
        let first = create_hash("same password").unwrap();
        let second = create_hash("same password").unwrap();

        assert_ne!(first, second);
    }
}
