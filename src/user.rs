use chrono::{DateTime, Utc};
use tokio_postgres::{Error as PgError};
use deadpool_postgres::GenericClient;

const ENABLE_TOTP_SQL: &str = "\
    update users \
    set totp_enabled = true, \
        totp_secret = $2, \
        requires_totp = false \
    where users.id = $1";

const FLIP_REQUIRES_TOTP_SQL: &str = "\
    update users \
    set requires_totp = true \
    where users.id = $1 and \
          users.requires_totp = false and \
          users.totp_enabled = false";

#[derive(Debug)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub created: DateTime<Utc>,
    pub totp_enabled: bool,
    pub totp_secret: Option<String>,
    pub requires_totp: bool,
}

pub struct CreateParams {
    pub name: Option<String>,
    pub email: String,
    pub hash: String,
    pub totp_secret: Option<String>,
}

impl User {
    pub async fn retrieve(
        conn: &impl GenericClient,
        id: &i64,
    ) -> Result<Option<User>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select users.id, \
                   users.name, \
                   users.email, \
                   users.created, \
                   users.totp_enabled, \
                   users.totp_secret, \
                   users.requires_totp \
            from users \
            where users.id = $1",
            &[id]
        ).await? {
            Ok(Some(User {
                id: row.get(0),
                name: row.get(1),
                email: row.get(2),
                created: row.get(3),
                totp_enabled: row.get(4),
                totp_secret: row.get(5),
                requires_totp: row.get(6),
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn query_with_email(
        conn: &impl GenericClient,
        email: &str,
    ) -> Result<Option<User>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select users.id, \
                   users.name, \
                   users.email, \
                   users.created, \
                   users.totp_enabled, \
                   users.totp_secret, \
                   users.requires_totp \
            from users \
            where users.email = $1",
            &[&email]
        ).await? {
            Ok(Some(User {
                id: row.get(0),
                name: row.get(1),
                email: row.get(2),
                created: row.get(3),
                totp_enabled: row.get(4),
                totp_secret: row.get(5),
                requires_totp: row.get(6),
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn create(
        conn: &impl GenericClient,
        params: CreateParams,
    ) -> Result<User, PgError> {
        let totp_enabled = params.totp_secret.is_some();
        let requires_totp = false;

        let row = conn.query_one(
            "\
            insert into users (name, email, hash, totp_enabled, totp_secret, requires_totp) values \
            ($1, $2, $3, $4, $5, $6) \
            returning id, created",
            &[
                &params.name,
                &params.email,
                &params.hash,
                &totp_enabled,
                &params.totp_secret,
                &requires_totp,
            ]
        ).await?;

        Ok(User {
            id: row.get(0),
            name: params.name,
            email: params.email,
            created: row.get(1),
            totp_enabled,
            totp_secret: params.totp_secret,
            requires_totp,
        })
    }

    /// Stores the secret, marks totp active, and clears any outstanding
    /// setup requirement in one statement.
    pub async fn enable_totp(
        conn: &impl GenericClient,
        id: &i64,
        secret: &str,
    ) -> Result<bool, PgError> {
        let count = conn.execute(ENABLE_TOTP_SQL, &[id, &secret]).await?;

        Ok(count == 1)
    }

    /// Conditional flip of the setup requirement once the grace window has
    /// lapsed. The predicate keeps concurrent logins from racing each
    /// other or clobbering an account that enrolled in the meantime.
    pub async fn flip_requires_totp(
        conn: &impl GenericClient,
        id: &i64,
    ) -> Result<bool, PgError> {
        let count = conn.execute(FLIP_REQUIRES_TOTP_SQL, &[id]).await?;

        Ok(count == 1)
    }

    pub fn into_api(self) -> taskbook_api::users::User {
        taskbook_api::users::User {
            id: self.id,
            name: self.name,
            email: self.email,
            created: self.created,
            totp_enabled: self.totp_enabled,
            requires_totp: self.requires_totp,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flip_statement_only_targets_unflagged_unenrolled_rows() {
        assert!(FLIP_REQUIRES_TOTP_SQL.contains("set requires_totp = true"));
        assert!(FLIP_REQUIRES_TOTP_SQL.contains("users.requires_totp = false"));
        assert!(FLIP_REQUIRES_TOTP_SQL.contains("users.totp_enabled = false"));
    }

    #[test]
    fn enable_statement_pairs_secret_with_flags() {
        assert!(ENABLE_TOTP_SQL.contains("set totp_enabled = true"));
        assert!(ENABLE_TOTP_SQL.contains("totp_secret = $2"));
        assert!(ENABLE_TOTP_SQL.contains("requires_totp = false"));
        assert!(ENABLE_TOTP_SQL.ends_with("where users.id = $1"));
    }
}
