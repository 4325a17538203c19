//! Sign-in identities and bearer sessions.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, NaiveDateTime};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{AuthIdentity, Session};
use crate::validation::{format_timestamp, validate_email, validate_required};

/// Length of generated temporary passwords.
pub const TEMPORARY_PASSWORD_LENGTH: usize = 16;

/// Minimum length for user-chosen passwords.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const SESSION_TOKEN_LENGTH: usize = 48;

/// Hash a password with Argon2id, returning a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DatabaseError::PasswordHash(e.to_string()))
}

/// Check a password against a PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| DatabaseError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Random alphanumeric password handed to provisioned users.
pub fn generate_temporary_password() -> String {
    random_token(TEMPORARY_PASSWORD_LENGTH)
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Create a new identity. Emails are unique regardless of case.
pub async fn create_identity(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    must_change_password: bool,
) -> Result<AuthIdentity> {
    insert_identity(pool, email, password, must_change_password, None).await
}

/// Create an identity on behalf of a church, holding a temporary password.
pub async fn create_provisioned_identity(
    pool: &SqlitePool,
    church_id: &str,
    email: &str,
    temporary_password: &str,
) -> Result<AuthIdentity> {
    insert_identity(pool, email, temporary_password, true, Some(church_id)).await
}

async fn insert_identity(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    must_change_password: bool,
    church_id: Option<&str>,
) -> Result<AuthIdentity> {
    let email = email.trim();
    validate_email(email)?;
    validate_required("password", password, 256)?;

    let id = Uuid::new_v4().to_string();
    let password_hash = hash_password(password)?;

    sqlx::query(
        r#"
        INSERT INTO auth_identities (id, email, password_hash, must_change_password, church_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(email)
    .bind(&password_hash)
    .bind(must_change_password)
    .bind(church_id)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "AuthIdentity", email))?;

    get_identity(pool, &id).await
}

/// Get an identity by id.
pub async fn get_identity(pool: &SqlitePool, id: &str) -> Result<AuthIdentity> {
    sqlx::query_as::<_, AuthIdentity>(
        r#"
        SELECT id, email, password_hash, must_change_password, church_id, created_at
        FROM auth_identities
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "AuthIdentity",
        id: id.to_string(),
    })
}

/// Find an identity by email (case-insensitive).
pub async fn find_identity_by_email(pool: &SqlitePool, email: &str) -> Result<Option<AuthIdentity>> {
    let identity = sqlx::query_as::<_, AuthIdentity>(
        r#"
        SELECT id, email, password_hash, must_change_password, church_id, created_at
        FROM auth_identities
        WHERE email = ?
        "#,
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    Ok(identity)
}

/// Check an email/password pair.
pub async fn verify_credentials(pool: &SqlitePool, email: &str, password: &str) -> Result<AuthIdentity> {
    let identity = find_identity_by_email(pool, email)
        .await?
        .ok_or(DatabaseError::InvalidCredentials)?;

    if !verify_password(password, &identity.password_hash)? {
        return Err(DatabaseError::InvalidCredentials);
    }

    Ok(identity)
}

/// Replace a password and clear the temporary-password flag.
pub async fn set_password(pool: &SqlitePool, id: &str, new_password: &str) -> Result<()> {
    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DatabaseError::Invalid(crate::ValidationError::OutOfRange {
            field: "password length".to_string(),
            min: MIN_PASSWORD_LENGTH as i64,
            max: 256,
            actual: new_password.chars().count() as i64,
        }));
    }
    validate_required("password", new_password, 256)?;

    let password_hash = hash_password(new_password)?;
    let result = sqlx::query(
        r#"
        UPDATE auth_identities
        SET password_hash = ?, must_change_password = 0
        WHERE id = ?
        "#,
    )
    .bind(&password_hash)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "AuthIdentity",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Identities a church provisioned that have no profile row: left behind
/// when provisioning stops after creating the identity.
pub async fn list_orphaned_identities(pool: &SqlitePool, church_id: &str) -> Result<Vec<AuthIdentity>> {
    let identities = sqlx::query_as::<_, AuthIdentity>(
        r#"
        SELECT a.id, a.email, a.password_hash, a.must_change_password, a.church_id, a.created_at
        FROM auth_identities a
        LEFT JOIN profiles p ON p.id = a.id
        WHERE p.id IS NULL AND a.church_id = ?
        ORDER BY a.created_at
        "#,
    )
    .bind(church_id)
    .fetch_all(pool)
    .await?;

    Ok(identities)
}

/// Delete an identity the church provisioned that has no profile.
pub async fn delete_orphaned_identity(pool: &SqlitePool, church_id: &str, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM auth_identities
        WHERE id = ? AND church_id = ?
          AND NOT EXISTS (SELECT 1 FROM profiles WHERE profiles.id = auth_identities.id)
        "#,
    )
    .bind(id)
    .bind(church_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Orphaned identity",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Open a session for a user.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: &str,
    now: NaiveDateTime,
    ttl: Duration,
) -> Result<Session> {
    let token = random_token(SESSION_TOKEN_LENGTH);
    let created_at = format_timestamp(now);
    let expires_at = format_timestamp(now + ttl);

    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&token)
    .bind(user_id)
    .bind(&created_at)
    .bind(&expires_at)
    .execute(pool)
    .await?;

    Ok(Session {
        token,
        user_id: user_id.to_string(),
        created_at,
        expires_at,
    })
}

/// Look up a live session. Expired sessions resolve to `None`.
pub async fn resolve_session(pool: &SqlitePool, token: &str, now: NaiveDateTime) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        r#"
        SELECT token, user_id, created_at, expires_at
        FROM sessions
        WHERE token = ? AND expires_at > ?
        "#,
    )
    .bind(token)
    .bind(format_timestamp(now))
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

/// End a session. Returns false when the token was unknown.
pub async fn revoke_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE token = ?
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every expired session, returning how many were removed.
pub async fn purge_expired_sessions(pool: &SqlitePool, now: NaiveDateTime) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE expires_at <= ?
        "#,
    )
    .bind(format_timestamp(now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_church, test_db};

    fn now() -> NaiveDateTime {
        crate::validation::parse_timestamp("now", "2026-10-15 12:00:00").unwrap()
    }

    #[test]
    fn test_temporary_password_shape() {
        let a = generate_temporary_password();
        let b = generate_temporary_password();
        assert_eq!(a.len(), TEMPORARY_PASSWORD_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_identity_and_credentials() {
        let db = test_db().await;
        let identity = create_identity(db.pool(), "Ana@Igreja.org", "segredo123", false)
            .await
            .unwrap();

        let ok = verify_credentials(db.pool(), "ana@igreja.org", "segredo123")
            .await
            .unwrap();
        assert_eq!(ok.id, identity.id);

        let bad = verify_credentials(db.pool(), "ana@igreja.org", "errado").await;
        assert!(matches!(bad, Err(DatabaseError::InvalidCredentials)));

        let unknown = verify_credentials(db.pool(), "ninguem@igreja.org", "x").await;
        assert!(matches!(unknown, Err(DatabaseError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        create_identity(db.pool(), "ana@igreja.org", "segredo123", false)
            .await
            .unwrap();
        let dup = create_identity(db.pool(), "ANA@igreja.org", "outra-senha", false).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_set_password_clears_flag() {
        let db = test_db().await;
        let identity = create_identity(db.pool(), "joao@igreja.org", "temp-pass", true)
            .await
            .unwrap();
        assert!(identity.must_change_password);

        assert!(set_password(db.pool(), &identity.id, "curta").await.is_err());
        set_password(db.pool(), &identity.id, "nova-senha-forte").await.unwrap();

        let updated = get_identity(db.pool(), &identity.id).await.unwrap();
        assert!(!updated.must_change_password);
        assert!(verify_credentials(db.pool(), "joao@igreja.org", "nova-senha-forte")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = test_db().await;
        let identity = create_identity(db.pool(), "maria@igreja.org", "segredo123", false)
            .await
            .unwrap();

        let session = create_session(db.pool(), &identity.id, now(), Duration::hours(1))
            .await
            .unwrap();

        let live = resolve_session(db.pool(), &session.token, now()).await.unwrap();
        assert_eq!(live.unwrap().user_id, identity.id);

        let later = now() + Duration::hours(2);
        assert!(resolve_session(db.pool(), &session.token, later)
            .await
            .unwrap()
            .is_none());

        assert_eq!(purge_expired_sessions(db.pool(), later).await.unwrap(), 1);
        assert!(!revoke_session(db.pool(), &session.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_orphaned_identities() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let orphan = create_provisioned_identity(db.pool(), &church.id, "orfao@igreja.org", "segredo123")
            .await
            .unwrap();
        assert!(orphan.must_change_password);
        // Self-managed identities are never listed.
        create_identity(db.pool(), "livre@igreja.org", "segredo123", false)
            .await
            .unwrap();

        let orphans = list_orphaned_identities(db.pool(), &church.id).await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, orphan.id);

        delete_orphaned_identity(db.pool(), &church.id, &orphan.id).await.unwrap();
        assert!(list_orphaned_identities(db.pool(), &church.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orphaned_identities_are_scoped_to_church() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let other = crate::church::create_church(db.pool(), "Igreja Vizinha", Some("Olinda"))
            .await
            .unwrap();
        let orphan = create_provisioned_identity(db.pool(), &church.id, "orfao@igreja.org", "segredo123")
            .await
            .unwrap();

        assert!(list_orphaned_identities(db.pool(), &other.id).await.unwrap().is_empty());
        let err = delete_orphaned_identity(db.pool(), &other.id, &orphan.id).await;
        assert!(matches!(err, Err(DatabaseError::NotFound { .. })));
        assert_eq!(list_orphaned_identities(db.pool(), &church.id).await.unwrap().len(), 1);
    }
}
