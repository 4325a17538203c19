//! Announcements, optionally targeted at one role.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::enums::UserRole;
use crate::error::{DatabaseError, Result};
use crate::models::Announcement;
use crate::validation::{format_timestamp, validate_required, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};

/// Publish an announcement. `audience: None` targets everyone.
pub async fn create_announcement(
    pool: &SqlitePool,
    church_id: &str,
    author_id: &str,
    title: &str,
    body: &str,
    audience: Option<UserRole>,
    expires_at: Option<NaiveDateTime>,
) -> Result<Announcement> {
    validate_required("title", title, MAX_NAME_LENGTH)?;
    validate_required("body", body, MAX_NOTES_LENGTH)?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO announcements (id, church_id, author_id, title, body, audience, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(church_id)
    .bind(author_id)
    .bind(title.trim())
    .bind(body.trim())
    .bind(audience)
    .bind(expires_at.map(format_timestamp))
    .execute(pool)
    .await?;

    tracing::info!(announcement_id = %id, church_id, audience = ?audience, "Announcement published");

    get_announcement(pool, &id).await
}

/// Get an announcement by ID.
pub async fn get_announcement(pool: &SqlitePool, id: &str) -> Result<Announcement> {
    sqlx::query_as::<_, Announcement>(
        r#"
        SELECT id, church_id, author_id, title, body, audience, published_at, expires_at
        FROM announcements
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Announcement",
        id: id.to_string(),
    })
}

/// Unexpired announcements a viewer with `role` should see, newest first.
pub async fn list_current(
    pool: &SqlitePool,
    church_id: &str,
    role: UserRole,
    now: NaiveDateTime,
) -> Result<Vec<Announcement>> {
    let rows = sqlx::query_as::<_, Announcement>(
        r#"
        SELECT id, church_id, author_id, title, body, audience, published_at, expires_at
        FROM announcements
        WHERE church_id = ?
          AND (audience IS NULL OR audience = ?)
          AND (expires_at IS NULL OR expires_at > ?)
        ORDER BY published_at DESC, rowid DESC
        "#,
    )
    .bind(church_id)
    .bind(role)
    .bind(format_timestamp(now))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete an announcement.
pub async fn delete_announcement(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Announcement",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_church, seed_profile, test_db};
    use crate::validation::parse_timestamp;

    #[tokio::test]
    async fn test_audience_and_expiry() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let pastor = seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let now = parse_timestamp("now", "2026-10-15 12:00:00").unwrap();
        let yesterday = parse_timestamp("t", "2026-10-14 12:00:00").unwrap();

        create_announcement(db.pool(), &church.id, &pastor.id, "Culto", "Domingo 18h", None, None)
            .await
            .unwrap();
        create_announcement(
            db.pool(),
            &church.id,
            &pastor.id,
            "Reunião de líderes",
            "Sábado 9h",
            Some(UserRole::Lider),
            None,
        )
        .await
        .unwrap();
        create_announcement(
            db.pool(),
            &church.id,
            &pastor.id,
            "Retiro",
            "Inscrições encerradas",
            None,
            Some(yesterday),
        )
        .await
        .unwrap();

        let members = list_current(db.pool(), &church.id, UserRole::Membro, now).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].title, "Culto");

        let leaders = list_current(db.pool(), &church.id, UserRole::Lider, now).await.unwrap();
        assert_eq!(leaders.len(), 2);
    }
}
