//! Prayer requests.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::enums::UserRole;
use crate::error::{DatabaseError, Result};
use crate::models::PrayerRequest;
use crate::pagination::{Page, PageRequest};
use crate::validation::{validate_required, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};

/// Create a prayer request.
pub async fn create_prayer_request(
    pool: &SqlitePool,
    church_id: &str,
    author_id: &str,
    title: &str,
    body: &str,
    is_private: bool,
) -> Result<PrayerRequest> {
    validate_required("title", title, MAX_NAME_LENGTH)?;
    validate_required("body", body, MAX_NOTES_LENGTH)?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO prayer_requests (id, church_id, author_id, title, body, is_private)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(church_id)
    .bind(author_id)
    .bind(title.trim())
    .bind(body.trim())
    .bind(is_private)
    .execute(pool)
    .await?;

    get_prayer_request(pool, &id).await
}

/// Get a prayer request by ID.
pub async fn get_prayer_request(pool: &SqlitePool, id: &str) -> Result<PrayerRequest> {
    sqlx::query_as::<_, PrayerRequest>(
        r#"
        SELECT id, church_id, author_id, title, body, is_private, answered, created_at
        FROM prayer_requests
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "PrayerRequest",
        id: id.to_string(),
    })
}

/// Requests visible to a viewer, newest first.
///
/// Private requests are shown only to their author and to pastoral roles.
pub async fn list_prayer_requests(
    pool: &SqlitePool,
    church_id: &str,
    viewer_id: &str,
    viewer_role: UserRole,
    page: PageRequest,
) -> Result<Page<PrayerRequest>> {
    let page = page.normalized();
    let rows = sqlx::query_as::<_, PrayerRequest>(
        r#"
        SELECT id, church_id, author_id, title, body, is_private, answered, created_at
        FROM prayer_requests
        WHERE church_id = ?
          AND (is_private = 0 OR author_id = ? OR ?)
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(church_id)
    .bind(viewer_id)
    .bind(viewer_role.is_pastoral())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::from_rows(rows, page))
}

/// Mark a request answered.
pub async fn mark_answered(pool: &SqlitePool, id: &str) -> Result<PrayerRequest> {
    let result = sqlx::query("UPDATE prayer_requests SET answered = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "PrayerRequest",
            id: id.to_string(),
        });
    }

    get_prayer_request(pool, id).await
}
