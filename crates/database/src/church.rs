//! Church CRUD operations.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::Church;
use crate::validation::{validate_required, MAX_NAME_LENGTH};

/// Create a new church.
pub async fn create_church(pool: &SqlitePool, name: &str, city: Option<&str>) -> Result<Church> {
    validate_required("name", name, MAX_NAME_LENGTH)?;
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO churches (id, name, city)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(name.trim())
    .bind(city)
    .execute(pool)
    .await?;

    get_church(pool, &id).await
}

/// Get a church by ID.
pub async fn get_church(pool: &SqlitePool, id: &str) -> Result<Church> {
    sqlx::query_as::<_, Church>(
        r#"
        SELECT id, name, city, created_at
        FROM churches
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Church",
        id: id.to_string(),
    })
}

/// List all churches.
pub async fn list_churches(pool: &SqlitePool) -> Result<Vec<Church>> {
    let churches = sqlx::query_as::<_, Church>(
        r#"
        SELECT id, name, city, created_at
        FROM churches
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(churches)
}
