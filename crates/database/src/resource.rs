//! Resource library.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::Resource;
use crate::validation::{validate_max_length, validate_required, ValidationError, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};

/// Add a resource to the library.
pub async fn create_resource(
    pool: &SqlitePool,
    church_id: &str,
    created_by: &str,
    title: &str,
    description: Option<&str>,
    url: &str,
    category: Option<&str>,
) -> Result<Resource> {
    let url = url.trim();
    validate_required("title", title, MAX_NAME_LENGTH)?;
    validate_required("url", url, MAX_NOTES_LENGTH)?;
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ValidationError::UnknownValue {
            field: "url scheme".to_string(),
            value: url.to_string(),
        }
        .into());
    }
    if let Some(description) = description {
        validate_max_length("description", description, MAX_NOTES_LENGTH)?;
    }
    let category = category.map(str::trim).filter(|c| !c.is_empty()).unwrap_or("geral");
    validate_max_length("category", category, 60)?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO resources (id, church_id, title, description, url, category, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(church_id)
    .bind(title.trim())
    .bind(description)
    .bind(url)
    .bind(category)
    .bind(created_by)
    .execute(pool)
    .await?;

    get_resource(pool, &id).await
}

/// Get a resource by ID.
pub async fn get_resource(pool: &SqlitePool, id: &str) -> Result<Resource> {
    sqlx::query_as::<_, Resource>(
        r#"
        SELECT id, church_id, title, description, url, category, created_by, created_at
        FROM resources
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Resource",
        id: id.to_string(),
    })
}

/// Resources of a church, optionally one category.
pub async fn list_resources(pool: &SqlitePool, church_id: &str, category: Option<&str>) -> Result<Vec<Resource>> {
    let rows = sqlx::query_as::<_, Resource>(
        r#"
        SELECT id, church_id, title, description, url, category, created_by, created_at
        FROM resources
        WHERE church_id = ? AND (? IS NULL OR category = ?)
        ORDER BY category, title
        "#,
    )
    .bind(church_id)
    .bind(category)
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Distinct categories in use.
pub async fn list_categories(pool: &SqlitePool, church_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT category FROM resources WHERE church_id = ? ORDER BY category
        "#,
    )
    .bind(church_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a resource.
pub async fn delete_resource(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM resources WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Resource",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::UserRole;
    use crate::test_support::{seed_church, seed_profile, test_db};

    #[tokio::test]
    async fn test_library_by_category() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let pastor = seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;

        create_resource(db.pool(), &church.id, &pastor.id, "Estudo de Romanos", None, "https://example.org/romanos.pdf", Some("estudos"))
            .await
            .unwrap();
        let hymn = create_resource(db.pool(), &church.id, &pastor.id, "Hinário", None, "https://example.org/hinos", None)
            .await
            .unwrap();
        assert_eq!(hymn.category, "geral");

        let studies = list_resources(db.pool(), &church.id, Some("estudos")).await.unwrap();
        assert_eq!(studies.len(), 1);
        assert_eq!(list_resources(db.pool(), &church.id, None).await.unwrap().len(), 2);
        assert_eq!(list_categories(db.pool(), &church.id).await.unwrap(), vec!["estudos", "geral"]);

        delete_resource(db.pool(), &hymn.id).await.unwrap();
        assert_eq!(list_resources(db.pool(), &church.id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let pastor = seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let result = create_resource(db.pool(), &church.id, &pastor.id, "X", None, "ftp://x", None).await;
        assert!(matches!(result, Err(DatabaseError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_url_is_trimmed_before_checks() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let pastor = seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let resource = create_resource(
            db.pool(),
            &church.id,
            &pastor.id,
            "Estudo de Romanos",
            None,
            "  https://igreja.org/romanos.pdf ",
            None,
        )
        .await
        .unwrap();
        assert_eq!(resource.url, "https://igreja.org/romanos.pdf");
    }
}
