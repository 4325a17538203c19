//! Pastoral alerts addressed to one user.
//!
//! Writes publish on the [`ChangeFeed`] so open alert streams can re-query.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::changes::{ChangeFeed, ChangeKind};
use crate::enums::{AlertPriority, AlertType};
use crate::error::{DatabaseError, Result};
use crate::models::Alert;
use crate::pagination::{Page, PageRequest};

const SELECT_ALERT: &str = r#"
    SELECT id, church_id, target_user_id, alert_type, priority, title, message,
           related_member_id, related_group_id, is_read, created_at, read_at
    FROM pastoral_alerts
"#;

/// Fields for a new alert.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub church_id: String,
    pub target_user_id: String,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub related_member_id: Option<String>,
    pub related_group_id: Option<String>,
}

/// Insert an alert and notify its recipient's subscribers.
pub async fn create_alert(pool: &SqlitePool, changes: &ChangeFeed, alert: &NewAlert) -> Result<Alert> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO pastoral_alerts (
            id, church_id, target_user_id, alert_type, priority, title, message,
            related_member_id, related_group_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&alert.church_id)
    .bind(&alert.target_user_id)
    .bind(alert.alert_type)
    .bind(alert.priority)
    .bind(&alert.title)
    .bind(&alert.message)
    .bind(&alert.related_member_id)
    .bind(&alert.related_group_id)
    .execute(pool)
    .await?;

    changes.publish(&alert.target_user_id, ChangeKind::Inserted);
    get_alert(pool, &id).await
}

/// Get an alert by ID.
pub async fn get_alert(pool: &SqlitePool, id: &str) -> Result<Alert> {
    let sql = format!("{SELECT_ALERT} WHERE id = ?");
    sqlx::query_as::<_, Alert>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Alert",
            id: id.to_string(),
        })
}

/// Get an alert only if it is addressed to `user_id`.
pub async fn get_alert_for_user(pool: &SqlitePool, id: &str, user_id: &str) -> Result<Alert> {
    let sql = format!("{SELECT_ALERT} WHERE id = ? AND target_user_id = ?");
    sqlx::query_as::<_, Alert>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Alert",
            id: id.to_string(),
        })
}

/// A page of a user's alerts, newest first.
pub async fn list_alerts(
    pool: &SqlitePool,
    user_id: &str,
    unread_only: bool,
    page: PageRequest,
) -> Result<Page<Alert>> {
    let page = page.normalized();
    let sql = format!(
        r#"{SELECT_ALERT}
        WHERE target_user_id = ? AND (? = 0 OR is_read = 0)
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#
    );

    let rows = sqlx::query_as::<_, Alert>(&sql)
        .bind(user_id)
        .bind(unread_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok(Page::from_rows(rows, page))
}

/// The newest unread alerts of a user.
pub async fn list_unread(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<Alert>> {
    let sql = format!(
        r#"{SELECT_ALERT}
        WHERE target_user_id = ? AND is_read = 0
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?
        "#
    );

    let alerts = sqlx::query_as::<_, Alert>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(alerts)
}

/// Count a user's unread alerts.
pub async fn unread_count(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM pastoral_alerts
        WHERE target_user_id = ? AND is_read = 0
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Mark one alert read. Only the recipient may do so.
///
/// Marking an already-read alert is a no-op.
pub async fn mark_read(pool: &SqlitePool, changes: &ChangeFeed, id: &str, user_id: &str) -> Result<Alert> {
    let existing = get_alert_for_user(pool, id, user_id).await?;
    if existing.is_read {
        return Ok(existing);
    }

    sqlx::query(
        r#"
        UPDATE pastoral_alerts
        SET is_read = 1, read_at = datetime('now')
        WHERE id = ? AND target_user_id = ? AND is_read = 0
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    changes.publish(user_id, ChangeKind::Updated);
    get_alert(pool, id).await
}

/// Mark every unread alert of a user read, returning how many changed.
pub async fn mark_all_read(pool: &SqlitePool, changes: &ChangeFeed, user_id: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE pastoral_alerts
        SET is_read = 1, read_at = datetime('now')
        WHERE target_user_id = ? AND is_read = 0
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        changes.publish(user_id, ChangeKind::Updated);
    }

    Ok(result.rows_affected())
}

/// Whether an unread alert of this kind already exists for the same
/// target and subject.
pub async fn has_open_alert(
    pool: &SqlitePool,
    alert_type: AlertType,
    target_user_id: &str,
    related_member_id: Option<&str>,
    related_group_id: Option<&str>,
) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM pastoral_alerts
        WHERE alert_type = ?
          AND target_user_id = ?
          AND related_member_id IS ?
          AND related_group_id IS ?
          AND is_read = 0
        LIMIT 1
        "#,
    )
    .bind(alert_type)
    .bind(target_user_id)
    .bind(related_member_id)
    .bind(related_group_id)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::UserRole;
    use crate::test_support::{seed_church, seed_profile, test_db};

    fn new_alert(church_id: &str, target: &str, n: usize) -> NewAlert {
        NewAlert {
            church_id: church_id.to_string(),
            target_user_id: target.to_string(),
            alert_type: AlertType::EncontroAtrasado,
            priority: AlertPriority::Baixa,
            title: format!("Alerta {}", n),
            message: "Encontro atrasado".to_string(),
            related_member_id: None,
            related_group_id: None,
        }
    }

    #[tokio::test]
    async fn test_mark_read_leaves_unread_list() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;

        let a = create_alert(db.pool(), db.changes(), &new_alert(&church.id, &leader.id, 1))
            .await
            .unwrap();
        create_alert(db.pool(), db.changes(), &new_alert(&church.id, &leader.id, 2))
            .await
            .unwrap();
        assert_eq!(unread_count(db.pool(), &leader.id).await.unwrap(), 2);

        let read = mark_read(db.pool(), db.changes(), &a.id, &leader.id).await.unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        let unread = list_unread(db.pool(), &leader.id, 10).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert!(unread.iter().all(|alert| alert.id != a.id));

        // Persisted: a fresh read still sees it as read.
        assert!(get_alert(db.pool(), &a.id).await.unwrap().is_read);
        assert_eq!(unread_count(db.pool(), &leader.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_only_recipient_marks_read() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let other = seed_profile(&db, &church.id, "Bruno", UserRole::Lider).await;

        let a = create_alert(db.pool(), db.changes(), &new_alert(&church.id, &leader.id, 1))
            .await
            .unwrap();
        let result = mark_read(db.pool(), db.changes(), &a.id, &other.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        assert!(!get_alert(db.pool(), &a.id).await.unwrap().is_read);
    }

    #[tokio::test]
    async fn test_pagination_page_size_five() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;

        for n in 0..12 {
            create_alert(db.pool(), db.changes(), &new_alert(&church.id, &leader.id, n))
                .await
                .unwrap();
        }

        let p0 = list_alerts(db.pool(), &leader.id, false, PageRequest::new(0, 5)).await.unwrap();
        let p1 = list_alerts(db.pool(), &leader.id, false, PageRequest::new(1, 5)).await.unwrap();
        let p2 = list_alerts(db.pool(), &leader.id, false, PageRequest::new(2, 5)).await.unwrap();

        assert_eq!((p0.items.len(), p0.has_more), (5, true));
        assert_eq!((p1.items.len(), p1.has_more), (5, true));
        assert_eq!((p2.items.len(), p2.has_more), (2, false));

        // Newest first.
        assert_eq!(p0.items[0].title, "Alerta 11");
    }

    #[tokio::test]
    async fn test_mark_all_read_and_changes() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let mut rx = db.changes().subscribe();

        create_alert(db.pool(), db.changes(), &new_alert(&church.id, &leader.id, 1))
            .await
            .unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Inserted);

        assert_eq!(mark_all_read(db.pool(), db.changes(), &leader.id).await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Updated);

        assert_eq!(mark_all_read(db.pool(), db.changes(), &leader.id).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_has_open_alert_matches_subject() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let member = seed_profile(&db, &church.id, "Davi", UserRole::Membro).await;

        let mut alert = new_alert(&church.id, &leader.id, 1);
        alert.alert_type = AlertType::DiscipuloAusente;
        alert.related_member_id = Some(member.id.clone());
        create_alert(db.pool(), db.changes(), &alert).await.unwrap();

        assert!(has_open_alert(
            db.pool(),
            AlertType::DiscipuloAusente,
            &leader.id,
            Some(&member.id),
            None
        )
        .await
        .unwrap());
        assert!(!has_open_alert(db.pool(), AlertType::DiscipuloAusente, &leader.id, None, None)
            .await
            .unwrap());
    }
}
