//! Follow-up reminders scheduled against an alert.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::alert::get_alert_for_user;
use crate::error::{DatabaseError, Result};
use crate::models::AlertFollowUp;
use crate::validation::{
    format_timestamp, parse_date, parse_time, validate_max_length, ValidationError,
    MAX_NOTES_LENGTH,
};

/// Combine a `YYYY-MM-DD` date and an `HH:MM` time.
pub fn scheduled_at(date: &str, time: &str) -> std::result::Result<NaiveDateTime, ValidationError> {
    let date = parse_date("date", date)?;
    let time = parse_time("time", time)?;
    Ok(date.and_time(time))
}

/// Schedule a follow-up on one of the user's own alerts.
///
/// `scheduled_for` must not be earlier than `now`.
pub async fn schedule_follow_up(
    pool: &SqlitePool,
    alert_id: &str,
    user_id: &str,
    scheduled_for: NaiveDateTime,
    notes: &str,
    now: NaiveDateTime,
) -> Result<AlertFollowUp> {
    if scheduled_for < now {
        return Err(ValidationError::InPast("scheduled_for".to_string()).into());
    }
    validate_max_length("notes", notes, MAX_NOTES_LENGTH)?;

    get_alert_for_user(pool, alert_id, user_id).await?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO alert_follow_ups (id, alert_id, created_by, scheduled_for, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(alert_id)
    .bind(user_id)
    .bind(format_timestamp(scheduled_for))
    .bind(notes.trim())
    .execute(pool)
    .await?;

    tracing::debug!(alert_id, user_id, %scheduled_for, "Scheduled alert follow-up");

    sqlx::query_as::<_, AlertFollowUp>(
        r#"
        SELECT id, alert_id, created_by, scheduled_for, notes, created_at
        FROM alert_follow_ups
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(pool)
    .await?
    .ok_or(DatabaseError::NotFound {
        entity: "AlertFollowUp",
        id,
    })
}

/// Follow-ups of an alert, soonest first.
pub async fn list_follow_ups(pool: &SqlitePool, alert_id: &str) -> Result<Vec<AlertFollowUp>> {
    let rows = sqlx::query_as::<_, AlertFollowUp>(
        r#"
        SELECT id, alert_id, created_by, scheduled_for, notes, created_at
        FROM alert_follow_ups
        WHERE alert_id = ?
        ORDER BY scheduled_for
        "#,
    )
    .bind(alert_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Follow-ups a user scheduled that fall within `[from, to)`.
pub async fn list_due_for_user(
    pool: &SqlitePool,
    user_id: &str,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<AlertFollowUp>> {
    let rows = sqlx::query_as::<_, AlertFollowUp>(
        r#"
        SELECT id, alert_id, created_by, scheduled_for, notes, created_at
        FROM alert_follow_ups
        WHERE created_by = ? AND scheduled_for >= ? AND scheduled_for < ?
        ORDER BY scheduled_for
        "#,
    )
    .bind(user_id)
    .bind(format_timestamp(from))
    .bind(format_timestamp(to))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{create_alert, NewAlert};
    use crate::enums::{AlertPriority, AlertType, UserRole};
    use crate::test_support::{seed_church, seed_profile, test_db};
    use chrono::Duration;

    fn now() -> NaiveDateTime {
        scheduled_at("2026-10-15", "10:00").unwrap()
    }

    async fn setup() -> (crate::Database, String, String) {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let pastor = seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let alert = create_alert(
            db.pool(),
            db.changes(),
            &NewAlert {
                church_id: church.id.clone(),
                target_user_id: pastor.id.clone(),
                alert_type: AlertType::NovoConvertido,
                priority: AlertPriority::Media,
                title: "Novo convertido".to_string(),
                message: "Acompanhar".to_string(),
                related_member_id: None,
                related_group_id: None,
            },
        )
        .await
        .unwrap();
        (db, pastor.id, alert.id)
    }

    #[tokio::test]
    async fn test_schedule_future() {
        let (db, pastor, alert) = setup().await;
        let when = scheduled_at("2026-10-20", "19:30").unwrap();

        let follow_up = schedule_follow_up(db.pool(), &alert, &pastor, when, "Ligar após o culto", now())
            .await
            .unwrap();
        assert_eq!(follow_up.scheduled_for, "2026-10-20 19:30:00");

        let listed = list_follow_ups(db.pool(), &alert).await.unwrap();
        assert_eq!(listed.len(), 1);

        let due = list_due_for_user(db.pool(), &pastor, now(), now() + Duration::days(7))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_past_date_rejected() {
        let (db, pastor, alert) = setup().await;
        let when = now() - Duration::minutes(1);

        let result = schedule_follow_up(db.pool(), &alert, &pastor, when, "", now()).await;
        assert!(matches!(
            result,
            Err(DatabaseError::Invalid(ValidationError::InPast(_)))
        ));
        assert!(list_follow_ups(db.pool(), &alert).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_users_alert_rejected() {
        let (db, _pastor, alert) = setup().await;
        let church = seed_church(&db).await;
        let stranger = seed_profile(&db, &church.id, "Outro", UserRole::Lider).await;
        let when = now() + Duration::days(1);

        let result = schedule_follow_up(db.pool(), &alert, &stranger.id, when, "", now()).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn test_scheduled_at_rejects_bad_input() {
        assert!(scheduled_at("2026-13-01", "10:00").is_err());
        assert!(scheduled_at("2026-10-01", "10h").is_err());
    }
}
