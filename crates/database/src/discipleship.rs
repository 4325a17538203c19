//! Discipleship: leader-disciple pairings, their encontros and activities.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::enums::ActivityType;
use crate::error::{DatabaseError, Result};
use crate::models::{Activity, Discipulado, Encontro};
use crate::validation::{
    parse_date, validate_max_length, validate_optional_date, validate_required, MAX_NOTES_LENGTH,
};

/// Pair a disciple with a leader. A disciple has at most one active pairing.
pub async fn start_discipulado(
    pool: &SqlitePool,
    church_id: &str,
    leader_id: &str,
    disciple_id: &str,
    notes: Option<&str>,
) -> Result<Discipulado> {
    if leader_id == disciple_id {
        return Err(DatabaseError::Conflict(
            "a leader cannot disciple themselves".to_string(),
        ));
    }
    if let Some(notes) = notes {
        validate_max_length("notes", notes, MAX_NOTES_LENGTH)?;
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO discipulados (id, church_id, leader_id, disciple_id, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(church_id)
    .bind(leader_id)
    .bind(disciple_id)
    .bind(notes)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Active discipulado", disciple_id))?;

    tracing::info!(discipulado_id = %id, leader_id, disciple_id, "Discipulado started");
    get_discipulado(pool, &id).await
}

/// Get a discipulado by ID.
pub async fn get_discipulado(pool: &SqlitePool, id: &str) -> Result<Discipulado> {
    sqlx::query_as::<_, Discipulado>(
        r#"
        SELECT id, church_id, leader_id, disciple_id, started_at, active, notes
        FROM discipulados
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Discipulado",
        id: id.to_string(),
    })
}

/// End a pairing. It stays on record as inactive.
pub async fn end_discipulado(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE discipulados SET active = 0 WHERE id = ? AND active = 1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Active discipulado",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Pairings led by a leader, active first.
pub async fn list_for_leader(pool: &SqlitePool, leader_id: &str) -> Result<Vec<Discipulado>> {
    let rows = sqlx::query_as::<_, Discipulado>(
        r#"
        SELECT id, church_id, leader_id, disciple_id, started_at, active, notes
        FROM discipulados
        WHERE leader_id = ?
        ORDER BY active DESC, started_at DESC
        "#,
    )
    .bind(leader_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Active pairing of a disciple, if any.
pub async fn active_for_disciple(pool: &SqlitePool, disciple_id: &str) -> Result<Option<Discipulado>> {
    let row = sqlx::query_as::<_, Discipulado>(
        r#"
        SELECT id, church_id, leader_id, disciple_id, started_at, active, notes
        FROM discipulados
        WHERE disciple_id = ? AND active = 1
        "#,
    )
    .bind(disciple_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Log a one-on-one meeting.
pub async fn log_encontro(
    pool: &SqlitePool,
    discipulado_id: &str,
    met_on: &str,
    topic: Option<&str>,
    notes: Option<&str>,
) -> Result<Encontro> {
    parse_date("met_on", met_on)?;
    if let Some(notes) = notes {
        validate_max_length("notes", notes, MAX_NOTES_LENGTH)?;
    }

    let discipulado = get_discipulado(pool, discipulado_id).await?;
    if !discipulado.active {
        return Err(DatabaseError::Conflict(format!(
            "discipulado {} has ended",
            discipulado_id
        )));
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO encontros (id, discipulado_id, met_on, topic, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(discipulado_id)
    .bind(met_on.trim())
    .bind(topic)
    .bind(notes)
    .execute(pool)
    .await?;

    let encontro = sqlx::query_as::<_, Encontro>(
        r#"
        SELECT id, discipulado_id, met_on, topic, notes, created_at
        FROM encontros
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;

    Ok(encontro)
}

/// Encontros of a pairing, most recent first.
pub async fn list_encontros(pool: &SqlitePool, discipulado_id: &str) -> Result<Vec<Encontro>> {
    let rows = sqlx::query_as::<_, Encontro>(
        r#"
        SELECT id, discipulado_id, met_on, topic, notes, created_at
        FROM encontros
        WHERE discipulado_id = ?
        ORDER BY met_on DESC, rowid DESC
        "#,
    )
    .bind(discipulado_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Assign an activity within a pairing.
pub async fn add_activity(
    pool: &SqlitePool,
    discipulado_id: &str,
    activity_type: ActivityType,
    description: &str,
    due_date: Option<&str>,
) -> Result<Activity> {
    let due_date = due_date.map(str::trim).filter(|d| !d.is_empty());
    validate_required("description", description, MAX_NOTES_LENGTH)?;
    validate_optional_date("due_date", due_date)?;
    get_discipulado(pool, discipulado_id).await?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO activities (id, discipulado_id, activity_type, description, due_date)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(discipulado_id)
    .bind(activity_type)
    .bind(description.trim())
    .bind(due_date)
    .execute(pool)
    .await?;

    get_activity(pool, &id).await
}

/// Get an activity by ID.
pub async fn get_activity(pool: &SqlitePool, id: &str) -> Result<Activity> {
    sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, discipulado_id, activity_type, description, due_date, completed, created_at
        FROM activities
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Activity",
        id: id.to_string(),
    })
}

/// Mark an activity done (or not).
pub async fn set_activity_completed(pool: &SqlitePool, id: &str, completed: bool) -> Result<Activity> {
    let result = sqlx::query("UPDATE activities SET completed = ? WHERE id = ?")
        .bind(completed)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Activity",
            id: id.to_string(),
        });
    }

    get_activity(pool, id).await
}

/// Activities of a pairing, open ones first.
pub async fn list_activities(pool: &SqlitePool, discipulado_id: &str) -> Result<Vec<Activity>> {
    let rows = sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, discipulado_id, activity_type, description, due_date, completed, created_at
        FROM activities
        WHERE discipulado_id = ?
        ORDER BY completed, due_date IS NULL, due_date, created_at
        "#,
    )
    .bind(discipulado_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::UserRole;
    use crate::test_support::{seed_church, seed_profile, test_db};

    #[tokio::test]
    async fn test_one_active_pairing_per_disciple() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let lia = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let bruno = seed_profile(&db, &church.id, "Bruno", UserRole::Lider).await;
        let ana = seed_profile(&db, &church.id, "Ana", UserRole::Membro).await;

        let first = start_discipulado(db.pool(), &church.id, &lia.id, &ana.id, None)
            .await
            .unwrap();
        let dup = start_discipulado(db.pool(), &church.id, &bruno.id, &ana.id, None).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));

        end_discipulado(db.pool(), &first.id).await.unwrap();
        assert!(active_for_disciple(db.pool(), &ana.id).await.unwrap().is_none());

        let second = start_discipulado(db.pool(), &church.id, &bruno.id, &ana.id, None)
            .await
            .unwrap();
        assert_eq!(
            active_for_disciple(db.pool(), &ana.id).await.unwrap().unwrap().id,
            second.id
        );
    }

    #[tokio::test]
    async fn test_self_discipleship_rejected() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let lia = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let result = start_discipulado(db.pool(), &church.id, &lia.id, &lia.id, None).await;
        assert!(matches!(result, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_encontros_and_activities() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let lia = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let ana = seed_profile(&db, &church.id, "Ana", UserRole::Membro).await;
        let d = start_discipulado(db.pool(), &church.id, &lia.id, &ana.id, Some("Novo convertido"))
            .await
            .unwrap();

        log_encontro(db.pool(), &d.id, "2026-10-01", Some("Oração"), None).await.unwrap();
        log_encontro(db.pool(), &d.id, "2026-10-08", Some("Palavra"), None).await.unwrap();
        let encontros = list_encontros(db.pool(), &d.id).await.unwrap();
        assert_eq!(encontros[0].met_on, "2026-10-08");

        let reading = add_activity(
            db.pool(),
            &d.id,
            ActivityType::LeituraBiblica,
            "Ler o evangelho de João",
            Some("2026-10-20"),
        )
        .await
        .unwrap();
        add_activity(db.pool(), &d.id, ActivityType::Oracao, "Orar pela família", None)
            .await
            .unwrap();

        let done = set_activity_completed(db.pool(), &reading.id, true).await.unwrap();
        assert!(done.completed);

        let activities = list_activities(db.pool(), &d.id).await.unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].activity_type, ActivityType::Oracao);

        end_discipulado(db.pool(), &d.id).await.unwrap();
        let late = log_encontro(db.pool(), &d.id, "2026-10-15", None, None).await;
        assert!(matches!(late, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_activity_due_date_is_trimmed() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let lia = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let ana = seed_profile(&db, &church.id, "Ana", UserRole::Membro).await;
        let d = start_discipulado(db.pool(), &church.id, &lia.id, &ana.id, None)
            .await
            .unwrap();

        let fasting = add_activity(db.pool(), &d.id, ActivityType::Jejum, "Jejum de Daniel", Some(" 2026-10-20 "))
            .await
            .unwrap();
        assert_eq!(fasting.due_date.as_deref(), Some("2026-10-20"));

        let blank = add_activity(db.pool(), &d.id, ActivityType::Meta, "Convidar um amigo", Some("  "))
            .await
            .unwrap();
        assert_eq!(blank.due_date, None);
    }
}
