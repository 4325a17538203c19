//! Discipleship plans, their ordered steps, and per-user progress.
//!
//! Steps are numbered `1..=n` with no gaps. A user's `current_step` counts
//! completed steps and always stays within `0..=n`; reaching `n` completes
//! the plan.

use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::enums::ProgressStatus;
use crate::error::{DatabaseError, Result};
use crate::models::{Plan, PlanProgress, PlanStep};
use crate::validation::{validate_max_length, validate_required, ValidationError, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};

/// Offset used to move steps out of the way while renumbering.
const RENUMBER_OFFSET: i64 = 1_000_000;

/// Create a plan.
pub async fn create_plan(
    pool: &SqlitePool,
    church_id: &str,
    title: &str,
    description: Option<&str>,
    created_by: &str,
) -> Result<Plan> {
    validate_required("title", title, MAX_NAME_LENGTH)?;
    if let Some(description) = description {
        validate_max_length("description", description, MAX_NOTES_LENGTH)?;
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO plans (id, church_id, title, description, created_by)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(church_id)
    .bind(title.trim())
    .bind(description)
    .bind(created_by)
    .execute(pool)
    .await?;

    get_plan(pool, &id).await
}

/// Get a plan by ID.
pub async fn get_plan(pool: &SqlitePool, id: &str) -> Result<Plan> {
    sqlx::query_as::<_, Plan>(
        r#"
        SELECT id, church_id, title, description, created_by, created_at
        FROM plans
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Plan",
        id: id.to_string(),
    })
}

/// List the plans of a church.
pub async fn list_plans(pool: &SqlitePool, church_id: &str) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>(
        r#"
        SELECT id, church_id, title, description, created_by, created_at
        FROM plans
        WHERE church_id = ?
        ORDER BY title
        "#,
    )
    .bind(church_id)
    .fetch_all(pool)
    .await?;

    Ok(plans)
}

/// Append a step at the end of a plan.
pub async fn add_step(
    pool: &SqlitePool,
    plan_id: &str,
    title: &str,
    content: Option<&str>,
) -> Result<PlanStep> {
    validate_required("title", title, MAX_NAME_LENGTH)?;
    get_plan(pool, plan_id).await?;

    let mut tx = pool.begin().await?;
    let next = steps_count_tx(&mut tx, plan_id).await? + 1;
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO plan_steps (id, plan_id, step_order, title, content)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(plan_id)
    .bind(next)
    .bind(title.trim())
    .bind(content)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(PlanStep {
        id,
        plan_id: plan_id.to_string(),
        step_order: next,
        title: title.trim().to_string(),
        content: content.map(str::to_string),
    })
}

/// Steps of a plan in order.
pub async fn list_steps(pool: &SqlitePool, plan_id: &str) -> Result<Vec<PlanStep>> {
    let steps = sqlx::query_as::<_, PlanStep>(
        r#"
        SELECT id, plan_id, step_order, title, content
        FROM plan_steps
        WHERE plan_id = ?
        ORDER BY step_order
        "#,
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await?;

    Ok(steps)
}

/// Number of steps in a plan.
pub async fn steps_count(pool: &SqlitePool, plan_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM plan_steps WHERE plan_id = ?
        "#,
    )
    .bind(plan_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

async fn steps_count_tx(tx: &mut Transaction<'_, Sqlite>, plan_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM plan_steps WHERE plan_id = ?
        "#,
    )
    .bind(plan_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(count)
}

/// Remove a step, close the gap it leaves, and pull any progress cursor
/// at or past the new end onto it (completing open progress there).
pub async fn remove_step(pool: &SqlitePool, step_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    let step = sqlx::query_as::<_, PlanStep>(
        r#"
        SELECT id, plan_id, step_order, title, content
        FROM plan_steps
        WHERE id = ?
        "#,
    )
    .bind(step_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "PlanStep",
        id: step_id.to_string(),
    })?;

    sqlx::query("DELETE FROM plan_steps WHERE id = ?")
        .bind(step_id)
        .execute(&mut *tx)
        .await?;

    // Two passes so the (plan_id, step_order) uniqueness holds row by row.
    sqlx::query(
        r#"
        UPDATE plan_steps
        SET step_order = step_order + ?
        WHERE plan_id = ? AND step_order > ?
        "#,
    )
    .bind(RENUMBER_OFFSET)
    .bind(&step.plan_id)
    .bind(step.step_order)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE plan_steps
        SET step_order = step_order - ?
        WHERE plan_id = ? AND step_order > ?
        "#,
    )
    .bind(RENUMBER_OFFSET + 1)
    .bind(&step.plan_id)
    .bind(RENUMBER_OFFSET)
    .execute(&mut *tx)
    .await?;

    let remaining = steps_count_tx(&mut tx, &step.plan_id).await?;
    sqlx::query(
        r#"
        UPDATE plan_progress
        SET current_step = MIN(current_step, ?),
            status = CASE WHEN status = 'em_progresso' AND ? > 0 THEN 'concluido' ELSE status END,
            completed_at = CASE WHEN status = 'em_progresso' AND ? > 0 THEN datetime('now') ELSE completed_at END,
            updated_at = datetime('now')
        WHERE plan_id = ?
          AND current_step >= ?
          AND (current_step > ? OR status = 'em_progresso')
        "#,
    )
    .bind(remaining)
    .bind(remaining)
    .bind(remaining)
    .bind(&step.plan_id)
    .bind(remaining)
    .bind(remaining)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Status implied by a cursor position on an open plan.
pub fn status_for_step(current_step: i64, steps_count: i64) -> ProgressStatus {
    if steps_count > 0 && current_step >= steps_count {
        ProgressStatus::Concluido
    } else {
        ProgressStatus::EmProgresso
    }
}

/// A user's progress on a plan, if any was recorded.
pub async fn get_progress(pool: &SqlitePool, user_id: &str, plan_id: &str) -> Result<Option<PlanProgress>> {
    let progress = sqlx::query_as::<_, PlanProgress>(
        r#"
        SELECT user_id, plan_id, current_step, status, started_at, completed_at, updated_at
        FROM plan_progress
        WHERE user_id = ? AND plan_id = ?
        "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .fetch_optional(pool)
    .await?;

    Ok(progress)
}

async fn get_progress_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    plan_id: &str,
) -> Result<Option<PlanProgress>> {
    let progress = sqlx::query_as::<_, PlanProgress>(
        r#"
        SELECT user_id, plan_id, current_step, status, started_at, completed_at, updated_at
        FROM plan_progress
        WHERE user_id = ? AND plan_id = ?
        "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(progress)
}

async fn write_cursor(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    plan_id: &str,
    current_step: i64,
    status: ProgressStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO plan_progress (user_id, plan_id, current_step, status, started_at, completed_at)
        VALUES (?, ?, ?, ?, datetime('now'), CASE WHEN ? = 'concluido' THEN datetime('now') END)
        ON CONFLICT(user_id, plan_id) DO UPDATE SET
            current_step = excluded.current_step,
            status = excluded.status,
            started_at = COALESCE(plan_progress.started_at, excluded.started_at),
            completed_at = excluded.completed_at,
            updated_at = datetime('now')
        "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .bind(current_step)
    .bind(status)
    .bind(status)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Start (or restart) a plan at step 0.
///
/// A plan already in progress is returned unchanged.
pub async fn start_plan(pool: &SqlitePool, user_id: &str, plan_id: &str) -> Result<PlanProgress> {
    get_plan(pool, plan_id).await?;

    let mut tx = pool.begin().await?;
    if steps_count_tx(&mut tx, plan_id).await? == 0 {
        return Err(DatabaseError::Conflict(format!("plan {} has no steps", plan_id)));
    }

    let existing = get_progress_tx(&mut tx, user_id, plan_id).await?;
    if !matches!(&existing, Some(p) if p.status == ProgressStatus::EmProgresso) {
        write_cursor(&mut tx, user_id, plan_id, 0, ProgressStatus::EmProgresso).await?;
    }
    tx.commit().await?;

    tracing::debug!(user_id, plan_id, "Plan started");
    require_progress(pool, user_id, plan_id).await
}

/// Move the cursor forward one step, completing the plan on the last one.
pub async fn advance(pool: &SqlitePool, user_id: &str, plan_id: &str) -> Result<PlanProgress> {
    let mut tx = pool.begin().await?;
    let count = steps_count_tx(&mut tx, plan_id).await?;
    let progress = get_progress_tx(&mut tx, user_id, plan_id).await?;

    let current = match &progress {
        Some(p) if p.status.is_closed() => {
            return Err(DatabaseError::Conflict(format!(
                "progress on plan {} is {}",
                plan_id, p.status
            )));
        }
        Some(p) if p.status == ProgressStatus::Concluido => {
            tx.rollback().await?;
            return require_progress(pool, user_id, plan_id).await;
        }
        Some(p) => p.current_step,
        None => 0,
    };

    if count == 0 {
        return Err(DatabaseError::Conflict(format!("plan {} has no steps", plan_id)));
    }

    let next = (current + 1).min(count);
    write_cursor(&mut tx, user_id, plan_id, next, status_for_step(next, count)).await?;
    tx.commit().await?;

    require_progress(pool, user_id, plan_id).await
}

/// Put the cursor at an explicit step within `0..=steps_count`.
pub async fn set_step(pool: &SqlitePool, user_id: &str, plan_id: &str, step: i64) -> Result<PlanProgress> {
    let mut tx = pool.begin().await?;
    let count = steps_count_tx(&mut tx, plan_id).await?;

    if step < 0 || step > count {
        return Err(ValidationError::OutOfRange {
            field: "current_step".to_string(),
            min: 0,
            max: count,
            actual: step,
        }
        .into());
    }

    if let Some(p) = get_progress_tx(&mut tx, user_id, plan_id).await? {
        if p.status.is_closed() {
            return Err(DatabaseError::Conflict(format!(
                "progress on plan {} is {}",
                plan_id, p.status
            )));
        }
    }

    write_cursor(&mut tx, user_id, plan_id, step, status_for_step(step, count)).await?;
    tx.commit().await?;

    require_progress(pool, user_id, plan_id).await
}

/// Archive a user's progress on a plan.
pub async fn archive(pool: &SqlitePool, user_id: &str, plan_id: &str) -> Result<PlanProgress> {
    close(pool, user_id, plan_id, ProgressStatus::Arquivado).await
}

/// Remove a plan from a user's list. The row is kept with status `removido`.
pub async fn remove(pool: &SqlitePool, user_id: &str, plan_id: &str) -> Result<PlanProgress> {
    close(pool, user_id, plan_id, ProgressStatus::Removido).await
}

async fn close(pool: &SqlitePool, user_id: &str, plan_id: &str, status: ProgressStatus) -> Result<PlanProgress> {
    let result = sqlx::query(
        r#"
        UPDATE plan_progress
        SET status = ?, updated_at = datetime('now')
        WHERE user_id = ? AND plan_id = ?
        "#,
    )
    .bind(status)
    .bind(user_id)
    .bind(plan_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(progress_not_found(user_id, plan_id));
    }

    require_progress(pool, user_id, plan_id).await
}

/// Every plan a user has touched, except removed ones.
pub async fn list_progress_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<PlanProgress>> {
    let rows = sqlx::query_as::<_, PlanProgress>(
        r#"
        SELECT user_id, plan_id, current_step, status, started_at, completed_at, updated_at
        FROM plan_progress
        WHERE user_id = ? AND status <> 'removido'
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

async fn require_progress(pool: &SqlitePool, user_id: &str, plan_id: &str) -> Result<PlanProgress> {
    get_progress(pool, user_id, plan_id)
        .await?
        .ok_or_else(|| progress_not_found(user_id, plan_id))
}

fn progress_not_found(user_id: &str, plan_id: &str) -> DatabaseError {
    DatabaseError::NotFound {
        entity: "PlanProgress",
        id: format!("{}/{}", user_id, plan_id),
    }
}
