//! Role assignments.

use sqlx::SqlitePool;

use crate::enums::UserRole;
use crate::error::{DatabaseError, Result};
use crate::models::RoleAssignment;

/// Grant a role to a user.
pub async fn assign_role(pool: &SqlitePool, user_id: &str, role: UserRole) -> Result<RoleAssignment> {
    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role)
        VALUES (?, ?)
        "#,
    )
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "RoleAssignment", format!("{}/{}", user_id, role)))?;

    let assignment = sqlx::query_as::<_, RoleAssignment>(
        r#"
        SELECT user_id, role, created_at
        FROM user_roles
        WHERE user_id = ? AND role = ?
        "#,
    )
    .bind(user_id)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(assignment)
}

/// Withdraw a role from a user.
pub async fn revoke_role(pool: &SqlitePool, user_id: &str, role: UserRole) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM user_roles
        WHERE user_id = ? AND role = ?
        "#,
    )
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "RoleAssignment",
            id: format!("{}/{}", user_id, role),
        });
    }

    Ok(())
}

/// All roles assigned to a user.
pub async fn roles_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<UserRole>> {
    let roles = sqlx::query_scalar::<_, UserRole>(
        r#"
        SELECT role
        FROM user_roles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(roles)
}

/// Highest-ranked role among the assignments, if any.
pub async fn primary_role(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRole>> {
    let roles = roles_for_user(pool, user_id).await?;
    Ok(roles.into_iter().max_by_key(UserRole::rank))
}
