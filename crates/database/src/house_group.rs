//! House groups, their members, meetings and attendance.

use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{Attendance, GroupMeeting, GroupMember, HouseGroup};
use crate::pagination::{Page, PageRequest};
use crate::validation::{
    parse_date, parse_time, validate_max_length, validate_range, validate_required,
    MAX_NAME_LENGTH, MAX_NOTES_LENGTH,
};

const SELECT_GROUP: &str = r#"
    SELECT id, church_id, name, leader_id, address, meeting_day, meeting_time,
           capacity, active, created_at
    FROM house_groups
"#;

/// Fields for a new or edited group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupForm {
    pub name: String,
    pub leader_id: String,
    pub address: Option<String>,
    pub meeting_day: i64,
    pub meeting_time: String,
    #[serde(default = "default_capacity")]
    pub capacity: i64,
}

fn default_capacity() -> i64 {
    12
}

impl GroupForm {
    pub fn validate(&self) -> std::result::Result<(), crate::ValidationError> {
        validate_required("name", &self.name, MAX_NAME_LENGTH)?;
        validate_required("leader_id", &self.leader_id, 64)?;
        validate_range("meeting_day", self.meeting_day, 0, 6)?;
        parse_time("meeting_time", &self.meeting_time)?;
        validate_range("capacity", self.capacity, 1, 500)?;
        if let Some(address) = &self.address {
            validate_max_length("address", address, MAX_NOTES_LENGTH)?;
        }
        Ok(())
    }
}

/// One attendance mark when recording a meeting.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceMark {
    pub profile_id: String,
    pub present: bool,
}

/// Create a group.
pub async fn create_group(pool: &SqlitePool, church_id: &str, form: &GroupForm) -> Result<HouseGroup> {
    form.validate()?;
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO house_groups (id, church_id, name, leader_id, address, meeting_day, meeting_time, capacity)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(church_id)
    .bind(form.name.trim())
    .bind(&form.leader_id)
    .bind(&form.address)
    .bind(form.meeting_day)
    .bind(form.meeting_time.trim())
    .bind(form.capacity)
    .execute(pool)
    .await?;

    tracing::info!(group_id = %id, church_id, "House group created");
    get_group(pool, &id).await
}

/// Get a group by ID.
pub async fn get_group(pool: &SqlitePool, id: &str) -> Result<HouseGroup> {
    let sql = format!("{SELECT_GROUP} WHERE id = ?");
    sqlx::query_as::<_, HouseGroup>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "HouseGroup",
            id: id.to_string(),
        })
}

/// Replace the editable fields of a group.
pub async fn update_group(pool: &SqlitePool, id: &str, form: &GroupForm) -> Result<HouseGroup> {
    form.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE house_groups
        SET name = ?, leader_id = ?, address = ?, meeting_day = ?, meeting_time = ?, capacity = ?
        WHERE id = ?
        "#,
    )
    .bind(form.name.trim())
    .bind(&form.leader_id)
    .bind(&form.address)
    .bind(form.meeting_day)
    .bind(form.meeting_time.trim())
    .bind(form.capacity)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "HouseGroup",
            id: id.to_string(),
        });
    }

    get_group(pool, id).await
}

/// Activate or deactivate a group.
pub async fn set_group_active(pool: &SqlitePool, id: &str, active: bool) -> Result<()> {
    let result = sqlx::query("UPDATE house_groups SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "HouseGroup",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Groups of a church, optionally only those led by `leader_id`.
pub async fn list_groups(pool: &SqlitePool, church_id: &str, leader_id: Option<&str>) -> Result<Vec<HouseGroup>> {
    let sql = format!(
        r#"{SELECT_GROUP}
        WHERE church_id = ? AND (? IS NULL OR leader_id = ?)
        ORDER BY name
        "#
    );

    let groups = sqlx::query_as::<_, HouseGroup>(&sql)
        .bind(church_id)
        .bind(leader_id)
        .bind(leader_id)
        .fetch_all(pool)
        .await?;

    Ok(groups)
}

/// Active groups of a church in weekly order (day, then time).
pub async fn weekly_schedule(pool: &SqlitePool, church_id: &str) -> Result<Vec<HouseGroup>> {
    let sql = format!(
        r#"{SELECT_GROUP}
        WHERE church_id = ? AND active = 1
        ORDER BY meeting_day, meeting_time, name
        "#
    );

    let groups = sqlx::query_as::<_, HouseGroup>(&sql)
        .bind(church_id)
        .fetch_all(pool)
        .await?;

    Ok(groups)
}

/// Add a profile to a group.
pub async fn add_member(pool: &SqlitePool, group_id: &str, profile_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO group_members (group_id, profile_id)
        VALUES (?, ?)
        "#,
    )
    .bind(group_id)
    .bind(profile_id)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "GroupMember", format!("{}/{}", group_id, profile_id)))?;

    Ok(())
}

/// Remove a profile from a group.
pub async fn remove_member(pool: &SqlitePool, group_id: &str, profile_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM group_members
        WHERE group_id = ? AND profile_id = ?
        "#,
    )
    .bind(group_id)
    .bind(profile_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "GroupMember",
            id: format!("{}/{}", group_id, profile_id),
        });
    }

    Ok(())
}

/// Members of a group, by name.
pub async fn list_members(pool: &SqlitePool, group_id: &str) -> Result<Vec<GroupMember>> {
    let members = sqlx::query_as::<_, GroupMember>(
        r#"
        SELECT m.group_id, m.profile_id, p.full_name, m.joined_at
        FROM group_members m
        INNER JOIN profiles p ON p.id = m.profile_id
        WHERE m.group_id = ?
        ORDER BY p.full_name
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// Count members of a group.
pub async fn member_count(pool: &SqlitePool, group_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM group_members WHERE group_id = ?")
        .bind(group_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Record a meeting together with its attendance, atomically.
///
/// Every marked profile must be a member of the group.
pub async fn record_meeting(
    pool: &SqlitePool,
    group_id: &str,
    meeting_date: &str,
    topic: Option<&str>,
    notes: Option<&str>,
    attendance: &[AttendanceMark],
) -> Result<GroupMeeting> {
    parse_date("meeting_date", meeting_date)?;
    if let Some(notes) = notes {
        validate_max_length("notes", notes, MAX_NOTES_LENGTH)?;
    }
    get_group(pool, group_id).await?;

    let id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO group_meetings (id, group_id, meeting_date, topic, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(group_id)
    .bind(meeting_date.trim())
    .bind(topic)
    .bind(notes)
    .execute(&mut *tx)
    .await?;

    for mark in attendance {
        let is_member = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM group_members WHERE group_id = ? AND profile_id = ?",
        )
        .bind(group_id)
        .bind(&mark.profile_id)
        .fetch_optional(&mut *tx)
        .await?;

        if is_member.is_none() {
            return Err(DatabaseError::Conflict(format!(
                "{} is not a member of group {}",
                mark.profile_id, group_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO attendance (meeting_id, profile_id, present)
            VALUES (?, ?, ?)
            ON CONFLICT(meeting_id, profile_id) DO UPDATE SET present = excluded.present
            "#,
        )
        .bind(&id)
        .bind(&mark.profile_id)
        .bind(mark.present)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(group_id, meeting_id = %id, marks = attendance.len(), "Meeting recorded");

    get_meeting(pool, &id).await
}

/// Get a meeting by ID.
pub async fn get_meeting(pool: &SqlitePool, id: &str) -> Result<GroupMeeting> {
    sqlx::query_as::<_, GroupMeeting>(
        r#"
        SELECT id, group_id, meeting_date, topic, notes, created_at
        FROM group_meetings
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "GroupMeeting",
        id: id.to_string(),
    })
}

/// A page of a group's meetings, most recent first.
pub async fn list_meetings(pool: &SqlitePool, group_id: &str, page: PageRequest) -> Result<Page<GroupMeeting>> {
    let page = page.normalized();
    let rows = sqlx::query_as::<_, GroupMeeting>(
        r#"
        SELECT id, group_id, meeting_date, topic, notes, created_at
        FROM group_meetings
        WHERE group_id = ?
        ORDER BY meeting_date DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(group_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::from_rows(rows, page))
}

/// Attendance marks of a meeting.
pub async fn attendance_for_meeting(pool: &SqlitePool, meeting_id: &str) -> Result<Vec<Attendance>> {
    let rows = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT meeting_id, profile_id, present
        FROM attendance
        WHERE meeting_id = ?
        "#,
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
