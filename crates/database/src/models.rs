//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::enums::{ActivityType, AlertPriority, AlertType, ProgressStatus, UserRole};

/// A local congregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Church {
    pub id: String,
    pub name: String,
    pub city: Option<String>,
    pub created_at: String,
}

/// A sign-in identity. Its id is the user id used by every other table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AuthIdentity {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Set for provisioned users holding a temporary password.
    pub must_change_password: bool,
    /// Church whose staff provisioned this identity.
    pub church_id: Option<String>,
    pub created_at: String,
}

/// An opaque bearer session.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

/// A person within one church.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub church_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub birth_date: Option<String>,
    pub baptism_date: Option<String>,
    pub conversion_date: Option<String>,
    /// Profile of the person this one reports to.
    pub supervisor_id: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A role granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleAssignment {
    pub user_id: String,
    pub role: UserRole,
    pub created_at: String,
}

/// A pastoral-care notification targeted at one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: String,
    pub church_id: String,
    pub target_user_id: String,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub related_member_id: Option<String>,
    pub related_group_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub read_at: Option<String>,
}

/// A scheduled reminder tied to one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AlertFollowUp {
    pub id: String,
    pub alert_id: String,
    pub created_by: String,
    pub scheduled_for: String,
    pub notes: String,
    pub created_at: String,
}

/// A discipleship curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: String,
    pub church_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

/// One step of a plan. `step_order` is 1-based and contiguous within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlanStep {
    pub id: String,
    pub plan_id: String,
    pub step_order: i64,
    pub title: String,
    pub content: Option<String>,
}

/// A user's cursor through a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlanProgress {
    pub user_id: String,
    pub plan_id: String,
    pub current_step: i64,
    pub status: ProgressStatus,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub updated_at: String,
}

/// A leader-owned small group with a weekly time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HouseGroup {
    pub id: String,
    pub church_id: String,
    pub name: String,
    pub leader_id: String,
    pub address: Option<String>,
    /// 0 = Sunday … 6 = Saturday.
    pub meeting_day: i64,
    /// `HH:MM`.
    pub meeting_time: String,
    pub capacity: i64,
    pub active: bool,
    pub created_at: String,
}

/// Membership of a profile in a house group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub group_id: String,
    pub profile_id: String,
    pub full_name: String,
    pub joined_at: String,
}

/// A logged group meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupMeeting {
    pub id: String,
    pub group_id: String,
    pub meeting_date: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Whether a member attended a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub meeting_id: String,
    pub profile_id: String,
    pub present: bool,
}

/// A leader-disciple pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Discipulado {
    pub id: String,
    pub church_id: String,
    pub leader_id: String,
    pub disciple_id: String,
    pub started_at: String,
    pub active: bool,
    pub notes: Option<String>,
}

/// A logged one-on-one meeting within a discipulado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Encontro {
    pub id: String,
    pub discipulado_id: String,
    pub met_on: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// An activity assigned within a discipulado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: String,
    pub discipulado_id: String,
    pub activity_type: ActivityType,
    pub description: String,
    pub due_date: Option<String>,
    pub completed: bool,
    pub created_at: String,
}

/// A prayer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PrayerRequest {
    pub id: String,
    pub church_id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub is_private: bool,
    pub answered: bool,
    pub created_at: String,
}

/// A church-wide or role-targeted announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: String,
    pub church_id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    /// `None` targets everyone.
    pub audience: Option<UserRole>,
    pub published_at: String,
    pub expires_at: Option<String>,
}

/// An entry in the resource library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: String,
    pub church_id: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub category: String,
    pub created_by: String,
    pub created_at: String,
}
