//! House groups, their members, meetings and attendance.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use database::house_group::{self, AttendanceMark, GroupForm};
use database::{profile, Attendance, GroupMeeting, GroupMember, HouseGroup, Page, PageRequest};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GroupQuery {
    /// Only groups the caller leads.
    #[serde(default)]
    pub mine: bool,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<GroupQuery>,
) -> Result<Json<Vec<HouseGroup>>> {
    let leader = query.mine.then_some(user.user_id.as_str());
    let groups = house_group::list_groups(state.db.pool(), &user.church_id, leader).await?;
    Ok(Json(groups))
}

/// Active groups ordered by weekday and time.
pub async fn schedule(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<HouseGroup>>> {
    Ok(Json(house_group::weekly_schedule(state.db.pool(), &user.church_id).await?))
}

/// The profile must exist in the caller's church.
async fn require_member_of_church(state: &AppState, user: &CurrentUser, profile_id: &str) -> Result<()> {
    let found = profile::get_profile(state.db.pool(), profile_id).await?;
    user.require_church(&found.church_id)
}

async fn load_group(state: &AppState, user: &CurrentUser, id: &str) -> Result<HouseGroup> {
    let group = house_group::get_group(state.db.pool(), id).await?;
    user.require_church(&group.church_id)?;
    Ok(group)
}

/// Load a group the caller may manage: its leader or a pastoral role.
async fn load_managed_group(state: &AppState, user: &CurrentUser, id: &str) -> Result<HouseGroup> {
    let group = load_group(state, user, id).await?;
    if group.leader_id != user.user_id {
        user.require_pastoral()?;
    }
    Ok(group)
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<GroupForm>,
) -> Result<Json<HouseGroup>> {
    user.require_leadership()?;
    if form.leader_id != user.user_id {
        user.require_pastoral()?;
    }
    require_member_of_church(&state, &user, &form.leader_id).await?;

    let group = house_group::create_group(state.db.pool(), &user.church_id, &form).await?;
    Ok(Json(group))
}

#[derive(Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: HouseGroup,
    pub member_count: i64,
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<GroupDetail>> {
    let group = load_group(&state, &user, &id).await?;
    let member_count = house_group::member_count(state.db.pool(), &id).await?;
    Ok(Json(GroupDetail { group, member_count }))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<GroupForm>,
) -> Result<Json<HouseGroup>> {
    let group = load_managed_group(&state, &user, &id).await?;
    if form.leader_id != group.leader_id {
        user.require_pastoral()?;
        require_member_of_church(&state, &user, &form.leader_id).await?;
    }
    Ok(Json(house_group::update_group(state.db.pool(), &id, &form).await?))
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

pub async fn set_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> Result<StatusCode> {
    user.require_pastoral()?;
    load_group(&state, &user, &id).await?;
    house_group::set_group_active(state.db.pool(), &id, req.active).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn members(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<GroupMember>>> {
    load_group(&state, &user, &id).await?;
    Ok(Json(house_group::list_members(state.db.pool(), &id).await?))
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub profile_id: String,
}

pub async fn add_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> Result<StatusCode> {
    load_managed_group(&state, &user, &id).await?;
    require_member_of_church(&state, &user, &req.profile_id).await?;
    house_group::add_member(state.db.pool(), &id, &req.profile_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, profile_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    load_managed_group(&state, &user, &id).await?;
    house_group::remove_member(state.db.pool(), &id, &profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct MeetingQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    database::pagination::DEFAULT_PAGE_SIZE
}

pub async fn meetings(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<MeetingQuery>,
) -> Result<Json<Page<GroupMeeting>>> {
    load_managed_group(&state, &user, &id).await?;
    let page = PageRequest::new(query.page, query.page_size);
    Ok(Json(house_group::list_meetings(state.db.pool(), &id, page).await?))
}

#[derive(Deserialize)]
pub struct RecordMeetingRequest {
    pub meeting_date: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub attendance: Vec<AttendanceMark>,
}

/// Record a meeting and its attendance together.
pub async fn record_meeting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RecordMeetingRequest>,
) -> Result<Json<GroupMeeting>> {
    load_managed_group(&state, &user, &id).await?;
    let meeting = house_group::record_meeting(
        state.db.pool(),
        &id,
        &req.meeting_date,
        req.topic.as_deref(),
        req.notes.as_deref(),
        &req.attendance,
    )
    .await?;
    Ok(Json(meeting))
}

pub async fn attendance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<Vec<Attendance>>> {
    let meeting = house_group::get_meeting(state.db.pool(), &meeting_id).await?;
    load_managed_group(&state, &user, &meeting.group_id).await?;
    Ok(Json(house_group::attendance_for_meeting(state.db.pool(), &meeting_id).await?))
}
