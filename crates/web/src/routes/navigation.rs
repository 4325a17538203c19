//! Navigation menu for the signed-in user.

use axum::Json;
use database::UserRole;
use serde::Serialize;

use crate::navigation::{navigation_for, NavItem};
use crate::session::CurrentUser;

#[derive(Serialize)]
pub struct NavigationResponse {
    pub role: UserRole,
    pub items: Vec<NavItem>,
}

pub async fn navigation(user: CurrentUser) -> Json<NavigationResponse> {
    Json(NavigationResponse {
        role: user.role,
        items: navigation_for(user.role),
    })
}
