//! User provisioning: identity, then profile, then role.
//!
//! The request is validated in full before anything is written. The three
//! writes then run in sequence without a surrounding transaction. When a
//! later step fails the identity from the first step is left behind and
//! logged; `/api/admin/orphaned-identities` lists and removes such rows.

use database::auth::{create_provisioned_identity, generate_temporary_password};
use database::profile::{create_profile, NewProfile};
use database::role::assign_role;
use database::{DatabaseError, UserRole, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::CurrentUser;
use crate::state::AppState;

/// Body of `POST /functions/create-user`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: String,
    /// Defaults to the caller's church.
    #[serde(default)]
    pub church_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub baptism_date: Option<String>,
    #[serde(default)]
    pub conversion_date: Option<String>,
}

/// A provisioned user and the password to hand over.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedUser {
    pub user_id: String,
    pub temporary_password: String,
}

/// Why provisioning stopped.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Only admins can create admin users")]
    AdminRequired,

    #[error("Cannot create users in another church")]
    OtherChurch,

    #[error("Invalid user data: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Failed to create auth user: {0}")]
    Identity(DatabaseError),

    #[error("Failed to create profile: {source}")]
    Profile {
        orphaned_identity: String,
        source: DatabaseError,
    },

    #[error("Failed to assign role: {source}")]
    Role {
        user_id: String,
        source: DatabaseError,
    },
}

/// Create identity, profile and role assignment for a new member.
pub async fn provision_user(
    state: &AppState,
    caller: &CurrentUser,
    request: &CreateUserRequest,
) -> Result<ProvisionedUser, ProvisionError> {
    let role: UserRole = request
        .role
        .parse()
        .map_err(|_| ProvisionError::InvalidRole(request.role.clone()))?;
    if role == UserRole::Admin && caller.role != UserRole::Admin {
        return Err(ProvisionError::AdminRequired);
    }

    let church_id = request
        .church_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| caller.church_id.clone());
    if church_id != caller.church_id {
        return Err(ProvisionError::OtherChurch);
    }

    let email = request.email.trim().to_string();
    let mut profile = NewProfile {
        // Filled in once the identity exists.
        id: String::new(),
        church_id,
        full_name: request.full_name.clone(),
        email: email.clone(),
        phone: request.phone.clone(),
        role,
        address: request.address.clone(),
        emergency_contact: request.emergency_contact.clone(),
        emergency_phone: request.emergency_phone.clone(),
        birth_date: request.birth_date.clone(),
        baptism_date: request.baptism_date.clone(),
        conversion_date: request.conversion_date.clone(),
        supervisor_id: None,
    };
    profile.validate()?;

    let pool = state.db.pool();
    let temporary_password = generate_temporary_password();

    let identity = create_provisioned_identity(pool, &profile.church_id, &email, &temporary_password)
        .await
        .map_err(|err| match err {
            DatabaseError::AlreadyExists { .. } => ProvisionError::DuplicateEmail(email.clone()),
            other => ProvisionError::Identity(other),
        })?;
    profile.id = identity.id.clone();

    if let Err(source) = create_profile(pool, &profile).await {
        tracing::warn!(
            identity_id = %identity.id,
            church_id = %profile.church_id,
            error = %source,
            "Profile creation failed; auth identity left without profile"
        );
        return Err(ProvisionError::Profile {
            orphaned_identity: identity.id,
            source,
        });
    }

    if let Err(source) = assign_role(pool, &identity.id, role).await {
        tracing::warn!(
            user_id = %identity.id,
            church_id = %profile.church_id,
            error = %source,
            "Role assignment failed; profile left without role row"
        );
        return Err(ProvisionError::Role {
            user_id: identity.id,
            source,
        });
    }

    tracing::info!(user_id = %identity.id, %role, created_by = %caller.user_id, "User provisioned");

    Ok(ProvisionedUser {
        user_id: identity.id,
        temporary_password,
    })
}
