//! Member registry: profile rows.

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::enums::UserRole;
use crate::error::{DatabaseError, Result};
use crate::models::Profile;
use crate::validation::{
    validate_email, validate_max_length, validate_optional_date, validate_phone,
    validate_required, MAX_NAME_LENGTH, MAX_NOTES_LENGTH,
};

const SELECT_PROFILE: &str = r#"
    SELECT id, church_id, full_name, email, phone, role, address,
           emergency_contact, emergency_phone, birth_date, baptism_date,
           conversion_date, supervisor_id, active, created_at, updated_at
    FROM profiles
"#;

/// Fields for a new profile. `id` must be an existing identity id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
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
    pub supervisor_id: Option<String>,
}

impl NewProfile {
    /// Check every field that has a format.
    pub fn validate(&self) -> std::result::Result<(), crate::ValidationError> {
        validate_required("full_name", &self.full_name, MAX_NAME_LENGTH)?;
        validate_email(&self.email)?;
        if let Some(phone) = non_empty(&self.phone) {
            validate_phone(phone)?;
        }
        if let Some(phone) = non_empty(&self.emergency_phone) {
            validate_phone(phone)?;
        }
        if let Some(address) = non_empty(&self.address) {
            validate_max_length("address", address, MAX_NOTES_LENGTH)?;
        }
        validate_optional_date("birth_date", self.birth_date.as_deref())?;
        validate_optional_date("baptism_date", self.baptism_date.as_deref())?;
        validate_optional_date("conversion_date", self.conversion_date.as_deref())?;
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Editable profile columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    FullName,
    Phone,
    Address,
    EmergencyContact,
    EmergencyPhone,
    BirthDate,
    BaptismDate,
    ConversionDate,
    Supervisor,
}

impl ProfileField {
    /// Get the database column name for this field.
    pub fn column_name(&self) -> &'static str {
        match self {
            ProfileField::FullName => "full_name",
            ProfileField::Phone => "phone",
            ProfileField::Address => "address",
            ProfileField::EmergencyContact => "emergency_contact",
            ProfileField::EmergencyPhone => "emergency_phone",
            ProfileField::BirthDate => "birth_date",
            ProfileField::BaptismDate => "baptism_date",
            ProfileField::ConversionDate => "conversion_date",
            ProfileField::Supervisor => "supervisor_id",
        }
    }

    /// Parse a field name as sent by clients.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full_name" => Some(ProfileField::FullName),
            "phone" => Some(ProfileField::Phone),
            "address" => Some(ProfileField::Address),
            "emergency_contact" => Some(ProfileField::EmergencyContact),
            "emergency_phone" => Some(ProfileField::EmergencyPhone),
            "birth_date" => Some(ProfileField::BirthDate),
            "baptism_date" => Some(ProfileField::BaptismDate),
            "conversion_date" => Some(ProfileField::ConversionDate),
            "supervisor_id" | "supervisor" => Some(ProfileField::Supervisor),
            _ => None,
        }
    }

    /// Validate a new value for this field. `None` clears the column.
    pub fn validate(&self, value: Option<&str>) -> std::result::Result<(), crate::ValidationError> {
        let Some(value) = value else {
            if *self == ProfileField::FullName {
                return Err(crate::ValidationError::Empty("full_name".to_string()));
            }
            return Ok(());
        };

        match self {
            ProfileField::FullName => validate_required("full_name", value, MAX_NAME_LENGTH),
            ProfileField::Phone | ProfileField::EmergencyPhone => validate_phone(value),
            ProfileField::Address => validate_max_length("address", value, MAX_NOTES_LENGTH),
            ProfileField::EmergencyContact => {
                validate_max_length("emergency_contact", value, MAX_NAME_LENGTH)
            }
            ProfileField::BirthDate | ProfileField::BaptismDate | ProfileField::ConversionDate => {
                validate_optional_date(self.column_name(), Some(value))
            }
            ProfileField::Supervisor => validate_required("supervisor_id", value, 64),
        }
    }
}

/// Filters for listing profiles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFilter {
    /// Exact role match.
    pub role: Option<UserRole>,
    /// Substring of name or email.
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create a profile row.
pub async fn create_profile(pool: &SqlitePool, profile: &NewProfile) -> Result<Profile> {
    profile.validate()?;

    sqlx::query(
        r#"
        INSERT INTO profiles (
            id, church_id, full_name, email, phone, role, address,
            emergency_contact, emergency_phone, birth_date, baptism_date,
            conversion_date, supervisor_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&profile.id)
    .bind(&profile.church_id)
    .bind(profile.full_name.trim())
    .bind(profile.email.trim())
    .bind(non_empty(&profile.phone))
    .bind(profile.role)
    .bind(non_empty(&profile.address))
    .bind(non_empty(&profile.emergency_contact))
    .bind(non_empty(&profile.emergency_phone))
    .bind(non_empty(&profile.birth_date))
    .bind(non_empty(&profile.baptism_date))
    .bind(non_empty(&profile.conversion_date))
    .bind(non_empty(&profile.supervisor_id))
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Profile", profile.id.clone()))?;

    get_profile(pool, &profile.id).await
}

/// Get a profile by ID.
pub async fn get_profile(pool: &SqlitePool, id: &str) -> Result<Profile> {
    let sql = format!("{SELECT_PROFILE} WHERE id = ?");
    sqlx::query_as::<_, Profile>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Profile",
            id: id.to_string(),
        })
}

/// Update a single editable column.
pub async fn update_profile_field(
    pool: &SqlitePool,
    id: &str,
    field: ProfileField,
    value: Option<&str>,
) -> Result<Profile> {
    field.validate(value)?;

    // Column names come from the ProfileField enum, never from input.
    let sql = format!(
        r#"
        UPDATE profiles
        SET {column} = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
        column = field.column_name()
    );

    let result = sqlx::query(&sql)
        .bind(value.map(str::trim))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Profile",
            id: id.to_string(),
        });
    }

    get_profile(pool, id).await
}

/// Change the displayed role of a profile.
pub async fn set_role(pool: &SqlitePool, id: &str, role: UserRole) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET role = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(role)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Profile",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Activate or deactivate a profile. Profiles are never hard-deleted.
pub async fn set_active(pool: &SqlitePool, id: &str, active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET active = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Profile",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// List the profiles of a church, ordered by name.
pub async fn list_profiles(
    pool: &SqlitePool,
    church_id: &str,
    filter: &ProfileFilter,
) -> Result<Vec<Profile>> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let sql = format!(
        r#"{SELECT_PROFILE}
        WHERE church_id = ?
          AND (? IS NULL OR role = ?)
          AND (? IS NULL OR full_name LIKE ? OR email LIKE ?)
          AND (? OR active = 1)
        ORDER BY full_name
        "#
    );

    let profiles = sqlx::query_as::<_, Profile>(&sql)
        .bind(church_id)
        .bind(filter.role)
        .bind(filter.role)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(filter.include_inactive)
        .fetch_all(pool)
        .await?;

    Ok(profiles)
}

/// Active profiles of a church holding a role.
pub async fn list_by_role(pool: &SqlitePool, church_id: &str, role: UserRole) -> Result<Vec<Profile>> {
    list_profiles(
        pool,
        church_id,
        &ProfileFilter {
            role: Some(role),
            ..Default::default()
        },
    )
    .await
}

/// Count active profiles grouped by role.
pub async fn count_by_role(pool: &SqlitePool, church_id: &str) -> Result<Vec<(UserRole, i64)>> {
    let rows = sqlx::query_as::<_, (UserRole, i64)>(
        r#"
        SELECT role, COUNT(*) as count
        FROM profiles
        WHERE church_id = ? AND active = 1
        GROUP BY role
        ORDER BY count DESC
        "#,
    )
    .bind(church_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_church, seed_profile, test_db};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let profile = seed_profile(&db, &church.id, "Ana Souza", UserRole::Membro).await;

        let fetched = get_profile(db.pool(), &profile.id).await.unwrap();
        assert_eq!(fetched.full_name, "Ana Souza");
        assert_eq!(fetched.role, UserRole::Membro);
        assert!(fetched.active);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = test_db().await;
        let result = get_profile(db.pool(), "nope").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_role_filter_is_exact_subset() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let l1 = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let l2 = seed_profile(&db, &church.id, "Bruno", UserRole::Lider).await;
        seed_profile(&db, &church.id, "Davi", UserRole::Membro).await;

        let leaders = list_by_role(db.pool(), &church.id, UserRole::Lider).await.unwrap();
        let mut ids: Vec<_> = leaders.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        let mut expected = vec![l1.id, l2.id];
        expected.sort();
        assert_eq!(ids, expected);
        assert!(leaders.iter().all(|p| p.role == UserRole::Lider));

        let all = list_profiles(db.pool(), &church.id, &ProfileFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_search_and_inactive() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let ana = seed_profile(&db, &church.id, "Ana Souza", UserRole::Membro).await;
        seed_profile(&db, &church.id, "Bruno Lima", UserRole::Membro).await;

        set_active(db.pool(), &ana.id, false).await.unwrap();

        let filter = ProfileFilter {
            search: Some("souza".to_string()),
            ..Default::default()
        };
        assert!(list_profiles(db.pool(), &church.id, &filter).await.unwrap().is_empty());

        let filter = ProfileFilter {
            search: Some("souza".to_string()),
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(list_profiles(db.pool(), &church.id, &filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_field() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let profile = seed_profile(&db, &church.id, "Ana", UserRole::Membro).await;

        let updated = update_profile_field(
            db.pool(),
            &profile.id,
            ProfileField::Phone,
            Some("+55 11 98765-4321"),
        )
        .await
        .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+55 11 98765-4321"));

        let cleared = update_profile_field(db.pool(), &profile.id, ProfileField::Phone, None)
            .await
            .unwrap();
        assert!(cleared.phone.is_none());

        let bad = update_profile_field(
            db.pool(),
            &profile.id,
            ProfileField::BaptismDate,
            Some("ontem"),
        )
        .await;
        assert!(matches!(bad, Err(DatabaseError::Invalid(_))));

        let no_name = update_profile_field(db.pool(), &profile.id, ProfileField::FullName, None).await;
        assert!(matches!(no_name, Err(DatabaseError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_count_by_role() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        seed_profile(&db, &church.id, "A", UserRole::Membro).await;
        seed_profile(&db, &church.id, "B", UserRole::Membro).await;
        seed_profile(&db, &church.id, "C", UserRole::Pastor).await;

        let counts = count_by_role(db.pool(), &church.id).await.unwrap();
        assert_eq!(counts[0], (UserRole::Membro, 2));
        assert!(counts.contains(&(UserRole::Pastor, 1)));
    }

    #[test]
    fn test_profile_field_parse() {
        assert_eq!(ProfileField::parse("phone"), Some(ProfileField::Phone));
        assert_eq!(ProfileField::parse("supervisor"), Some(ProfileField::Supervisor));
        assert_eq!(ProfileField::parse("role"), None);
        assert_eq!(ProfileField::parse("Phone"), None);
    }
}
