//! Pastoral alert generation.
//!
//! Scans groups, converts and discipleship pairings for situations that need
//! a pastor's or leader's attention and files one alert per situation. An
//! alert is not filed again while an unread one for the same target and
//! subject exists.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::alert::{create_alert, has_open_alert, NewAlert};
use crate::changes::ChangeFeed;
use crate::enums::{AlertPriority, AlertType, UserRole};
use crate::error::Result;
use crate::profile::list_by_role;
use crate::validation::{format_timestamp, DATE_FORMAT};

/// Tunables for the alert rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    /// Consecutive missed meetings before a member counts as absent.
    pub absence_meetings: i64,
    /// How long after conversion someone is a new convert.
    pub new_convert_days: i64,
    /// Days without an encontro before a pairing is overdue.
    pub encontro_overdue_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            absence_meetings: 3,
            new_convert_days: 30,
            encontro_overdue_days: 14,
        }
    }
}

/// Alerts created by one run, per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub counts: BTreeMap<AlertType, i64>,
    pub total: i64,
}

impl GenerationReport {
    fn empty() -> Self {
        Self {
            counts: AlertType::ALL.iter().map(|t| (*t, 0)).collect(),
            total: 0,
        }
    }

    fn record(&mut self, alert_type: AlertType) {
        *self.counts.entry(alert_type).or_insert(0) += 1;
        self.total += 1;
    }
}

#[derive(Debug, FromRow)]
struct AbsentMember {
    group_id: String,
    group_name: String,
    church_id: String,
    leader_id: String,
    member_id: String,
    member_name: String,
}

#[derive(Debug, FromRow)]
struct NewConvert {
    id: String,
    church_id: String,
    full_name: String,
    conversion_date: String,
}

#[derive(Debug, FromRow)]
struct CrowdedGroup {
    id: String,
    church_id: String,
    name: String,
    capacity: i64,
    members: i64,
    supervisor_id: Option<String>,
}

#[derive(Debug, FromRow)]
struct OverduePairing {
    church_id: String,
    leader_id: String,
    disciple_id: String,
    disciple_name: String,
    last_met: Option<String>,
}

/// Run every rule once.
pub async fn generate_pastoral_alerts(
    pool: &SqlitePool,
    changes: &ChangeFeed,
    thresholds: &AlertThresholds,
    now: NaiveDateTime,
) -> Result<GenerationReport> {
    let mut report = GenerationReport::empty();

    absent_disciples(pool, changes, thresholds, &mut report).await?;
    new_converts(pool, changes, thresholds, now, &mut report).await?;
    crowded_groups(pool, changes, &mut report).await?;
    overdue_encontros(pool, changes, thresholds, now, &mut report).await?;

    tracing::info!(total = report.total, counts = ?report.counts, "Pastoral alert generation finished");
    Ok(report)
}

/// File an alert unless an unread one for the same subject exists.
async fn file_alert(
    pool: &SqlitePool,
    changes: &ChangeFeed,
    alert: NewAlert,
    report: &mut GenerationReport,
) -> Result<()> {
    if has_open_alert(
        pool,
        alert.alert_type,
        &alert.target_user_id,
        alert.related_member_id.as_deref(),
        alert.related_group_id.as_deref(),
    )
    .await?
    {
        return Ok(());
    }

    create_alert(pool, changes, &alert).await?;
    report.record(alert.alert_type);
    Ok(())
}

/// Active pastors of a church, falling back to admins when there are none.
async fn pastoral_targets(pool: &SqlitePool, church_id: &str) -> Result<Vec<String>> {
    for role in [UserRole::Pastor, UserRole::Admin] {
        let profiles = list_by_role(pool, church_id, role).await?;
        if !profiles.is_empty() {
            return Ok(profiles.into_iter().map(|p| p.id).collect());
        }
    }
    Ok(Vec::new())
}

async fn absent_disciples(
    pool: &SqlitePool,
    changes: &ChangeFeed,
    thresholds: &AlertThresholds,
    report: &mut GenerationReport,
) -> Result<()> {
    let rows = sqlx::query_as::<_, AbsentMember>(
        r#"
        WITH recent AS (
            SELECT id, group_id
            FROM (
                SELECT id, group_id,
                       ROW_NUMBER() OVER (
                           PARTITION BY group_id ORDER BY meeting_date DESC, rowid DESC
                       ) AS position
                FROM group_meetings
            )
            WHERE position <= ?
        )
        SELECT g.id AS group_id, g.name AS group_name, g.church_id, g.leader_id,
               p.id AS member_id, p.full_name AS member_name
        FROM house_groups g
        INNER JOIN group_members m ON m.group_id = g.id
        INNER JOIN profiles p ON p.id = m.profile_id
        WHERE g.active = 1
          AND p.active = 1
          AND p.id <> g.leader_id
          AND (SELECT COUNT(*) FROM recent r WHERE r.group_id = g.id) >= ?
          AND (
              SELECT COUNT(*)
              FROM recent r
              INNER JOIN attendance a ON a.meeting_id = r.id
              WHERE r.group_id = g.id AND a.profile_id = p.id AND a.present = 0
          ) >= ?
        "#,
    )
    .bind(thresholds.absence_meetings)
    .bind(thresholds.absence_meetings)
    .bind(thresholds.absence_meetings)
    .fetch_all(pool)
    .await?;

    tracing::debug!(candidates = rows.len(), "Checked absent disciples");

    for row in rows {
        let alert = NewAlert {
            church_id: row.church_id,
            target_user_id: row.leader_id,
            alert_type: AlertType::DiscipuloAusente,
            priority: AlertPriority::Alta,
            title: format!("{} está ausente", row.member_name),
            message: format!(
                "{} faltou às últimas {} reuniões do grupo {}.",
                row.member_name, thresholds.absence_meetings, row.group_name
            ),
            related_member_id: Some(row.member_id),
            related_group_id: Some(row.group_id),
        };
        file_alert(pool, changes, alert, report).await?;
    }

    Ok(())
}

async fn new_converts(
    pool: &SqlitePool,
    changes: &ChangeFeed,
    thresholds: &AlertThresholds,
    now: NaiveDateTime,
    report: &mut GenerationReport,
) -> Result<()> {
    let today = now.date().format(DATE_FORMAT).to_string();
    let since = (now - Duration::days(thresholds.new_convert_days))
        .date()
        .format(DATE_FORMAT)
        .to_string();

    let rows = sqlx::query_as::<_, NewConvert>(
        r#"
        SELECT p.id, p.church_id, p.full_name, p.conversion_date
        FROM profiles p
        WHERE p.active = 1
          AND p.conversion_date IS NOT NULL
          AND p.conversion_date >= ?
          AND p.conversion_date <= ?
          AND NOT EXISTS (
              SELECT 1 FROM discipulados d
              WHERE d.disciple_id = p.id AND d.active = 1
          )
        "#,
    )
    .bind(&since)
    .bind(&today)
    .fetch_all(pool)
    .await?;

    tracing::debug!(candidates = rows.len(), "Checked new converts");

    for row in rows {
        for target in pastoral_targets(pool, &row.church_id).await? {
            if target == row.id {
                continue;
            }
            let alert = NewAlert {
                church_id: row.church_id.clone(),
                target_user_id: target,
                alert_type: AlertType::NovoConvertido,
                priority: AlertPriority::Media,
                title: format!("Novo convertido: {}", row.full_name),
                message: format!(
                    "{} se converteu em {} e ainda não tem discipulador.",
                    row.full_name, row.conversion_date
                ),
                related_member_id: Some(row.id.clone()),
                related_group_id: None,
            };
            file_alert(pool, changes, alert, report).await?;
        }
    }

    Ok(())
}

async fn crowded_groups(pool: &SqlitePool, changes: &ChangeFeed, report: &mut GenerationReport) -> Result<()> {
    let rows = sqlx::query_as::<_, CrowdedGroup>(
        r#"
        SELECT g.id, g.church_id, g.name, g.capacity,
               COUNT(m.profile_id) AS members,
               leader.supervisor_id
        FROM house_groups g
        INNER JOIN profiles leader ON leader.id = g.leader_id
        LEFT JOIN group_members m ON m.group_id = g.id
        WHERE g.active = 1
        GROUP BY g.id
        HAVING COUNT(m.profile_id) > g.capacity
        "#,
    )
    .fetch_all(pool)
    .await?;

    tracing::debug!(candidates = rows.len(), "Checked crowded groups");

    for row in rows {
        let targets = match row.supervisor_id {
            Some(supervisor) => vec![supervisor],
            None => pastoral_targets(pool, &row.church_id).await?,
        };

        for target in targets {
            let alert = NewAlert {
                church_id: row.church_id.clone(),
                target_user_id: target,
                alert_type: AlertType::GrupoSobrecarregado,
                priority: AlertPriority::Media,
                title: format!("Grupo {} sobrecarregado", row.name),
                message: format!(
                    "O grupo {} tem {} membros para capacidade de {}. Considere multiplicar.",
                    row.name, row.members, row.capacity
                ),
                related_member_id: None,
                related_group_id: Some(row.id.clone()),
            };
            file_alert(pool, changes, alert, report).await?;
        }
    }

    Ok(())
}

async fn overdue_encontros(
    pool: &SqlitePool,
    changes: &ChangeFeed,
    thresholds: &AlertThresholds,
    now: NaiveDateTime,
    report: &mut GenerationReport,
) -> Result<()> {
    let cutoff = now - Duration::days(thresholds.encontro_overdue_days);
    let cutoff_date = cutoff.date().format(DATE_FORMAT).to_string();

    let rows = sqlx::query_as::<_, OverduePairing>(
        r#"
        SELECT d.church_id, d.leader_id, d.disciple_id,
               p.full_name AS disciple_name,
               (SELECT MAX(e.met_on) FROM encontros e WHERE e.discipulado_id = d.id) AS last_met
        FROM discipulados d
        INNER JOIN profiles p ON p.id = d.disciple_id
        WHERE d.active = 1
          AND d.started_at <= ?
          AND COALESCE(
              (SELECT MAX(e.met_on) FROM encontros e WHERE e.discipulado_id = d.id),
              ''
          ) < ?
        "#,
    )
    .bind(format_timestamp(cutoff))
    .bind(&cutoff_date)
    .fetch_all(pool)
    .await?;

    tracing::debug!(candidates = rows.len(), "Checked overdue encontros");

    for row in rows {
        let since = row
            .last_met
            .as_deref()
            .map(|d| format!("desde {}", d))
            .unwrap_or_else(|| "desde o início do discipulado".to_string());
        let alert = NewAlert {
            church_id: row.church_id,
            target_user_id: row.leader_id,
            alert_type: AlertType::EncontroAtrasado,
            priority: AlertPriority::Baixa,
            title: format!("Encontro atrasado com {}", row.disciple_name),
            message: format!("Nenhum encontro com {} registrado {}.", row.disciple_name, since),
            related_member_id: Some(row.disciple_id),
            related_group_id: None,
        };
        file_alert(pool, changes, alert, report).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{list_unread, mark_read};
    use crate::discipleship::{log_encontro, start_discipulado};
    use crate::house_group::{add_member, create_group, record_meeting, AttendanceMark, GroupForm};
    use crate::profile::{update_profile_field, ProfileField};
    use crate::test_support::{seed_church, seed_profile, test_db};
    use crate::validation::parse_timestamp;

    fn now() -> NaiveDateTime {
        parse_timestamp("now", "2026-10-15 12:00:00").unwrap()
    }

    fn group_form(leader: &str, capacity: i64) -> GroupForm {
        GroupForm {
            name: "Quinta".to_string(),
            leader_id: leader.to_string(),
            address: None,
            meeting_day: 4,
            meeting_time: "20:00".to_string(),
            capacity,
        }
    }

    #[tokio::test]
    async fn test_empty_database_reports_zero_for_every_type() {
        let db = test_db().await;
        let report = generate_pastoral_alerts(db.pool(), db.changes(), &AlertThresholds::default(), now())
            .await
            .unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.counts.len(), AlertType::ALL.len());
    }

    #[tokio::test]
    async fn test_absent_disciple() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let ana = seed_profile(&db, &church.id, "Ana", UserRole::Membro).await;
        let davi = seed_profile(&db, &church.id, "Davi", UserRole::Membro).await;
        let group = create_group(db.pool(), &church.id, &group_form(&leader.id, 12)).await.unwrap();
        add_member(db.pool(), &group.id, &ana.id).await.unwrap();
        add_member(db.pool(), &group.id, &davi.id).await.unwrap();

        for (i, date) in ["2026-09-24", "2026-10-01", "2026-10-08"].iter().enumerate() {
            record_meeting(
                db.pool(),
                &group.id,
                date,
                None,
                None,
                &[
                    AttendanceMark { profile_id: ana.id.clone(), present: false },
                    // Davi came to the second meeting only.
                    AttendanceMark { profile_id: davi.id.clone(), present: i == 1 },
                ],
            )
            .await
            .unwrap();
        }

        let report = generate_pastoral_alerts(db.pool(), db.changes(), &AlertThresholds::default(), now())
            .await
            .unwrap();
        assert_eq!(report.counts[&AlertType::DiscipuloAusente], 1);

        let alerts = list_unread(db.pool(), &leader.id, 10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].related_member_id.as_deref(), Some(ana.id.as_str()));
        assert_eq!(alerts[0].priority, AlertPriority::Alta);
    }

    #[tokio::test]
    async fn test_no_duplicate_while_unread() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let pastor = seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let convert = seed_profile(&db, &church.id, "Rute", UserRole::Membro).await;
        update_profile_field(db.pool(), &convert.id, ProfileField::ConversionDate, Some("2026-10-01"))
            .await
            .unwrap();

        let thresholds = AlertThresholds::default();
        let first = generate_pastoral_alerts(db.pool(), db.changes(), &thresholds, now()).await.unwrap();
        assert_eq!(first.counts[&AlertType::NovoConvertido], 1);

        let second = generate_pastoral_alerts(db.pool(), db.changes(), &thresholds, now()).await.unwrap();
        assert_eq!(second.total, 0);

        // Once read, the situation is reported again on the next run.
        let alert = list_unread(db.pool(), &pastor.id, 1).await.unwrap().remove(0);
        mark_read(db.pool(), db.changes(), &alert.id, &pastor.id).await.unwrap();
        let third = generate_pastoral_alerts(db.pool(), db.changes(), &thresholds, now()).await.unwrap();
        assert_eq!(third.counts[&AlertType::NovoConvertido], 1);
    }

    #[tokio::test]
    async fn test_new_convert_falls_back_to_admins() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let admin = seed_profile(&db, &church.id, "Marta", UserRole::Admin).await;
        let convert = seed_profile(&db, &church.id, "Rute", UserRole::Membro).await;
        update_profile_field(db.pool(), &convert.id, ProfileField::ConversionDate, Some("2026-10-01"))
            .await
            .unwrap();

        let report = generate_pastoral_alerts(db.pool(), db.changes(), &AlertThresholds::default(), now())
            .await
            .unwrap();
        assert_eq!(report.counts[&AlertType::NovoConvertido], 1);
        let alerts = list_unread(db.pool(), &admin.id, 10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].related_member_id.as_deref(), Some(convert.id.as_str()));
    }

    #[tokio::test]
    async fn test_old_convert_or_discipled_convert_ignored() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let old = seed_profile(&db, &church.id, "Antigo", UserRole::Membro).await;
        let cared = seed_profile(&db, &church.id, "Cuidado", UserRole::Membro).await;

        update_profile_field(db.pool(), &old.id, ProfileField::ConversionDate, Some("2025-01-01"))
            .await
            .unwrap();
        update_profile_field(db.pool(), &cared.id, ProfileField::ConversionDate, Some("2026-10-10"))
            .await
            .unwrap();
        start_discipulado(db.pool(), &church.id, &leader.id, &cared.id, None)
            .await
            .unwrap();

        let report = generate_pastoral_alerts(db.pool(), db.changes(), &AlertThresholds::default(), now())
            .await
            .unwrap();
        assert_eq!(report.counts[&AlertType::NovoConvertido], 0);
    }

    #[tokio::test]
    async fn test_crowded_group_goes_to_supervisor() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let pastor = seed_profile(&db, &church.id, "Pr. Carlos", UserRole::Pastor).await;
        let supervisor = seed_profile(&db, &church.id, "Marta", UserRole::Missionario).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        update_profile_field(db.pool(), &leader.id, ProfileField::Supervisor, Some(&supervisor.id))
            .await
            .unwrap();

        let group = create_group(db.pool(), &church.id, &group_form(&leader.id, 2)).await.unwrap();
        for name in ["A", "B", "C"] {
            let member = seed_profile(&db, &church.id, name, UserRole::Membro).await;
            add_member(db.pool(), &group.id, &member.id).await.unwrap();
        }

        let report = generate_pastoral_alerts(db.pool(), db.changes(), &AlertThresholds::default(), now())
            .await
            .unwrap();
        assert_eq!(report.counts[&AlertType::GrupoSobrecarregado], 1);
        assert_eq!(list_unread(db.pool(), &supervisor.id, 10).await.unwrap().len(), 1);
        assert!(list_unread(db.pool(), &pastor.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overdue_encontro() {
        let db = test_db().await;
        let church = seed_church(&db).await;
        let leader = seed_profile(&db, &church.id, "Lia", UserRole::Lider).await;
        let ana = seed_profile(&db, &church.id, "Ana", UserRole::Membro).await;
        let d = start_discipulado(db.pool(), &church.id, &leader.id, &ana.id, None)
            .await
            .unwrap();

        // Started "now" in wall-clock terms; evaluate a month later.
        let later = parse_timestamp("later", &d.started_at).unwrap() + Duration::days(30);
        log_encontro(db.pool(), &d.id, &(later - Duration::days(20)).date().to_string(), None, None)
            .await
            .unwrap();

        let report = generate_pastoral_alerts(db.pool(), db.changes(), &AlertThresholds::default(), later)
            .await
            .unwrap();
        assert_eq!(report.counts[&AlertType::EncontroAtrasado], 1);

        // A recent encontro clears the condition for the next unread cycle.
        let recent = later.date().to_string();
        log_encontro(db.pool(), &d.id, &recent, None, None).await.unwrap();
        let alert = list_unread(db.pool(), &leader.id, 1).await.unwrap().remove(0);
        mark_read(db.pool(), db.changes(), &alert.id, &leader.id).await.unwrap();

        let report = generate_pastoral_alerts(db.pool(), db.changes(), &AlertThresholds::default(), later)
            .await
            .unwrap();
        assert_eq!(report.counts[&AlertType::EncontroAtrasado], 0);
    }
}
