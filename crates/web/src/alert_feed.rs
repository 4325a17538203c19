//! Unread alert feed for the signed-in user.
//!
//! Every change notification for the user triggers a full re-query of the
//! unread count and list; lagging behind the change feed counts as a change.

use std::convert::Infallible;
use std::future::ready;

use axum::response::sse::Event;
use database::{alert, Alert, ChangeFeed, Database};
use futures::{stream, Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// How many unread alerts a snapshot carries.
pub const SNAPSHOT_LIMIT: i64 = 20;

/// Unread state of one user.
#[derive(Debug, Clone, Serialize)]
pub struct UnreadSnapshot {
    pub count: i64,
    pub alerts: Vec<Alert>,
}

/// Query the current unread count and the newest unread alerts.
pub async fn unread_snapshot(db: &Database, user_id: &str) -> database::Result<UnreadSnapshot> {
    let count = alert::unread_count(db.pool(), user_id).await?;
    let alerts = alert::list_unread(db.pool(), user_id, SNAPSHOT_LIMIT).await?;
    Ok(UnreadSnapshot { count, alerts })
}

/// A stream that yields once immediately and then once per change affecting
/// `user_id`.
pub fn change_triggers(changes: &ChangeFeed, user_id: String) -> impl Stream<Item = ()> + Send + 'static {
    // Subscribe before the first snapshot is taken so nothing slips between.
    let updates = BroadcastStream::new(changes.subscribe()).filter_map(move |change| {
        let relevant = match change {
            Ok(change) => change.target_user_id == user_id,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Alert feed lagged, re-querying");
                true
            }
        };
        ready(relevant.then_some(()))
    });

    stream::once(ready(())).chain(updates)
}

/// A fresh snapshot now and after every change affecting `user_id`.
pub fn unread_snapshots(
    db: Database,
    user_id: String,
) -> impl Stream<Item = database::Result<UnreadSnapshot>> + Send + 'static {
    change_triggers(db.changes(), user_id.clone()).then(move |()| {
        let db = db.clone();
        let user_id = user_id.clone();
        async move { unread_snapshot(&db, &user_id).await }
    })
}

/// Server-sent `unread` events for `user_id`.
pub fn unread_events(db: Database, user_id: String) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let events_user = user_id.clone();
    unread_snapshots(db, user_id).map(move |snapshot| Ok(snapshot_event(&events_user, snapshot)))
}

fn snapshot_event(user_id: &str, snapshot: database::Result<UnreadSnapshot>) -> Event {
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::error!(user_id, error = %err, "Failed to load unread alerts");
            return Event::default().event("error").data("failed to load alerts");
        }
    };

    match Event::default().event("unread").json_data(&snapshot) {
        Ok(event) => event,
        Err(err) => {
            tracing::error!(user_id, error = %err, "Failed to encode unread alerts");
            Event::default().event("error").data("failed to encode alerts")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::alert::NewAlert;
    use database::profile::NewProfile;
    use database::{auth, church, profile, AlertPriority, AlertType, ChangeKind, UserRole};
    use std::time::Duration;

    #[tokio::test]
    async fn test_triggers_only_for_the_user() {
        let feed = ChangeFeed::new();
        let mut triggers = Box::pin(change_triggers(&feed, "ana".to_string()));

        // Initial load.
        assert_eq!(triggers.next().await, Some(()));

        feed.publish("bruno", ChangeKind::Inserted);
        feed.publish("ana", ChangeKind::Updated);
        assert_eq!(triggers.next().await, Some(()));

        // Bruno's change was skipped, so nothing else is pending.
        let pending = tokio::time::timeout(Duration::from_millis(50), triggers.next()).await;
        assert!(pending.is_err());
    }

    async fn seed_user(db: &Database) -> (String, String) {
        let church = church::create_church(db.pool(), "Igreja Corpo Vivo", Some("Recife"))
            .await
            .unwrap();
        let identity = auth::create_identity(db.pool(), "lia@igreja.org", "segredo123", false)
            .await
            .unwrap();
        let lia = profile::create_profile(
            db.pool(),
            &NewProfile {
                id: identity.id,
                church_id: church.id.clone(),
                full_name: "Lia".to_string(),
                email: "lia@igreja.org".to_string(),
                phone: None,
                role: UserRole::Lider,
                address: None,
                emergency_contact: None,
                emergency_phone: None,
                birth_date: None,
                baptism_date: None,
                conversion_date: None,
                supervisor_id: None,
            },
        )
        .await
        .unwrap();
        (church.id, lia.id)
    }

    fn new_alert(church_id: &str, target: &str, title: &str) -> NewAlert {
        NewAlert {
            church_id: church_id.to_string(),
            target_user_id: target.to_string(),
            alert_type: AlertType::DiscipuloAusente,
            priority: AlertPriority::Alta,
            title: title.to_string(),
            message: "Três reuniões sem presença".to_string(),
            related_member_id: None,
            related_group_id: None,
        }
    }

    async fn next_snapshot(
        snapshots: &mut (impl Stream<Item = database::Result<UnreadSnapshot>> + Unpin),
    ) -> UnreadSnapshot {
        tokio::time::timeout(Duration::from_secs(2), snapshots.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_snapshots_requery_after_each_change() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let (church_id, lia) = seed_user(&db).await;
        let first = alert::create_alert(db.pool(), db.changes(), &new_alert(&church_id, &lia, "Ana"))
            .await
            .unwrap();

        let mut snapshots = Box::pin(unread_snapshots(db.clone(), lia.clone()));
        let opened = next_snapshot(&mut snapshots).await;
        assert_eq!(opened.count, 1);
        assert_eq!(opened.alerts[0].id, first.id);

        let second = alert::create_alert(db.pool(), db.changes(), &new_alert(&church_id, &lia, "Davi"))
            .await
            .unwrap();
        let inserted = next_snapshot(&mut snapshots).await;
        assert_eq!(inserted.count, 2);
        assert_eq!(inserted.alerts.len(), 2);

        alert::mark_read(db.pool(), db.changes(), &first.id, &lia).await.unwrap();
        let read = next_snapshot(&mut snapshots).await;
        assert_eq!(read.count, 1);
        let ids: Vec<&str> = read.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str()]);
    }

    #[tokio::test]
    async fn test_unread_events_emit_for_each_snapshot() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let (church_id, lia) = seed_user(&db).await;

        let mut events = Box::pin(unread_events(db.clone(), lia.clone()));
        assert!(events.next().await.is_some());

        alert::create_alert(db.pool(), db.changes(), &new_alert(&church_id, &lia, "Ana"))
            .await
            .unwrap();
        let next = tokio::time::timeout(Duration::from_secs(2), events.next()).await;
        assert!(matches!(next, Ok(Some(Ok(_)))));
    }

    #[tokio::test]
    async fn test_snapshot_of_empty_user() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();

        let snapshot = unread_snapshot(&db, "nobody").await.unwrap();
        assert_eq!(snapshot.count, 0);
        assert!(snapshot.alerts.is_empty());
    }
}
