use sqlx::PgConnection;

use crate::core::error::Result;
use crate::features::incidents::models::HandlerLoad;
use crate::features::incidents::services::IncidentStore;

/// Routes new incidents to the least-loaded active handler
///
/// Load is the number of Pending incidents already assigned to a handler.
/// The write is conditional, so a concurrent assignment simply wins and this
/// one leaves the incident as it is.
pub struct AssignmentPolicy;

impl AssignmentPolicy {
    /// Assign `incident_id` inside the caller's transaction
    ///
    /// Returns the handler written, or `None` when no handler is active or the
    /// incident already had one.
    pub async fn assign_new_incident(
        conn: &mut PgConnection,
        incident_id: i64,
    ) -> Result<Option<i64>> {
        let loads = IncidentStore::list_handler_loads(&mut *conn).await?;
        let Some(handler_id) = pick_least_loaded(&loads) else {
            tracing::info!("No active handler available for incident {}", incident_id);
            return Ok(None);
        };

        if IncidentStore::assign_handler_if_empty(&mut *conn, incident_id, handler_id).await? {
            tracing::info!("Assigned incident {} to handler {}", incident_id, handler_id);
            Ok(Some(handler_id))
        } else {
            tracing::debug!("Incident {} already had a handler", incident_id);
            Ok(None)
        }
    }
}

/// Least-loaded handler of a snapshot; lowest id wins ties
pub fn pick_least_loaded(loads: &[HandlerLoad]) -> Option<i64> {
    loads
        .iter()
        .min_by_key(|l| (l.pending_count, l.handler_id))
        .map(|l| l.handler_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::incidents::models::{IncidentStatus, NewIncident};
    use crate::shared::test_helpers::insert_user;
    use sqlx::PgPool;

    fn load(handler_id: i64, pending_count: i64) -> HandlerLoad {
        HandlerLoad {
            handler_id,
            pending_count,
        }
    }

    #[test]
    fn test_pick_least_loaded_prefers_min_count() {
        let loads = [load(1, 3), load(2, 0), load(3, 1)];
        assert_eq!(pick_least_loaded(&loads), Some(2));
    }

    #[test]
    fn test_pick_least_loaded_breaks_ties_by_lowest_id() {
        let loads = [load(9, 2), load(4, 2), load(7, 2)];
        assert_eq!(pick_least_loaded(&loads), Some(4));
    }

    #[test]
    fn test_pick_least_loaded_empty() {
        assert_eq!(pick_least_loaded(&[]), None);
    }

    async fn seed_assigned(pool: &PgPool, owner: i64, handler: i64, status: IncidentStatus) {
        let mut new = NewIncident::draft(owner, None, None, false);
        new.assigned_handler_id = Some(handler);
        new.status = status;
        IncidentStore::insert_incident(pool, &new).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_sql_order_matches_pick_least_loaded(pool: PgPool) {
        let owner = insert_user(&pool, false, true).await;
        let busy = insert_user(&pool, true, true).await;
        let idle_a = insert_user(&pool, true, true).await;
        let idle_b = insert_user(&pool, true, true).await;
        let _inactive = insert_user(&pool, true, false).await;

        seed_assigned(&pool, owner, busy, IncidentStatus::Pending).await;
        // only pending work counts as load
        seed_assigned(&pool, owner, idle_a, IncidentStatus::Rejected).await;

        let loads = IncidentStore::list_handler_loads(&pool).await.unwrap();
        assert_eq!(loads.len(), 3);

        let first_in_sql_order = loads.first().map(|l| l.handler_id);
        assert_eq!(first_in_sql_order, pick_least_loaded(&loads));
        assert_eq!(first_in_sql_order, Some(idle_a.min(idle_b)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_no_active_handler_leaves_unassigned(pool: PgPool) {
        let owner = insert_user(&pool, false, true).await;
        let _inactive = insert_user(&pool, true, false).await;
        let id = IncidentStore::insert_incident(&pool, &NewIncident::draft(owner, None, None, false))
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let assigned = AssignmentPolicy::assign_new_incident(&mut conn, id)
            .await
            .unwrap();
        assert_eq!(assigned, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_assignment_spreads_load(pool: PgPool) {
        let owner = insert_user(&pool, false, true).await;
        let h1 = insert_user(&pool, true, true).await;
        let h2 = insert_user(&pool, true, true).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut assigned = Vec::new();
        for _ in 0..4 {
            let id = IncidentStore::insert_incident(
                &mut *conn,
                &NewIncident::draft(owner, None, None, false),
            )
            .await
            .unwrap();
            assigned.push(
                AssignmentPolicy::assign_new_incident(&mut conn, id)
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(assigned, vec![Some(h1), Some(h2), Some(h1), Some(h2)]);
    }
}
