//! Persistence for incidents and their categories and attachments.
//!
//! Statements that belong to a multi-step write take a `&mut PgConnection`
//! (or any executor) so they run on the connection leased by
//! [`IncidentStore::run_in_transaction`]. Read-only projections go straight
//! to the pool.

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::core::error::{map_insert_error, AppError, Result};
use crate::features::incidents::models::{
    Attachment, HandlerLoad, Incident, IncidentFieldsPatch, IncidentStatus, IncidentSummaryRow,
    NewAttachment, NewIncident, OwnedIncidentRow, PublicIncidentRow,
};
use crate::shared::domain::host_of;

const INCIDENT_COLUMNS: &str = "i.id, i.owner_user_id, i.user_id, i.page_url, i.domain, \
     i.description, i.anonymous, i.status, i.assigned_admin_id, i.is_published, \
     i.created_at, i.updated_at";

const ATTACHMENT_COLUMNS: &str =
    "a.id, a.incident_id, a.path, a.mime_type, a.size_bytes, a.created_at";

/// Joins the earliest category of `i` as `fc.category_id` / `c.name`
const FIRST_CATEGORY_JOIN: &str = "LEFT JOIN LATERAL ( \
         SELECT ic.category_id FROM incident_categories ic \
          WHERE ic.incident_id = i.id \
          ORDER BY ic.created_at ASC, ic.category_id ASC \
          LIMIT 1 \
     ) fc ON TRUE \
     LEFT JOIN categories c ON c.id = fc.category_id";

/// Attachments of `a` that count as a cover image; the cover shown is the
/// lowest id among them
pub(crate) const COVER_ATTACHMENT_FILTER: &str =
    "(a.mime_type LIKE 'image/%' OR a.mime_type IS NULL)";

/// Published-only projection shared with the public catalog
pub(crate) fn public_incident_select() -> String {
    format!(
        "SELECT i.id, i.page_url, i.domain, i.description, i.anonymous, \
                u.name AS user_name, fc.category_id, c.name AS category_name, \
                (SELECT a.path FROM attachments a \
                  WHERE a.incident_id = i.id \
                    AND {COVER_ATTACHMENT_FILTER} \
                  ORDER BY a.id ASC LIMIT 1) AS cover_path, \
                i.created_at \
           FROM incidents i \
           LEFT JOIN users u ON u.id = i.user_id \
           {FIRST_CATEGORY_JOIN} \
          WHERE i.status = 'published' AND i.is_published = TRUE"
    )
}

/// Why a transaction did not report success
#[derive(Debug)]
pub enum TransactionError {
    /// Nothing `work` wrote is visible
    RolledBack(AppError),
    /// COMMIT itself failed; the writes may already be durable
    Commit(AppError),
}

impl TransactionError {
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack(_))
    }
}

impl From<TransactionError> for AppError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::RolledBack(e) | TransactionError::Commit(e) => e,
        }
    }
}

/// Incident persistence and the transaction envelope
#[derive(Clone)]
pub struct IncidentStore {
    pool: PgPool,
}

impl IncidentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `work` on a single transaction connection
    ///
    /// Commits once when `work` succeeds. Any error rolls back every statement
    /// `work` issued; a failing rollback is logged and the original error is
    /// returned. The connection goes back to the pool on every path.
    pub async fn run_in_transaction<T, F>(&self, work: F) -> std::result::Result<T, TransactionError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            TransactionError::RolledBack(AppError::Database(e))
        })?;

        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(|e| {
                    tracing::error!("Failed to commit transaction: {:?}", e);
                    TransactionError::Commit(AppError::Database(e))
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("Failed to roll back transaction: {:?}", rollback_err);
                }
                Err(TransactionError::RolledBack(err))
            }
        }
    }

    // ---- writes (transaction-scoped) -------------------------------------

    /// Insert an incident and return its id
    ///
    /// `domain` is derived from `page_url`. An owner without an account row is
    /// reported as Forbidden.
    pub async fn insert_incident<'e, E>(executor: E, new: &NewIncident) -> Result<i64>
    where
        E: PgExecutor<'e>,
    {
        let domain = new.page_url.as_deref().and_then(host_of);

        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO incidents
                (owner_user_id, user_id, page_url, domain, description, anonymous,
                 status, assigned_admin_id, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(new.owner_id)
        .bind(new.display_id)
        .bind(&new.page_url)
        .bind(domain)
        .bind(&new.description)
        .bind(new.anonymous)
        .bind(new.status)
        .bind(new.assigned_handler_id)
        .bind(new.is_published)
        .fetch_one(executor)
        .await
        .map_err(map_insert_error)
    }

    /// Link categories to an incident; existing links are kept
    pub async fn insert_categories<'e, E>(
        executor: E,
        incident_id: i64,
        category_ids: &[i64],
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        if category_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO incident_categories (incident_id, category_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(incident_id)
        .bind(category_ids)
        .execute(executor)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    /// Replace every category link of an incident with `category_ids`
    pub async fn replace_categories_for_incident(
        conn: &mut PgConnection,
        incident_id: i64,
        category_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM incident_categories WHERE incident_id = $1")
            .bind(incident_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!("Failed to clear categories of incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })?;

        Self::insert_categories(&mut *conn, incident_id, category_ids).await
    }

    /// Insert attachment rows; returned in insertion order
    pub async fn insert_attachments(
        conn: &mut PgConnection,
        incident_id: i64,
        files: &[NewAttachment],
    ) -> Result<Vec<Attachment>> {
        let mut inserted = Vec::with_capacity(files.len());

        for file in files {
            let attachment = sqlx::query_as::<_, Attachment>(
                r#"
                INSERT INTO attachments (incident_id, path, mime_type, size_bytes)
                VALUES ($1, $2, $3, $4)
                RETURNING id, incident_id, path, mime_type, size_bytes, created_at
                "#,
            )
            .bind(incident_id)
            .bind(&file.path)
            .bind(&file.mime_type)
            .bind(file.size_bytes)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert attachment for incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })?;

            inserted.push(attachment);
        }

        Ok(inserted)
    }

    /// Cover-kind attachments of an owned incident that is still editable,
    /// lowest id first
    pub async fn find_owned_cover_attachments<'e, E>(
        executor: E,
        owner_id: i64,
        incident_id: i64,
    ) -> Result<Vec<Attachment>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
              FROM attachments a
              JOIN incidents i ON i.id = a.incident_id
             WHERE a.incident_id = $1
               AND i.owner_user_id = $2
               AND i.status = 'pending'
               AND i.is_published = FALSE
               AND {COVER_ATTACHMENT_FILTER}
             ORDER BY a.id ASC
            "#
        );

        sqlx::query_as::<_, Attachment>(&query)
            .bind(incident_id)
            .bind(owner_id)
            .fetch_all(executor)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch cover of incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })
    }

    /// Delete one attachment row of an owned, editable incident
    pub async fn delete_owned_attachment<'e, E>(
        executor: E,
        owner_id: i64,
        incident_id: i64,
        attachment_id: i64,
    ) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM attachments a
             USING incidents i
             WHERE a.id = $1
               AND a.incident_id = $2
               AND i.id = a.incident_id
               AND i.owner_user_id = $3
               AND i.status = 'pending'
               AND i.is_published = FALSE
            "#,
        )
        .bind(attachment_id)
        .bind(incident_id)
        .bind(owner_id)
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete attachment {}: {:?}", attachment_id, e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Lock an owned, non-deleted incident row for the rest of the transaction
    pub async fn find_owned_for_update_locked<'e, E>(
        executor: E,
        owner_id: i64,
        incident_id: i64,
    ) -> Result<Option<Incident>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            SELECT {INCIDENT_COLUMNS}
              FROM incidents i
             WHERE i.id = $1
               AND i.owner_user_id = $2
               AND i.status <> 'deleted'
               FOR UPDATE
            "#
        );

        sqlx::query_as::<_, Incident>(&query)
            .bind(incident_id)
            .bind(owner_id)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                tracing::error!("Failed to lock incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })
    }

    /// Soft-delete an owned incident; rows already deleted are not touched
    pub async fn soft_delete<'e, E>(executor: E, owner_id: i64, incident_id: i64) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE incidents
               SET status = $3,
                   is_published = FALSE,
                   updated_at = NOW()
             WHERE id = $1
               AND owner_user_id = $2
               AND status <> $3
            "#,
        )
        .bind(incident_id)
        .bind(owner_id)
        .bind(IncidentStatus::soft_delete_target())
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to soft-delete incident {}: {:?}", incident_id, e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// Update owner-editable fields inside the editable window
    ///
    /// The window is part of the WHERE clause and `updated_at` is always
    /// bumped, so `false` means the row is missing, foreign or not editable.
    pub async fn update_owned_fields<'e, E>(
        executor: E,
        owner_id: i64,
        incident_id: i64,
        fields: &IncidentFieldsPatch,
    ) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let domain = fields.page_url.as_deref().and_then(host_of);

        let result = sqlx::query(
            r#"
            UPDATE incidents
               SET page_url = COALESCE($3, page_url),
                   domain = CASE WHEN $3::TEXT IS NULL THEN domain ELSE $4 END,
                   description = COALESCE($5, description),
                   updated_at = NOW()
             WHERE id = $1
               AND owner_user_id = $2
               AND status = 'pending'
               AND is_published = FALSE
            "#,
        )
        .bind(incident_id)
        .bind(owner_id)
        .bind(&fields.page_url)
        .bind(domain)
        .bind(&fields.description)
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update incident {}: {:?}", incident_id, e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    // ---- assignment ------------------------------------------------------

    /// Pending workload of every active handler, least loaded first and
    /// lowest id first on ties
    pub async fn list_handler_loads<'e, E>(executor: E) -> Result<Vec<HandlerLoad>>
    where
        E: PgExecutor<'e>,
    {
        let query = r#"
            SELECT u.id AS handler_id,
                   (SELECT COUNT(*)
                      FROM incidents i
                     WHERE i.assigned_admin_id = u.id
                       AND i.status = 'pending') AS pending_count
              FROM users u
             WHERE u.is_admin = TRUE
               AND u.user_status = 'active'
             ORDER BY pending_count ASC, u.id ASC
        "#;

        sqlx::query_as::<_, HandlerLoad>(query)
            .fetch_all(executor)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list handler loads: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Set the handler only while the incident has none
    pub async fn assign_handler_if_empty<'e, E>(
        executor: E,
        incident_id: i64,
        handler_id: i64,
    ) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE incidents
               SET assigned_admin_id = $2
             WHERE id = $1
               AND assigned_admin_id IS NULL
            "#,
        )
        .bind(incident_id)
        .bind(handler_id)
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to assign incident {}: {:?}", incident_id, e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    // ---- reads -----------------------------------------------------------

    pub async fn find_by_id<'e, E>(executor: E, incident_id: i64) -> Result<Option<Incident>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {INCIDENT_COLUMNS} FROM incidents i WHERE i.id = $1");

        sqlx::query_as::<_, Incident>(&query)
            .bind(incident_id)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })
    }

    /// Attachments of an incident by ascending id
    pub async fn list_attachments<'e, E>(executor: E, incident_id: i64) -> Result<Vec<Attachment>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments a WHERE a.incident_id = $1 ORDER BY a.id ASC"
        );

        sqlx::query_as::<_, Attachment>(&query)
            .bind(incident_id)
            .fetch_all(executor)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list attachments of incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })
    }

    pub async fn find_published_by_id(&self, incident_id: i64) -> Result<Option<PublicIncidentRow>> {
        let query = format!("{} AND i.id = $1", public_incident_select());

        sqlx::query_as::<_, PublicIncidentRow>(&query)
            .bind(incident_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch published incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })
    }

    /// Owned, non-deleted incident with first category and attachment count
    pub async fn find_owned_detail<'e, E>(
        executor: E,
        owner_id: i64,
        incident_id: i64,
    ) -> Result<Option<OwnedIncidentRow>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            SELECT {INCIDENT_COLUMNS},
                   fc.category_id,
                   c.name AS category_name,
                   (SELECT COUNT(*) FROM attachments a WHERE a.incident_id = i.id) AS attachment_count
              FROM incidents i
              {FIRST_CATEGORY_JOIN}
             WHERE i.id = $1
               AND i.owner_user_id = $2
               AND i.status <> 'deleted'
            "#
        );

        sqlx::query_as::<_, OwnedIncidentRow>(&query)
            .bind(incident_id)
            .bind(owner_id)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch owned incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })
    }

    /// Non-deleted incidents of an owner, newest first
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<IncidentSummaryRow>> {
        let query = format!(
            r#"
            SELECT {INCIDENT_COLUMNS},
                   c.name AS category_name
              FROM incidents i
              {FIRST_CATEGORY_JOIN}
             WHERE i.owner_user_id = $1
               AND i.status <> 'deleted'
             ORDER BY i.created_at DESC, i.id DESC
            "#
        );

        sqlx::query_as::<_, IncidentSummaryRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list incidents of owner {}: {:?}", owner_id, e);
                AppError::Database(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{category_id, insert_user, publish};

    #[test]
    fn test_public_select_is_published_only() {
        let sql = public_incident_select();
        assert!(sql.contains("i.status = 'published' AND i.is_published = TRUE"));
        assert!(sql.contains(COVER_ATTACHMENT_FILTER));
    }

    async fn insert_draft(store: &IncidentStore, owner: i64, url: Option<&str>) -> i64 {
        let new = NewIncident::draft(
            owner,
            url.map(str::to_string),
            Some("suspicious checkout page".to_string()),
            false,
        );
        IncidentStore::insert_incident(store.pool(), &new)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_insert_derives_domain(pool: PgPool) {
        let store = IncidentStore::new(pool);
        let owner = insert_user(store.pool(), false, true).await;
        let id = insert_draft(&store, owner, Some("https://WWW.Shop.Example:8443/x")).await;

        let incident = IncidentStore::find_by_id(store.pool(), id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(incident.domain.as_deref(), Some("www.shop.example"));
        assert_eq!(incident.status, IncidentStatus::Pending);
        assert_eq!(incident.user_id, Some(owner));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_insert_for_unknown_owner_is_forbidden(pool: PgPool) {
        let new = NewIncident::draft(999_999, None, None, true);
        let err = IncidentStore::insert_incident(&pool, &new)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_failed_transaction_rolls_back_every_statement(pool: PgPool) {
        let store = IncidentStore::new(pool);
        let owner = insert_user(store.pool(), false, true).await;

        let result = store
            .run_in_transaction(move |conn| {
                Box::pin(async move {
                    let id = IncidentStore::insert_incident(
                        &mut *conn,
                        &NewIncident::draft(owner, None, None, false),
                    )
                    .await?;
                    IncidentStore::insert_attachments(
                        conn,
                        id,
                        &[NewAttachment {
                            path: "public/uploads/a.png".to_string(),
                            mime_type: Some("image/png".to_string()),
                            size_bytes: Some(3),
                        }],
                    )
                    .await?;
                    // unknown category makes the whole unit fail
                    IncidentStore::insert_categories(&mut *conn, id, &[424_242]).await?;
                    Ok(id)
                })
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_rolled_back());
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
        let incidents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incidents")
            .fetch_one(store.pool())
            .await
            .unwrap();
        let attachments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!((incidents, attachments), (0, 0));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_replace_categories_is_idempotent(pool: PgPool) {
        let store = IncidentStore::new(pool);
        let owner = insert_user(store.pool(), false, true).await;
        let id = insert_draft(&store, owner, None).await;
        let phishing = category_id(store.pool(), "Phishing").await;
        let malware = category_id(store.pool(), "Malware").await;

        let mut conn = store.pool().acquire().await.unwrap();
        IncidentStore::insert_categories(&mut *conn, id, &[phishing, malware])
            .await
            .unwrap();
        IncidentStore::replace_categories_for_incident(&mut conn, id, &[malware, malware])
            .await
            .unwrap();
        IncidentStore::replace_categories_for_incident(&mut conn, id, &[malware])
            .await
            .unwrap();

        let linked: Vec<i64> = sqlx::query_scalar(
            "SELECT category_id FROM incident_categories WHERE incident_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .unwrap();
        assert_eq!(linked, vec![malware]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_update_is_gated_by_editable_window(pool: PgPool) {
        let store = IncidentStore::new(pool);
        let owner = insert_user(store.pool(), false, true).await;
        let stranger = insert_user(store.pool(), false, true).await;
        let id = insert_draft(&store, owner, Some("https://a.example")).await;

        let patch = IncidentFieldsPatch {
            page_url: Some("https://b.example/page".to_string()),
            description: None,
        };
        assert!(!IncidentStore::update_owned_fields(store.pool(), stranger, id, &patch)
            .await
            .unwrap());
        assert!(IncidentStore::update_owned_fields(store.pool(), owner, id, &patch)
            .await
            .unwrap());

        let incident = IncidentStore::find_by_id(store.pool(), id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(incident.domain.as_deref(), Some("b.example"));
        assert_eq!(
            incident.description.as_deref(),
            Some("suspicious checkout page")
        );

        // an empty patch still counts as a successful write in the window
        assert!(IncidentStore::update_owned_fields(
            store.pool(),
            owner,
            id,
            &IncidentFieldsPatch::default()
        )
        .await
        .unwrap());

        publish(store.pool(), id).await;
        assert!(!IncidentStore::update_owned_fields(store.pool(), owner, id, &patch)
            .await
            .unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_soft_delete_hides_from_owner_reads(pool: PgPool) {
        let store = IncidentStore::new(pool);
        let owner = insert_user(store.pool(), false, true).await;
        let id = insert_draft(&store, owner, None).await;

        assert!(IncidentStore::soft_delete(store.pool(), owner, id)
            .await
            .unwrap());
        assert!(!IncidentStore::soft_delete(store.pool(), owner, id)
            .await
            .unwrap());

        assert!(IncidentStore::find_owned_detail(store.pool(), owner, id)
            .await
            .unwrap()
            .is_none());
        assert!(store.list_by_owner(owner).await.unwrap().is_empty());
        let row = IncidentStore::find_by_id(store.pool(), id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, IncidentStatus::Deleted);
        assert!(!row.is_published);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_assign_if_empty_never_reassigns(pool: PgPool) {
        let store = IncidentStore::new(pool);
        let owner = insert_user(store.pool(), false, true).await;
        let first = insert_user(store.pool(), true, true).await;
        let second = insert_user(store.pool(), true, true).await;
        let id = insert_draft(&store, owner, None).await;

        assert!(IncidentStore::assign_handler_if_empty(store.pool(), id, first)
            .await
            .unwrap());
        assert!(!IncidentStore::assign_handler_if_empty(store.pool(), id, second)
            .await
            .unwrap());

        let incident = IncidentStore::find_by_id(store.pool(), id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(incident.assigned_admin_id, Some(first));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_cover_attachments_are_images_of_editable_owned_incident(pool: PgPool) {
        let store = IncidentStore::new(pool);
        let owner = insert_user(store.pool(), false, true).await;
        let id = insert_draft(&store, owner, None).await;

        let file = |path: &str, mime: Option<&str>| NewAttachment {
            path: path.to_string(),
            mime_type: mime.map(str::to_string),
            size_bytes: Some(1),
        };
        let mut conn = store.pool().acquire().await.unwrap();
        let rows = IncidentStore::insert_attachments(
            &mut conn,
            id,
            &[
                file("public/uploads/1.png", Some("image/png")),
                file("public/uploads/doc.pdf", Some("application/pdf")),
                file("public/uploads/legacy", None),
            ],
        )
        .await
        .unwrap();
        assert_eq!(rows[0].path, "public/uploads/1.png");
        assert_eq!(rows[2].path, "public/uploads/legacy");

        let covers: Vec<i64> = IncidentStore::find_owned_cover_attachments(&mut *conn, owner, id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(covers, vec![rows[0].id, rows[2].id]);

        let stranger = insert_user(store.pool(), false, true).await;
        assert!(IncidentStore::find_owned_cover_attachments(&mut *conn, stranger, id)
            .await
            .unwrap()
            .is_empty());

        publish(store.pool(), id).await;
        assert!(IncidentStore::find_owned_cover_attachments(&mut *conn, owner, id)
            .await
            .unwrap()
            .is_empty());
        assert!(
            !IncidentStore::delete_owned_attachment(&mut *conn, owner, id, rows[0].id)
                .await
                .unwrap()
        );
    }
}
