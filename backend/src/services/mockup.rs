//! Mockup and modification request service
//!
//! Both request types share the `Sent → Started → Returned` progress rules
//! from the domain model; this service loads rows under lock, applies the
//! transition and writes the result back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    check_revision_chain, Actor, MockupRequest, ModificationRequest, PageParams, RequestProgress,
    RequestStatus, ReturnDesignInput, Role,
};

/// Mockup service
#[derive(Clone)]
pub struct MockupService {
    db: PgPool,
}

/// Input for raising a mockup request
#[derive(Debug, Deserialize)]
pub struct CreateMockupInput {
    pub lead_id: Uuid,
    pub designer_id: Uuid,
    pub note: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// Input for raising a modification request
#[derive(Debug, Deserialize)]
pub struct CreateModificationInput {
    pub mockup_id: Uuid,
    pub prev_modification_id: Option<Uuid>,
    /// Defaults to the designer of the mockup
    pub designer_id: Option<Uuid>,
    pub note: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// Filters accepted by request listings
#[derive(Debug, Default, Deserialize)]
pub struct RequestFilter {
    pub lead_id: Option<Uuid>,
    pub mockup_id: Option<Uuid>,
    pub designer_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
}

#[derive(Debug, FromRow)]
struct MockupRow {
    id: Uuid,
    lead_id: Uuid,
    requested_by: Uuid,
    designer_id: Uuid,
    status: String,
    note: Option<String>,
    reference_images: Vec<String>,
    mockup_image: Option<String>,
    price: Option<Decimal>,
    started_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    requested_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ModificationRow {
    id: Uuid,
    mockup_id: Uuid,
    prev_modification_id: Option<Uuid>,
    requested_by: Uuid,
    designer_id: Uuid,
    status: String,
    note: Option<String>,
    reference_images: Vec<String>,
    mockup_image: Option<String>,
    price: Option<Decimal>,
    started_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    requested_at: DateTime<Utc>,
}

fn progress(
    designer_id: Uuid,
    status: &str,
    mockup_image: Option<String>,
    price: Option<Decimal>,
    started_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
) -> AppResult<RequestProgress> {
    let status = RequestStatus::parse(status)
        .ok_or_else(|| AppError::Internal(format!("unknown request status {}", status)))?;
    Ok(RequestProgress {
        designer_id,
        status,
        mockup_image,
        price,
        started_at,
        returned_at,
    })
}

impl TryFrom<MockupRow> for MockupRequest {
    type Error = AppError;

    fn try_from(row: MockupRow) -> AppResult<Self> {
        Ok(MockupRequest {
            id: row.id,
            lead_id: row.lead_id,
            requested_by: row.requested_by,
            note: row.note,
            reference_images: row.reference_images,
            progress: progress(
                row.designer_id,
                &row.status,
                row.mockup_image,
                row.price,
                row.started_at,
                row.returned_at,
            )?,
            requested_at: row.requested_at,
        })
    }
}

impl TryFrom<ModificationRow> for ModificationRequest {
    type Error = AppError;

    fn try_from(row: ModificationRow) -> AppResult<Self> {
        Ok(ModificationRequest {
            id: row.id,
            mockup_id: row.mockup_id,
            prev_modification_id: row.prev_modification_id,
            requested_by: row.requested_by,
            note: row.note,
            reference_images: row.reference_images,
            progress: progress(
                row.designer_id,
                &row.status,
                row.mockup_image,
                row.price,
                row.started_at,
                row.returned_at,
            )?,
            requested_at: row.requested_at,
        })
    }
}

const MOCKUP_COLUMNS: &str = "id, lead_id, requested_by, designer_id, status, note, \
     reference_images, mockup_image, price, started_at, returned_at, requested_at";

const MODIFICATION_COLUMNS: &str = "id, mockup_id, prev_modification_id, requested_by, \
     designer_id, status, note, reference_images, mockup_image, price, started_at, \
     returned_at, requested_at";

impl MockupService {
    /// Create a new MockupService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Mockup requests
    // ========================================================================

    /// Raise a mockup request against a lead
    pub async fn create_mockup(
        &self,
        actor: &Actor,
        input: CreateMockupInput,
    ) -> AppResult<MockupRequest> {
        actor.require(&[Role::Sales], "request mockups")?;

        let lead_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM leads WHERE id = $1)")
                .bind(input.lead_id)
                .fetch_one(&self.db)
                .await?;
        if !lead_exists {
            return Err(AppError::validation("lead_id", "lead does not exist"));
        }

        let open = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM mockup_requests
                WHERE lead_id = $1 AND designer_id = $2 AND status <> 'returned'
            )
            "#,
        )
        .bind(input.lead_id)
        .bind(input.designer_id)
        .fetch_one(&self.db)
        .await?;
        if open {
            return Err(AppError::validation(
                "designer_id",
                "the designer already has an open mockup request for this lead",
            ));
        }

        let row = sqlx::query_as::<_, MockupRow>(&format!(
            r#"
            INSERT INTO mockup_requests (lead_id, requested_by, designer_id, note, reference_images)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MOCKUP_COLUMNS
        ))
        .bind(input.lead_id)
        .bind(actor.user_id)
        .bind(input.designer_id)
        .bind(&input.note)
        .bind(&input.reference_images)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            "Mockup request {} sent to designer {}",
            row.id,
            row.designer_id
        );
        row.try_into()
    }

    /// Get a mockup request by id
    pub async fn get_mockup(&self, mockup_id: Uuid) -> AppResult<MockupRequest> {
        sqlx::query_as::<_, MockupRow>(&format!(
            "SELECT {} FROM mockup_requests WHERE id = $1",
            MOCKUP_COLUMNS
        ))
        .bind(mockup_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Mockup request".to_string()))?
        .try_into()
    }

    /// List mockup requests, newest first
    pub async fn list_mockups(
        &self,
        filter: &RequestFilter,
        params: PageParams,
    ) -> AppResult<(Vec<MockupRequest>, u64)> {
        let params = params.normalized();

        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM mockup_requests WHERE TRUE");
        push_request_filter(&mut count_query, filter, false);
        let count: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM mockup_requests WHERE TRUE",
            MOCKUP_COLUMNS
        ));
        push_request_filter(&mut query, filter, false);
        push_page(&mut query, params);

        let rows = query.build_query_as::<MockupRow>().fetch_all(&self.db).await?;
        let mockups = rows
            .into_iter()
            .map(MockupRequest::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((mockups, count as u64))
    }

    /// Designer starts work on a mockup request
    pub async fn start_mockup(&self, actor: &Actor, mockup_id: Uuid) -> AppResult<MockupRequest> {
        let mut tx = self.db.begin().await?;
        let mut mockup = lock_mockup(&mut tx, mockup_id).await?;

        mockup.progress.start(actor, Utc::now())?;
        store_progress(&mut tx, "mockup_requests", mockup.id, &mockup.progress).await?;

        tx.commit().await?;
        tracing::info!("Mockup request {} started", mockup.id);
        Ok(mockup)
    }

    /// Designer returns a mockup with its image and price
    pub async fn return_mockup(
        &self,
        actor: &Actor,
        mockup_id: Uuid,
        input: ReturnDesignInput,
    ) -> AppResult<MockupRequest> {
        let mut tx = self.db.begin().await?;
        let mut mockup = lock_mockup(&mut tx, mockup_id).await?;

        mockup.progress.return_design(actor, input, Utc::now())?;
        store_progress(&mut tx, "mockup_requests", mockup.id, &mockup.progress).await?;

        tx.commit().await?;
        tracing::info!("Mockup request {} returned", mockup.id);
        Ok(mockup)
    }

    // ========================================================================
    // Modification requests
    // ========================================================================

    /// Raise a revision of a returned mockup
    ///
    /// The predecessor, when given, must be a returned modification of the
    /// same mockup, and the resulting chain must stay acyclic.
    pub async fn create_modification(
        &self,
        actor: &Actor,
        input: CreateModificationInput,
    ) -> AppResult<ModificationRequest> {
        actor.require(&[Role::Sales], "request modifications")?;

        let mut tx = self.db.begin().await?;
        let mockup = lock_mockup(&mut tx, input.mockup_id).await?;
        if !mockup.progress.is_returned() {
            return Err(AppError::InvalidStateTransition(format!(
                "mockup request {} is {}; only returned mockups can be modified",
                mockup.id, mockup.progress.status
            )));
        }

        let links = chain_links(&mut tx, mockup.id).await?;
        if let Some(prev_id) = input.prev_modification_id {
            match links.get(&prev_id) {
                None => {
                    return Err(AppError::validation(
                        "prev_modification_id",
                        "previous modification does not belong to this mockup",
                    ))
                }
                Some((_, status)) if *status != RequestStatus::Returned => {
                    return Err(AppError::validation(
                        "prev_modification_id",
                        "previous modification has not been returned",
                    ))
                }
                Some(_) => {}
            }
        }

        let id = Uuid::new_v4();
        check_revision_chain(id, input.prev_modification_id, |link| {
            links.get(&link).map(|(prev, _)| *prev)
        })?;

        let designer_id = input.designer_id.unwrap_or(mockup.progress.designer_id);
        let row = sqlx::query_as::<_, ModificationRow>(&format!(
            r#"
            INSERT INTO modification_requests
                (id, mockup_id, prev_modification_id, requested_by, designer_id, note, reference_images)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            MODIFICATION_COLUMNS
        ))
        .bind(id)
        .bind(mockup.id)
        .bind(input.prev_modification_id)
        .bind(actor.user_id)
        .bind(designer_id)
        .bind(&input.note)
        .bind(&input.reference_images)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            "Modification request {} raised on mockup {}",
            row.id,
            row.mockup_id
        );
        row.try_into()
    }

    /// Get a modification request by id
    pub async fn get_modification(&self, modification_id: Uuid) -> AppResult<ModificationRequest> {
        sqlx::query_as::<_, ModificationRow>(&format!(
            "SELECT {} FROM modification_requests WHERE id = $1",
            MODIFICATION_COLUMNS
        ))
        .bind(modification_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Modification request".to_string()))?
        .try_into()
    }

    /// List modification requests, newest first
    pub async fn list_modifications(
        &self,
        filter: &RequestFilter,
        params: PageParams,
    ) -> AppResult<(Vec<ModificationRequest>, u64)> {
        let params = params.normalized();

        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM modification_requests WHERE TRUE");
        push_request_filter(&mut count_query, filter, true);
        let count: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM modification_requests WHERE TRUE",
            MODIFICATION_COLUMNS
        ));
        push_request_filter(&mut query, filter, true);
        push_page(&mut query, params);

        let rows = query
            .build_query_as::<ModificationRow>()
            .fetch_all(&self.db)
            .await?;
        let modifications = rows
            .into_iter()
            .map(ModificationRequest::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((modifications, count as u64))
    }

    /// Designer starts work on a modification request
    pub async fn start_modification(
        &self,
        actor: &Actor,
        modification_id: Uuid,
    ) -> AppResult<ModificationRequest> {
        let mut tx = self.db.begin().await?;
        let mut modification = lock_modification(&mut tx, modification_id).await?;

        modification.progress.start(actor, Utc::now())?;
        store_progress(&mut tx, "modification_requests", modification.id, &modification.progress)
            .await?;

        tx.commit().await?;
        tracing::info!("Modification request {} started", modification.id);
        Ok(modification)
    }

    /// Designer returns a modification with its image and price
    pub async fn return_modification(
        &self,
        actor: &Actor,
        modification_id: Uuid,
        input: ReturnDesignInput,
    ) -> AppResult<ModificationRequest> {
        let mut tx = self.db.begin().await?;
        let mut modification = lock_modification(&mut tx, modification_id).await?;

        modification.progress.return_design(actor, input, Utc::now())?;
        store_progress(&mut tx, "modification_requests", modification.id, &modification.progress)
            .await?;

        tx.commit().await?;
        tracing::info!("Modification request {} returned", modification.id);
        Ok(modification)
    }

    /// A modification followed by its predecessors, newest first
    pub async fn revision_chain(&self, modification_id: Uuid) -> AppResult<Vec<ModificationRequest>> {
        let head = self.get_modification(modification_id).await?;

        let mut conn = self.db.acquire().await?;
        let links = chain_links(&mut conn, head.mockup_id).await?;
        let chain = check_revision_chain(Uuid::nil(), Some(head.id), |link| {
            links.get(&link).map(|(prev, _)| *prev)
        })?;

        let rows = sqlx::query_as::<_, ModificationRow>(&format!(
            "SELECT {} FROM modification_requests WHERE id = ANY($1)",
            MODIFICATION_COLUMNS
        ))
        .bind(&chain)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_id: HashMap<Uuid, ModificationRequest> = rows
            .into_iter()
            .map(|row| ModificationRequest::try_from(row).map(|m| (m.id, m)))
            .collect::<AppResult<_>>()?;

        Ok(chain.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

async fn lock_mockup(conn: &mut PgConnection, mockup_id: Uuid) -> AppResult<MockupRequest> {
    sqlx::query_as::<_, MockupRow>(&format!(
        "SELECT {} FROM mockup_requests WHERE id = $1 FOR UPDATE",
        MOCKUP_COLUMNS
    ))
    .bind(mockup_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Mockup request".to_string()))?
    .try_into()
}

async fn lock_modification(
    conn: &mut PgConnection,
    modification_id: Uuid,
) -> AppResult<ModificationRequest> {
    sqlx::query_as::<_, ModificationRow>(&format!(
        "SELECT {} FROM modification_requests WHERE id = $1 FOR UPDATE",
        MODIFICATION_COLUMNS
    ))
    .bind(modification_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Modification request".to_string()))?
    .try_into()
}

/// Predecessor and status of every modification raised on a mockup
async fn chain_links(
    conn: &mut PgConnection,
    mockup_id: Uuid,
) -> AppResult<HashMap<Uuid, (Option<Uuid>, RequestStatus)>> {
    let rows = sqlx::query_as::<_, (Uuid, Option<Uuid>, String)>(
        "SELECT id, prev_modification_id, status FROM modification_requests WHERE mockup_id = $1",
    )
    .bind(mockup_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|(id, prev, status)| {
            RequestStatus::parse(&status)
                .map(|s| (id, (prev, s)))
                .ok_or_else(|| AppError::Internal(format!("unknown request status {}", status)))
        })
        .collect()
}

async fn store_progress(
    conn: &mut PgConnection,
    table: &str,
    id: Uuid,
    progress: &RequestProgress,
) -> AppResult<()> {
    sqlx::query(&format!(
        r#"
        UPDATE {}
        SET status = $1, mockup_image = $2, price = $3, started_at = $4, returned_at = $5
        WHERE id = $6
        "#,
        table
    ))
    .bind(progress.status.as_str())
    .bind(&progress.mockup_image)
    .bind(progress.price)
    .bind(progress.started_at)
    .bind(progress.returned_at)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

fn push_request_filter(
    query: &mut QueryBuilder<'_, Postgres>,
    filter: &RequestFilter,
    modifications: bool,
) {
    if modifications {
        if let Some(mockup_id) = filter.mockup_id {
            query.push(" AND mockup_id = ").push_bind(mockup_id);
        }
    } else if let Some(lead_id) = filter.lead_id {
        query.push(" AND lead_id = ").push_bind(lead_id);
    }
    if let Some(designer_id) = filter.designer_id {
        query.push(" AND designer_id = ").push_bind(designer_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
}

fn push_page(query: &mut QueryBuilder<'_, Postgres>, params: PageParams) {
    query
        .push(" ORDER BY requested_at DESC LIMIT ")
        .push_bind(i64::from(params.limit))
        .push(" OFFSET ")
        .push_bind(i64::from(params.offset));
}
