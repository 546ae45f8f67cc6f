//! Release service: inventory movements and their confirmation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::material::decrement_stock;
use super::order::lock_order;
use crate::error::{AppError, AppResult};
use crate::models::{
    confirm_pending_adds, pending_add_releases, Actor, PageParams, Release, ReleaseDraft,
    ReleaseFilter, ReleaseReason, ReleaseTarget, Role,
};

/// Release service
#[derive(Clone)]
pub struct ReleaseService {
    db: PgPool,
}

/// Input for recording a release
#[derive(Debug, Deserialize)]
pub struct CreateReleaseInput {
    pub material_id: Uuid,
    pub reason: ReleaseReason,
    pub amount: Decimal,
    pub order_code: Option<String>,
    pub maintenance_id: Option<Uuid>,
    pub proof_image: Option<String>,
}

/// Outcome of confirming an order's additional releases
#[derive(Debug, Serialize)]
pub struct ConfirmOrderReleases {
    pub order_code: String,
    pub confirmed_count: usize,
    pub confirmed_ids: Vec<Uuid>,
}

#[derive(Debug, FromRow)]
struct ReleaseRow {
    id: Uuid,
    material_id: Uuid,
    reason: String,
    amount: Decimal,
    order_code: Option<String>,
    maintenance_id: Option<Uuid>,
    sale_id: Option<Uuid>,
    proof_image: Option<String>,
    released_by: Uuid,
    released_at: DateTime<Utc>,
    confirmed: bool,
    confirmed_by: Option<Uuid>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReleaseRow> for Release {
    type Error = AppError;

    fn try_from(row: ReleaseRow) -> AppResult<Self> {
        let reason = ReleaseReason::parse(&row.reason)
            .ok_or_else(|| AppError::Internal(format!("unknown release reason {}", row.reason)))?;
        let target = ReleaseTarget::from_refs(row.order_code, row.maintenance_id, row.sale_id)
            .ok_or_else(|| AppError::Internal(format!("release {} has several targets", row.id)))?;

        Ok(Release {
            id: row.id,
            material_id: row.material_id,
            reason,
            amount: row.amount,
            target,
            proof_image: row.proof_image,
            released_by: row.released_by,
            released_at: row.released_at,
            confirmed: row.confirmed,
            confirmed_by: row.confirmed_by,
            confirmed_at: row.confirmed_at,
        })
    }
}

const RELEASE_COLUMNS: &str = "id, material_id, reason, amount, order_code, maintenance_id, \
     sale_id, proof_image, released_by, released_at, confirmed, confirmed_by, confirmed_at";

impl ReleaseService {
    /// Create a new ReleaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a release and take its amount out of stock
    pub async fn create_release(&self, actor: &Actor, input: CreateReleaseInput) -> AppResult<Release> {
        actor.require(&[Role::Production, Role::StockManager], "release material")?;

        let target = ReleaseTarget::from_refs(input.order_code, input.maintenance_id, None)
            .ok_or_else(|| {
                AppError::validation("target", "a release is tied to at most one order or maintenance")
            })?;
        let draft = ReleaseDraft {
            material_id: input.material_id,
            reason: input.reason,
            amount: input.amount,
            target,
            proof_image: input.proof_image.filter(|p| !p.trim().is_empty()),
        };
        draft.validate()?;

        let mut tx = self.db.begin().await?;
        match &draft.target {
            ReleaseTarget::Order(code) => {
                let order = lock_order(&mut tx, code).await?;
                if order.status.is_terminal() {
                    return Err(AppError::InvalidStateTransition(format!(
                        "order {} is {} and takes no more releases",
                        order.order_code, order.status
                    )));
                }
            }
            ReleaseTarget::Maintenance(id) => {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM maintenances WHERE id = $1)",
                )
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
                if !exists {
                    return Err(AppError::validation("maintenance_id", "maintenance does not exist"));
                }
            }
            ReleaseTarget::Sale(_) | ReleaseTarget::Stock => {}
        }

        let release = insert_release(&mut tx, &draft, actor.user_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Release {} recorded: {} {} of material {}",
            release.id,
            release.reason,
            release.amount,
            release.material_id
        );
        Ok(release)
    }

    /// Get a release by id
    pub async fn get_release(&self, release_id: Uuid) -> AppResult<Release> {
        sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {} FROM releases WHERE id = $1",
            RELEASE_COLUMNS
        ))
        .bind(release_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Release".to_string()))?
        .try_into()
    }

    /// List releases matching the filter, newest first
    pub async fn list_releases(
        &self,
        filter: &ReleaseFilter,
        params: PageParams,
    ) -> AppResult<(Vec<Release>, u64)> {
        let params = params.normalized();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM releases WHERE TRUE");
        push_release_filter(&mut count_query, filter);
        let count: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM releases WHERE TRUE",
            RELEASE_COLUMNS
        ));
        push_release_filter(&mut query, filter);
        query
            .push(" ORDER BY released_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(params.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(params.offset));

        let rows = query.build_query_as::<ReleaseRow>().fetch_all(&self.db).await?;
        let releases = rows
            .into_iter()
            .map(Release::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((releases, count as u64))
    }

    /// Confirm every unconfirmed `Add` release of an order in one transaction
    ///
    /// An order with nothing pending is a successful no-op.
    pub async fn confirm_order_releases(
        &self,
        actor: &Actor,
        order_code: &str,
    ) -> AppResult<ConfirmOrderReleases> {
        actor.require(&[Role::StockManager], "confirm releases")?;

        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, order_code).await?;

        let rows = sqlx::query_as::<_, ReleaseRow>(&format!(
            r#"
            SELECT {} FROM releases
            WHERE order_code = $1 AND reason = 'add' AND NOT confirmed
            FOR UPDATE
            "#,
            RELEASE_COLUMNS
        ))
        .bind(&order.order_code)
        .fetch_all(&mut *tx)
        .await?;
        let mut pending = rows
            .into_iter()
            .map(Release::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let now = Utc::now();
        let outstanding = pending_add_releases(&pending, &order.order_code);
        let confirmed_ids = confirm_pending_adds(&mut pending, &order.order_code, actor, now)?;

        if !confirmed_ids.is_empty() {
            sqlx::query(
                r#"
                UPDATE releases
                SET confirmed = TRUE, confirmed_by = $1, confirmed_at = $2
                WHERE id = ANY($3) AND NOT confirmed
                "#,
            )
            .bind(actor.user_id)
            .bind(now)
            .bind(&confirmed_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            "Confirmed {} of {} pending additional release(s) of order {}",
            confirmed_ids.len(),
            outstanding,
            order.order_code
        );

        Ok(ConfirmOrderReleases {
            order_code: order.order_code,
            confirmed_count: confirmed_ids.len(),
            confirmed_ids,
        })
    }

    /// Confirm a single release; confirming twice keeps the first confirmation
    pub async fn confirm_release(&self, actor: &Actor, release_id: Uuid) -> AppResult<Release> {
        actor.require(&[Role::StockManager], "confirm releases")?;

        let target = self.get_release(release_id).await?.target;

        let mut tx = self.db.begin().await?;
        if let Some(code) = target.order_code() {
            lock_order(&mut tx, code).await?;
        }

        let row = sqlx::query_as::<_, ReleaseRow>(&format!(
            "SELECT {} FROM releases WHERE id = $1 FOR UPDATE",
            RELEASE_COLUMNS
        ))
        .bind(release_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Release".to_string()))?;
        let mut release = Release::try_from(row)?;

        if release.confirm(actor, Utc::now())? {
            sqlx::query(
                "UPDATE releases SET confirmed = TRUE, confirmed_by = $1, confirmed_at = $2 WHERE id = $3",
            )
            .bind(release.confirmed_by)
            .bind(release.confirmed_at)
            .bind(release.id)
            .execute(&mut *tx)
            .await?;
            tracing::info!("Release {} confirmed by {}", release.id, actor.user_id);
        }

        tx.commit().await?;
        Ok(release)
    }
}

/// Insert a release row, then decrement the material's stock
///
/// Runs inside the caller's transaction so a failed decrement rolls back the
/// row as well.
pub(crate) async fn insert_release(
    conn: &mut PgConnection,
    draft: &ReleaseDraft,
    released_by: Uuid,
) -> AppResult<Release> {
    let row = sqlx::query_as::<_, ReleaseRow>(&format!(
        r#"
        INSERT INTO releases (material_id, reason, amount, order_code, maintenance_id, sale_id, proof_image, released_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        RELEASE_COLUMNS
    ))
    .bind(draft.material_id)
    .bind(draft.reason.as_str())
    .bind(draft.amount)
    .bind(draft.target.order_code())
    .bind(draft.target.maintenance_id())
    .bind(draft.target.sale_id())
    .bind(&draft.proof_image)
    .bind(released_by)
    .fetch_one(&mut *conn)
    .await?;

    let remaining = decrement_stock(&mut *conn, draft.material_id, draft.amount).await?;
    tracing::debug!("Material {} now has {} available", draft.material_id, remaining);

    row.try_into()
}

fn push_release_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &ReleaseFilter) {
    if let Some(confirmed) = filter.confirmed {
        query.push(" AND confirmed = ").push_bind(confirmed);
    }
    if let Some(released_by) = filter.released_by {
        query.push(" AND released_by = ").push_bind(released_by);
    }
    if let Some(from) = filter.from {
        query.push(" AND released_at::date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND released_at::date <= ").push_bind(to);
    }
    if let Some(code) = filter.order_code.as_deref() {
        query.push(" AND order_code = ").push_bind(code.to_string());
    }
    if let Some(maintenance_id) = filter.maintenance_id {
        query.push(" AND maintenance_id = ").push_bind(maintenance_id);
    }
    if let Some(material_id) = filter.material_id {
        query.push(" AND material_id = ").push_bind(material_id);
    }
    if let Some(reason) = filter.reason {
        query.push(" AND reason = ").push_bind(reason.as_str());
    }
}
