//! Order service: creation from returned designs, BOM, DXF files and the
//! production state machine
//!
//! Every mutation of an existing order runs in one transaction holding
//! `FOR UPDATE NOWAIT` on the order row. A competing writer gets a lock
//! error, which surfaces as a retryable conflict.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::material::material_kinds;
use super::storage::{StorageService, Upload};
use crate::error::{AppError, AppResult};
use crate::models::{
    bom_total, generate_order_code, validate_bom, Actor, AttachmentPurpose, BomLine, BomLineDraft,
    DesignSource, DxfFile, MaterialKind, Order, OrderStatus, PageParams, RequestStatus, Role,
};

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Input for creating an order from a returned design
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub mockup_id: Option<Uuid>,
    pub modification_id: Option<Uuid>,
    pub price: Option<Decimal>,
    /// Optional BOM submitted together with the order
    pub boms: Option<Vec<BomLineDraft>>,
}

/// BOM batch for fillbom/editbom
#[derive(Debug, Deserialize)]
pub struct BomInput {
    pub boms: Vec<BomLineDraft>,
}

/// Advance request; the target is only needed where the lifecycle branches
#[derive(Debug, Default, Deserialize)]
pub struct AdvanceInput {
    pub to: Option<OrderStatus>,
}

/// Filters accepted by the order listing
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub designer_id: Option<Uuid>,
    /// Whether the order has a BOM
    pub filled: Option<bool>,
    /// `true` for orders with no unconfirmed additional release
    pub release_confirmed: Option<bool>,
    pub created_by: Option<Uuid>,
}

/// Order together with its release gate
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    /// Sum of the unit-priced BOM line totals
    pub bom_total: Decimal,
    pub pending_add_releases: i64,
}

impl OrderView {
    fn new(order: Order, pending_add_releases: i64) -> AppResult<Self> {
        let bom_total = bom_total(&order.boms).ok_or_else(|| {
            AppError::Internal(format!("BOM total of order {} overflows", order.order_code))
        })?;
        Ok(Self {
            order,
            bom_total,
            pending_add_releases,
        })
    }
}

/// Result of toggling `dxf_ready`
#[derive(Debug, Serialize)]
pub struct DxfReadyResponse {
    pub order_code: String,
    pub dxf_ready: bool,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    order_code: String,
    mockup_id: Option<Uuid>,
    modification_id: Option<Uuid>,
    status: String,
    price: Decimal,
    dxf_ready: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct BomRow {
    order_code: String,
    material_id: Uuid,
    kind: String,
    amount: Decimal,
    width: Decimal,
    height: Decimal,
    price_per_unit: Decimal,
    total_price: Decimal,
}

#[derive(Debug, FromRow)]
struct DxfRow {
    id: Uuid,
    order_code: String,
    file_name: String,
    stored_path: String,
    uploaded_by: Uuid,
    uploaded_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, boms: Vec<BomLine>, dxf_files: Vec<DxfFile>) -> AppResult<Order> {
        let source = DesignSource::from_refs(self.mockup_id, self.modification_id).ok_or_else(
            || AppError::Internal(format!("order {} has no single design source", self.order_code)),
        )?;
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| AppError::Internal(format!("unknown order status {}", self.status)))?;

        Ok(Order {
            order_code: self.order_code,
            source,
            status,
            price: self.price,
            boms,
            dxf_files,
            dxf_ready: self.dxf_ready,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<BomRow> for BomLine {
    type Error = AppError;

    fn try_from(row: BomRow) -> AppResult<Self> {
        let kind = MaterialKind::parse(&row.kind)
            .ok_or_else(|| AppError::Internal(format!("unknown material kind {}", row.kind)))?;
        Ok(BomLine {
            material_id: row.material_id,
            kind,
            amount: row.amount,
            width: row.width,
            height: row.height,
            price_per_unit: row.price_per_unit,
            total_price: row.total_price,
        })
    }
}

impl From<DxfRow> for DxfFile {
    fn from(row: DxfRow) -> Self {
        DxfFile {
            id: row.id,
            file_name: row.file_name,
            stored_path: row.stored_path,
            uploaded_by: row.uploaded_by,
            uploaded_at: row.uploaded_at,
        }
    }
}

const ORDER_COLUMNS: &str = "order_code, mockup_id, modification_id, status, price, dxf_ready, \
     created_by, created_at, updated_at";

/// Roles that maintain the BOM and cutting files
const PRODUCTION_FILE_ROLES: &[Role] = &[Role::Designer, Role::Production];

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an order in Pre-Accepted from a returned mockup or modification
    pub async fn create_order(&self, actor: &Actor, input: CreateOrderInput) -> AppResult<OrderView> {
        actor.require(&[Role::Sales], "create orders")?;

        let source = DesignSource::from_refs(input.mockup_id, input.modification_id).ok_or_else(
            || AppError::validation("source", "exactly one of mockup_id or modification_id is required"),
        )?;
        let price = match input.price {
            Some(p) if p > Decimal::ZERO => p,
            Some(_) => return Err(AppError::validation("price", "price must be greater than 0")),
            None => return Err(AppError::validation("price", "price is required")),
        };

        let mut tx = self.db.begin().await?;
        ensure_returned_design(&mut tx, source).await?;

        let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('order_code_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let now = Utc::now();
        let order_code = generate_order_code(now.year(), sequence);

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (order_code, mockup_id, modification_id, status, price, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&order_code)
        .bind(source.mockup_id())
        .bind(source.modification_id())
        .bind(OrderStatus::PreAccepted.as_str())
        .bind(price)
        .bind(actor.user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut order = row.into_order(Vec::new(), Vec::new())?;
        if let Some(drafts) = input.boms.filter(|b| !b.is_empty()) {
            let lines = validated_lines(&mut tx, &drafts).await?;
            order.fill_bom(lines)?;
            replace_bom_lines(&mut tx, &order).await?;
        }

        tx.commit().await?;
        tracing::info!(
            "Order {} created from {:?} by {}",
            order.order_code,
            order.source,
            actor.user_id
        );

        OrderView::new(order, 0)
    }

    /// Get an order with its BOM, DXF files and release gate
    pub async fn get_order(&self, order_code: &str) -> AppResult<OrderView> {
        let mut conn = self.db.acquire().await?;
        let order = load_order(&mut conn, order_code, false).await?;
        let pending_add_releases = count_pending_adds(&mut conn, order_code).await?;
        OrderView::new(order, pending_add_releases)
    }

    /// List orders, newest first
    pub async fn list_orders(
        &self,
        filter: &OrderFilter,
        params: PageParams,
    ) -> AppResult<(Vec<OrderView>, u64)> {
        let params = params.normalized();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o WHERE TRUE");
        push_order_filter(&mut count_query, filter);
        let count: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT o.order_code, o.mockup_id, o.modification_id, o.status, o.price, o.dxf_ready, \
             o.created_by, o.created_at, o.updated_at FROM orders o WHERE TRUE",
        );
        push_order_filter(&mut query, filter);
        query
            .push(" ORDER BY o.created_at DESC LIMIT ")
            .push_bind(i64::from(params.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(params.offset));
        let rows = query.build_query_as::<OrderRow>().fetch_all(&self.db).await?;

        let codes: Vec<String> = rows.iter().map(|r| r.order_code.clone()).collect();
        let mut boms = bom_lines_for(&self.db, &codes).await?;
        let mut dxf_files = dxf_files_for(&self.db, &codes).await?;
        let pending = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT order_code, COUNT(*)
            FROM releases
            WHERE order_code = ANY($1) AND reason = 'add' AND NOT confirmed
            GROUP BY order_code
            "#,
        )
        .bind(&codes)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect::<HashMap<String, i64>>();

        let views = rows
            .into_iter()
            .map(|row| -> AppResult<OrderView> {
                let code = row.order_code.clone();
                let order = row.into_order(
                    boms.remove(&code).unwrap_or_default(),
                    dxf_files.remove(&code).unwrap_or_default(),
                )?;
                OrderView::new(order, pending.get(&code).copied().unwrap_or(0))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok((views, count as u64))
    }

    /// Attach the first BOM; fails if the order already has one
    pub async fn fill_bom(&self, actor: &Actor, order_code: &str, input: BomInput) -> AppResult<Order> {
        actor.require(PRODUCTION_FILE_ROLES, "fill BOMs")?;

        let mut tx = self.db.begin().await?;
        let mut order = lock_order(&mut tx, order_code).await?;
        let lines = validated_lines(&mut tx, &input.boms).await?;

        order.fill_bom(lines)?;
        replace_bom_lines(&mut tx, &order).await?;
        touch_order(&mut tx, &mut order).await?;

        tx.commit().await?;
        tracing::info!("BOM filled for order {} ({} lines)", order.order_code, order.boms.len());
        Ok(order)
    }

    /// Replace the BOM wholesale; nothing changes unless the whole batch is valid
    pub async fn edit_bom(&self, actor: &Actor, order_code: &str, input: BomInput) -> AppResult<Order> {
        actor.require(PRODUCTION_FILE_ROLES, "edit BOMs")?;

        let mut tx = self.db.begin().await?;
        let mut order = lock_order(&mut tx, order_code).await?;
        let lines = validated_lines(&mut tx, &input.boms).await?;

        order.edit_bom(lines)?;
        replace_bom_lines(&mut tx, &order).await?;
        touch_order(&mut tx, &mut order).await?;

        tx.commit().await?;
        tracing::info!("BOM replaced for order {} ({} lines)", order.order_code, order.boms.len());
        Ok(order)
    }

    /// Move the order one stage forward
    pub async fn advance(
        &self,
        actor: &Actor,
        order_code: &str,
        input: AdvanceInput,
    ) -> AppResult<OrderView> {
        let mut tx = self.db.begin().await?;
        let mut order = lock_order(&mut tx, order_code).await?;
        let pending = count_pending_adds(&mut tx, order_code).await?;

        let from = order.status;
        let to = match order.advance(actor, input.to, pending as usize, Utc::now()) {
            Ok(to) => to,
            Err(e) => {
                tracing::warn!("Advance of order {} from {} refused: {}", order_code, from, e);
                return Err(e.into());
            }
        };

        sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE order_code = $3")
            .bind(to.as_str())
            .bind(order.updated_at)
            .bind(&order.order_code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Order {} moved {} -> {}", order.order_code, from, to);

        OrderView::new(order, pending)
    }

    /// Store an uploaded cutting file and attach it to the order
    pub async fn upload_dxf(
        &self,
        actor: &Actor,
        storage: &StorageService,
        order_code: &str,
        upload: Upload,
    ) -> AppResult<DxfFile> {
        actor.require(PRODUCTION_FILE_ROLES, "upload DXF files")?;

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE order_code = $1)")
                .bind(order_code)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Order".to_string()));
        }

        let stored_path = storage.write_file(AttachmentPurpose::Dxf, &upload).await?;
        let inserted = sqlx::query_as::<_, DxfRow>(
            r#"
            INSERT INTO order_dxf_files (order_code, file_name, stored_path, uploaded_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_code, file_name, stored_path, uploaded_by, uploaded_at
            "#,
        )
        .bind(order_code)
        .bind(super::storage::sanitize_file_name(&upload.file_name))
        .bind(&stored_path)
        .bind(actor.user_id)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(row) => {
                tracing::info!("DXF {} attached to order {}", row.file_name, order_code);
                Ok(row.into())
            }
            Err(e) => {
                storage.remove_file(&stored_path).await;
                Err(e.into())
            }
        }
    }

    /// Remove a cutting file; removing the last one clears `dxf_ready`
    pub async fn delete_dxf(
        &self,
        actor: &Actor,
        storage: &StorageService,
        order_code: &str,
        file_id: Uuid,
    ) -> AppResult<Order> {
        actor.require(PRODUCTION_FILE_ROLES, "delete DXF files")?;

        let mut tx = self.db.begin().await?;
        let mut order = lock_order(&mut tx, order_code).await?;
        let removed = order
            .remove_dxf(file_id)
            .ok_or_else(|| AppError::NotFound("DXF file".to_string()))?;

        sqlx::query("DELETE FROM order_dxf_files WHERE id = $1")
            .bind(removed.id)
            .execute(&mut *tx)
            .await?;
        touch_order(&mut tx, &mut order).await?;

        tx.commit().await?;
        storage.remove_file(&removed.stored_path).await;

        tracing::info!(
            "DXF {} removed from order {} (dxf_ready = {})",
            removed.file_name,
            order.order_code,
            order.dxf_ready
        );
        Ok(order)
    }

    /// Flip `dxf_ready`; the order needs at least one DXF file
    pub async fn toggle_dxf_ready(&self, actor: &Actor, order_code: &str) -> AppResult<DxfReadyResponse> {
        actor.require(PRODUCTION_FILE_ROLES, "mark DXF files ready")?;

        let mut tx = self.db.begin().await?;
        let mut order = lock_order(&mut tx, order_code).await?;
        let dxf_ready = order.toggle_dxf_ready()?;
        touch_order(&mut tx, &mut order).await?;
        tx.commit().await?;

        tracing::info!("Order {} dxf_ready = {}", order.order_code, dxf_ready);
        Ok(DxfReadyResponse {
            order_code: order.order_code,
            dxf_ready,
        })
    }
}

/// Load an order under `FOR UPDATE NOWAIT`
pub(crate) async fn lock_order(conn: &mut PgConnection, order_code: &str) -> AppResult<Order> {
    load_order(conn, order_code, true).await
}

async fn load_order(conn: &mut PgConnection, order_code: &str, lock: bool) -> AppResult<Order> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {} FROM orders WHERE order_code = $1{}",
        ORDER_COLUMNS,
        if lock { " FOR UPDATE NOWAIT" } else { "" }
    ))
    .bind(order_code)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    let codes = [order_code.to_string()];
    let boms = bom_lines_for(&mut *conn, &codes)
        .await?
        .remove(order_code)
        .unwrap_or_default();
    let dxf_files = dxf_files_for(&mut *conn, &codes)
        .await?
        .remove(order_code)
        .unwrap_or_default();

    row.into_order(boms, dxf_files)
}

/// Number of unconfirmed `Add` releases tied to an order
pub(crate) async fn count_pending_adds(conn: &mut PgConnection, order_code: &str) -> AppResult<i64> {
    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM releases WHERE order_code = $1 AND reason = 'add' AND NOT confirmed",
    )
    .bind(order_code)
    .fetch_one(conn)
    .await?;
    Ok(pending)
}

async fn ensure_returned_design(conn: &mut PgConnection, source: DesignSource) -> AppResult<()> {
    let (table, field, id) = match source {
        DesignSource::Mockup(id) => ("mockup_requests", "mockup_id", id),
        DesignSource::Modification(id) => ("modification_requests", "modification_id", id),
    };

    let status = sqlx::query_scalar::<_, String>(&format!("SELECT status FROM {} WHERE id = $1", table))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::validation(field, "design request does not exist"))?;

    if RequestStatus::parse(&status) != Some(RequestStatus::Returned) {
        return Err(AppError::InvalidStateTransition(format!(
            "design request {} is {}; only returned designs can become orders",
            id, status
        )));
    }

    let taken = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM orders WHERE {} = $1)",
        field
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    if taken {
        return Err(AppError::validation(field, "an order already exists for this design"));
    }

    Ok(())
}

async fn validated_lines(conn: &mut PgConnection, drafts: &[BomLineDraft]) -> AppResult<Vec<BomLine>> {
    let ids: Vec<Uuid> = drafts.iter().map(|d| d.material_id).collect();
    let kinds = material_kinds(conn, &ids).await?;
    Ok(validate_bom(drafts, |id| kinds.get(&id).copied())?)
}

async fn replace_bom_lines(conn: &mut PgConnection, order: &Order) -> AppResult<()> {
    sqlx::query("DELETE FROM order_bom_lines WHERE order_code = $1")
        .bind(&order.order_code)
        .execute(&mut *conn)
        .await?;

    if order.boms.is_empty() {
        return Ok(());
    }

    let mut insert = QueryBuilder::<Postgres>::new(
        "INSERT INTO order_bom_lines (order_code, line_no, material_id, kind, amount, width, \
         height, price_per_unit, total_price) ",
    );
    insert.push_values(order.boms.iter().enumerate(), |mut b, (idx, line)| {
        b.push_bind(order.order_code.clone())
            .push_bind(idx as i32 + 1)
            .push_bind(line.material_id)
            .push_bind(line.kind.as_str())
            .push_bind(line.amount)
            .push_bind(line.width)
            .push_bind(line.height)
            .push_bind(line.price_per_unit)
            .push_bind(line.total_price);
    });
    insert.build().execute(&mut *conn).await?;
    Ok(())
}

async fn touch_order(conn: &mut PgConnection, order: &mut Order) -> AppResult<()> {
    order.updated_at = Utc::now();
    sqlx::query("UPDATE orders SET dxf_ready = $1, updated_at = $2 WHERE order_code = $3")
        .bind(order.dxf_ready)
        .bind(order.updated_at)
        .bind(&order.order_code)
        .execute(conn)
        .await?;
    Ok(())
}

async fn bom_lines_for<'e, E>(executor: E, codes: &[String]) -> AppResult<HashMap<String, Vec<BomLine>>>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, BomRow>(
        r#"
        SELECT order_code, material_id, kind, amount, width, height, price_per_unit, total_price
        FROM order_bom_lines
        WHERE order_code = ANY($1)
        ORDER BY order_code, line_no
        "#,
    )
    .bind(codes)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<String, Vec<BomLine>> = HashMap::new();
    for row in rows {
        let code = row.order_code.clone();
        grouped.entry(code).or_default().push(row.try_into()?);
    }
    Ok(grouped)
}

async fn dxf_files_for<'e, E>(executor: E, codes: &[String]) -> AppResult<HashMap<String, Vec<DxfFile>>>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, DxfRow>(
        r#"
        SELECT id, order_code, file_name, stored_path, uploaded_by, uploaded_at
        FROM order_dxf_files
        WHERE order_code = ANY($1)
        ORDER BY uploaded_at
        "#,
    )
    .bind(codes)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<String, Vec<DxfFile>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_code.clone()).or_default().push(row.into());
    }
    Ok(grouped)
}

fn push_order_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(status) = filter.status {
        query.push(" AND o.status = ").push_bind(status.as_str());
    }
    if let Some(created_by) = filter.created_by {
        query.push(" AND o.created_by = ").push_bind(created_by);
    }
    if let Some(designer_id) = filter.designer_id {
        query
            .push(
                " AND (EXISTS (SELECT 1 FROM mockup_requests m WHERE m.id = o.mockup_id AND m.designer_id = ",
            )
            .push_bind(designer_id)
            .push(
                ") OR EXISTS (SELECT 1 FROM modification_requests r WHERE r.id = o.modification_id AND r.designer_id = ",
            )
            .push_bind(designer_id)
            .push("))");
    }
    if let Some(filled) = filter.filled {
        query.push(if filled { " AND EXISTS" } else { " AND NOT EXISTS" }).push(
            " (SELECT 1 FROM order_bom_lines b WHERE b.order_code = o.order_code)",
        );
    }
    if let Some(confirmed) = filter.release_confirmed {
        query
            .push(if confirmed { " AND NOT EXISTS" } else { " AND EXISTS" })
            .push(
                " (SELECT 1 FROM releases rl WHERE rl.order_code = o.order_code \
                 AND rl.reason = 'add' AND NOT rl.confirmed)",
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(kind: MaterialKind, amount: i64, price: Decimal) -> BomLine {
        BomLine {
            material_id: Uuid::new_v4(),
            kind,
            amount: Decimal::from(amount),
            width: Decimal::ZERO,
            height: Decimal::ZERO,
            price_per_unit: price,
            total_price: Decimal::from(amount) * price,
        }
    }

    fn order_with(boms: Vec<BomLine>) -> Order {
        let now = Utc::now();
        Order {
            order_code: generate_order_code(2026, 7),
            source: DesignSource::Mockup(Uuid::new_v4()),
            status: OrderStatus::PreAccepted,
            price: Decimal::from(500),
            boms,
            dxf_files: Vec::new(),
            dxf_ready: false,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_order_view_sums_bom_lines() {
        let order = order_with(vec![
            line(MaterialKind::Piece, 4, Decimal::new(250, 2)),
            line(MaterialKind::Length, 3, Decimal::from(20)),
        ]);
        let view = OrderView::new(order, 2).unwrap();
        assert_eq!(view.bom_total, Decimal::from(70));
        assert_eq!(view.pending_add_releases, 2);
    }

    #[test]
    fn test_order_view_rejects_overflowing_total() {
        let order = order_with(vec![
            line(MaterialKind::Piece, 1, Decimal::MAX),
            line(MaterialKind::Piece, 1, Decimal::MAX),
        ]);
        assert!(matches!(OrderView::new(order, 0), Err(AppError::Internal(_))));
    }
}
