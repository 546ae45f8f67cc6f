//! Material catalog service: materials, payment accounts and upstream sync

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::data_service::{RemoteAccount, RemoteMaterial};
use crate::external::DataServiceClient;
use crate::models::{
    selectable_accounts, Account, AccountType, Actor, Material, MaterialKind, PageParams, Role,
};

/// Material service for catalog reads and synchronisation
#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
}

/// Filters accepted by the material listing
#[derive(Debug, Default, Deserialize)]
pub struct MaterialFilter {
    pub kind: Option<MaterialKind>,
    pub available: Option<bool>,
    pub search: Option<String>,
}

/// Outcome of a catalog sync
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub materials_created: usize,
    pub materials_updated: usize,
    pub accounts_synced: usize,
    /// Codes whose kind change was refused because a BOM line uses them
    pub kind_conflicts: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    code: String,
    name: String,
    kind: String,
    available_quantity: Decimal,
    is_available: bool,
}

impl TryFrom<MaterialRow> for Material {
    type Error = AppError;

    fn try_from(row: MaterialRow) -> AppResult<Self> {
        let kind = MaterialKind::parse(&row.kind)
            .ok_or_else(|| AppError::Internal(format!("unknown material kind {}", row.kind)))?;
        Ok(Material {
            id: row.id,
            code: row.code,
            name: row.name,
            kind,
            available_quantity: row.available_quantity,
            is_available: row.is_available,
        })
    }
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    number: String,
    account_type: String,
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> AppResult<Self> {
        let account_type = AccountType::parse(&row.account_type).ok_or_else(|| {
            AppError::Internal(format!("unknown account type {}", row.account_type))
        })?;
        Ok(Account {
            id: row.id,
            name: row.name,
            number: row.number,
            account_type,
        })
    }
}

const MATERIAL_COLUMNS: &str = "id, code, name, kind, available_quantity, is_available";

impl MaterialService {
    /// Create a new MaterialService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List materials, ordered by code
    pub async fn list_materials(
        &self,
        filter: &MaterialFilter,
        params: PageParams,
    ) -> AppResult<(Vec<Material>, u64)> {
        let params = params.normalized();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM materials WHERE TRUE");
        push_material_filter(&mut count_query, filter);
        let count: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM materials WHERE TRUE",
            MATERIAL_COLUMNS
        ));
        push_material_filter(&mut query, filter);
        query
            .push(" ORDER BY code LIMIT ")
            .push_bind(i64::from(params.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(params.offset));

        let rows = query.build_query_as::<MaterialRow>().fetch_all(&self.db).await?;
        let materials = rows
            .into_iter()
            .map(Material::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((materials, count as u64))
    }

    /// Get a material by id
    pub async fn get_material(&self, material_id: Uuid) -> AppResult<Material> {
        let row = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {} FROM materials WHERE id = $1",
            MATERIAL_COLUMNS
        ))
        .bind(material_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        row.try_into()
    }

    /// List payment accounts; `invoice_only` narrows to invoice-eligible ones
    pub async fn list_accounts(&self, invoice_only: bool) -> AppResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, name, number, account_type FROM accounts ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        let accounts = rows
            .into_iter()
            .map(Account::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(selectable_accounts(&accounts, invoice_only)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Import the catalog from the upstream data service
    ///
    /// New materials take the upstream quantity; existing ones keep the local
    /// quantity, which releases maintain. A kind change is refused once any
    /// BOM line references the material.
    pub async fn sync_catalog(
        &self,
        actor: &Actor,
        client: &DataServiceClient,
    ) -> AppResult<SyncReport> {
        actor.require(&[Role::StockManager], "sync the material catalog")?;

        let materials = client.list_materials().await?;
        let accounts = client.list_accounts().await?;
        tracing::info!(
            "Fetched {} materials and {} accounts from data service",
            materials.len(),
            accounts.len()
        );

        let mut report = SyncReport::default();
        let mut tx = self.db.begin().await?;

        for remote in materials {
            self.sync_material(&mut tx, remote, &mut report).await?;
        }
        for remote in accounts {
            if sync_account(&mut tx, &remote).await? {
                report.accounts_synced += 1;
            } else {
                report.skipped.push(remote.number);
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Catalog sync done: {} created, {} updated, {} kind conflicts",
            report.materials_created,
            report.materials_updated,
            report.kind_conflicts.len()
        );
        Ok(report)
    }

    async fn sync_material(
        &self,
        conn: &mut PgConnection,
        remote: RemoteMaterial,
        report: &mut SyncReport,
    ) -> AppResult<()> {
        let Some(kind) = MaterialKind::parse(&remote.kind.to_lowercase()) else {
            tracing::warn!("Skipping material {} with unknown kind {}", remote.code, remote.kind);
            report.skipped.push(remote.code);
            return Ok(());
        };

        let existing = sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {} FROM materials WHERE code = $1 FOR UPDATE",
            MATERIAL_COLUMNS
        ))
        .bind(&remote.code)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(existing) = existing else {
            sqlx::query(
                r#"
                INSERT INTO materials (code, name, kind, available_quantity, is_available)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&remote.code)
            .bind(&remote.name)
            .bind(kind.as_str())
            .bind(remote.available_quantity.max(Decimal::ZERO))
            .bind(remote.is_available)
            .execute(&mut *conn)
            .await?;
            report.materials_created += 1;
            return Ok(());
        };

        let existing = Material::try_from(existing)?;
        let referenced = material_referenced_by_bom(&mut *conn, existing.id).await?;
        let kind = if existing.kind_change_allowed(kind, referenced) {
            kind
        } else {
            tracing::warn!(
                "Keeping kind {} for material {}: referenced by a BOM",
                existing.kind,
                existing.code
            );
            report.kind_conflicts.push(existing.code.clone());
            existing.kind
        };

        sqlx::query(
            r#"
            UPDATE materials
            SET name = $1, kind = $2, is_available = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(&remote.name)
        .bind(kind.as_str())
        .bind(remote.is_available)
        .bind(existing.id)
        .execute(&mut *conn)
        .await?;
        report.materials_updated += 1;
        Ok(())
    }
}

async fn sync_account(conn: &mut PgConnection, remote: &RemoteAccount) -> AppResult<bool> {
    let Some(account_type) = AccountType::parse(&remote.account_type.to_lowercase()) else {
        tracing::warn!(
            "Skipping account {} with unknown type {}",
            remote.number,
            remote.account_type
        );
        return Ok(false);
    };

    sqlx::query(
        r#"
        INSERT INTO accounts (id, name, number, account_type)
        VALUES (COALESCE($1, gen_random_uuid()), $2, $3, $4)
        ON CONFLICT (number) DO UPDATE
        SET name = EXCLUDED.name, account_type = EXCLUDED.account_type
        "#,
    )
    .bind(remote.id)
    .bind(&remote.name)
    .bind(&remote.number)
    .bind(account_type.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(true)
}

fn push_material_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &MaterialFilter) {
    if let Some(kind) = filter.kind {
        query.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(available) = filter.available {
        query.push(" AND is_available = ").push_bind(available);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Whether any BOM line references the material
pub(crate) async fn material_referenced_by_bom(
    conn: &mut PgConnection,
    material_id: Uuid,
) -> AppResult<bool> {
    let referenced = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM order_bom_lines WHERE material_id = $1)",
    )
    .bind(material_id)
    .fetch_one(conn)
    .await?;
    Ok(referenced)
}

/// Kinds of the given materials; unknown ids are simply absent
pub(crate) async fn material_kinds(
    conn: &mut PgConnection,
    material_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, MaterialKind>> {
    let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT id, kind FROM materials WHERE id = ANY($1)")
        .bind(material_ids)
        .fetch_all(conn)
        .await?;

    rows.into_iter()
        .map(|(id, kind)| {
            MaterialKind::parse(&kind)
                .map(|k| (id, k))
                .ok_or_else(|| AppError::Internal(format!("unknown material kind {}", kind)))
        })
        .collect()
}

/// Lock a material row and take `amount` out of its available quantity
///
/// Fails with insufficient inventory when stock would go negative.
pub(crate) async fn decrement_stock(
    conn: &mut PgConnection,
    material_id: Uuid,
    amount: Decimal,
) -> AppResult<Decimal> {
    let row = sqlx::query_as::<_, MaterialRow>(&format!(
        "SELECT {} FROM materials WHERE id = $1 FOR UPDATE",
        MATERIAL_COLUMNS
    ))
    .bind(material_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Material".to_string()))?;
    let material = Material::try_from(row)?;

    if !material.has_stock_for(amount) {
        return Err(AppError::InsufficientInventory(format!(
            "{} has {} available, {} requested",
            material.code, material.available_quantity, amount
        )));
    }

    let remaining = sqlx::query_scalar::<_, Decimal>(
        r#"
        UPDATE materials
        SET available_quantity = available_quantity - $1, updated_at = NOW()
        WHERE id = $2
        RETURNING available_quantity
        "#,
    )
    .bind(amount)
    .bind(material_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(remaining)
}
