//! Direct sales and maintenance jobs; each line becomes a release

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::release::insert_release;
use crate::error::{AppError, AppResult};
use crate::models::{validate_stock_lines, Actor, Maintenance, Release, Role, Sale, StockLine};

/// Stock movement service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub customer_name: String,
    pub total_price: Decimal,
    pub lines: Vec<StockLine>,
}

/// Input for recording a maintenance job
#[derive(Debug, Deserialize)]
pub struct CreateMaintenanceInput {
    pub description: String,
    pub lines: Vec<StockLine>,
}

/// A stock record together with the releases it produced
#[derive(Debug, Serialize)]
pub struct WithReleases<T> {
    #[serde(flatten)]
    pub record: T,
    pub releases: Vec<Release>,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale and release its material
    pub async fn create_sale(
        &self,
        actor: &Actor,
        input: CreateSaleInput,
    ) -> AppResult<WithReleases<Sale>> {
        actor.require(&[Role::Sales], "record sales")?;

        let customer_name = input.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(AppError::validation("customer_name", "customer name is required"));
        }
        if input.total_price < Decimal::ZERO {
            return Err(AppError::validation("total_price", "total price cannot be negative"));
        }
        validate_stock_lines(&input.lines)?;

        let sale = Sale {
            id: Uuid::new_v4(),
            customer_name,
            lines: input.lines,
            total_price: input.total_price,
            sold_by: actor.user_id,
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO sales (id, customer_name, total_price, sold_by, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(sale.id)
        .bind(&sale.customer_name)
        .bind(sale.total_price)
        .bind(sale.sold_by)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;
        insert_lines(&mut tx, "sale_lines", "sale_id", sale.id, &sale.lines).await?;

        let mut releases = Vec::with_capacity(sale.lines.len());
        for draft in sale.release_drafts() {
            releases.push(insert_release(&mut tx, &draft, actor.user_id).await?);
        }

        tx.commit().await?;
        tracing::info!("Sale {} recorded with {} release(s)", sale.id, releases.len());

        Ok(WithReleases {
            record: sale,
            releases,
        })
    }

    /// Record a maintenance job and release its material
    pub async fn create_maintenance(
        &self,
        actor: &Actor,
        input: CreateMaintenanceInput,
    ) -> AppResult<WithReleases<Maintenance>> {
        actor.require(&[Role::Production, Role::StockManager], "record maintenance")?;

        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::validation("description", "description is required"));
        }
        validate_stock_lines(&input.lines)?;

        let maintenance = Maintenance {
            id: Uuid::new_v4(),
            description,
            lines: input.lines,
            requested_by: actor.user_id,
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO maintenances (id, description, requested_by, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(maintenance.id)
        .bind(&maintenance.description)
        .bind(maintenance.requested_by)
        .bind(maintenance.created_at)
        .execute(&mut *tx)
        .await?;
        insert_lines(
            &mut tx,
            "maintenance_lines",
            "maintenance_id",
            maintenance.id,
            &maintenance.lines,
        )
        .await?;

        let mut releases = Vec::with_capacity(maintenance.lines.len());
        for draft in maintenance.release_drafts() {
            releases.push(insert_release(&mut tx, &draft, actor.user_id).await?);
        }

        tx.commit().await?;
        tracing::info!(
            "Maintenance {} recorded with {} release(s)",
            maintenance.id,
            releases.len()
        );

        Ok(WithReleases {
            record: maintenance,
            releases,
        })
    }
}

async fn insert_lines(
    conn: &mut PgConnection,
    table: &str,
    owner_column: &str,
    owner_id: Uuid,
    lines: &[StockLine],
) -> AppResult<()> {
    let mut insert = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {} ({}, material_id, amount) ",
        table, owner_column
    ));
    insert.push_values(lines, |mut b, line| {
        b.push_bind(owner_id)
            .push_bind(line.material_id)
            .push_bind(line.amount);
    });
    insert.build().execute(conn).await?;
    Ok(())
}
