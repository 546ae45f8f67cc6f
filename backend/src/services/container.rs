//! Order container service: payment split, wallet routing and payment evidence

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::storage::{record_attachment, StorageService, Upload};
use crate::error::{AppError, AppResult};
use crate::models::{
    round_currency, Actor, AttachmentPurpose, OrderContainer, PaymentDetails, PaymentMethod,
    PaymentSplit, Role,
};

/// Order container service
#[derive(Clone)]
pub struct ContainerService {
    db: PgPool,
    default_ratio: Decimal,
}

/// Input for wrapping orders in a container
#[derive(Debug, Deserialize)]
pub struct CreateContainerInput {
    pub order_codes: Vec<String>,
    /// Defaults to the sum of the order prices
    pub full_payment: Option<Decimal>,
    /// Explicit advance; takes precedence over `advance_ratio`
    pub advance_payment: Option<Decimal>,
    pub advance_ratio: Option<Decimal>,
    pub method: PaymentMethod,
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub invoice: bool,
}

/// Evidence files sent alongside a container
#[derive(Debug, Default)]
pub struct PaymentEvidence {
    pub payment_screenshot: Option<Upload>,
    pub invoice_image: Option<Upload>,
}

/// Input for re-pricing a container
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentInput {
    pub full_payment: Decimal,
}

#[derive(Debug, FromRow)]
struct ContainerRow {
    id: Uuid,
    full_payment: Decimal,
    advance_payment: Decimal,
    remaining_payment: Decimal,
    wallet_id: i32,
    method: String,
    account_id: Option<Uuid>,
    invoice: bool,
    payment_screenshot: Option<String>,
    invoice_image: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContainerRow {
    fn into_container(self, order_codes: Vec<String>) -> AppResult<OrderContainer> {
        let method = PaymentMethod::parse(&self.method)
            .ok_or_else(|| AppError::Internal(format!("unknown payment method {}", self.method)))?;
        Ok(OrderContainer {
            id: self.id,
            order_codes,
            split: PaymentSplit {
                full_payment: self.full_payment,
                advance_payment: self.advance_payment,
                remaining_payment: self.remaining_payment,
            },
            wallet_id: self.wallet_id,
            method,
            account_id: self.account_id,
            invoice: self.invoice,
            payment_screenshot: self.payment_screenshot,
            invoice_image: self.invoice_image,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const CONTAINER_COLUMNS: &str = "id, full_payment, advance_payment, remaining_payment, wallet_id, \
     method, account_id, invoice, payment_screenshot, invoice_image, created_by, created_at, updated_at";

impl ContainerService {
    /// Create a new ContainerService instance
    pub fn new(db: PgPool, default_ratio: Decimal) -> Self {
        Self { db, default_ratio }
    }

    /// Wrap one or more orders in a container and record how it is paid
    pub async fn create_container(
        &self,
        actor: &Actor,
        storage: &StorageService,
        input: CreateContainerInput,
        evidence: PaymentEvidence,
    ) -> AppResult<OrderContainer> {
        actor.require(&[Role::Sales], "create order containers")?;

        let mut order_codes: Vec<String> = input
            .order_codes
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        order_codes.sort();
        order_codes.dedup();
        if order_codes.is_empty() {
            return Err(AppError::validation("order_codes", "at least one order is required"));
        }

        let account_is_invoice = match input.account_id {
            Some(account_id) => sqlx::query_scalar::<_, String>(
                "SELECT account_type FROM accounts WHERE id = $1",
            )
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?
            .map(|t| t == "invoice"),
            None => None,
        };
        let details = PaymentDetails {
            method: input.method,
            account_id: input.account_id,
            invoice: input.invoice,
            has_payment_screenshot: evidence.payment_screenshot.is_some(),
            has_invoice_image: evidence.invoice_image.is_some(),
        };
        details.validate(account_is_invoice)?;

        let staged = stage_evidence(storage, &evidence).await?;
        let created = self
            .persist_container(actor, &input, order_codes, &evidence, &staged)
            .await;
        if created.is_err() {
            storage.discard(&staged.stored_paths()).await;
        }
        created
    }

    async fn persist_container(
        &self,
        actor: &Actor,
        input: &CreateContainerInput,
        order_codes: Vec<String>,
        evidence: &PaymentEvidence,
        staged: &StagedEvidence,
    ) -> AppResult<OrderContainer> {
        let mut tx = self.db.begin().await?;
        let prices = order_prices(&mut tx, &order_codes).await?;

        let full = match input.full_payment {
            Some(full) => full,
            None => sum_prices(&prices)?,
        };
        let split = match input.advance_payment {
            Some(advance) => PaymentSplit::from_advance(full, advance)?,
            None => PaymentSplit::from_ratio(full, input.advance_ratio.unwrap_or(self.default_ratio))?,
        };

        let id = Uuid::new_v4();
        let row = sqlx::query_as::<_, ContainerRow>(&format!(
            r#"
            INSERT INTO order_containers (
                id, full_payment, advance_payment, remaining_payment, wallet_id, method,
                account_id, invoice, payment_screenshot, invoice_image, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            CONTAINER_COLUMNS
        ))
        .bind(id)
        .bind(split.full_payment)
        .bind(split.advance_payment)
        .bind(split.remaining_payment)
        .bind(input.method.wallet_id())
        .bind(input.method.as_str())
        .bind(input.account_id)
        .bind(input.invoice)
        .bind(&staged.payment_screenshot)
        .bind(&staged.invoice_image)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let owner_id = id.to_string();
        let owner = Some(("order_container", owner_id.as_str()));
        let recorded = [
            (
                AttachmentPurpose::PaymentScreenshot,
                &evidence.payment_screenshot,
                &staged.payment_screenshot,
            ),
            (
                AttachmentPurpose::InvoiceImage,
                &evidence.invoice_image,
                &staged.invoice_image,
            ),
        ];
        for (purpose, upload, stored_path) in recorded {
            if let (Some(upload), Some(stored_path)) = (upload, stored_path) {
                record_attachment(
                    &mut tx,
                    purpose,
                    owner,
                    &upload.file_name,
                    stored_path,
                    actor.user_id,
                )
                .await?;
            }
        }

        let mut link = QueryBuilder::<Postgres>::new("INSERT INTO container_orders (container_id, order_code) ");
        link.push_values(&order_codes, |mut b, code| {
            b.push_bind(id).push_bind(code.clone());
        });
        link.build().execute(&mut *tx).await?;

        tx.commit().await?;
        tracing::info!(
            "Container {} created for {} order(s): full {} advance {} wallet {}",
            id,
            order_codes.len(),
            split.full_payment,
            split.advance_payment,
            row.wallet_id
        );

        row.into_container(order_codes)
    }

    /// Get a container with its order codes
    pub async fn get_container(&self, container_id: Uuid) -> AppResult<OrderContainer> {
        let mut conn = self.db.acquire().await?;
        load_container(&mut conn, container_id, false).await
    }

    /// Change the full payment, keeping the advance ratio implied by the
    /// current amounts
    pub async fn update_payment(
        &self,
        actor: &Actor,
        container_id: Uuid,
        input: UpdatePaymentInput,
    ) -> AppResult<OrderContainer> {
        actor.require(&[Role::Sales], "change container payments")?;

        let mut tx = self.db.begin().await?;
        let mut container = load_container(&mut tx, container_id, true).await?;
        let previous = container.split;
        container.split = previous.with_full_payment(input.full_payment)?;
        container.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE order_containers
            SET full_payment = $1, advance_payment = $2, remaining_payment = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(container.split.full_payment)
        .bind(container.split.advance_payment)
        .bind(container.split.remaining_payment)
        .bind(container.updated_at)
        .bind(container.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            "Container {} re-priced {} -> {} (advance {} -> {})",
            container.id,
            previous.full_payment,
            container.split.full_payment,
            previous.advance_payment,
            container.split.advance_payment
        );
        Ok(container)
    }
}

async fn load_container(
    conn: &mut PgConnection,
    container_id: Uuid,
    lock: bool,
) -> AppResult<OrderContainer> {
    let row = sqlx::query_as::<_, ContainerRow>(&format!(
        "SELECT {} FROM order_containers WHERE id = $1{}",
        CONTAINER_COLUMNS,
        if lock { " FOR UPDATE NOWAIT" } else { "" }
    ))
    .bind(container_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order container".to_string()))?;

    let order_codes = sqlx::query_scalar::<_, String>(
        "SELECT order_code FROM container_orders WHERE container_id = $1 ORDER BY order_code",
    )
    .bind(container_id)
    .fetch_all(&mut *conn)
    .await?;

    row.into_container(order_codes)
}

/// Evidence files written to disk ahead of the container insert
#[derive(Debug, Default)]
struct StagedEvidence {
    payment_screenshot: Option<String>,
    invoice_image: Option<String>,
}

impl StagedEvidence {
    fn stored_paths(&self) -> Vec<String> {
        self.payment_screenshot
            .iter()
            .chain(self.invoice_image.iter())
            .cloned()
            .collect()
    }
}

/// Write the evidence files; a failed write removes the ones already written
async fn stage_evidence(
    storage: &StorageService,
    evidence: &PaymentEvidence,
) -> AppResult<StagedEvidence> {
    let mut staged = StagedEvidence::default();
    if let Some(upload) = &evidence.payment_screenshot {
        staged.payment_screenshot = Some(
            storage
                .write_file(AttachmentPurpose::PaymentScreenshot, upload)
                .await?,
        );
    }
    if let Some(upload) = &evidence.invoice_image {
        match storage.write_file(AttachmentPurpose::InvoiceImage, upload).await {
            Ok(stored_path) => staged.invoice_image = Some(stored_path),
            Err(e) => {
                storage.discard(&staged.stored_paths()).await;
                return Err(e);
            }
        }
    }
    Ok(staged)
}

/// Rounded sum of the order prices, used when no full payment is given
fn sum_prices(prices: &[Decimal]) -> AppResult<Decimal> {
    prices
        .iter()
        .try_fold(Decimal::ZERO, |total, price| total.checked_add(*price))
        .map(round_currency)
        .ok_or_else(|| AppError::validation("full_payment", "order prices sum is too large"))
}

/// Prices of the given orders; every order must exist and be uncontained
async fn order_prices(conn: &mut PgConnection, order_codes: &[String]) -> AppResult<Vec<Decimal>> {
    let rows = sqlx::query_as::<_, (String, Decimal, bool)>(
        r#"
        SELECT o.order_code, o.price,
               EXISTS(SELECT 1 FROM container_orders c WHERE c.order_code = o.order_code)
        FROM orders o
        WHERE o.order_code = ANY($1)
        FOR UPDATE OF o NOWAIT
        "#,
    )
    .bind(order_codes)
    .fetch_all(conn)
    .await?;

    if let Some(missing) = order_codes
        .iter()
        .find(|code| !rows.iter().any(|(c, _, _)| c == *code))
    {
        return Err(AppError::validation(
            "order_codes",
            format!("order {} does not exist", missing),
        ));
    }
    if let Some((code, _, _)) = rows.iter().find(|(_, _, contained)| *contained) {
        return Err(AppError::validation(
            "order_codes",
            format!("order {} already belongs to a container", code),
        ));
    }

    Ok(rows.into_iter().map(|(_, price, _)| price).collect())
}
