//! Sales lead service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::models::{Actor, Lead, PageParams, Role};

/// Lead service
#[derive(Clone)]
pub struct LeadService {
    db: PgPool,
}

/// Input for creating a lead
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeadInput {
    #[validate(length(min = 1, max = 255, message = "customer name is required"))]
    pub customer_name: String,
    #[validate(custom = "phone_number")]
    pub phone: String,
    #[validate(length(max = 2000, message = "note is too long"))]
    pub note: Option<String>,
}

/// Filters accepted by the lead listing
#[derive(Debug, Default, Deserialize)]
pub struct LeadFilter {
    pub sales_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, FromRow)]
struct LeadRow {
    id: Uuid,
    customer_name: String,
    phone: String,
    note: Option<String>,
    sales_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Lead {
            id: row.id,
            customer_name: row.customer_name,
            phone: row.phone,
            note: row.note,
            sales_id: row.sales_id,
            created_at: row.created_at,
        }
    }
}

fn phone_number(phone: &str) -> Result<(), ValidationError> {
    shared::validate_phone(phone).map_err(|msg| {
        let mut err = ValidationError::new("phone");
        err.message = Some(msg.into());
        err
    })
}

impl LeadService {
    /// Create a new LeadService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a new lead owned by the calling sales user
    pub async fn create_lead(&self, actor: &Actor, input: CreateLeadInput) -> AppResult<Lead> {
        actor.require(&[Role::Sales], "create leads")?;
        input.validate()?;

        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            INSERT INTO leads (customer_name, phone, note, sales_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, customer_name, phone, note, sales_id, created_at
            "#,
        )
        .bind(input.customer_name.trim())
        .bind(input.phone.trim())
        .bind(&input.note)
        .bind(actor.user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!("Lead {} created by {}", row.id, actor.user_id);
        Ok(row.into())
    }

    /// Get a lead by id
    pub async fn get_lead(&self, lead_id: Uuid) -> AppResult<Lead> {
        sqlx::query_as::<_, LeadRow>(
            "SELECT id, customer_name, phone, note, sales_id, created_at FROM leads WHERE id = $1",
        )
        .bind(lead_id)
        .fetch_optional(&self.db)
        .await?
        .map(Lead::from)
        .ok_or_else(|| AppError::NotFound("Lead".to_string()))
    }

    /// List leads, newest first
    pub async fn list_leads(
        &self,
        filter: &LeadFilter,
        params: PageParams,
    ) -> AppResult<(Vec<Lead>, u64)> {
        let params = params.normalized();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads WHERE TRUE");
        push_lead_filter(&mut count_query, filter);
        let count: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, customer_name, phone, note, sales_id, created_at FROM leads WHERE TRUE",
        );
        push_lead_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(params.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(params.offset));

        let rows = query.build_query_as::<LeadRow>().fetch_all(&self.db).await?;
        Ok((rows.into_iter().map(Lead::from).collect(), count as u64))
    }
}

fn push_lead_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &LeadFilter) {
    if let Some(sales_id) = filter.sales_id {
        query.push(" AND sales_id = ").push_bind(sales_id);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (customer_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
