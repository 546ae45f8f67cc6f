//! Design request models: mockup requests and their revision chain

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Actor, Role};
use crate::error::{collect_errors, DomainError, FieldError};

/// Status shared by mockup and modification requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Sent,
    Started,
    /// Terminal; the only status eligible for order creation
    Returned,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Sent => "sent",
            RequestStatus::Started => "started",
            RequestStatus::Returned => "returned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(RequestStatus::Sent),
            "started" => Some(RequestStatus::Started),
            "returned" => Some(RequestStatus::Returned),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Sent, RequestStatus::Started)
                | (RequestStatus::Started, RequestStatus::Returned)
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Sent => write!(f, "Sent"),
            RequestStatus::Started => write!(f, "Started"),
            RequestStatus::Returned => write!(f, "Returned"),
        }
    }
}

/// Designer response submitted with `return`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnDesignInput {
    pub mockup_image: Option<String>,
    pub price: Option<Decimal>,
}

/// Progress of a design request through `Sent → Started → Returned`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestProgress {
    pub designer_id: Uuid,
    pub status: RequestStatus,
    pub mockup_image: Option<String>,
    pub price: Option<Decimal>,
    pub started_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl RequestProgress {
    pub fn new(designer_id: Uuid) -> Self {
        Self {
            designer_id,
            status: RequestStatus::Sent,
            mockup_image: None,
            price: None,
            started_at: None,
            returned_at: None,
        }
    }

    fn require_designer(&self, actor: &Actor, action: &str) -> Result<(), DomainError> {
        actor.require(&[Role::Designer], action)?;
        if actor.role != Role::Admin && actor.user_id != self.designer_id {
            return Err(DomainError::Forbidden(format!(
                "only the assigned designer may {}",
                action
            )));
        }
        Ok(())
    }

    fn require_transition(&self, next: RequestStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::transition(format!(
                "request is {}, cannot move to {}",
                self.status, next
            )))
        }
    }

    /// Designer picks the request up
    pub fn start(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require_designer(actor, "start this request")?;
        self.require_transition(RequestStatus::Started)?;

        self.status = RequestStatus::Started;
        self.started_at = Some(now);
        Ok(())
    }

    /// Designer hands back the mockup; both image and price are mandatory
    pub fn return_design(
        &mut self,
        actor: &Actor,
        input: ReturnDesignInput,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.require_designer(actor, "return this request")?;
        self.require_transition(RequestStatus::Returned)?;

        let mut errors = Vec::new();
        let image = input.mockup_image.filter(|s| !s.trim().is_empty());
        if image.is_none() {
            errors.push(FieldError::new("mockup_image", "mockup image is required"));
        }
        match input.price {
            None => errors.push(FieldError::new("price", "price is required")),
            Some(p) if p <= Decimal::ZERO => {
                errors.push(FieldError::new("price", "price must be greater than 0"))
            }
            Some(_) => {}
        }
        collect_errors(errors)?;

        self.status = RequestStatus::Returned;
        self.mockup_image = image;
        self.price = input.price;
        self.returned_at = Some(now);
        Ok(())
    }

    pub fn is_returned(&self) -> bool {
        self.status == RequestStatus::Returned
    }
}

/// A design request raised by sales against a lead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockupRequest {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub requested_by: Uuid,
    pub note: Option<String>,
    pub reference_images: Vec<String>,
    #[serde(flatten)]
    pub progress: RequestProgress,
    pub requested_at: DateTime<Utc>,
}

/// A revision of a returned mockup, optionally chained to an earlier revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationRequest {
    pub id: Uuid,
    pub mockup_id: Uuid,
    pub prev_modification_id: Option<Uuid>,
    pub requested_by: Uuid,
    pub note: Option<String>,
    pub reference_images: Vec<String>,
    #[serde(flatten)]
    pub progress: RequestProgress,
    pub requested_at: DateTime<Utc>,
}

/// Walk a revision chain starting at `prev` and make sure `new_id` does not
/// already appear in it.
///
/// `prev_of` returns the predecessor of a modification (`Some(None)` for the
/// head of the chain, `None` if the id is unknown). Returns the chain, newest
/// first, on success.
pub fn check_revision_chain<F>(
    new_id: Uuid,
    prev: Option<Uuid>,
    mut prev_of: F,
) -> Result<Vec<Uuid>, DomainError>
where
    F: FnMut(Uuid) -> Option<Option<Uuid>>,
{
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(new_id);

    let mut cursor = prev;
    while let Some(id) = cursor {
        if !seen.insert(id) {
            return Err(DomainError::RevisionCycle(id));
        }
        chain.push(id);
        cursor = prev_of(id).ok_or_else(|| {
            DomainError::invalid(
                "prev_modification_id",
                format!("modification {} does not exist", id),
            )
        })?;
    }

    Ok(chain)
}
