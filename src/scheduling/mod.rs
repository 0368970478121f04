// src/scheduling/mod.rs — Appointment scheduling: domain types and the external API seam

pub mod cache;
pub mod calendly;
pub mod client;
pub mod metrics;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{RescheduleOutcome, SchedulingClient};
pub use metrics::{CallStatus, MetricsSink};

/// Every appointment at the clinic is this long.
pub const SLOT_MINUTES: i64 = 30;

/// An open appointment window. Value object, no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl AvailabilitySlot {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            duration_minutes: SLOT_MINUTES,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Identifier assigned by the external service.
    pub id: String,
    pub slot: AvailabilitySlot,
    pub patient_name: String,
    pub patient_email: String,
    pub status: BookingStatus,
}

impl Booking {
    /// Status after an explicit cancel. The slot is never mutated in place.
    pub fn cancelled(mut self) -> Self {
        self.status = BookingStatus::Cancelled;
        self
    }
}

/// Inclusive calendar-day range, expanded to whole UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if end < start {
            return Err(format!("end_date {end} is before start_date {start}"));
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub start: DateTime<Utc>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingQuery {
    Email(String),
    Id(String),
}

/// A raw failure from one call to the external service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after_ms: Option<u64>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Retry eligibility of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeout, 5xx, 429: worth retrying.
    Transient,
    /// Other 4xx and malformed responses: retrying cannot help.
    Permanent,
}

impl ApiError {
    pub fn classify(&self) -> FailureClass {
        match self {
            ApiError::Timeout(_) | ApiError::Connect(_) => FailureClass::Transient,
            ApiError::Status { status, .. } if *status == 429 || *status == 408 => {
                FailureClass::Transient
            }
            ApiError::Status { status, .. } if *status >= 500 => FailureClass::Transient,
            ApiError::Status { .. } | ApiError::Decode(_) => FailureClass::Permanent,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            ApiError::Status {
                retry_after_ms: Some(ms),
                ..
            } if *ms > 0 => Some(std::time::Duration::from_millis(*ms)),
            _ => None,
        }
    }

    /// The request may have been applied server-side even though we saw a failure.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Timeout(_) => "timeout",
            ApiError::Connect(_) => "connect",
            ApiError::Status { status, .. } if *status == 429 => "rate_limited",
            ApiError::Status { status, .. } if *status >= 500 => "server_error",
            ApiError::Status { .. } => "client_error",
            ApiError::Decode(_) => "decode",
        }
    }
}

/// A classified failure surfaced by [`SchedulingClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("{operation} failed after {attempts} attempts: {message}")]
    Transient {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("{operation} rejected: {message}")]
    Permanent {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{operation} outcome unknown: {message}")]
    Ambiguous { operation: String, message: String },
}

impl SchedulingError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchedulingError::Permanent {
                status: Some(404),
                ..
            }
        )
    }
}

/// The external booking service: four primitives, no native reschedule.
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    async fn list_availability(&self, range: &DateRange) -> Result<Vec<AvailabilitySlot>, ApiError>;

    async fn create_invitee(&self, booking: &NewBooking) -> Result<Booking, ApiError>;

    async fn find_invitees(&self, query: &BookingQuery) -> Result<Vec<Booking>, ApiError>;

    async fn cancel_invitee(&self, booking_id: &str, reason: &str) -> Result<Booking, ApiError>;
}
