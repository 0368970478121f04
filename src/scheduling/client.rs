// src/scheduling/client.rs — Resilient wrapper around the scheduling API
//
// Every attempt is timed and reported to the metrics sink. Transient failures
// (timeouts, 5xx, 429) are retried on the backoff schedule; permanent ones
// return immediately. A create that times out is never replayed blindly: the
// patient's bookings are checked first.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::metrics::{CallStatus, MetricsSink};
use super::{
    ApiError, AvailabilitySlot, Booking, BookingQuery, BookingStatus, DateRange, FailureClass,
    NewBooking, SchedulingApi, SchedulingError,
};
use crate::infra::config::SchedulingConfig;
use crate::infra::retry::RetryConfig;

const RESCHEDULE_REASON: &str = "Rescheduled by patient via chat assistant";

/// Result of the cancel-then-create sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum RescheduleOutcome {
    Rescheduled {
        cancelled: Booking,
        booking: Booking,
    },
    /// The old booking is gone but the new one could not be made.
    CancelledNotRebooked {
        cancelled: Booking,
        error: SchedulingError,
    },
    /// The old booking is gone and the create outcome could not be confirmed;
    /// a new booking may or may not exist.
    CancelledRebookUnknown {
        cancelled: Booking,
        error: SchedulingError,
    },
}

enum Next {
    Retry(Duration),
    Fail(SchedulingError),
}

pub struct SchedulingClient {
    api: Arc<dyn SchedulingApi>,
    metrics: Arc<dyn MetricsSink>,
    retry: RetryConfig,
    service: String,
}

impl SchedulingClient {
    pub fn new(
        api: Arc<dyn SchedulingApi>,
        metrics: Arc<dyn MetricsSink>,
        retry: RetryConfig,
        service: impl Into<String>,
    ) -> Self {
        Self {
            api,
            metrics,
            retry,
            service: service.into(),
        }
    }

    pub fn from_config(
        api: Arc<dyn SchedulingApi>,
        metrics: Arc<dyn MetricsSink>,
        config: &SchedulingConfig,
    ) -> Self {
        Self::new(api, metrics, config.retry.clone(), config.service_name.clone())
    }

    pub async fn list_availability(
        &self,
        range: &DateRange,
    ) -> Result<Vec<AvailabilitySlot>, SchedulingError> {
        self.with_retry("list_availability", || self.api.list_availability(range))
            .await
    }

    pub async fn find_bookings(&self, query: &BookingQuery) -> Result<Vec<Booking>, SchedulingError> {
        self.with_retry("find_invitees", || self.api.find_invitees(query))
            .await
    }

    pub async fn cancel_booking(
        &self,
        booking_id: &str,
        reason: &str,
    ) -> Result<Booking, SchedulingError> {
        self.with_retry("cancel_invitee", || {
            self.api.cancel_invitee(booking_id, reason)
        })
        .await
    }

    /// Create a booking. Retries after definite rejections (5xx, 429); after a
    /// timeout the existing bookings are consulted instead.
    pub async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, SchedulingError> {
        const OP: &str = "create_invitee";
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.timed(OP, self.api.create_invitee(booking)).await {
                Ok(created) => return Ok(created),
                Err(e) if e.outcome_unknown() => return self.reconcile_create(booking, &e).await,
                Err(e) => match self.after_failure(OP, e, attempt) {
                    Next::Retry(delay) => tokio::time::sleep(delay).await,
                    Next::Fail(err) => return Err(err),
                },
            }
        }
    }

    /// Move a booking to a new slot. The new slot is checked first so an
    /// unavailable slot leaves the old booking untouched.
    pub async fn reschedule_booking(
        &self,
        booking_id: &str,
        new_start: DateTime<Utc>,
    ) -> Result<RescheduleOutcome, SchedulingError> {
        let existing = self
            .find_bookings(&BookingQuery::Id(booking_id.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Permanent {
                operation: "reschedule".into(),
                status: Some(404),
                message: format!("no booking with id {booking_id}"),
            })?;

        if existing.status == BookingStatus::Cancelled {
            return Err(SchedulingError::Permanent {
                operation: "reschedule".into(),
                status: None,
                message: format!("booking {booking_id} is already cancelled"),
            });
        }

        let day = DateRange::single_day(new_start.date_naive());
        let open = self.list_availability(&day).await?;
        if !open.iter().any(|slot| slot.start == new_start) {
            return Err(SchedulingError::Permanent {
                operation: "reschedule".into(),
                status: None,
                message: format!("{} is not an available slot", new_start.to_rfc3339()),
            });
        }

        let cancelled = self.cancel_booking(booking_id, RESCHEDULE_REASON).await?;

        let replacement = NewBooking {
            start: new_start,
            name: existing.patient_name.clone(),
            email: existing.patient_email.clone(),
        };
        match self.create_booking(&replacement).await {
            Ok(booking) => {
                tracing::info!(old = booking_id, new = %booking.id, "Booking rescheduled");
                Ok(RescheduleOutcome::Rescheduled { cancelled, booking })
            }
            Err(error @ SchedulingError::Ambiguous { .. }) => {
                tracing::warn!(
                    booking_id,
                    "Cancelled for reschedule, rebooking state unknown: {}",
                    error
                );
                Ok(RescheduleOutcome::CancelledRebookUnknown { cancelled, error })
            }
            Err(error) => {
                tracing::warn!(
                    booking_id,
                    "Cancelled for reschedule but rebooking failed: {}",
                    error
                );
                Ok(RescheduleOutcome::CancelledNotRebooked { cancelled, error })
            }
        }
    }

    async fn reconcile_create(
        &self,
        booking: &NewBooking,
        cause: &ApiError,
    ) -> Result<Booking, SchedulingError> {
        tracing::warn!(start = %booking.start, "Create timed out, checking for an existing booking: {}", cause);
        let ambiguous = |message: String| SchedulingError::Ambiguous {
            operation: "create_invitee".into(),
            message,
        };

        match self
            .find_bookings(&BookingQuery::Email(booking.email.clone()))
            .await
        {
            Ok(found) => found
                .into_iter()
                .find(|b| b.slot.start == booking.start && b.status != BookingStatus::Cancelled)
                .ok_or_else(|| {
                    ambiguous(format!(
                        "{cause}; no booking at {} found for this email",
                        booking.start.to_rfc3339()
                    ))
                }),
            Err(lookup) => Err(ambiguous(format!("{cause}; lookup failed: {lookup}"))),
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, SchedulingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.timed(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(e) => match self.after_failure(operation, e, attempt) {
                    Next::Retry(delay) => tokio::time::sleep(delay).await,
                    Next::Fail(err) => return Err(err),
                },
            }
        }
    }

    async fn timed<T, Fut>(&self, operation: &str, fut: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = match &result {
            Ok(_) => CallStatus::Success,
            Err(e) => {
                tracing::debug!(service = %self.service, operation, kind = e.kind(), "attempt failed");
                CallStatus::Failure
            }
        };
        self.metrics
            .record(&self.service, operation, status, latency_ms);
        result
    }

    fn after_failure(&self, operation: &str, error: ApiError, attempt: u32) -> Next {
        let max_attempts = self.retry.max_attempts.max(1);

        if error.classify() == FailureClass::Permanent {
            return Next::Fail(SchedulingError::Permanent {
                operation: operation.to_string(),
                status: error.status(),
                message: error.to_string(),
            });
        }

        if attempt >= max_attempts {
            tracing::error!(
                service = %self.service,
                operation,
                attempts = attempt,
                "Giving up after transient failures: {}",
                error
            );
            return Next::Fail(SchedulingError::Transient {
                operation: operation.to_string(),
                attempts: attempt,
                message: error.to_string(),
            });
        }

        let delay = self
            .retry
            .delay_for_attempt(attempt - 1, error.retry_after());
        tracing::warn!(
            service = %self.service,
            operation,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Retrying after error: {}",
            error
        );
        Next::Retry(delay)
    }
}
