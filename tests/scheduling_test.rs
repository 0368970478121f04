// tests/scheduling_test.rs — Retry, classification, metrics and reschedule behaviour of the scheduling client

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pretty_assertions::assert_eq;

use frontdesk::infra::retry::RetryConfig;
use frontdesk::scheduling::metrics::InMemorySink;
use frontdesk::scheduling::*;

// ---------- Scripted API ----------

type Script<T> = Mutex<VecDeque<Result<T, ApiError>>>;

/// Each operation pops its next scripted result; an empty script succeeds
/// with an empty or echoed value.
#[derive(Default)]
struct ScriptedApi {
    availability: Script<Vec<AvailabilitySlot>>,
    creates: Script<Booking>,
    finds: Script<Vec<Booking>>,
    cancels: Script<Booking>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedApi {
    fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }
}

fn pop<T>(script: &Script<T>) -> Option<Result<T, ApiError>> {
    script.lock().unwrap().pop_front()
}

#[async_trait]
impl SchedulingApi for ScriptedApi {
    async fn list_availability(&self, _range: &DateRange) -> Result<Vec<AvailabilitySlot>, ApiError> {
        self.calls.lock().unwrap().push("list");
        pop(&self.availability).unwrap_or(Ok(Vec::new()))
    }

    async fn create_invitee(&self, booking: &NewBooking) -> Result<Booking, ApiError> {
        self.calls.lock().unwrap().push("create");
        pop(&self.creates).unwrap_or_else(|| {
            Ok(confirmed("new-1", booking.start, &booking.name, &booking.email))
        })
    }

    async fn find_invitees(&self, _query: &BookingQuery) -> Result<Vec<Booking>, ApiError> {
        self.calls.lock().unwrap().push("find");
        pop(&self.finds).unwrap_or(Ok(Vec::new()))
    }

    async fn cancel_invitee(&self, booking_id: &str, _reason: &str) -> Result<Booking, ApiError> {
        self.calls.lock().unwrap().push("cancel");
        pop(&self.cancels).unwrap_or_else(|| {
            Ok(confirmed(booking_id, at("2030-03-04T09:00:00Z"), "Jane Doe", "jane@example.com").cancelled())
        })
    }
}

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn confirmed(id: &str, start: DateTime<Utc>, name: &str, email: &str) -> Booking {
    Booking {
        id: id.into(),
        slot: AvailabilitySlot::new(start),
        patient_name: name.into(),
        patient_email: email.into(),
        status: BookingStatus::Confirmed,
    }
}

fn status(code: u16) -> ApiError {
    ApiError::Status {
        status: code,
        body: "{}".into(),
        retry_after_ms: None,
    }
}

fn client(api: Arc<ScriptedApi>) -> (SchedulingClient, Arc<InMemorySink>) {
    let sink = Arc::new(InMemorySink::new());
    let client = SchedulingClient::new(api, sink.clone(), RetryConfig::immediate(3), "calendly");
    (client, sink)
}

fn monday() -> DateRange {
    DateRange::single_day(NaiveDate::from_ymd_opt(2030, 3, 4).unwrap())
}

// ---------- Retry and metrics ----------

#[tokio::test]
async fn test_two_server_errors_then_success() {
    let api = Arc::new(ScriptedApi::default());
    api.availability.lock().unwrap().extend([
        Err(status(503)),
        Err(status(503)),
        Ok(vec![AvailabilitySlot::new(at("2030-03-04T09:00:00Z"))]),
    ]);
    let (client, sink) = client(api.clone());

    let slots = client.list_availability(&monday()).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(api.calls("list"), 3);
    assert_eq!(sink.count(CallStatus::Failure), 2);
    assert_eq!(sink.count(CallStatus::Success), 1);

    let records = sink.records();
    assert!(records
        .iter()
        .all(|r| r.service == "calendly" && r.operation == "list_availability"));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let api = Arc::new(ScriptedApi::default());
    api.cancels.lock().unwrap().push_back(Err(status(404)));
    let (client, sink) = client(api.clone());

    let err = client.cancel_booking("missing", "no longer needed").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(api.calls("cancel"), 1);
    assert_eq!(sink.records().len(), 1);
}

#[tokio::test]
async fn test_persistent_timeouts_surface_as_transient() {
    let api = Arc::new(ScriptedApi::default());
    api.finds.lock().unwrap().extend([
        Err(ApiError::Timeout("t1".into())),
        Err(ApiError::Timeout("t2".into())),
        Err(ApiError::Timeout("t3".into())),
        Ok(Vec::new()),
    ]);
    let (client, sink) = client(api.clone());

    let err = client
        .find_bookings(&BookingQuery::Email("jane@example.com".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Transient { attempts: 3, .. }));
    assert_eq!(api.calls("find"), 3);
    assert_eq!(sink.count(CallStatus::Failure), 3);
}

#[tokio::test]
async fn test_bad_request_is_permanent() {
    let api = Arc::new(ScriptedApi::default());
    api.creates.lock().unwrap().push_back(Err(status(400)));
    let (client, _) = client(api.clone());

    let err = client
        .create_booking(&NewBooking {
            start: at("2030-03-04T09:00:00Z"),
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Permanent { status: Some(400), .. }));
    assert_eq!(api.calls("create"), 1);
}

// ---------- Create after timeout ----------

#[tokio::test]
async fn test_create_timeout_without_match_is_ambiguous() {
    let api = Arc::new(ScriptedApi::default());
    api.creates
        .lock()
        .unwrap()
        .push_back(Err(ApiError::Timeout("read timed out".into())));
    let (client, _) = client(api.clone());

    let err = client
        .create_booking(&NewBooking {
            start: at("2030-03-04T09:00:00Z"),
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Ambiguous { .. }));
    // Never replayed blindly.
    assert_eq!(api.calls("create"), 1);
    assert_eq!(api.calls("find"), 1);
}

#[tokio::test]
async fn test_create_timeout_reconciled_from_existing_booking() {
    let start = at("2030-03-04T09:00:00Z");
    let api = Arc::new(ScriptedApi::default());
    api.creates
        .lock()
        .unwrap()
        .push_back(Err(ApiError::Timeout("read timed out".into())));
    api.finds.lock().unwrap().push_back(Ok(vec![
        confirmed("other", at("2030-03-05T09:00:00Z"), "Jane Doe", "jane@example.com"),
        confirmed("made-it", start, "Jane Doe", "jane@example.com"),
    ]));
    let (client, _) = client(api.clone());

    let booking = client
        .create_booking(&NewBooking {
            start,
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
        })
        .await
        .unwrap();
    assert_eq!(booking.id, "made-it");
}

// ---------- Reschedule ----------

fn reschedule_api(new_start: DateTime<Utc>) -> Arc<ScriptedApi> {
    let api = Arc::new(ScriptedApi::default());
    api.finds.lock().unwrap().push_back(Ok(vec![confirmed(
        "old-1",
        at("2030-03-04T09:00:00Z"),
        "Jane Doe",
        "jane@example.com",
    )]));
    api.availability
        .lock()
        .unwrap()
        .push_back(Ok(vec![AvailabilitySlot::new(new_start)]));
    api
}

#[tokio::test]
async fn test_reschedule_happy_path() {
    let new_start = at("2030-03-06T14:00:00Z");
    let api = reschedule_api(new_start);
    let (client, _) = client(api.clone());

    match client.reschedule_booking("old-1", new_start).await.unwrap() {
        RescheduleOutcome::Rescheduled { cancelled, booking } => {
            assert_eq!(cancelled.status, BookingStatus::Cancelled);
            assert_eq!(booking.slot.start, new_start);
            assert_eq!(booking.patient_email, "jane@example.com");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_reschedule_create_failure_after_cancel_is_reported() {
    let new_start = at("2030-03-06T14:00:00Z");
    let api = reschedule_api(new_start);
    api.creates.lock().unwrap().push_back(Err(status(409)));
    let (client, _) = client(api.clone());

    match client.reschedule_booking("old-1", new_start).await.unwrap() {
        RescheduleOutcome::CancelledNotRebooked { cancelled, error } => {
            assert_eq!(cancelled.id, "old-1");
            assert!(matches!(error, SchedulingError::Permanent { status: Some(409), .. }));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(api.calls("cancel"), 1);
}

#[tokio::test]
async fn test_reschedule_create_timeout_after_cancel_is_unknown() {
    let new_start = at("2030-03-06T14:00:00Z");
    let api = reschedule_api(new_start);
    api.creates
        .lock()
        .unwrap()
        .push_back(Err(ApiError::Timeout("read timed out".into())));
    api.finds.lock().unwrap().extend([
        Err(ApiError::Timeout("lookup".into())),
        Err(ApiError::Timeout("lookup".into())),
        Err(ApiError::Timeout("lookup".into())),
    ]);
    let (client, _) = client(api.clone());

    match client.reschedule_booking("old-1", new_start).await.unwrap() {
        RescheduleOutcome::CancelledRebookUnknown { cancelled, error } => {
            assert_eq!(cancelled.id, "old-1");
            assert!(matches!(error, SchedulingError::Ambiguous { .. }));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(api.calls("cancel"), 1);
    assert_eq!(api.calls("create"), 1);
}

#[tokio::test]
async fn test_reschedule_to_unavailable_slot_keeps_original() {
    let api = reschedule_api(at("2030-03-06T14:00:00Z"));
    let (client, _) = client(api.clone());

    let err = client
        .reschedule_booking("old-1", at("2030-03-06T15:30:00Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Permanent { .. }));
    assert_eq!(api.calls("cancel"), 0);
    assert_eq!(api.calls("create"), 0);
}

#[tokio::test]
async fn test_reschedule_unknown_booking_is_not_found() {
    let api = Arc::new(ScriptedApi::default());
    let (client, _) = client(api.clone());

    let err = client
        .reschedule_booking("nope", at("2030-03-06T14:00:00Z"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
