// src/tools/booking.rs — Scheduling tools: availability, create, find, cancel, reschedule

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, Tool, ToolFailure, ToolRegistry};
use crate::core::types::ToolErrorKind;
use crate::scheduling::{Booking, BookingQuery, DateRange, NewBooking, RescheduleOutcome, SchedulingClient};

const DEFAULT_CANCEL_REASON: &str = "Cancelled by patient via chat assistant";

/// Shared by every scheduling tool.
pub struct BookingContext {
    pub client: Arc<SchedulingClient>,
    pub max_range_days: i64,
    pub slot_minutes: i64,
}

impl BookingContext {
    pub fn new(client: Arc<SchedulingClient>, max_range_days: i64, slot_minutes: i64) -> Self {
        Self {
            client,
            max_range_days,
            slot_minutes,
        }
    }
}

/// Add the five scheduling tools to `registry`.
pub fn register_booking_tools(registry: &mut ToolRegistry, ctx: Arc<BookingContext>) {
    registry.register(GetAvailableSlots(ctx.clone()));
    registry.register(CreateBooking(ctx.clone()));
    registry.register(FindBooking(ctx.clone()));
    registry.register(CancelBooking(ctx.clone()));
    registry.register(RescheduleBooking(ctx));
}

fn email_pattern() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(concat!(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+",
            r"@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
            r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        ))
        .expect("email pattern is a valid regex")
    })
}

pub fn validate_email(email: &str) -> Result<String, String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("No email address was provided. Ask the patient for their email.".into());
    }
    if !email_pattern().is_match(email) {
        return Err(format!(
            "\"{email}\" does not look like a valid email address. Ask the patient to double-check it."
        ));
    }
    Ok(email.to_string())
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{field} must be a date in YYYY-MM-DD format, got \"{raw}\""))
}

fn parse_slot_start(field: &str, raw: &str) -> Result<DateTime<Utc>, String> {
    let start = DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            format!("{field} must be an ISO 8601 timestamp such as 2026-02-17T10:30:00Z, got \"{raw}\"")
        })?;
    if start <= Utc::now() {
        return Err(format!("{field} {raw} is in the past"));
    }
    Ok(start)
}

fn required(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(value.to_string())
}

/// Human-facing slot label, e.g. "Tue 17 Feb 2026 at 10:30".
pub fn display_time(t: &DateTime<Utc>) -> String {
    t.format("%a %d %b %Y at %H:%M").to_string()
}

fn booking_json(b: &Booking) -> Value {
    json!({
        "booking_id": b.id,
        "start": b.slot.start.to_rfc3339(),
        "display": display_time(&b.slot.start),
        "duration_minutes": b.slot.duration_minutes,
        "patient_name": b.patient_name,
        "patient_email": b.patient_email,
        "status": b.status,
    })
}

// ─── get_available_slots ────────────────────────────────────────

#[derive(Deserialize)]
struct SlotsArgs {
    start_date: String,
    end_date: String,
}

impl SlotsArgs {
    fn check(args: &Value, ctx: &BookingContext) -> Result<DateRange, String> {
        let raw: Self = parse_args(args)?;
        let start = parse_date("start_date", &raw.start_date)?;
        let end = parse_date("end_date", &raw.end_date)?;
        let range = DateRange::new(start, end)?;
        if range.days() > ctx.max_range_days {
            return Err(format!(
                "The date range covers {} days; at most {} days can be checked at once",
                range.days(),
                ctx.max_range_days
            ));
        }
        Ok(range)
    }
}

pub struct GetAvailableSlots(Arc<BookingContext>);

#[async_trait]
impl Tool for GetAvailableSlots {
    fn name(&self) -> &str {
        "get_available_slots"
    }

    fn description(&self) -> &str {
        "Check open 30-minute check-up slots between two dates (inclusive, at most 7 days)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": { "type": "string", "description": "First day, YYYY-MM-DD" },
                "end_date": { "type": "string", "description": "Last day, YYYY-MM-DD" }
            },
            "required": ["start_date", "end_date"]
        })
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        SlotsArgs::check(args, &self.0).map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure> {
        let range = SlotsArgs::check(&args, &self.0).map_err(ToolFailure::validation)?;
        let slots = self.0.client.list_availability(&range).await?;

        let listed: Vec<Value> = slots
            .iter()
            .map(|s| {
                json!({
                    "start": s.start.to_rfc3339(),
                    "display": display_time(&s.start),
                    "duration_minutes": s.duration_minutes,
                })
            })
            .collect();
        let mut payload = json!({
            "start_date": range.start.to_string(),
            "end_date": range.end.to_string(),
            "count": listed.len(),
            "slots": listed,
        });
        if slots.is_empty() {
            payload["note"] = json!("No open slots in this range. Suggest different dates.");
        }
        Ok(payload)
    }
}

// ─── create_booking ─────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateArgs {
    slot_start: String,
    #[serde(default)]
    duration_minutes: Option<i64>,
    name: String,
    email: String,
}

impl CreateArgs {
    fn check(args: &Value, ctx: &BookingContext) -> Result<NewBooking, String> {
        let raw: Self = parse_args(args)?;
        if let Some(d) = raw.duration_minutes {
            if d != ctx.slot_minutes {
                return Err(format!(
                    "Appointments are always {} minutes, got {d}",
                    ctx.slot_minutes
                ));
            }
        }
        Ok(NewBooking {
            start: parse_slot_start("slot_start", &raw.slot_start)?,
            name: required("name", &raw.name)?,
            email: validate_email(&raw.email)?,
        })
    }
}

pub struct CreateBooking(Arc<BookingContext>);

#[async_trait]
impl Tool for CreateBooking {
    fn name(&self) -> &str {
        "create_booking"
    }

    fn description(&self) -> &str {
        "Book a check-up for the patient. slot_start must be one of the slots returned by get_available_slots."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "slot_start": { "type": "string", "description": "Slot start, ISO 8601 (e.g. 2026-02-17T10:30:00Z)" },
                "duration_minutes": { "type": "integer", "description": "Always 30" },
                "name": { "type": "string", "description": "Patient full name" },
                "email": { "type": "string", "description": "Patient email address" }
            },
            "required": ["slot_start", "name", "email"]
        })
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        CreateArgs::check(args, &self.0).map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure> {
        let new = CreateArgs::check(&args, &self.0).map_err(ToolFailure::validation)?;
        let booking = self.0.client.create_booking(&new).await?;
        Ok(json!({ "booking": booking_json(&booking) }))
    }
}

// ─── find_booking ───────────────────────────────────────────────

#[derive(Deserialize)]
struct FindArgs {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    booking_id: Option<String>,
}

impl FindArgs {
    fn check(args: &Value) -> Result<BookingQuery, String> {
        let raw: Self = parse_args(args)?;
        let id = raw.booking_id.as_deref().map(str::trim).unwrap_or_default();
        let email = raw.email.as_deref().map(str::trim).unwrap_or_default();
        if !id.is_empty() {
            return Ok(BookingQuery::Id(id.to_string()));
        }
        if !email.is_empty() {
            return Ok(BookingQuery::Email(validate_email(email)?));
        }
        Err("Provide either email or booking_id".into())
    }
}

pub struct FindBooking(Arc<BookingContext>);

#[async_trait]
impl Tool for FindBooking {
    fn name(&self) -> &str {
        "find_booking"
    }

    fn description(&self) -> &str {
        "Look up a patient's upcoming appointments by email, or one appointment by booking_id."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "email": { "type": "string", "description": "Patient email address" },
                "booking_id": { "type": "string", "description": "Appointment ID" }
            }
        })
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        FindArgs::check(args).map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure> {
        let query = FindArgs::check(&args).map_err(ToolFailure::validation)?;
        let bookings = self.0.client.find_bookings(&query).await?;
        if bookings.is_empty() {
            let what = match &query {
                BookingQuery::Email(e) => format!("email {e}"),
                BookingQuery::Id(id) => format!("booking id {id}"),
            };
            return Err(ToolFailure::not_found(format!("No upcoming appointments found for {what}")));
        }
        let listed: Vec<Value> = bookings.iter().map(booking_json).collect();
        Ok(json!({ "count": listed.len(), "bookings": listed }))
    }
}

// ─── cancel_booking ─────────────────────────────────────────────

#[derive(Deserialize)]
struct CancelArgs {
    booking_id: String,
    #[serde(default)]
    reason: Option<String>,
}

impl CancelArgs {
    fn check(args: &Value) -> Result<(String, String), String> {
        let raw: Self = parse_args(args)?;
        let id = required("booking_id", &raw.booking_id)?;
        let reason = raw
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
        Ok((id, reason))
    }
}

pub struct CancelBooking(Arc<BookingContext>);

#[async_trait]
impl Tool for CancelBooking {
    fn name(&self) -> &str {
        "cancel_booking"
    }

    fn description(&self) -> &str {
        "Cancel an appointment. Only call after the patient has confirmed which appointment to cancel."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "booking_id": { "type": "string", "description": "Appointment ID from find_booking" },
                "reason": { "type": "string", "description": "Optional cancellation reason" }
            },
            "required": ["booking_id"]
        })
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        CancelArgs::check(args).map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure> {
        let (id, reason) = CancelArgs::check(&args).map_err(ToolFailure::validation)?;
        let cancelled = self.0.client.cancel_booking(&id, &reason).await?;
        Ok(json!({ "cancelled": booking_json(&cancelled) }))
    }
}

// ─── reschedule_booking ─────────────────────────────────────────

#[derive(Deserialize)]
struct RescheduleArgs {
    booking_id: String,
    new_slot_start: String,
}

impl RescheduleArgs {
    fn check(args: &Value) -> Result<(String, DateTime<Utc>), String> {
        let raw: Self = parse_args(args)?;
        Ok((
            required("booking_id", &raw.booking_id)?,
            parse_slot_start("new_slot_start", &raw.new_slot_start)?,
        ))
    }
}

pub struct RescheduleBooking(Arc<BookingContext>);

#[async_trait]
impl Tool for RescheduleBooking {
    fn name(&self) -> &str {
        "reschedule_booking"
    }

    fn description(&self) -> &str {
        "Move an appointment to a new slot. Cancels the old appointment, then books the new one."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "booking_id": { "type": "string", "description": "Appointment ID to move" },
                "new_slot_start": { "type": "string", "description": "New slot start, ISO 8601" }
            },
            "required": ["booking_id", "new_slot_start"]
        })
    }

    fn validate(&self, args: &Value) -> Result<(), String> {
        RescheduleArgs::check(args).map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolFailure> {
        let (id, new_start) = RescheduleArgs::check(&args).map_err(ToolFailure::validation)?;
        match self.0.client.reschedule_booking(&id, new_start).await? {
            RescheduleOutcome::Rescheduled { cancelled, booking } => Ok(json!({
                "cancelled": booking_json(&cancelled),
                "booking": booking_json(&booking),
            })),
            RescheduleOutcome::CancelledNotRebooked { cancelled, error } => Err(ToolFailure::new(
                ToolErrorKind::PartialFailure,
                format!(
                    "The original appointment {} ({}) was cancelled, but the new appointment at {} \
                     could not be booked ({}). The patient currently has no appointment.",
                    cancelled.id,
                    display_time(&cancelled.slot.start),
                    display_time(&new_start),
                    error
                ),
            )),
            RescheduleOutcome::CancelledRebookUnknown { cancelled, error } => Err(ToolFailure::new(
                ToolErrorKind::Ambiguous,
                format!(
                    "The original appointment {} ({}) was cancelled. Booking the new appointment at {} \
                     did not confirm ({}), so it may or may not exist. Verify first: look up the \
                     patient's bookings by email before booking again.",
                    cancelled.id,
                    display_time(&cancelled.slot.start),
                    display_time(&new_start),
                    error
                ),
            )),
        }
    }
}
