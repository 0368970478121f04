// src/scheduling/calendly.rs — Calendly v2 REST implementation of SchedulingApi
//
// One attempt per call; retries and metrics live in SchedulingClient. The
// current user and the clinic's event type never change while running, so
// both are fetched once and kept. Event listings by email and invitee lists
// go through the response cache and are invalidated by create and cancel.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use url::Url;

use super::cache::{events_by_email_key, invitees_key, ResponseCache, EVENTS_BY_EMAIL};
use super::{
    ApiError, AvailabilitySlot, Booking, BookingQuery, BookingStatus, DateRange, NewBooking,
    SchedulingApi,
};
use crate::infra::config::SchedulingConfig;

#[derive(Debug, Clone)]
struct EventType {
    uri: String,
    location: Option<Value>,
}

pub struct CalendlyApi {
    client: reqwest::Client,
    base_url: Url,
    token: String,
    timezone: String,
    user_uri: OnceCell<String>,
    event_type: OnceCell<EventType>,
    cache: ResponseCache,
}

impl CalendlyApi {
    pub fn new(
        token: String,
        config: &SchedulingConfig,
        timezone: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid scheduling base_url '{}': {e}", config.base_url))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
            timezone: timezone.into(),
            user_uri: OnceCell::new(),
            event_type: OnceCell::new(),
            cache: ResponseCache::new(config.cache_max_bytes),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Decode(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token)
            .query(query);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(retry_after_millis);
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%method, path = url.path(), status = status.as_u16(), "calendly request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
                retry_after_ms,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(e.to_string())
            } else {
                ApiError::Decode(e.to_string())
            }
        })
    }

    async fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.request(Method::GET, self.endpoint(segments)?, query, None)
            .await
    }

    /// GET through the response cache. Only successful responses are stored.
    async fn cached_get(
        &self,
        key: String,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(key = %key, "cache hit");
            return Ok(hit);
        }
        let data = self.get(segments, query).await?;
        self.cache.put(key, data.clone());
        Ok(data)
    }

    /// Forget the cached listing that mentions `event_uuid`, and its invitees.
    fn invalidate_event(&self, event_uuid: &str) {
        if let Some(key) = self.cache.find_key_containing(EVENTS_BY_EMAIL, event_uuid) {
            self.cache.invalidate(&key);
        }
        self.cache.invalidate(&invitees_key(event_uuid));
    }

    async fn user_uri(&self) -> Result<&str, ApiError> {
        let uri = self
            .user_uri
            .get_or_try_init(|| async {
                let me = self.get(&["users", "me"], &[]).await?;
                string_at(&me, &["resource", "uri"])
            })
            .await?;
        Ok(uri.as_str())
    }

    async fn event_type(&self) -> Result<&EventType, ApiError> {
        self.event_type
            .get_or_try_init(|| async {
                let user = self.user_uri().await?;
                let listed = self
                    .get(&["event_types"], &[("user", user), ("active", "true")])
                    .await?;
                let first = collection(&listed)
                    .first()
                    .cloned()
                    .ok_or_else(|| ApiError::Decode("no active event types configured".into()))?;
                let location = first["locations"]
                    .as_array()
                    .and_then(|locs| locs.first())
                    .map(|loc| {
                        json!({
                            "kind": loc["kind"],
                            "location": loc["location"].as_str().unwrap_or(""),
                        })
                    });
                let uri = string_at(&first, &["uri"])?;
                tracing::info!(event_type = %uri, "Resolved clinic event type");
                Ok(EventType { uri, location })
            })
            .await
    }

    async fn invitees(&self, event_uuid: &str) -> Result<Vec<Value>, ApiError> {
        let data = self
            .cached_get(
                invitees_key(event_uuid),
                &["scheduled_events", event_uuid, "invitees"],
                &[],
            )
            .await?;
        Ok(collection(&data).to_vec())
    }

    /// Event plus its invitee (preferring `email` when given) as a Booking.
    async fn hydrate(&self, event: &Value, email: Option<&str>) -> Result<Booking, ApiError> {
        let uuid = uuid_from_uri(&string_at(event, &["uri"])?);
        let invitees = match self.invitees(&uuid).await {
            Ok(list) => list,
            Err(e) if matches!(e, ApiError::Status { .. }) => {
                tracing::warn!(event = %uuid, "Could not fetch invitees: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let invitee = invitees
            .iter()
            .find(|inv| match email {
                Some(email) => inv["email"]
                    .as_str()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email)),
                None => true,
            })
            .cloned()
            .unwrap_or(Value::Null);
        event_to_booking(event, &invitee, email)
    }
}

#[async_trait]
impl SchedulingApi for CalendlyApi {
    async fn list_availability(&self, range: &DateRange) -> Result<Vec<AvailabilitySlot>, ApiError> {
        let event_type = self.event_type().await?;

        // the API rejects windows that start in the past
        let start = range
            .start_time()
            .max(Utc::now() + chrono::Duration::minutes(1));
        let end = range.end_time();
        if start >= end {
            return Ok(Vec::new());
        }
        let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = end.to_rfc3339_opts(SecondsFormat::Secs, true);

        let data = self
            .get(
                &["event_type_available_times"],
                &[
                    ("event_type", event_type.uri.as_str()),
                    ("start_time", start.as_str()),
                    ("end_time", end.as_str()),
                ],
            )
            .await?;
        parse_available_times(&data)
    }

    async fn create_invitee(&self, booking: &NewBooking) -> Result<Booking, ApiError> {
        let event_type = self.event_type().await?;

        let mut payload = json!({
            "event_type": event_type.uri,
            "start_time": booking.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "invitee": {
                "name": booking.name,
                "email": booking.email,
                "timezone": self.timezone,
            },
        });
        if let Some(location) = &event_type.location {
            payload["location"] = location.clone();
        }

        let result = self
            .request(Method::POST, self.endpoint(&["invitees"])?, &[], Some(payload))
            .await;
        // a timed-out create may still have landed
        self.cache.invalidate(&events_by_email_key(&booking.email));
        let data = result?;
        let resource = &data["resource"];
        let event_uri = string_at(resource, &["event"])?;

        Ok(Booking {
            id: uuid_from_uri(&event_uri),
            slot: AvailabilitySlot::new(booking.start),
            patient_name: resource["name"]
                .as_str()
                .unwrap_or(&booking.name)
                .to_string(),
            patient_email: resource["email"]
                .as_str()
                .unwrap_or(&booking.email)
                .to_string(),
            status: BookingStatus::Confirmed,
        })
    }

    async fn find_invitees(&self, query: &BookingQuery) -> Result<Vec<Booking>, ApiError> {
        match query {
            BookingQuery::Email(email) => {
                let user = self.user_uri().await?;
                let data = self
                    .cached_get(
                        events_by_email_key(email),
                        &["scheduled_events"],
                        &[
                            ("user", user),
                            ("status", "active"),
                            ("invitee_email", email.as_str()),
                        ],
                    )
                    .await?;
                let mut bookings = Vec::new();
                for event in collection(&data) {
                    bookings.push(self.hydrate(event, Some(email)).await?);
                }
                Ok(bookings)
            }
            BookingQuery::Id(id) => {
                let data = match self.get(&["scheduled_events", id], &[]).await {
                    Ok(data) => data,
                    Err(ApiError::Status { status: 404, .. }) => return Ok(Vec::new()),
                    Err(e) => return Err(e),
                };
                Ok(vec![self.hydrate(&data["resource"], None).await?])
            }
        }
    }

    async fn cancel_invitee(&self, booking_id: &str, reason: &str) -> Result<Booking, ApiError> {
        let event = self.get(&["scheduled_events", booking_id], &[]).await?;
        let booking = self.hydrate(&event["resource"], None).await?;

        let result = self
            .request(
                Method::POST,
                self.endpoint(&["scheduled_events", booking_id, "cancellation"])?,
                &[],
                Some(json!({ "reason": reason })),
            )
            .await;
        self.invalidate_event(booking_id);
        result?;
        tracing::info!(booking_id, "Booking cancelled");
        Ok(booking.cancelled())
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(e.to_string())
    } else {
        ApiError::Connect(e.to_string())
    }
}

/// Retry-After in delta-seconds form. HTTP-date values are ignored.
fn retry_after_millis(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

fn collection(data: &Value) -> &[Value] {
    data["collection"].as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn string_at(value: &Value, path: &[&str]) -> Result<String, ApiError> {
    let mut cur = value;
    for key in path {
        cur = &cur[*key];
    }
    cur.as_str()
        .map(str::to_string)
        .ok_or_else(|| ApiError::Decode(format!("missing field {}", path.join("."))))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ApiError::Decode(format!("bad timestamp '{raw}': {e}")))
}

/// Last path segment of a resource URI.
fn uuid_from_uri(uri: &str) -> String {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(uri)
        .to_string()
}

fn parse_available_times(data: &Value) -> Result<Vec<AvailabilitySlot>, ApiError> {
    collection(data)
        .iter()
        .filter(|slot| slot["status"] == "available")
        .map(|slot| string_at(slot, &["start_time"]).and_then(|s| parse_time(&s)))
        .map(|start| start.map(AvailabilitySlot::new))
        .collect()
}

fn event_to_booking(event: &Value, invitee: &Value, email: Option<&str>) -> Result<Booking, ApiError> {
    let start = parse_time(&string_at(event, &["start_time"])?)?;
    let status = match event["status"].as_str() {
        Some("canceled") | Some("cancelled") => BookingStatus::Cancelled,
        Some("active") => BookingStatus::Confirmed,
        _ => BookingStatus::Pending,
    };
    Ok(Booking {
        id: uuid_from_uri(&string_at(event, &["uri"])?),
        slot: AvailabilitySlot::new(start),
        patient_name: invitee["name"].as_str().unwrap_or_default().to_string(),
        patient_email: invitee["email"]
            .as_str()
            .or(email)
            .unwrap_or_default()
            .to_string(),
        status,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
