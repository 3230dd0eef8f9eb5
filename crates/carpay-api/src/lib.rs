//! carpay-api
//!
//! HTTP adapter for the booking/payment system of record. One [`RestApi`]
//! value implements every store contract the engine consumes:
//!
//! | contract           | endpoint                                        |
//! |--------------------|-------------------------------------------------|
//! | `get_booking`      | `GET  /bookings/{id}`                           |
//! | `get_invoice`      | `GET  /invoices/{id}`                           |
//! | `update_booking_status` | `PUT /bookings/{id}/status`                |
//! | `list_bookings`    | `GET  /users/{id}/bookings`                     |
//! | `lines_for_booking`| `GET  /bookings/{id}/payments`                  |
//! | `update_line_by_booking` | `PUT /bookings/{id}/payments/{kind}`      |
//! | `update_line_by_order_code` | `PUT /payments/orders/{orderCode}`     |
//! | `get_car` / `get_user` | `GET /cars/{id}` / `GET /users/{id}`        |
//! | `list_records` / `submit_record` | `GET`/`POST /conversations/{id}/messages` |
//!
//! Status mapping: 404 is `NotFound`, any other 4xx is `Rejected`, 5xx and
//! transport failures are `Unavailable`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use carpay_echo::{MessageDraft, MessageRecord, RecordStore};
use carpay_ledger::{
    Booking, BookingStatus, BookingStore, Car, DirectoryStore, Invoice, LineKind, LineStatus,
    PaymentLine, PaymentLineStore, PaymentMethod, StoreError, UserProfile,
};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RestApi {
    http: reqwest::Client,
    base_url: Url,
}

impl RestApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid api base url: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("api base url cannot carry paths: {base_url}");
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("api http client build failed")?;
        Ok(Self { http, base_url })
    }

    /// `base_url` plus percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable(format!("bad base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        entity: &'static str,
        id: &str,
    ) -> Result<T, StoreError> {
        let url = self.url(segments)?;
        let resp = send(self.http.get(url), entity, id).await?;
        resp.json::<T>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("{entity} {id}: undecodable body: {e}")))
    }

    async fn put(
        &self,
        segments: &[&str],
        body: serde_json::Value,
        entity: &'static str,
        id: &str,
    ) -> Result<(), StoreError> {
        let url = self.url(segments)?;
        send(self.http.put(url).json(&body), entity, id).await?;
        Ok(())
    }
}

async fn send(
    req: RequestBuilder,
    entity: &'static str,
    id: &str,
) -> Result<reqwest::Response, StoreError> {
    let resp = req
        .send()
        .await
        .map_err(|e| StoreError::Unavailable(format!("{entity} {id}: {e}")))?;

    let status = resp.status();
    debug!(entity, id, status = status.as_u16(), "api: response");
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(classify(status, entity, id, body))
}

fn classify(status: StatusCode, entity: &'static str, id: &str, body: String) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        StoreError::not_found(entity, id)
    } else if status.is_client_error() {
        StoreError::Rejected {
            reason: format!("{entity} {id}: http {}: {}", status.as_u16(), body.trim()),
        }
    } else {
        warn!(entity, id, status = status.as_u16(), "api: upstream failure");
        StoreError::Unavailable(format!("{entity} {id}: http {}", status.as_u16()))
    }
}

#[async_trait]
impl BookingStore for RestApi {
    async fn get_booking(&self, booking_id: &str) -> Result<Booking, StoreError> {
        self.fetch(&["bookings", booking_id], "booking", booking_id)
            .await
    }

    async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, StoreError> {
        self.fetch(&["invoices", invoice_id], "invoice", invoice_id)
            .await
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        self.put(
            &["bookings", booking_id, "status"],
            json!({ "status": status }),
            "booking",
            booking_id,
        )
        .await
    }

    async fn list_bookings(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        self.fetch(&["users", user_id, "bookings"], "user", user_id)
            .await
    }
}

#[async_trait]
impl PaymentLineStore for RestApi {
    async fn lines_for_booking(&self, booking_id: &str) -> Result<Vec<PaymentLine>, StoreError> {
        self.fetch(&["bookings", booking_id, "payments"], "booking", booking_id)
            .await
    }

    async fn update_line_by_booking(
        &self,
        booking_id: &str,
        kind: LineKind,
        status: LineStatus,
    ) -> Result<(), StoreError> {
        self.put(
            &["bookings", booking_id, "payments", kind.as_str()],
            json!({ "status": status }),
            "payment",
            booking_id,
        )
        .await
    }

    async fn update_line_by_order_code(
        &self,
        order_code: i64,
        status: LineStatus,
        method: PaymentMethod,
    ) -> Result<(), StoreError> {
        let code = order_code.to_string();
        self.put(
            &["payments", "orders", code.as_str()],
            json!({ "status": status, "method": method }),
            "order",
            &code,
        )
        .await
    }
}

#[async_trait]
impl DirectoryStore for RestApi {
    async fn get_car(&self, car_id: &str) -> Result<Car, StoreError> {
        self.fetch(&["cars", car_id], "car", car_id).await
    }

    async fn get_user(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        self.fetch(&["users", user_id], "user", user_id).await
    }
}

#[async_trait]
impl RecordStore for RestApi {
    async fn list_records(&self, owner_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
        let mut records: Vec<MessageRecord> = self
            .fetch(&["conversations", owner_id, "messages"], "conversation", owner_id)
            .await?;
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn submit_record(&self, owner_id: &str, draft: &MessageDraft) -> Result<(), StoreError> {
        let url = self.url(&["conversations", owner_id, "messages"])?;
        send(self.http.post(url).json(draft), "conversation", owner_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_segments_are_encoded() {
        let api = RestApi::new("http://api.local/v2/", Duration::from_secs(1)).unwrap();
        let url = api.url(&["bookings", "B 1/x", "payments"]).unwrap();
        assert_eq!(url.as_str(), "http://api.local/v2/bookings/B%201%2Fx/payments");
    }

    #[test]
    fn status_classification() {
        assert!(classify(StatusCode::NOT_FOUND, "booking", "B1", String::new()).is_not_found());
        assert!(matches!(
            classify(StatusCode::CONFLICT, "order", "42", "locked".into()),
            StoreError::Rejected { .. }
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, "order", "42", String::new()),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(RestApi::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
        assert!(RestApi::new("not a url", Duration::from_secs(1)).is_err());
    }
}
