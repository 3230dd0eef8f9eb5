use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use carpay_ledger::{
    derive_status, Booking, BookingStore, Car, DerivedStatus, DirectoryStore, PaymentLine,
    PaymentLineStore, StoreError, UserProfile,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{batch_fetch, TtlCache};

/// Cache lifetimes for list views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListTtls {
    /// A user's booking page.
    pub list: Duration,
    /// Cars, users and payment lines.
    pub entity: Duration,
}

impl Default for ListTtls {
    fn default() -> Self {
        Self {
            list: Duration::from_millis(30_000),
            entity: Duration::from_millis(300_000),
        }
    }
}

/// One row of a booking list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListItem {
    pub booking: Booking,
    /// `None` when the car lookup failed; the row is still shown.
    pub car: Option<Car>,
    pub user: Option<UserProfile>,
    pub lines: Vec<PaymentLine>,
    pub derived: DerivedStatus,
}

/// Loads booking pages for list views.
///
/// Per-entity lookups go through [`batch_fetch`] keyed by the distinct
/// foreign ids on the page, and are cached under `car:<id>`, `user:<id>`
/// and `lines:<booking_id>`. The page itself is cached under
/// `list:<user_id>`.
pub struct BookingListLoader {
    bookings: Arc<dyn BookingStore>,
    lines: Arc<dyn PaymentLineStore>,
    directory: Arc<dyn DirectoryStore>,
    ttls: ListTtls,
    pages: TtlCache<Vec<Booking>>,
    cars: TtlCache<Car>,
    users: TtlCache<UserProfile>,
    line_sets: TtlCache<Vec<PaymentLine>>,
}

impl BookingListLoader {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        lines: Arc<dyn PaymentLineStore>,
        directory: Arc<dyn DirectoryStore>,
        ttls: ListTtls,
    ) -> Self {
        Self {
            bookings,
            lines,
            directory,
            ttls,
            pages: TtlCache::new(),
            cars: TtlCache::new(),
            users: TtlCache::new(),
            line_sets: TtlCache::new(),
        }
    }

    /// All bookings of `user_id` with details and derived status.
    ///
    /// Failing to list the bookings, or to load any booking's payment lines,
    /// fails the page: without lines there is no status to show. Car and user
    /// lookup failures only blank out that detail.
    pub async fn load_page(&self, user_id: &str) -> Result<Vec<BookingListItem>, StoreError> {
        let page_key = format!("list:{user_id}");
        let bookings = self
            .pages
            .get_or_fetch(&page_key, self.ttls.list, || {
                self.bookings.list_bookings(user_id)
            })
            .await?;

        let car_ids: Vec<&str> = bookings.iter().map(|b| b.car_id.as_str()).collect();
        let user_ids: Vec<&str> = bookings.iter().map(|b| b.user_id.as_str()).collect();
        let booking_ids: Vec<&str> = bookings.iter().map(|b| b.booking_id.as_str()).collect();

        let (cars, users, line_sets) = tokio::join!(
            batch_fetch(car_ids, |id| self.car(id)),
            batch_fetch(user_ids, |id| self.user(id)),
            batch_fetch(booking_ids, |id| self.lines_for(id)),
        );

        debug!(
            user_id,
            bookings = bookings.len(),
            cars = cars.len(),
            users = users.len(),
            "list: page assembled"
        );

        let mut items = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let lines = lines_of(&line_sets, &booking.booking_id)?;
            items.push(BookingListItem {
                car: detail(&cars, &booking.car_id, "car"),
                user: detail(&users, &booking.user_id, "user"),
                derived: derive_status(&lines),
                lines,
                booking,
            });
        }
        Ok(items)
    }

    /// Drop a booking's cached lines and every cached page.
    ///
    /// Call after reconciling the booking.
    pub async fn invalidate_booking(&self, booking_id: &str) {
        self.line_sets
            .invalidate(&format!("lines:{booking_id}"))
            .await;
        let pages = self.pages.invalidate_matching("list:*").await;
        debug!(booking_id, pages, "list: cache invalidated");
    }

    /// Drop expired entries from every cache. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        self.pages.purge_expired().await
            + self.cars.purge_expired().await
            + self.users.purge_expired().await
            + self.line_sets.purge_expired().await
    }

    async fn car(&self, car_id: String) -> Result<Car, StoreError> {
        self.cars
            .get_or_fetch(&format!("car:{car_id}"), self.ttls.entity, || {
                self.directory.get_car(&car_id)
            })
            .await
    }

    async fn user(&self, user_id: String) -> Result<UserProfile, StoreError> {
        self.users
            .get_or_fetch(&format!("user:{user_id}"), self.ttls.entity, || {
                self.directory.get_user(&user_id)
            })
            .await
    }

    async fn lines_for(&self, booking_id: String) -> Result<Vec<PaymentLine>, StoreError> {
        self.line_sets
            .get_or_fetch(&format!("lines:{booking_id}"), self.ttls.entity, || {
                self.lines.lines_for_booking(&booking_id)
            })
            .await
    }
}

fn detail<V: Clone>(
    fetched: &BTreeMap<String, Result<V, StoreError>>,
    id: &str,
    entity: &'static str,
) -> Option<V> {
    match fetched.get(id) {
        Some(Ok(v)) => Some(v.clone()),
        Some(Err(e)) => {
            warn!(id, entity, error = %e, "list: detail lookup failed");
            None
        }
        None => None,
    }
}

fn lines_of(
    fetched: &BTreeMap<String, Result<Vec<PaymentLine>, StoreError>>,
    booking_id: &str,
) -> Result<Vec<PaymentLine>, StoreError> {
    match fetched.get(booking_id) {
        Some(Ok(lines)) => Ok(lines.clone()),
        Some(Err(e)) => Err(e.clone()),
        None => Ok(Vec::new()),
    }
}
