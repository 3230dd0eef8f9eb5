use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use carpay_ledger::{
    Booking, BookingStatus, BookingStore, Car, DirectoryStore, Invoice, LineKind, LineStatus,
    PaymentLine, PaymentLineStore, PaymentMethod, StoreError, UserProfile,
};

/// Every write the engine issued, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteCall {
    LineByBooking {
        booking_id: String,
        kind: LineKind,
        status: LineStatus,
    },
    LineByOrderCode {
        order_code: i64,
        status: LineStatus,
        method: PaymentMethod,
    },
    BookingStatus {
        booking_id: String,
        status: BookingStatus,
    },
}

/// Read counters, for asserting batch loaders fetch each entity once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadCounts {
    pub bookings: usize,
    pub invoices: usize,
    pub lines: usize,
    pub cars: usize,
    pub users: usize,
    pub list_bookings: usize,
}

#[derive(Default)]
struct LedgerState {
    bookings: BTreeMap<String, Booking>,
    invoices: BTreeMap<String, String>,
    lines: BTreeMap<String, Vec<PaymentLine>>,
    cars: BTreeMap<String, Car>,
    users: BTreeMap<String, UserProfile>,
    rejected_order_codes: BTreeSet<i64>,
    reject_booking_writes: bool,
    unavailable: bool,
    writes: Vec<WriteCall>,
    reads: ReadCounts,
}

/// In-memory booking, payment-line and directory store.
///
/// Writes are applied immediately and logged; individual order codes can be
/// scripted to refuse writes.
#[derive(Default)]
pub struct InMemoryLedger {
    inner: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a booking with its lines. An invoice is registered when the
    /// booking carries an invoice id.
    pub fn insert_booking(&self, booking: Booking, lines: Vec<PaymentLine>) {
        let mut st = self.state();
        if let Some(invoice_id) = &booking.invoice_id {
            st.invoices
                .insert(invoice_id.clone(), booking.booking_id.clone());
        }
        st.lines.insert(booking.booking_id.clone(), lines);
        st.bookings.insert(booking.booking_id.clone(), booking);
    }

    /// Drop an invoice while keeping the booking pointing at it.
    pub fn remove_invoice(&self, invoice_id: &str) {
        self.state().invoices.remove(invoice_id);
    }

    pub fn insert_car(&self, car: Car) {
        self.state().cars.insert(car.car_id.clone(), car);
    }

    pub fn insert_user(&self, user: UserProfile) {
        self.state().users.insert(user.user_id.clone(), user);
    }

    /// Refuse every write that targets this order code.
    pub fn reject_line_writes(&self, order_code: i64) {
        self.state().rejected_order_codes.insert(order_code);
    }

    pub fn reject_booking_writes(&self, reject: bool) {
        self.state().reject_booking_writes = reject;
    }

    /// Make every read fail as if the boundary system were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn booking(&self, booking_id: &str) -> Option<Booking> {
        self.state().bookings.get(booking_id).cloned()
    }

    pub fn lines(&self, booking_id: &str) -> Vec<PaymentLine> {
        self.state()
            .lines
            .get(booking_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn line(&self, order_code: i64) -> Option<PaymentLine> {
        self.state()
            .lines
            .values()
            .flatten()
            .find(|l| l.order_code == order_code)
            .cloned()
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    pub fn reads(&self) -> ReadCounts {
        self.state().reads.clone()
    }

    fn check_available(st: &LedgerState) -> Result<(), StoreError> {
        if st.unavailable {
            return Err(StoreError::Unavailable("in-memory ledger offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryLedger {
    async fn get_booking(&self, booking_id: &str) -> Result<Booking, StoreError> {
        let mut st = self.state();
        st.reads.bookings += 1;
        Self::check_available(&st)?;
        st.bookings
            .get(booking_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("booking", booking_id))
    }

    async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, StoreError> {
        let mut st = self.state();
        st.reads.invoices += 1;
        Self::check_available(&st)?;
        let booking_id = st
            .invoices
            .get(invoice_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("invoice", invoice_id))?;
        Ok(Invoice {
            invoice_id: invoice_id.to_string(),
            lines: st.lines.get(&booking_id).cloned().unwrap_or_default(),
            booking_id,
        })
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let mut st = self.state();
        if st.reject_booking_writes {
            return Err(StoreError::Rejected {
                reason: format!("booking {booking_id} is locked"),
            });
        }
        let booking = st
            .bookings
            .get_mut(booking_id)
            .ok_or_else(|| StoreError::not_found("booking", booking_id))?;
        booking.status = status;
        st.writes.push(WriteCall::BookingStatus {
            booking_id: booking_id.to_string(),
            status,
        });
        Ok(())
    }

    async fn list_bookings(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        let mut st = self.state();
        st.reads.list_bookings += 1;
        Self::check_available(&st)?;
        Ok(st
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentLineStore for InMemoryLedger {
    async fn lines_for_booking(&self, booking_id: &str) -> Result<Vec<PaymentLine>, StoreError> {
        let mut st = self.state();
        st.reads.lines += 1;
        Self::check_available(&st)?;
        if !st.bookings.contains_key(booking_id) {
            return Err(StoreError::not_found("booking", booking_id));
        }
        Ok(st.lines.get(booking_id).cloned().unwrap_or_default())
    }

    async fn update_line_by_booking(
        &self,
        booking_id: &str,
        kind: LineKind,
        status: LineStatus,
    ) -> Result<(), StoreError> {
        let mut st = self.state();
        let st = &mut *st;
        let line = st
            .lines
            .get_mut(booking_id)
            .and_then(|lines| lines.iter_mut().find(|l| l.kind == kind && l.is_active()))
            .ok_or_else(|| StoreError::not_found("payment", format!("{booking_id}/{kind}")))?;
        if st.rejected_order_codes.contains(&line.order_code) {
            return Err(StoreError::Rejected {
                reason: format!("payment {} is locked", line.order_code),
            });
        }
        line.status = status;
        st.writes.push(WriteCall::LineByBooking {
            booking_id: booking_id.to_string(),
            kind,
            status,
        });
        Ok(())
    }

    async fn update_line_by_order_code(
        &self,
        order_code: i64,
        status: LineStatus,
        method: PaymentMethod,
    ) -> Result<(), StoreError> {
        let mut st = self.state();
        let st = &mut *st;
        if st.rejected_order_codes.contains(&order_code) {
            return Err(StoreError::Rejected {
                reason: format!("order {order_code} is locked"),
            });
        }
        let line = st
            .lines
            .values_mut()
            .flatten()
            .find(|l| l.order_code == order_code)
            .ok_or_else(|| StoreError::not_found("order", order_code.to_string()))?;
        line.status = status;
        st.writes.push(WriteCall::LineByOrderCode {
            order_code,
            status,
            method,
        });
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for InMemoryLedger {
    async fn get_car(&self, car_id: &str) -> Result<Car, StoreError> {
        let mut st = self.state();
        st.reads.cars += 1;
        Self::check_available(&st)?;
        st.cars
            .get(car_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("car", car_id))
    }

    async fn get_user(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        let mut st = self.state();
        st.reads.users += 1;
        Self::check_available(&st)?;
        st.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", user_id))
    }
}
