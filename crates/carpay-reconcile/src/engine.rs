use std::sync::Arc;

use carpay_ledger::{
    derive_status, BookingStore, GatewayClient, LineStatus, PaymentLine, PaymentLineStore,
    PaymentMethod, StoreError, UpdatePath,
};
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    aggregate_target, plan_line, GatewayObservation, LineOutcome, LineReport, ReconcileError,
    ReconciliationReport,
};

/// Reconciles a booking's local payment lines against the gateway.
///
/// Holds no state between calls. Cloning is cheap; every clone shares the
/// same store and gateway handles.
#[derive(Clone)]
pub struct Reconciler {
    bookings: Arc<dyn BookingStore>,
    lines: Arc<dyn PaymentLineStore>,
    gateway: Arc<dyn GatewayClient>,
}

impl Reconciler {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        lines: Arc<dyn PaymentLineStore>,
        gateway: Arc<dyn GatewayClient>,
    ) -> Self {
        Self {
            bookings,
            lines,
            gateway,
        }
    }

    /// One reconciliation pass over `booking_id`.
    ///
    /// 1. load booking, invoice and lines (fatal on failure)
    /// 2. query the gateway for every non-terminal line, concurrently
    /// 3. write corrections through the kind-specific update path
    /// 4. re-derive the booking status and persist it if it changed
    pub async fn reconcile(&self, booking_id: &str) -> Result<ReconciliationReport, ReconcileError> {
        let booking = self.bookings.get_booking(booking_id).await?;
        let invoice_id = booking
            .invoice_id
            .clone()
            .ok_or_else(|| ReconcileError::NotFound {
                entity: "invoice",
                id: booking_id.to_string(),
            })?;
        self.bookings.get_invoice(&invoice_id).await?;
        let lines = self.lines.lines_for_booking(booking_id).await?;

        debug!(booking_id, lines = lines.len(), "reconcile: ledger loaded");

        let observations = self.observe(&lines).await;

        let mut reports = Vec::with_capacity(lines.len());
        let mut outcomes = Vec::with_capacity(lines.len());

        for (line, observation) in lines.into_iter().zip(observations) {
            let previous_status = line.status;
            let mut effective = line.clone();
            let mut was_updated = false;
            let mut note = None;

            if let Some(next) = plan_line(&line, &observation) {
                match self.apply(booking_id, &line, next).await {
                    Ok(()) => {
                        info!(
                            booking_id,
                            order_code = line.order_code,
                            kind = %line.kind,
                            from = %previous_status,
                            to = %next,
                            "reconcile: line corrected"
                        );
                        effective.status = next;
                        was_updated = true;
                    }
                    Err(e) => {
                        warn!(
                            booking_id,
                            order_code = line.order_code,
                            kind = %line.kind,
                            error = %e,
                            "reconcile: line update refused"
                        );
                        note = Some(e.to_string());
                    }
                }
            } else if observation == GatewayObservation::Error {
                note = Some("gateway lookup failed".to_string());
            }

            reports.push(LineReport {
                order_code: line.order_code,
                kind: line.kind,
                previous_status,
                gateway_status: observation.clone(),
                was_updated,
                note,
            });
            outcomes.push(LineOutcome {
                line: effective,
                observation,
            });
        }

        let previous_booking_status = booking.status;
        let mut booking_status = previous_booking_status;
        let mut booking_updated = false;

        if let Some(target) = aggregate_target(&outcomes) {
            if target != previous_booking_status {
                match self.bookings.update_booking_status(booking_id, target).await {
                    Ok(()) => {
                        info!(
                            booking_id,
                            from = %previous_booking_status,
                            to = %target,
                            "reconcile: booking transitioned"
                        );
                        booking_status = target;
                        booking_updated = true;
                    }
                    Err(e) => {
                        warn!(booking_id, error = %e, "reconcile: booking update refused");
                    }
                }
            }
        }

        let corrected: Vec<PaymentLine> = outcomes.into_iter().map(|o| o.line).collect();

        Ok(ReconciliationReport {
            booking_id: booking_id.to_string(),
            previous_booking_status,
            booking_status,
            booking_updated,
            lines: reports,
            derived: derive_status(&corrected),
        })
    }

    /// Reconcile several bookings with at most `max_concurrency` in flight.
    ///
    /// Results come back in input order. Bookings never interact.
    pub async fn reconcile_many(
        &self,
        booking_ids: &[String],
        max_concurrency: usize,
    ) -> Vec<(String, Result<ReconciliationReport, ReconcileError>)> {
        stream::iter(booking_ids.iter().cloned())
            .map(|id| async move {
                let result = self.reconcile(&id).await;
                (id, result)
            })
            .buffered(max_concurrency.max(1))
            .collect()
            .await
    }

    /// Gateway answers for each line, aligned with `lines`.
    async fn observe(&self, lines: &[PaymentLine]) -> Vec<GatewayObservation> {
        let queries = lines.iter().map(|line| async move {
            if line.status.is_terminal() {
                return GatewayObservation::Skipped;
            }
            match self.gateway.get_status(line.order_code).await {
                Ok(status) => GatewayObservation::Reported(status),
                Err(e) => {
                    warn!(
                        order_code = line.order_code,
                        gateway = self.gateway.name(),
                        error = %e,
                        "reconcile: gateway lookup failed"
                    );
                    GatewayObservation::Error
                }
            }
        });
        join_all(queries).await
    }

    async fn apply(
        &self,
        booking_id: &str,
        line: &PaymentLine,
        next: LineStatus,
    ) -> Result<(), StoreError> {
        match line.kind.update_path() {
            UpdatePath::ByBooking => {
                self.lines
                    .update_line_by_booking(booking_id, line.kind, next)
                    .await
            }
            UpdatePath::ByOrderCode => {
                self.lines
                    .update_line_by_order_code(line.order_code, next, PaymentMethod::PayOs)
                    .await
            }
        }
    }
}
