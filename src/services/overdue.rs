//! Bulk reconciliation of shipments that missed their delivery window.

use crate::{
    clock::SharedClock,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{shipment, ShipmentStatus},
};
use metrics::counter;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::interval};
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct OverdueReconciler {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clock: SharedClock,
}

impl OverdueReconciler {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, clock: SharedClock) -> Self {
        Self {
            db_pool,
            event_sender,
            clock,
        }
    }

    /// Flags every expired, unfinished shipment as OVERDUE in one statement.
    ///
    /// Shipments already DELIVERED, CANCELED or OVERDUE are left alone, so a second
    /// run with nothing newly expired reports 0. Per-shipment transition checks are
    /// not applied here.
    #[instrument(skip(self))]
    pub async fn mark_overdue(&self) -> Result<u64, ServiceError> {
        let now = self.clock.now();

        let result = shipment::Entity::update_many()
            .col_expr(shipment::Column::Status, Expr::value(ShipmentStatus::Overdue))
            .col_expr(shipment::Column::UpdatedAt, Expr::value(now))
            .filter(shipment::Column::ExpectedDeliveryDate.lt(now))
            .filter(shipment::Column::Status.is_not_in(ShipmentStatus::RECONCILED))
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Overdue reconciliation failed");
                counter!("fleet.overdue.failures", 1);
                ServiceError::OverdueReconciliation(e)
            })?;

        let count = result.rows_affected;
        counter!("fleet.overdue.runs", 1);
        if count > 0 {
            counter!("fleet.overdue.marked", count);
            info!(count, "Shipments marked overdue");
            self.event_sender
                .send_or_log(Event::ShipmentsMarkedOverdue { count })
                .await;
        }

        Ok(count)
    }

    /// Runs [`mark_overdue`](Self::mark_overdue) on a fixed interval until the task is aborted.
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        info!(interval_secs = every.as_secs(), "Starting overdue reconciler");
        tokio::spawn(async move {
            let mut ticker = interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.mark_overdue().await {
                    error!("overdue reconciler error: {}", e);
                }
            }
        })
    }
}
