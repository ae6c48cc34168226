//! In-process domain events.
//!
//! Core writes publish onto a broadcast channel; subscribers (logging today,
//! mail or webhooks tomorrow) consume on their own tasks. Publishing is fire
//! and forget: a write never fails because nobody is listening.

use chrono::NaiveDate;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum DomainEvent {
    InvoiceIssued {
        number: String,
        contract_id: String,
        total_ron: f64,
    },
    InvoiceDeleted {
        number: String,
    },
    ContractUpdated {
        contract_id: String,
    },
    IndexingReminderDue {
        contract_id: String,
        indexing_date: NaiveDate,
        days_until: i64,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // SendError only means no active receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Structured-log subscriber, the one consumer that always runs.
pub fn spawn_logging_subscriber(bus: &EventBus) {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(DomainEvent::InvoiceIssued {
                    number,
                    contract_id,
                    total_ron,
                }) => {
                    tracing::info!(%number, %contract_id, total_ron, "Invoice issued");
                }
                Ok(DomainEvent::InvoiceDeleted { number }) => {
                    tracing::info!(%number, "Invoice deleted");
                }
                Ok(DomainEvent::ContractUpdated { contract_id }) => {
                    tracing::info!(%contract_id, "Contract updated");
                }
                Ok(DomainEvent::IndexingReminderDue {
                    contract_id,
                    indexing_date,
                    days_until,
                }) => {
                    tracing::info!(
                        %contract_id,
                        %indexing_date,
                        days_until,
                        "Indexing reminder due"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::default();
        let mut receiver = bus.subscribe();
        bus.publish(DomainEvent::InvoiceDeleted {
            number: "N-1".into(),
        });
        match receiver.recv().await.unwrap() {
            DomainEvent::InvoiceDeleted { number } => assert_eq!(number, "N-1"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::ContractUpdated {
            contract_id: "c1".into(),
        });
    }
}
