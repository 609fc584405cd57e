// ============================================================================
// Test doubles for the placement collaborators
// ============================================================================

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::order::{Order, OrderPlacedEvent};
use crate::domain::stock::{StockQuery, StockResult};
use crate::inventory::{StockAvailabilityClient, StockCheckError};
use crate::messaging::{EventPublisher, PublishError};
use crate::store::{InMemoryOrderStore, OrderStore, StoreError};

#[derive(Debug, Clone)]
pub enum StockBehaviour {
    /// Every queried code is in stock
    AllInStock,
    /// Fixed answer regardless of the query
    Answer(StockResult),
    Unreachable,
    /// Never completes; only the gate can end the call
    Hang,
    /// Gives up at the deadline it was handed, like the HTTP client does
    ExceedsDeadline,
    Panic,
}

/// Scripted inventory service that counts how often it is reached.
pub struct FakeStockClient {
    behaviour: Mutex<StockBehaviour>,
    calls: AtomicU32,
    queries: Mutex<Vec<StockQuery>>,
}

impl FakeStockClient {
    pub fn new(behaviour: StockBehaviour) -> Self {
        Self {
            behaviour: Mutex::new(behaviour),
            calls: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn all_in_stock() -> Self {
        Self::new(StockBehaviour::AllInStock)
    }

    pub fn answering(pairs: &[(&str, bool)]) -> Self {
        Self::new(StockBehaviour::Answer(pairs.iter().copied().collect()))
    }

    pub fn set_behaviour(&self, behaviour: StockBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<StockQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl StockAvailabilityClient for FakeStockClient {
    async fn check_availability(
        &self,
        query: &StockQuery,
        deadline: Duration,
    ) -> Result<StockResult, StockCheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        let behaviour = self.behaviour.lock().unwrap().clone();

        match behaviour {
            StockBehaviour::AllInStock => Ok(query
                .codes()
                .iter()
                .map(|code| (code.clone(), true))
                .collect()),
            StockBehaviour::Answer(result) => Ok(result),
            StockBehaviour::Unreachable => {
                Err(StockCheckError::Unreachable("connection refused".to_string()))
            }
            StockBehaviour::Hang => std::future::pending().await,
            StockBehaviour::ExceedsDeadline => {
                tokio::time::sleep(deadline).await;
                Err(StockCheckError::Timeout(deadline))
            }
            StockBehaviour::Panic => panic!("inventory client bug"),
        }
    }
}

/// In-memory store with switchable failure modes.
#[derive(Default)]
pub struct RecordingStore {
    inner: InMemoryOrderStore,
    saves: AtomicU32,
    failing: AtomicBool,
    hanging: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn hanging() -> Self {
        let store = Self::default();
        store.hanging.store(true, Ordering::SeqCst);
        store
    }

    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn stored(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl OrderStore for RecordingStore {
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database is down".to_string()));
        }
        self.inner.save(order).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database is down".to_string()));
        }
        self.inner.get(id).await
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<OrderPlacedEvent>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.failing.store(true, Ordering::SeqCst);
        publisher
    }

    /// Takes `delay` before every broker acknowledgement
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<OrderPlacedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &OrderPlacedEvent) -> Result<(), PublishError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::BrokerUnavailable {
                reason: "broker down".to_string(),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
