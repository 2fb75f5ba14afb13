//! Scripted location provider for testing

use super::{
    LocationError, LocationOptions, LocationProvider, LocationSubscription, PositionSample,
    SubscriptionHandle,
};
use crate::geo::Coordinate;
use futures::channel::mpsc::{self, UnboundedSender};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Location provider driven by the test
///
/// One-shot fixes come from a script queue; an empty queue answers
/// `Unavailable`. Pushed samples go to every live subscription.
#[derive(Debug, Default)]
pub struct MockLocationProvider {
    fixes: Mutex<VecDeque<Result<PositionSample, LocationError>>>,
    subscribers: Mutex<HashMap<SubscriptionHandle, UnboundedSender<Result<PositionSample, LocationError>>>>,
    requests: Mutex<Vec<LocationOptions>>,
    subscribe_error: Mutex<Option<LocationError>>,
    next_handle: AtomicU64,
    unsubscribes: AtomicUsize,
}

impl MockLocationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose first fix is `coordinate`
    pub fn at(coordinate: Coordinate) -> Self {
        let provider = Self::new();
        provider.script_fix(Ok(PositionSample::now(coordinate)));
        provider
    }

    /// Queue the answer to the next one-shot request
    pub fn script_fix(&self, fix: Result<PositionSample, LocationError>) {
        self.fixes.lock().push_back(fix);
    }

    /// Make subscribing fail
    pub fn fail_subscribe(&self, error: LocationError) {
        *self.subscribe_error.lock() = Some(error);
    }

    /// Deliver a sample to every subscriber, returning how many received it
    pub fn push(&self, sample: PositionSample) -> usize {
        self.broadcast(Ok(sample))
    }

    /// Deliver a sample stamped with the current time
    pub fn push_coordinate(&self, coordinate: Coordinate) -> usize {
        self.push(PositionSample::new(coordinate, Instant::now()))
    }

    pub fn push_error(&self, error: LocationError) -> usize {
        self.broadcast(Err(error))
    }

    fn broadcast(&self, item: Result<PositionSample, LocationError>) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|_, tx| !tx.is_closed());
        subscribers
            .values()
            .filter(|tx| tx.unbounded_send(item.clone()).is_ok())
            .count()
    }

    /// Options of every one-shot request so far
    pub fn requests(&self) -> Vec<LocationOptions> {
        self.requests.lock().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl LocationProvider for MockLocationProvider {
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<PositionSample, LocationError> {
        self.requests.lock().push(*options);
        let fix = self.fixes.lock().pop_front();
        fix.unwrap_or_else(|| Err(LocationError::Unavailable("no scripted fix".into())))
    }

    fn subscribe(&self, _options: &LocationOptions) -> Result<LocationSubscription, LocationError> {
        if let Some(error) = self.subscribe_error.lock().clone() {
            return Err(error);
        }
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (tx, updates) = mpsc::unbounded();
        self.subscribers.lock().insert(handle, tx);
        Ok(LocationSubscription { handle, updates })
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscribers.lock().remove(&handle).is_some() {
            self.unsubscribes.fetch_add(1, Ordering::Relaxed);
        }
    }
}
