//! Dispatch registry.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use rockets_core::message::{BlockingMessage, Message};
use rockets_sync::MutexService;
use tracing::debug;

use crate::error::{BusError, HandlerError};
use crate::handler::Handler;

/// Registry mapping each type discriminant of `I` to one handler producing `O`.
pub struct Bus<I, O> {
    handlers: HashMap<&'static str, Arc<dyn Handler<I, O>>>,
}

impl<I, O> Bus<I, O>
where
    I: Message + 'static,
    O: Send + 'static,
{
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for inputs whose discriminant is `input_type`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::HandlerAlreadyRegistered` if `input_type` already
    /// has a handler; the existing registration is kept.
    pub fn register(
        &mut self,
        input_type: &'static str,
        handler: Arc<dyn Handler<I, O>>,
    ) -> Result<(), BusError> {
        if self.handlers.contains_key(input_type) {
            return Err(BusError::HandlerAlreadyRegistered { input_type });
        }
        self.handlers.insert(input_type, handler);
        debug!(input_type, "bus handler registered");
        Ok(())
    }

    /// Registers `handler`, failing fast on a double registration.
    ///
    /// Meant for startup wiring, where a duplicate is a programming error.
    ///
    /// # Panics
    ///
    /// Panics if `input_type` already has a handler.
    #[must_use]
    pub fn must_register(mut self, input_type: &'static str, handler: Arc<dyn Handler<I, O>>) -> Self {
        if let Err(e) = self.register(input_type, handler) {
            panic!("{e}");
        }
        self
    }

    /// Registered discriminants, sorted.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Dispatches `input` to its handler and returns the handler's output.
    ///
    /// # Errors
    ///
    /// - `BusError::HandlerNotRegistered` if no handler matches.
    /// - `BusError::InvalidInputProvided` if the handler rejects the input kind.
    /// - `BusError::Unprocessable` if the handler fails.
    pub async fn dispatch(&self, input: I) -> Result<O, BusError> {
        let input_type = input.message_type();
        let handler = self.handler_for(input_type)?;
        handler
            .handle(input)
            .await
            .map_err(|e| handler_failure(input_type, e))
    }

    /// Dispatches `input` and converts the output to `T`.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch), plus
    /// `BusError::InvalidOutputReceived` if the output is not a `T`.
    pub async fn dispatch_as<T>(&self, input: I) -> Result<T, BusError>
    where
        T: TryFrom<O>,
    {
        let input_type = input.message_type();
        let output = self.dispatch(input).await?;
        T::try_from(output).map_err(|_| BusError::InvalidOutputReceived {
            input_type,
            expected: type_name::<T>(),
        })
    }

    /// Dispatches `input` while holding the lock named by its blocking key.
    ///
    /// The handler runs at most once, and never concurrently with another
    /// blocking dispatch sharing the same key anywhere in the fleet.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch), plus `BusError::Coordination`
    /// if the lock could not be acquired or released.
    pub async fn dispatch_blocking(&self, mutex: &MutexService, input: I) -> Result<O, BusError>
    where
        I: BlockingMessage,
    {
        let input_type = input.message_type();
        let handler = self.handler_for(input_type)?;
        let key = input.blocking_key();

        let outcome = mutex
            .with_lock(&key, move || async move { handler.handle(input).await })
            .await
            .map_err(|source| BusError::Coordination { input_type, source })?;

        outcome.map_err(|e| handler_failure(input_type, e))
    }

    fn handler_for(&self, input_type: &'static str) -> Result<Arc<dyn Handler<I, O>>, BusError> {
        self.handlers
            .get(input_type)
            .cloned()
            .ok_or(BusError::HandlerNotRegistered { input_type })
    }
}

fn handler_failure(input_type: &'static str, error: HandlerError) -> BusError {
    match error {
        HandlerError::Domain(source) => BusError::Unprocessable { input_type, source },
        HandlerError::UnexpectedInput(_) => BusError::InvalidInputProvided { input_type },
    }
}

impl<I, O> Default for Bus<I, O>
where
    I: Message + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> std::fmt::Debug for Bus<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().collect();
        types.sort_unstable();
        f.debug_struct("Bus").field("handlers", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rockets_core::error::{DomainError, Severity};
    use rockets_sync::in_memory::InMemoryLockStore;
    use rockets_sync::{MutexError, MutexOptions};
    use rockets_test_support::{FailingLockStore, UnreleasableLockStore};

    use super::*;

    #[derive(Debug)]
    enum Signal {
        Ping(u32),
        Fail,
        Touch { signal_id: &'static str },
    }

    impl Message for Signal {
        fn message_type(&self) -> &'static str {
            match self {
                Self::Ping(_) => "Ping",
                Self::Fail => "Fail",
                Self::Touch { .. } => "Touch",
            }
        }
    }

    impl BlockingMessage for Signal {
        fn blocking_key(&self) -> String {
            match self {
                Self::Touch { signal_id } => format!("signal:{signal_id}"),
                _ => "signal:none".to_owned(),
            }
        }
    }

    #[derive(Debug, PartialEq)]
    enum Reply {
        Number(u32),
        Nothing,
    }

    #[derive(Debug, PartialEq)]
    struct Number(u32);

    impl TryFrom<Reply> for Number {
        type Error = Reply;

        fn try_from(reply: Reply) -> Result<Self, Self::Error> {
            match reply {
                Reply::Number(n) => Ok(Self(n)),
                other => Err(other),
            }
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl Handler<Signal, Reply> for EchoHandler {
        async fn handle(&self, input: Signal) -> Result<Reply, HandlerError> {
            match input {
                Signal::Ping(n) => Ok(Reply::Number(n)),
                other => Err(HandlerError::UnexpectedInput(other.message_type())),
            }
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl Handler<Signal, Reply> for FailingHandler {
        async fn handle(&self, _input: Signal) -> Result<Reply, HandlerError> {
            Err(DomainError::Validation("speed out of range".into()).into())
        }
    }

    /// Tracks how many invocations overlap.
    #[derive(Default)]
    struct SlowHandler {
        active: AtomicU32,
        max_active: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Handler<Signal, Reply> for SlowHandler {
        async fn handle(&self, _input: Signal) -> Result<Reply, HandlerError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::Nothing)
        }
    }

    fn fast_mutex_options() -> MutexOptions {
        MutexOptions {
            expiry: Duration::from_secs(5),
            retries: 200,
            retry_delay: Duration::from_millis(2),
            timeout_factor: 0.2,
            service_prefix: None,
        }
    }

    #[test]
    fn test_register_rejects_second_handler_for_same_type() {
        // Arrange
        let mut bus: Bus<Signal, Reply> = Bus::new();
        bus.register("Ping", Arc::new(EchoHandler)).unwrap();

        // Act
        let result = bus.register("Ping", Arc::new(FailingHandler));

        // Assert
        assert!(matches!(
            result,
            Err(BusError::HandlerAlreadyRegistered { input_type: "Ping" })
        ));
        assert_eq!(bus.registered_types(), vec!["Ping"]);
    }

    #[test]
    #[should_panic(expected = "bus handler already registered for Ping")]
    fn test_must_register_panics_on_double_registration() {
        let _bus = Bus::<Signal, Reply>::new()
            .must_register("Ping", Arc::new(EchoHandler))
            .must_register("Ping", Arc::new(EchoHandler));
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_registered_handler() {
        // Arrange
        let bus = Bus::<Signal, Reply>::new().must_register("Ping", Arc::new(EchoHandler));

        // Act
        let reply = bus.dispatch(Signal::Ping(7)).await.unwrap();

        // Assert
        assert_eq!(reply, Reply::Number(7));
    }

    #[tokio::test]
    async fn test_dispatch_without_handler_fails() {
        let bus: Bus<Signal, Reply> = Bus::new();

        let err = bus.dispatch(Signal::Fail).await.unwrap_err();

        assert!(matches!(err, BusError::HandlerNotRegistered { input_type: "Fail" }));
        assert!(err.is_wiring_fault());
    }

    #[tokio::test]
    async fn test_handler_rejecting_input_kind_is_wiring_fault() {
        // Arrange
        let bus = Bus::<Signal, Reply>::new().must_register("Fail", Arc::new(EchoHandler));

        // Act
        let err = bus.dispatch(Signal::Fail).await.unwrap_err();

        // Assert
        assert!(matches!(err, BusError::InvalidInputProvided { input_type: "Fail" }));
        assert_eq!(err.severity(), Severity::Fatal);
    }

    #[tokio::test]
    async fn test_handler_domain_error_keeps_its_severity() {
        // Arrange
        let bus = Bus::<Signal, Reply>::new().must_register("Fail", Arc::new(FailingHandler));

        // Act
        let err = bus.dispatch(Signal::Fail).await.unwrap_err();

        // Assert
        assert!(matches!(
            err,
            BusError::Unprocessable {
                source: DomainError::Validation(_),
                ..
            }
        ));
        assert_eq!(err.severity(), Severity::Info);
        assert!(!err.is_wiring_fault());
    }

    #[tokio::test]
    async fn test_dispatch_as_converts_matching_output() {
        let bus = Bus::<Signal, Reply>::new().must_register("Ping", Arc::new(EchoHandler));

        let number: Number = bus.dispatch_as(Signal::Ping(3)).await.unwrap();

        assert_eq!(number, Number(3));
    }

    #[tokio::test]
    async fn test_dispatch_as_reports_output_mismatch() {
        // Arrange
        let slow = Arc::new(SlowHandler::default());
        let bus = Bus::<Signal, Reply>::new().must_register("Touch", slow);

        // Act
        let err = bus
            .dispatch_as::<Number>(Signal::Touch { signal_id: "a" })
            .await
            .unwrap_err();

        // Assert
        match err {
            BusError::InvalidOutputReceived {
                input_type,
                expected,
            } => {
                assert_eq!(input_type, "Touch");
                assert!(expected.ends_with("Number"));
            }
            other => panic!("expected InvalidOutputReceived, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_blocking_dispatch_serializes_same_key() {
        // Arrange
        let slow = Arc::new(SlowHandler::default());
        let bus: Arc<Bus<Signal, Reply>> =
            Arc::new(Bus::<Signal, Reply>::new().must_register("Touch", slow.clone()));
        let mutex = MutexService::new(Arc::new(InMemoryLockStore::new()), fast_mutex_options());

        // Act
        let mut tasks = Vec::new();
        for _ in 0..5 {
            let bus = Arc::clone(&bus);
            let mutex = mutex.clone();
            tasks.push(tokio::spawn(async move {
                bus.dispatch_blocking(&mutex, Signal::Touch { signal_id: "same" })
                    .await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), Reply::Nothing);
        }

        // Assert
        assert_eq!(slow.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(slow.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_blocking_dispatch_without_lock_never_invokes_handler() {
        // Arrange
        let slow = Arc::new(SlowHandler::default());
        let bus = Bus::<Signal, Reply>::new().must_register("Touch", slow.clone());
        let mutex = MutexService::new(
            Arc::new(FailingLockStore),
            MutexOptions {
                retries: 2,
                ..fast_mutex_options()
            },
        );

        // Act
        let err = bus
            .dispatch_blocking(&mutex, Signal::Touch { signal_id: "a" })
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            BusError::Coordination {
                source: MutexError::LockAcquisitionFailed { .. },
                ..
            }
        ));
        assert!(err.severity().is_fatal());
        assert_eq!(slow.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreleased_lock_after_successful_handler_reports_handler_success() {
        // Arrange
        let slow = Arc::new(SlowHandler::default());
        let bus = Bus::<Signal, Reply>::new().must_register("Touch", slow.clone());
        let mutex = MutexService::new(Arc::new(UnreleasableLockStore), fast_mutex_options());

        // Act
        let err = bus
            .dispatch_blocking(&mutex, Signal::Touch { signal_id: "a" })
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            BusError::Coordination {
                source: MutexError::LockReleaseFailed { .. },
                ..
            }
        ));
        assert!(err.handler_succeeded());
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_acquisition_is_not_handler_success() {
        let bus = Bus::<Signal, Reply>::new().must_register("Touch", Arc::new(SlowHandler::default()));
        let mutex = MutexService::new(
            Arc::new(FailingLockStore),
            MutexOptions {
                retries: 2,
                ..fast_mutex_options()
            },
        );

        let err = bus
            .dispatch_blocking(&mutex, Signal::Touch { signal_id: "a" })
            .await
            .unwrap_err();

        assert!(!err.handler_succeeded());
    }
}
