//! End-to-end scenarios spanning the event bus, component runtime, and
//! state machine together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use eventry::{
    Broker, Component, ComponentCore, ComponentHandle, Event, EventType, PublisherComponent,
    StateMachineBuilder, StateOutcome, SubscriberComponent,
};

const ORDER_PLACED: EventType = EventType::new("order_placed");
const ORDER_SHIPPED: EventType = EventType::new("order_shipped");

struct Logger {
    core: ComponentCore,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Component for Logger {
    fn core(&self) -> &ComponentCore {
        &self.core
    }
}

impl PublisherComponent for Logger {}

#[async_trait]
impl SubscriberComponent for Logger {
    async fn handle_event(&self, event: Event) {
        self.seen.lock().push(event.source().to_string());
    }
}

/// S1 / invariant 1: fan-out delivers to every subscriber in registration
/// order, exactly once per handler.
#[tokio::test]
async fn fan_out_to_multiple_handlers() {
    let broker = Broker::builder().auto_discover(false).build();
    let order: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));

    for marker in [1u8, 2, 3] {
        let order = Arc::clone(&order);
        broker.subscribe(
            ORDER_PLACED,
            eventry::Subscription::Sync(Arc::new(move |_event: &Event| {
                order.lock().push(marker);
            })),
        );
    }

    broker.start().await;
    broker.publish(Event::bare(ORDER_PLACED, "checkout")).await;
    sleep(Duration::from_millis(20)).await;
    broker.stop().await;

    assert_eq!(*order.lock(), vec![1, 2, 3]);
}

/// S2 / invariant 2: a panicking handler does not stop later handlers or
/// later events.
#[tokio::test]
async fn handler_isolation_across_events_and_handlers() {
    let broker = Broker::builder().auto_discover(false).build();
    let survived = Arc::new(AtomicUsize::new(0));

    broker.subscribe(
        ORDER_PLACED,
        eventry::Subscription::Sync(Arc::new(|_event: &Event| panic!("boom"))),
    );
    let survived_clone = Arc::clone(&survived);
    broker.subscribe(
        ORDER_PLACED,
        eventry::Subscription::Sync(Arc::new(move |_event: &Event| {
            survived_clone.fetch_add(1, Ordering::SeqCst);
        })),
    );

    broker.start().await;
    broker.publish(Event::bare(ORDER_PLACED, "a")).await;
    broker.publish(Event::bare(ORDER_PLACED, "b")).await;
    sleep(Duration::from_millis(30)).await;
    broker.stop().await;

    assert_eq!(survived.load(Ordering::SeqCst), 2);
}

/// S3 / invariant 3 & 9: subscriptions taken out before attachment drain in
/// order into the broker, preserving duplicates.
#[tokio::test]
async fn pending_subscriptions_drain_on_registration() {
    let broker = Broker::builder().auto_discover(false).build();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let logger = Arc::new(Logger {
        core: ComponentCore::new("Logger"),
        seen: Arc::clone(&seen),
    });

    logger.subscribe_to(ORDER_PLACED);
    logger.subscribe_to(ORDER_PLACED);
    logger.subscribe_to(ORDER_SHIPPED);

    broker
        .register_component(ComponentHandle::Transceiver(logger), None)
        .unwrap();
    assert_eq!(broker.get_subscriber_count(ORDER_PLACED), 2);
    assert_eq!(broker.get_subscriber_count(ORDER_SHIPPED), 1);

    broker.start().await;
    broker.publish(Event::bare(ORDER_PLACED, "checkout")).await;
    sleep(Duration::from_millis(20)).await;
    broker.stop().await;

    assert_eq!(seen.lock().len(), 2);
}

/// S4 / invariant 4: a transceiver registration always lands under the
/// `Transceiver` capability label, never split across publisher/subscriber.
#[tokio::test]
async fn transceiver_registration_reports_combined_kind() {
    let broker = Broker::builder().auto_discover(false).build();
    let logger = Arc::new(Logger {
        core: ComponentCore::new("Logger"),
        seen: Arc::new(Mutex::new(Vec::new())),
    });
    let id = broker
        .register_component(
            ComponentHandle::Transceiver(logger),
            Some(eventry::ComponentId::new("logger")),
        )
        .unwrap();
    let info = broker.get_component_info(&id).unwrap();
    assert_eq!(info.kind, eventry::ComponentKind::Transceiver);
}

/// S5 / invariant 5: transition validity respects the configured map.
#[tokio::test]
async fn transition_map_is_enforced() {
    let sm = StateMachineBuilder::new("Pipeline")
        .initial_state("idle")
        .state("idle", |_| Box::pin(async { Ok(StateOutcome::Stop) }))
        .state("active", |_| Box::pin(async { Ok(StateOutcome::Stop) }))
        .state("error", |_| Box::pin(async { Ok(StateOutcome::Stop) }))
        .transitions([("idle", vec!["active"]), ("active", vec!["idle", "error"])])
        .build()
        .unwrap();

    assert!(sm.transition_to("active").await);
    assert!(sm.transition_to("idle").await);
    assert!(sm.transition_to("active").await);
    assert!(sm.transition_to("error").await);
    assert!(!sm.transition_to("idle").await);
}

/// S6 / invariant 6: a throwing handler with a registered `error` state
/// recovers there; sustained failure stops the machine.
#[tokio::test]
async fn error_recovery_and_hard_stop() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = Arc::clone(&attempts);

    let sm = StateMachineBuilder::new("Worker")
        .initial_state("working")
        .max_consecutive_errors(3)
        .state("working", move |_| {
            let attempts = Arc::clone(&attempts_clone);
            Box::pin(async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(eventry::StateMachineError::Handler("transient".to_string()))
            })
        })
        .state("error", |_| {
            Box::pin(async { Ok(StateOutcome::Transition("working".to_string())) })
        })
        .build()
        .unwrap();

    sm.start().await;
    sleep(Duration::from_millis(100)).await;

    assert!(!sm.is_running());
    assert!(attempts.load(Ordering::SeqCst) >= 3);
}

/// S7 / invariant 7: double start/stop are safe no-ops; restart resets the
/// error counter.
#[tokio::test]
async fn idempotent_lifecycle_and_restart() {
    let broker = Broker::builder().auto_discover(false).build();
    broker.start().await;
    broker.start().await;
    broker.stop().await;
    broker.stop().await;

    let sm = StateMachineBuilder::new("Idle")
        .initial_state("idle")
        .state_with_poll(
            "idle",
            |_| Box::pin(async { Ok(StateOutcome::Stay) }),
            Duration::from_millis(5),
        )
        .build()
        .unwrap();
    sm.start().await;
    sleep(Duration::from_millis(20)).await;
    sm.restart().await;
    assert!(sm.is_running());
    sm.stop().await;
}

/// S8 / invariant 8: events published in sequence from one task dispatch in
/// that sequence.
#[tokio::test]
async fn single_publisher_ordering_is_preserved() {
    let broker = Broker::builder().auto_discover(false).build();
    let order = Arc::new(Mutex::new(Vec::new()));
    let order_clone = Arc::clone(&order);
    broker.subscribe(
        ORDER_PLACED,
        eventry::Subscription::Sync(Arc::new(move |event: &Event| {
            order_clone.lock().push(event.source().to_string());
        })),
    );

    broker.start().await;
    for i in 0..5 {
        broker
            .publish(Event::bare(ORDER_PLACED, format!("order-{i}")))
            .await;
    }
    sleep(Duration::from_millis(30)).await;
    broker.stop().await;

    let expected: Vec<String> = (0..5).map(|i| format!("order-{i}")).collect();
    assert_eq!(*order.lock(), expected);
}

/// S9 / invariant 10: poll-interval precedence is runtime override > builder
/// default > global fallback.
#[tokio::test]
async fn poll_interval_precedence_end_to_end() {
    let sm = StateMachineBuilder::new("Poller")
        .state_with_poll(
            "steady",
            |_| Box::pin(async { Ok(StateOutcome::Stop) }),
            Duration::from_millis(250),
        )
        .build()
        .unwrap();

    assert_eq!(sm.get_poll_interval("steady"), Duration::from_millis(250));
    sm.set_poll_interval("steady", Duration::from_millis(10));
    assert_eq!(sm.get_poll_interval("steady"), Duration::from_millis(10));
    assert_eq!(sm.get_poll_interval("never_registered"), Duration::from_millis(100));
}
