//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 扇出投递顺序与恰好一次
//! - 失败策略（fail-fast / 聚合 / 错误路由）
//! - 并发订阅变更下的快照隔离

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use contracts::{HandlerError, Message, MessageHandler};

    /// Shared log of (handler, message) deliveries
    pub type Deliveries = Arc<Mutex<Vec<(String, Message)>>>;

    /// Handler that records what it sees and optionally fails
    pub struct Recorder {
        name: String,
        fail: bool,
        log: Deliveries,
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn handle_message(&self, message: &Message) -> Result<(), HandlerError> {
            self.log
                .lock()
                .unwrap()
                .push((self.name.clone(), message.clone()));
            if self.fail {
                return Err(HandlerError::failed(format!("{} refused", self.name)));
            }
            Ok(())
        }
    }

    pub fn recorder(name: &str, fail: bool, log: &Deliveries) -> Arc<dyn MessageHandler> {
        Arc::new(Recorder {
            name: name.to_string(),
            fail,
            log: Arc::clone(log),
        })
    }

    pub fn names(log: &Deliveries) -> Vec<String> {
        log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }
}

#[cfg(test)]
mod sync_dispatch_tests {
    use std::sync::{Arc, Mutex};

    use contracts::{headers, ChannelError, Message, MessageChannel, SubscribableChannel};
    use dispatcher::PublishSubscribeChannel;

    use crate::support::{names, recorder, Deliveries};

    #[tokio::test]
    async fn test_each_subscriber_receives_each_message_once_in_order() {
        let channel = PublishSubscribeChannel::builder("orders").build().unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        for name in ["a", "b", "c"] {
            channel.subscribe(recorder(name, false, &log));
        }

        let ids: Vec<_> = (0..3)
            .map(|i| Message::new(i as u32))
            .map(|m| (m.id(), m))
            .collect();
        for (_, message) in ids.iter().cloned() {
            assert!(channel.send(message).await.unwrap());
        }

        let deliveries = log.lock().unwrap().clone();
        assert_eq!(deliveries.len(), 9);
        for (i, (id, _)) in ids.iter().enumerate() {
            let chunk = &deliveries[i * 3..i * 3 + 3];
            let order: Vec<_> = chunk.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(order, vec!["a", "b", "c"]);
            assert!(chunk.iter().all(|(_, m)| m.id() == *id));
            assert_eq!(chunk[0].1.payload_ref::<u32>(), Some(&(i as u32)));
        }
    }

    #[tokio::test]
    async fn test_zero_subscribers_error_or_false() {
        let strict = PublishSubscribeChannel::builder("strict").build().unwrap();
        let err = strict.send(Message::empty()).await.unwrap_err();
        assert!(matches!(err, ChannelError::NoSubscribers { ref channel } if channel == "strict"));

        let lenient = PublishSubscribeChannel::builder("lenient")
            .require_subscribers(false)
            .build()
            .unwrap();
        assert!(!lenient.send(Message::empty()).await.unwrap());
        assert_eq!(lenient.metrics().no_subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_apply_sequence_numbers_each_copy() {
        let channel = PublishSubscribeChannel::builder("sequenced")
            .apply_sequence(true)
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        for name in ["a", "b", "c"] {
            channel.subscribe(recorder(name, false, &log));
        }

        let original = Message::new("batch");
        let original_id = original.id();
        let kept = original.clone();
        channel.send(original).await.unwrap();

        let deliveries = log.lock().unwrap().clone();
        let mut ids = Vec::new();
        for (position, (_, copy)) in deliveries.iter().enumerate() {
            let h = copy.headers();
            assert_eq!(h.sequence_number(), Some(position as i64 + 1));
            assert_eq!(h.sequence_size(), Some(3));
            assert_eq!(h.correlation_id(), Some(original_id));
            assert_ne!(copy.id(), original_id);
            assert!(copy.shares_payload_with(&kept));
            ids.push(copy.id());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        // the sender's message is untouched
        assert!(kept.headers().is_empty());
    }

    #[tokio::test]
    async fn test_apply_sequence_single_subscriber_gets_original() {
        let channel = PublishSubscribeChannel::builder("single")
            .apply_sequence(true)
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("only", false, &log));

        let message = Message::new(1u8);
        let id = message.id();
        channel.send(message).await.unwrap();

        let (_, received) = log.lock().unwrap()[0].clone();
        assert_eq!(received.id(), id);
        assert!(received.headers().get(headers::SEQUENCE_NUMBER).is_none());
        assert!(received.headers().get(headers::SEQUENCE_SIZE).is_none());
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let channel = PublishSubscribeChannel::builder("strict").build().unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("a", false, &log));
        channel.subscribe(recorder("b", true, &log));
        channel.subscribe(recorder("c", false, &log));
        channel.subscribe(recorder("d", false, &log));

        let message = Message::new("x");
        let id = message.id();
        let err = channel.send(message).await.unwrap_err();

        match err {
            ChannelError::HandlerInvocation(failure) => {
                assert_eq!(failure.handler, "b");
                assert_eq!(failure.channel, "strict");
                assert_eq!(failure.message_id(), id);
            }
            other => panic!("expected handler failure, got {other:?}"),
        }
        assert_eq!(names(&log), vec!["a", "b"]);
        assert_eq!(channel.metrics().delivered_count(), 1);
        assert_eq!(channel.metrics().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_ignore_failures_reports_every_failure_after_full_fanout() {
        let channel = PublishSubscribeChannel::builder("tolerant")
            .ignore_failures(true)
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("a", true, &log));
        channel.subscribe(recorder("b", false, &log));
        channel.subscribe(recorder("c", true, &log));
        channel.subscribe(recorder("d", true, &log));
        channel.subscribe(recorder("e", false, &log));

        let err = channel.send(Message::empty()).await.unwrap_err();

        match err {
            ChannelError::AggregateDispatch(aggregate) => {
                assert_eq!(aggregate.attempted, 5);
                assert_eq!(aggregate.failures.len(), 3);
                assert_eq!(aggregate.failed_handlers(), vec!["a", "c", "d"]);
            }
            other => panic!("expected aggregate failure, got {other:?}"),
        }
        assert_eq!(names(&log), vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_ignore_failures_all_succeed_returns_true() {
        let channel = PublishSubscribeChannel::builder("tolerant")
            .ignore_failures(true)
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("a", false, &log));
        channel.subscribe(recorder("b", false, &log));

        assert!(channel.send(Message::empty()).await.unwrap());
    }
}

#[cfg(test)]
mod subscription_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, Weak};

    use async_trait::async_trait;
    use contracts::{HandlerError, Message, MessageChannel, MessageHandler, SubscribableChannel};
    use dispatcher::PublishSubscribeChannel;

    use crate::support::{names, recorder, Deliveries};

    /// On its first message, unsubscribes `remove` and subscribes `add`
    struct Mutator {
        channel: Weak<PublishSubscribeChannel>,
        remove: Arc<dyn MessageHandler>,
        add: Arc<dyn MessageHandler>,
        fired: AtomicBool,
    }

    #[async_trait]
    impl MessageHandler for Mutator {
        fn name(&self) -> &str {
            "mutator"
        }

        async fn handle_message(&self, _message: &Message) -> Result<(), HandlerError> {
            if self.fired.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            let Some(channel) = self.channel.upgrade() else {
                return Err(HandlerError::rejected("channel gone"));
            };
            assert!(channel.unsubscribe(&self.remove));
            assert!(channel.subscribe(Arc::clone(&self.add)));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_in_flight_send_uses_its_snapshot() {
        let channel = Arc::new(PublishSubscribeChannel::builder("live").build().unwrap());
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        let late = recorder("late", false, &log);
        let newcomer = recorder("newcomer", false, &log);

        channel.subscribe(Arc::new(Mutator {
            channel: Arc::downgrade(&channel),
            remove: Arc::clone(&late),
            add: Arc::clone(&newcomer),
            fired: AtomicBool::new(false),
        }));
        channel.subscribe(Arc::clone(&late));

        // snapshot taken before the mutator ran still includes "late"
        channel.send(Message::empty()).await.unwrap();
        assert_eq!(names(&log), vec!["late"]);

        log.lock().unwrap().clear();
        channel.send(Message::empty()).await.unwrap();
        assert_eq!(names(&log), vec!["newcomer"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let channel = PublishSubscribeChannel::builder("orders").build().unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", false, &log);
        channel.subscribe(Arc::clone(&a));
        channel.subscribe(recorder("b", false, &log));

        assert!(channel.unsubscribe(&a));
        assert!(!channel.unsubscribe(&a));
        assert!(!channel.unsubscribe(&recorder("never", false, &log)));
        assert_eq!(channel.subscriber_count(), 1);

        channel.send(Message::empty()).await.unwrap();
        assert_eq!(names(&log), vec!["b"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_senders_and_subscribers() {
        let channel = Arc::new(
            PublishSubscribeChannel::builder("busy")
                .require_subscribers(false)
                .build()
                .unwrap(),
        );
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("stable", false, &log));

        let churn = {
            let channel = Arc::clone(&channel);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let h = recorder("transient", false, &log);
                    channel.subscribe(Arc::clone(&h));
                    tokio::task::yield_now().await;
                    assert!(channel.unsubscribe(&h));
                }
            })
        };

        let senders: Vec<_> = (0..4)
            .map(|_| {
                let channel = Arc::clone(&channel);
                tokio::spawn(async move {
                    for _ in 0..25 {
                        assert!(channel.send(Message::empty()).await.unwrap());
                    }
                })
            })
            .collect();

        churn.await.unwrap();
        for sender in senders {
            sender.await.unwrap();
        }

        let stable = names(&log).iter().filter(|n| *n == "stable").count();
        assert_eq!(stable, 100);
        assert_eq!(channel.subscriber_count(), 1);
    }
}

#[cfg(test)]
mod pooled_dispatch_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use contracts::{
        headers, ChannelError, ExecutorError, HandlerError, HandlerInvocationError, Message,
        MessageChannel, MessageHandler, RejectionPolicy, SubscribableChannel, WorkerPoolConfig,
    };
    use dispatcher::{
        FnHandler, NullChannel, PublishSubscribeChannel, QueueChannel, RoutingLimits, WorkerPool,
    };
    use tokio::sync::{mpsc, Semaphore};
    use tokio::time::{sleep, timeout, Duration};

    use crate::support::{recorder, Deliveries};

    fn pool(workers: usize, queue_capacity: usize, policy: RejectionPolicy) -> Arc<WorkerPool> {
        Arc::new(
            WorkerPool::spawn(&WorkerPoolConfig {
                name: "e2e-pool".to_string(),
                workers,
                queue_capacity,
                rejection_policy: policy,
            })
            .unwrap(),
        )
    }

    async fn eventually(check: impl Fn() -> bool) {
        for _ in 0..500 {
            if check() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(check(), "condition not reached in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pooled_failure_routed_exactly_once() {
        let workers = pool(2, 64, RejectionPolicy::Block);
        let errors = Arc::new(QueueChannel::new("errors", 16));
        let channel = PublishSubscribeChannel::builder("pooled")
            .executor(workers.clone())
            .error_channel(errors.clone())
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("ok", false, &log));
        channel.subscribe(recorder("broken", true, &log));

        let message = Message::new("job");
        let id = message.id();
        assert!(channel.send(message).await.unwrap());

        let routed = errors
            .receive_timeout(Duration::from_secs(5))
            .await
            .unwrap();
        let failure = routed.payload_ref::<HandlerInvocationError>().unwrap();
        assert_eq!(failure.handler, "broken");
        assert_eq!(failure.message_id(), id);
        assert_eq!(
            routed.headers().get(headers::FAILED_MESSAGE_ID).and_then(|v| v.as_id()),
            Some(id)
        );

        workers.shutdown().await;
        sleep(Duration::from_millis(50)).await;
        assert!(errors.try_receive().is_none());
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(channel.metrics().routed_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pooled_ignored_failure_routed_but_not_reraised() {
        let workers = pool(1, 64, RejectionPolicy::Block);
        let errors = Arc::new(QueueChannel::new("errors", 16));
        let channel = PublishSubscribeChannel::builder("pooled")
            .ignore_failures(true)
            .executor(workers.clone())
            .error_channel(errors.clone())
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("broken", true, &log));

        assert!(channel.send(Message::empty()).await.unwrap());
        assert!(errors
            .receive_timeout(Duration::from_secs(5))
            .await
            .is_some());

        workers.shutdown().await;
        assert_eq!(workers.metrics().failed_count(), 0);
        assert_eq!(workers.metrics().completed_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pooled_panic_routed_and_pool_survives() {
        let workers = pool(1, 64, RejectionPolicy::Block);
        let errors = Arc::new(QueueChannel::new("errors", 16));
        let channel = PublishSubscribeChannel::builder("pooled")
            .executor(workers.clone())
            .error_channel(errors.clone())
            .build()
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        channel.subscribe(Arc::new(FnHandler::new("flaky", move |_: &Message| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first call explodes");
            }
            Ok(())
        })));

        channel.send(Message::empty()).await.unwrap();
        channel.send(Message::empty()).await.unwrap();

        let routed = errors
            .receive_timeout(Duration::from_secs(5))
            .await
            .unwrap();
        let failure = routed.payload_ref::<HandlerInvocationError>().unwrap();
        assert!(matches!(failure.source, HandlerError::Panicked(ref msg) if msg.contains("explodes")));

        workers.shutdown().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(workers.metrics().completed_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_log_and_drop_counts_dropped_failures() {
        let workers = pool(1, 64, RejectionPolicy::Block);
        let channel = PublishSubscribeChannel::builder("pooled")
            .executor(workers.clone())
            .log_and_drop_errors()
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("broken", true, &log));

        assert!(channel.send(Message::empty()).await.unwrap());
        workers.shutdown().await;

        let metrics = Arc::clone(channel.metrics());
        eventually(|| metrics.dropped_count() == 1).await;
        assert_eq!(metrics.routed_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_null_channel_as_error_destination() {
        let workers = pool(1, 64, RejectionPolicy::Block);
        let channel = PublishSubscribeChannel::builder("pooled")
            .executor(workers.clone())
            .error_channel(Arc::new(NullChannel::default()))
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("broken", true, &log));

        channel.send(Message::empty()).await.unwrap();
        workers.shutdown().await;

        let metrics = Arc::clone(channel.metrics());
        eventually(|| metrics.routed_count() == 1).await;
        assert_eq!(metrics.dropped_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pubsub_channel_as_error_destination() {
        let workers = pool(2, 64, RejectionPolicy::Block);
        let failures: Deliveries = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(PublishSubscribeChannel::builder("errors").build().unwrap());
        errors.subscribe(recorder("audit", false, &failures));

        let channel = PublishSubscribeChannel::builder("pooled")
            .executor(workers.clone())
            .error_channel(errors.clone())
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("broken", true, &log));

        let message = Message::new(3u8);
        let id = message.id();
        channel.send(message).await.unwrap();
        workers.shutdown().await;

        let recorded = Arc::clone(&failures);
        eventually(|| recorded.lock().unwrap().len() == 1).await;
        let (_, routed) = failures.lock().unwrap()[0].clone();
        assert_eq!(routed.headers().correlation_id(), Some(id));
        assert_eq!(
            routed.headers().get(headers::FAILED_HANDLER).and_then(|v| v.as_str()),
            Some("broken")
        );
    }

    /// Signals when it starts, then waits for a permit
    struct Gate {
        started: mpsc::UnboundedSender<()>,
        release: Arc<Semaphore>,
    }

    #[async_trait]
    impl MessageHandler for Gate {
        fn name(&self) -> &str {
            "gate"
        }

        async fn handle_message(&self, _message: &Message) -> Result<(), HandlerError> {
            let _ = self.started.send(());
            let permit = self
                .release
                .acquire()
                .await
                .map_err(|e| HandlerError::from_source("gate closed", e))?;
            permit.forget();
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_pool_rejects_send() {
        let workers = pool(1, 1, RejectionPolicy::Reject);
        let channel = PublishSubscribeChannel::builder("bounded")
            .executor(workers.clone())
            .log_and_drop_errors()
            .build()
            .unwrap();

        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let release = Arc::new(Semaphore::new(0));
        channel.subscribe(Arc::new(Gate {
            started: started_tx,
            release: Arc::clone(&release),
        }));

        // first occupies the worker, second fills the queue
        channel.send(Message::empty()).await.unwrap();
        timeout(Duration::from_secs(5), started_rx.recv())
            .await
            .unwrap();
        channel.send(Message::empty()).await.unwrap();

        let err = channel.send(Message::empty()).await.unwrap_err();
        match err {
            ChannelError::Submission { handler, source, .. } => {
                assert_eq!(handler, "gate");
                assert!(matches!(source, ExecutorError::Rejected { capacity: 1, .. }));
            }
            other => panic!("expected submission failure, got {other:?}"),
        }

        release.add_permits(2);
        workers.shutdown().await;
        assert_eq!(workers.metrics().completed_count(), 2);
        assert_eq!(workers.metrics().rejected_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_pool_blocks_send_until_space() {
        let workers = pool(1, 1, RejectionPolicy::Block);
        let channel = PublishSubscribeChannel::builder("bounded")
            .executor(workers.clone())
            .log_and_drop_errors()
            .build()
            .unwrap();

        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let release = Arc::new(Semaphore::new(0));
        channel.subscribe(Arc::new(Gate {
            started: started_tx,
            release: Arc::clone(&release),
        }));

        channel.send(Message::empty()).await.unwrap();
        timeout(Duration::from_secs(5), started_rx.recv())
            .await
            .unwrap();
        channel.send(Message::empty()).await.unwrap();

        // worker busy and queue full: the third send waits instead of failing
        let mut third = channel.send(Message::empty());
        assert!(timeout(Duration::from_millis(100), &mut third).await.is_err());

        release.add_permits(3);
        let accepted = timeout(Duration::from_secs(5), third).await.unwrap().unwrap();
        assert!(accepted);

        workers.shutdown().await;
        assert_eq!(workers.metrics().completed_count(), 3);
        assert_eq!(workers.metrics().rejected_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pooled_sequence_follows_snapshot_position() {
        let workers = pool(4, 64, RejectionPolicy::Block);
        let channel = PublishSubscribeChannel::builder("sequenced")
            .apply_sequence(true)
            .executor(workers.clone())
            .log_and_drop_errors()
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        let names = ["a", "b", "c", "d", "e"];
        for name in names {
            channel.subscribe(recorder(name, false, &log));
        }

        let message = Message::new("batch");
        let original_id = message.id();
        assert!(channel.send(message).await.unwrap());
        workers.shutdown().await;

        let deliveries = log.lock().unwrap().clone();
        assert_eq!(deliveries.len(), names.len());

        let mut numbers = Vec::new();
        for (handler, copy) in &deliveries {
            let h = copy.headers();
            let number = h.sequence_number().unwrap();
            // position in the snapshot, whatever order the workers ran in
            let position = names.iter().position(|n| *n == handler.as_str()).unwrap() as i64 + 1;
            assert_eq!(number, position);
            assert_eq!(h.sequence_size(), Some(names.len() as i64));
            assert_eq!(h.correlation_id(), Some(original_id));
            numbers.push(number);
        }
        numbers.sort();
        assert_eq!(numbers, (1..=names.len() as i64).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stalled_error_destination_still_accounts_every_failure() {
        let workers = pool(2, 64, RejectionPolicy::Block);
        // capacity 1 and never drained
        let errors = Arc::new(QueueChannel::new("errors", 1));
        let channel = PublishSubscribeChannel::builder("pooled")
            .executor(workers.clone())
            .error_channel(errors.clone())
            .routing_limits(RoutingLimits {
                queue_capacity: 8,
                send_timeout: Duration::from_millis(20),
            })
            .build()
            .unwrap();
        let log: Deliveries = Arc::new(Mutex::new(Vec::new()));
        channel.subscribe(recorder("broken", true, &log));

        for _ in 0..50 {
            assert!(channel.send(Message::empty()).await.unwrap());
        }
        workers.shutdown().await;

        let metrics = Arc::clone(channel.metrics());
        assert_eq!(metrics.failure_count(), 50);
        eventually(|| metrics.routed_count() + metrics.dropped_count() == 50).await;
        assert_eq!(metrics.routed_count(), 1);
        assert_eq!(metrics.dropped_count(), 49);
        assert_eq!(errors.len(), 1);
    }
}
