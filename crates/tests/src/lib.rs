//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 分发语义 (顺序、once、transactional、unsubscribe)
//! - 并发注册与发布
//! - 配置 -> Dispatcher 端到端

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod dispatch_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    use contracts::{args, Callback};
    use dispatcher::{Dispatcher, DispatcherError};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Callback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |label: &str| {
                let log = Arc::clone(&log);
                let label = label.to_string();
                Callback::new(move || log.lock().unwrap().push(label.clone()))
            }
        };
        (log, make)
    }

    /// 同步 binding 按订阅顺序在调用线程上执行，publish 在最后一个结束后返回
    #[test]
    fn test_sync_bindings_run_in_order_on_caller() {
        let bus = Dispatcher::new();
        let caller = thread::current().id();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let log = Arc::clone(&log);
            bus.subscribe("t", move |n: i64| {
                assert_eq!(thread::current().id(), caller);
                if i == 4 {
                    thread::sleep(Duration::from_millis(50));
                }
                log.lock().unwrap().push((i, n));
            })
            .unwrap();
        }

        bus.publish("t", args![7]).unwrap();
        let expected: Vec<_> = (0..5).map(|i| (i, 7)).collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[test]
    fn test_invalid_handler_leaves_topic_unchanged() {
        let bus = Dispatcher::new();
        bus.subscribe("t", || {}).unwrap();

        let not_callable: Option<Callback> = None;
        for result in [
            bus.subscribe("t", not_callable.clone()),
            bus.subscribe_once("t", not_callable.clone()),
            bus.subscribe_async("t", not_callable.clone(), true),
            bus.subscribe_once_async("t", not_callable),
        ] {
            assert!(matches!(
                result,
                Err(DispatcherError::InvalidHandler { .. })
            ));
        }

        assert_eq!(bus.subscriber_count("t"), 1);
        assert!(!bus.has_callback("never-subscribed"));
    }

    /// 两个 publish 并发触发同一个 once binding，只执行一次
    #[test]
    fn test_once_fires_once_under_race() {
        for _ in 0..50 {
            let bus = Dispatcher::new();
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&hits);
            bus.subscribe_once("t", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

            let barrier = Arc::new(Barrier::new(2));
            let workers: Vec<_> = (0..2)
                .map(|_| {
                    let bus = bus.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        bus.publish("t", args![]).unwrap();
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }

            assert_eq!(hits.load(Ordering::SeqCst), 1);
            assert!(!bus.has_callback("t"));
        }
    }

    #[test]
    fn test_unsubscribe_asymmetry() {
        let bus = Dispatcher::new();
        let (_log, make) = recorder();
        let kept = make("kept");
        let stranger = make("stranger");

        assert!(matches!(
            bus.unsubscribe("t", &kept),
            Err(DispatcherError::UnknownTopic { .. })
        ));

        bus.subscribe("t", &kept).unwrap();
        bus.unsubscribe("t", &stranger).unwrap();
        assert_eq!(bus.subscriber_count("t"), 1);

        bus.unsubscribe("t", &kept).unwrap();
        assert!(!bus.has_callback("t"));
        assert!(matches!(
            bus.unsubscribe("t", &kept),
            Err(DispatcherError::UnknownTopic { .. })
        ));
    }

    #[test]
    fn test_unsubscribe_removes_first_match_only() {
        let bus = Dispatcher::new();
        let (log, make) = recorder();
        let f = make("f");
        let g = make("g");

        bus.subscribe("t", &f).unwrap();
        bus.subscribe("t", &g).unwrap();
        bus.subscribe("t", &f).unwrap();
        bus.unsubscribe("t", &f).unwrap();

        bus.publish("t", args![]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["g", "f"]);
    }

    /// transactional: X (延迟 1s) 先于 Y 执行完成
    #[test]
    fn test_transactional_preserves_publish_order() {
        let bus = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);

        bus.subscribe_async(
            "t",
            move |payload: String, delay_ms: u64| {
                thread::sleep(Duration::from_millis(delay_ms));
                sink.lock().unwrap().push(payload);
            },
            true,
        )
        .unwrap();

        bus.publish("t", args!["X", 1000]).unwrap();
        bus.publish("t", args!["Y", 0]).unwrap();
        bus.wait_async();

        assert_eq!(*order.lock().unwrap(), vec!["X", "Y"]);
    }

    #[test]
    fn test_same_callback_twice_fires_twice() {
        let bus = Dispatcher::new();
        let (log, make) = recorder();
        let f = make("f");

        bus.subscribe("t", &f).unwrap();
        bus.subscribe("t", &f).unwrap();
        bus.publish("t", args![]).unwrap();

        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_once_async_double_publish() {
        let bus = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        bus.subscribe_once_async("t", move |n: i64| sink.lock().unwrap().push(n))
            .unwrap();

        bus.publish("t", args![10]).unwrap();
        bus.publish("t", args![10]).unwrap();
        bus.wait_async();

        assert_eq!(*seen.lock().unwrap(), vec![10]);
        assert!(!bus.has_callback("t"));
    }

    #[test]
    fn test_sync_error_keeps_earlier_side_effects() {
        let bus = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&log);
        bus.subscribe("t", move |_: serde_json::Value| first.lock().unwrap().push("first"))
            .unwrap();
        bus.subscribe("t", |_: i64| {}).unwrap();
        let third = Arc::clone(&log);
        bus.subscribe("t", move |_: serde_json::Value| third.lock().unwrap().push("third"))
            .unwrap();

        let err = bus.publish("t", args!["not a number"]).unwrap_err();
        assert!(err.is_argument_mismatch());
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    /// 多线程并发注册、发布与等待
    #[test]
    fn test_concurrent_subscribe_and_publish() {
        let bus = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        thread::scope(|scope| {
            for worker in 0..4 {
                let bus = bus.clone();
                let hits = Arc::clone(&hits);
                scope.spawn(move || {
                    let topic = format!("topic-{worker}");
                    let counter = Arc::clone(&hits);
                    bus.subscribe_async(
                        &topic,
                        move || {
                            counter.fetch_add(1, Ordering::SeqCst);
                        },
                        worker % 2 == 0,
                    )
                    .unwrap();
                    for _ in 0..25 {
                        bus.publish(&topic, args![]).unwrap();
                        assert!(bus.has_callback(&topic));
                    }
                });
            }
        });

        bus.wait_async();
        assert_eq!(hits.load(Ordering::SeqCst), 100);
        assert_eq!(bus.in_flight(), 0);
        assert_eq!(bus.topics().len(), 4);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Callback, SubscriptionMode};
    use dispatcher::{ChannelObserver, Dispatcher};

    const BUS_TOML: &str = r#"
[dispatcher]
scheduler = "runtime"
log_failures = false

[[subscriptions]]
topic = "orders"
action = "count"

[[subscriptions]]
topic = "orders"
mode = "async"
transactional = true
action = "count"

[[subscriptions]]
topic = "orders"
mode = "once_async"
action = "count"

[[subscriptions]]
topic = "audit"
mode = "async"
action = "typed"

[[events]]
topic = "orders"
args = [1]
repeat = 4

[[events]]
topic = "audit"
args = ["wrong", "shape"]
"#;

    /// End-to-end test: config -> Dispatcher -> handlers -> failure channel
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_config_driven_bus() {
        let blueprint = ConfigLoader::load_from_str(BUS_TOML, ConfigFormat::Toml).unwrap();

        let (observer, mut failures) = ChannelObserver::new();
        let bus = Dispatcher::builder()
            .config(blueprint.dispatcher.clone())
            .observer(observer)
            .build()
            .unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        for sub in &blueprint.subscriptions {
            let callback = match sub.action.as_str() {
                "count" => {
                    let hits = Arc::clone(&hits);
                    Callback::new(move |_: i64| {
                        hits.fetch_add(1, Ordering::SeqCst);
                    })
                }
                _ => Callback::new(|_: i64| {}),
            };
            match sub.mode {
                SubscriptionMode::Sync => bus.subscribe(&sub.topic, callback),
                SubscriptionMode::Once => bus.subscribe_once(&sub.topic, callback),
                SubscriptionMode::Async => {
                    bus.subscribe_async(&sub.topic, callback, sub.transactional)
                }
                SubscriptionMode::OnceAsync => bus.subscribe_once_async(&sub.topic, callback),
            }
            .unwrap();
        }

        for event in &blueprint.events {
            for _ in 0..event.repeat {
                bus.publish(&event.topic, event.args.clone()).unwrap();
            }
        }
        bus.quiescent().await;

        // 4 sync + 4 transactional + 1 once_async
        assert_eq!(hits.load(Ordering::SeqCst), 9);
        assert_eq!(bus.subscriber_count("orders"), 2);

        let report = failures.recv().await.unwrap();
        assert_eq!(report.topic, "audit");
        assert!(report.argument_mismatch);
        assert!(failures.try_recv().is_err());

        let metrics = bus.metrics();
        assert_eq!(metrics.publish_count, 5);
        assert_eq!(metrics.failure_count, 1);
        assert_eq!(metrics.once_fired, 1);
        assert_eq!(metrics.async_completed, metrics.async_scheduled);
    }
}
