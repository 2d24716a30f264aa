//! # Dispatcher
//!
//! 进程内发布/订阅分发模块。
//!
//! 负责：
//! - 维护 topic → handler binding 注册表
//! - 同步 / 异步 / 一次性 / 有序 (transactional) 调用
//! - 跟踪异步调用直至全部完成 (`wait_async`)
//!
//! ```
//! use dispatcher::{args, Dispatcher};
//!
//! let bus = Dispatcher::new();
//! bus.subscribe("main:calculator", |a: i64, b: i64| println!("{}", a + b)).unwrap();
//! bus.publish("main:calculator", args![20, 40]).unwrap();
//! bus.wait_async();
//! ```

pub mod binding;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod observers;
pub mod scheduler;
pub mod tracker;

pub use contracts::{args, Args, Callback, ContractError, DispatcherConfig, SchedulerKind};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use observers::{ChannelObserver, FailureObserver, FailureReport, HandlerFailure, LogObserver};
pub use scheduler::Scheduler;
