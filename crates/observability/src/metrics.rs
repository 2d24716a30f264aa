//! Dispatcher 指标收集模块
//!
//! 通过 `metrics` facade 记录发布、调用与失败；未安装 recorder 时为空操作。

use std::time::Duration;

use metrics::{counter, gauge};

/// 记录一次 publish 调用
pub fn record_publish(topic: &str) {
    counter!("topicbus_publish_total", "topic" => topic.to_string()).increment(1);
}

/// 记录一次 handler 调用 (同步执行或异步调度)
pub fn record_handler_invocation(topic: &str, mode: &str) {
    counter!(
        "topicbus_handler_invocations_total",
        "topic" => topic.to_string(),
        "mode" => mode.to_string()
    )
    .increment(1);
}

/// 记录 handler 失败
///
/// `kind` 取值: `argument_mismatch` / `handler_error` / `panic` / `schedule`
pub fn record_handler_failure(topic: &str, kind: &str) {
    counter!(
        "topicbus_handler_failures_total",
        "topic" => topic.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// 记录当前未完成的异步调用数
pub fn record_in_flight(count: usize) {
    gauge!("topicbus_async_in_flight").set(count as f64);
}

/// 在线统计 (Welford), 用于发布延迟等样本
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    range: Option<(f64, f64)>,
}

impl RunningStats {
    /// 添加样本
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.range = Some(match self.range {
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
            None => (value, value),
        });
    }

    /// 以毫秒添加一段耗时
    pub fn push_duration(&mut self, elapsed: Duration) {
        self.push(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值 (无样本时为 0)
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        self.range.map(|(lo, _)| lo)
    }

    pub fn max(&self) -> Option<f64> {
        self.range.map(|(_, hi)| hi)
    }

    /// 生成摘要
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            min: self.min().unwrap_or_default(),
            max: self.max().unwrap_or_default(),
            mean: self.mean(),
            std_dev: self.std_dev(),
        }
    }
}

/// 统计摘要
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}
