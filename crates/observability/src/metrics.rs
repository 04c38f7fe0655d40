//! 消息分发指标模块
//!
//! 记录 channel 发送、handler 调用、失败路由与线程池拒绝等运行指标。

use metrics::{counter, histogram};
use serde::Serialize;

/// 记录消息发送
pub fn record_message_sent(channel: &str) {
    counter!(
        "fanout_messages_sent_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// 记录 send 耗时 (毫秒)
pub fn record_send_latency_ms(channel: &str, latency_ms: f64) {
    histogram!(
        "fanout_send_latency_ms",
        "channel" => channel.to_string()
    )
    .record(latency_ms);
}

/// 记录单次 handler 调用结果
pub fn record_handler_invocation(channel: &str, handler: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "fanout_handler_invocations_total",
        "channel" => channel.to_string(),
        "handler" => handler.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录失败路由结果 (routed = false 表示被丢弃)
pub fn record_failure_routed(channel: &str, routed: bool) {
    let outcome = if routed { "routed" } else { "dropped" };
    counter!(
        "fanout_failures_total",
        "channel" => channel.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录线程池拒绝任务
pub fn record_task_rejected(pool: &str) {
    counter!(
        "fanout_tasks_rejected_total",
        "pool" => pool.to_string()
    )
    .increment(1);
}

/// 统计摘要
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// 生成摘要
    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
