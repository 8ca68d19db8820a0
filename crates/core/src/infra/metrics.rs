use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::error::ErrorCode;

const MAX_LATENCY_RECORDS: usize = 1000;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    cleans: u64,
    rewrites_started: u64,
    rewrites_completed: u64,
    rewrites_failed: u64,
    chunks_relayed: u64,
    errors_config: u64,
    errors_transport: u64,
    errors_service: u64,
    errors_timeout: u64,
    errors_other: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub cleans: u64,
    pub rewrites_started: u64,
    pub rewrites_completed: u64,
    pub rewrites_failed: u64,
    pub chunks_relayed: u64,
    pub error_counts: ErrorCounts,
    pub avg_latency_ms: AvgLatency,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub config: u64,
    pub transport: u64,
    pub service: u64,
    pub timeout: u64,
    pub other: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub first_chunk: Option<f64>,
    pub rewrite: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_cleans(&self) {
        self.counters.lock().cleans += 1;
    }

    pub fn inc_rewrites_started(&self) {
        self.counters.lock().rewrites_started += 1;
    }

    pub fn inc_rewrites_completed(&self) {
        self.counters.lock().rewrites_completed += 1;
    }

    pub fn add_chunks(&self, n: usize) {
        self.counters.lock().chunks_relayed += n as u64;
    }

    /// 失敗したリライトをエラーコード別に記録
    pub fn inc_failure(&self, code: ErrorCode) {
        let mut c = self.counters.lock();
        c.rewrites_failed += 1;
        match code {
            ErrorCode::Config => c.errors_config += 1,
            ErrorCode::Transport => c.errors_transport += 1,
            ErrorCode::Service => c.errors_service += 1,
            ErrorCode::Timeout => c.errors_timeout += 1,
            _ => c.errors_other += 1,
        }
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock();
        latencies.push(record);
        if latencies.len() > MAX_LATENCY_RECORDS {
            let excess = latencies.len() - MAX_LATENCY_RECORDS;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock();
        let latencies = self.latencies.lock();

        let avg = |phase: &str| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            cleans: c.cleans,
            rewrites_started: c.rewrites_started,
            rewrites_completed: c.rewrites_completed,
            rewrites_failed: c.rewrites_failed,
            chunks_relayed: c.chunks_relayed,
            error_counts: ErrorCounts {
                config: c.errors_config,
                transport: c.errors_transport,
                service: c.errors_service,
                timeout: c.errors_timeout,
                other: c.errors_other,
            },
            avg_latency_ms: AvgLatency {
                first_chunk: avg("first_chunk"),
                rewrite: avg("rewrite"),
            },
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
