use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, OnceLock},
};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

// 时延分桶上界（毫秒）：<50, <100, <250, <500, <1000, >=1000
const LATENCY_BOUNDS_MS: [u64; 5] = [50, 100, 250, 500, 1000];

#[derive(Default)]
struct MetricsState {
    invocations: u64,
    failures: u64,
    per_command: HashMap<String, u64>,
    per_command_err: HashMap<String, u64>,
    per_error_code: HashMap<&'static str, u64>,
    latency_sum_ms: u128,
    latency_buckets: [u64; 6],
    // 校验类错误（未到达调用边界）
    validation_rejections: HashMap<&'static str, u64>,
}

fn state() -> MutexGuard<'static, MetricsState> {
    let lock = METRICS.get_or_init(|| Mutex::new(MetricsState::default()));
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

/// 记录一次调用边界请求
pub fn observe_invocation(command: &str, error_code: Option<&'static str>, elapsed_ms: u64) {
    let mut s = state();
    s.invocations += 1;
    *s.per_command.entry(command.to_string()).or_insert(0) += 1;

    if let Some(code) = error_code {
        s.failures += 1;
        *s.per_command_err.entry(command.to_string()).or_insert(0) += 1;
        *s.per_error_code.entry(code).or_insert(0) += 1;
    }

    s.latency_sum_ms += u128::from(elapsed_ms);
    let bucket = LATENCY_BOUNDS_MS
        .iter()
        .position(|bound| elapsed_ms < *bound)
        .unwrap_or(LATENCY_BOUNDS_MS.len());
    s.latency_buckets[bucket] += 1;
}

/// 记录一次本地校验拒绝（UnknownCoin、MissingCredential 等）
pub fn count_rejection(code: &'static str) {
    let mut s = state();
    *s.validation_rejections.entry(code).or_insert(0) += 1;
}

/// 指标快照
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub invocations: u64,
    pub failures: u64,
    pub per_command: BTreeMap<String, u64>,
    pub per_command_err: BTreeMap<String, u64>,
    pub per_error_code: BTreeMap<String, u64>,
    pub validation_rejections: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn command_count(&self, command: &str) -> u64 {
        self.per_command.get(command).copied().unwrap_or(0)
    }

    pub fn command_errors(&self, command: &str) -> u64 {
        self.per_command_err.get(command).copied().unwrap_or(0)
    }
}

pub fn snapshot() -> MetricsSnapshot {
    let s = state();
    MetricsSnapshot {
        invocations: s.invocations,
        failures: s.failures,
        per_command: s.per_command.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        per_command_err: s.per_command_err.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        per_error_code: s.per_error_code.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        validation_rejections: s
            .validation_rejections
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
    }
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();

    out.push_str("# HELP janus_invocations_total Total backend invocations\n");
    out.push_str("# TYPE janus_invocations_total counter\n");
    out.push_str(&format!("janus_invocations_total {}\n", s.invocations));

    out.push_str("# HELP janus_invocation_failures_total Total failed backend invocations\n");
    out.push_str("# TYPE janus_invocation_failures_total counter\n");
    out.push_str(&format!("janus_invocation_failures_total {}\n", s.failures));

    out.push_str("# HELP janus_command_invocations_total Invocations per command\n");
    out.push_str("# TYPE janus_command_invocations_total counter\n");
    for (k, v) in sorted(&s.per_command) {
        out.push_str(&format!(
            "janus_command_invocations_total{{command=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP janus_command_failures_total Failures per command\n");
    out.push_str("# TYPE janus_command_failures_total counter\n");
    for (k, v) in sorted(&s.per_command_err) {
        out.push_str(&format!(
            "janus_command_failures_total{{command=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP janus_invocation_errors_total Failures per error code\n");
    out.push_str("# TYPE janus_invocation_errors_total counter\n");
    for (k, v) in sorted(&s.per_error_code) {
        out.push_str(&format!(
            "janus_invocation_errors_total{{code=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP janus_validation_rejections_total Requests rejected before invocation\n");
    out.push_str("# TYPE janus_validation_rejections_total counter\n");
    for (k, v) in sorted(&s.validation_rejections) {
        out.push_str(&format!(
            "janus_validation_rejections_total{{code=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP janus_invocation_latency_ms_sum Sum of invocation latency in ms\n");
    out.push_str("# TYPE janus_invocation_latency_ms_sum counter\n");
    out.push_str(&format!(
        "janus_invocation_latency_ms_sum {}\n",
        s.latency_sum_ms
    ));

    out.push_str("# HELP janus_invocation_latency_ms_bucket Invocation latency histogram buckets\n");
    out.push_str("# TYPE janus_invocation_latency_ms_bucket histogram\n");
    let mut cumulative = 0;
    for (i, bound) in LATENCY_BOUNDS_MS.iter().enumerate() {
        cumulative += s.latency_buckets[i];
        out.push_str(&format!(
            "janus_invocation_latency_ms_bucket{{le=\"{}\"}} {}\n",
            bound, cumulative
        ));
    }
    // +Inf 桶
    out.push_str(&format!(
        "janus_invocation_latency_ms_bucket{{le=\"+Inf\"}} {}\n",
        s.latency_buckets.iter().sum::<u64>()
    ));

    out
}

fn sorted<K: Ord + AsRef<str>>(map: &HashMap<K, u64>) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = map.iter().map(|(k, v)| (k.as_ref(), *v)).collect();
    entries.sort();
    entries
}
