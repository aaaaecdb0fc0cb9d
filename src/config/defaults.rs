pub const MAX_WORKER_THREADS: usize = 64;
pub(super) const MIN_HEALTH_INTERVAL_SECS: u64 = 2;
pub(super) const MAX_HEALTH_INTERVAL_SECS: u64 = 300;

/// Worker pool size limited to `1..=MAX_WORKER_THREADS`.
pub fn clamp_worker_threads(value: usize) -> usize {
    value.clamp(1, MAX_WORKER_THREADS)
}

pub(super) fn clamp_health_interval_secs(value: u64) -> u64 {
    value.clamp(MIN_HEALTH_INTERVAL_SECS, MAX_HEALTH_INTERVAL_SECS)
}

pub(super) fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

pub(super) fn default_port() -> u16 {
    8000
}

pub(super) fn default_worker_threads() -> usize {
    4
}

pub(super) fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

pub(super) fn default_health_interval_secs() -> u64 {
    10
}
