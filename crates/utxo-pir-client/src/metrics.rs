//! Client-side metrics
//!
//! Privacy-safe: labels are view names and outcomes only, never keys,
//! positions or addresses. No recorder is installed here; the embedding
//! application chooses one.

use std::time::Duration;

use metrics::{counter, histogram};
use utxo_pir_core::SearchType;

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub fn record_query(view: SearchType, outcome: &str, duration: Duration) {
    counter!("utxo_pir_requests_total", "view" => view.as_str(), "outcome" => outcome.to_string()).increment(1);
    histogram!("utxo_pir_request_duration_seconds", "view" => view.as_str(), "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

/// One comparison probe of the interpolation search
pub fn record_probe() {
    counter!("utxo_pir_probes_total").increment(1);
}

pub fn record_search(found: bool, duration: Duration) {
    let result = if found { "found" } else { "not_found" };
    histogram!("utxo_pir_search_duration_seconds", "result" => result).record(duration.as_secs_f64());
}
