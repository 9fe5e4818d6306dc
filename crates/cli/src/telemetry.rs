use axum::http::HeaderMap;
use intake_core::normalize_tags;
use intake_protocol::{IntakeRequest, IntakeResponse, OPT_OUT_HEADER};
use serde_json::{json, Value};

pub(crate) const TELEMETRY_TARGET: &str = "intake::telemetry";

/// Opt-out is per request: the body flag or the `x-telemetry-opt-out: 1` header.
pub(crate) fn opted_out(request: &IntakeRequest, headers: &HeaderMap) -> bool {
    request.telemetry.opt_out
        || headers
            .get(OPT_OUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim() == "1")
}

pub(crate) fn intake_event(request: &IntakeRequest, response: &IntakeResponse) -> Value {
    json!({
        "event": "intake",
        "session": response.session.id,
        "tool": request.agent.tool,
        "tool_version": request.agent.tool_version,
        "tags": normalize_tags(&request.task.tags),
        "packs": response.packs.iter().map(|pack| pack.id.as_str()).collect::<Vec<_>>(),
    })
}

pub(crate) fn record_intake(request: &IntakeRequest, response: &IntakeResponse, opt_out: bool) {
    if opt_out {
        return;
    }
    log::info!(target: TELEMETRY_TARGET, "{}", intake_event(request, response));
}
