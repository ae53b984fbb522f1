use serde_json::Value;

/// True when a json document is a gRPC service config, identified by a
/// top-level `methodConfig` key. Unparseable json is never a config.
pub fn is_grpc_service_config(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .map(|v| v.get("methodConfig").is_some())
        .unwrap_or(false)
}
