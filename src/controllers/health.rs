use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
}

/// Liveness probe: always 200 while the process is serving.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        message: format!(
            "Midtier of Trade Marshals is alive at {}",
            Utc::now().to_rfc3339()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_response() {
        let Json(response) = health().await;
        assert_eq!(response.status, "UP");
        assert!(response.message.starts_with("Midtier of Trade Marshals is alive at "));

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"UP\""));
    }
}
