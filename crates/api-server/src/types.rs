//! API request and response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Response to a run trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// Identifier of the accepted run
    pub run_id: Uuid,
    /// Trigger status
    pub status: String,
}

/// Error body for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("0.1.0"));
    }

    #[test]
    fn test_trigger_response_round_trip() {
        let response = TriggerResponse {
            run_id: Uuid::new_v4(),
            status: "accepted".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        let parsed: TriggerResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, response.run_id);
        assert_eq!(parsed.status, "accepted");
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            error: "a detection run is already in progress".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "a detection run is already in progress"})
        );
    }
}
