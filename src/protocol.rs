//! JSON bodies of the HTTP surface
//!
//! Defines the response envelopes returned by the gateway and the query
//! parameters it accepts.

use serde::{Deserialize, Serialize};

use crate::control::ActionOutcome;
use crate::parse::UnitRecord;

/// `GET /services`
#[derive(Debug, Clone, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<UnitRecord>,
}

/// `GET /logs`
#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

/// Query string of `GET /logs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub service: Option<String>,
}

/// `POST /service`
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub result: ActionOutcome,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::StatusRecord;
    use serde_json::json;

    #[test]
    fn test_services_envelope() {
        let body = ServicesResponse {
            services: vec![UnitRecord {
                unit: "sshd.service".into(),
                load: "loaded".into(),
                active: "active".into(),
                sub: "running".into(),
                description: "OpenSSH server daemon".into(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"services": [{
                "unit": "sshd.service",
                "load": "loaded",
                "active": "active",
                "sub": "running",
                "description": "OpenSSH server daemon",
            }]})
        );
    }

    #[test]
    fn test_action_envelopes() {
        let raw = ActionResponse {
            result: ActionOutcome::Output(String::new()),
        };
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!({"result": ""}));

        let status: StatusRecord = [("unit", "nginx.service"), ("active", "inactive (dead)")]
            .into_iter()
            .collect();
        let parsed = ActionResponse {
            result: ActionOutcome::Status(status),
        };
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({"result": {"unit": "nginx.service", "active": "inactive (dead)"}})
        );
    }

    #[test]
    fn test_logs_query_optional() {
        let q: LogsQuery = serde_json::from_value(json!({})).unwrap();
        assert!(q.service.is_none());
    }
}
