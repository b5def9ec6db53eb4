use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::session::Session;
use crate::{de_level, de_opt_string_or_number, EngagementRecord, SensorReading, Severity};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("not logged in; run `focus-monitor login` first")]
    MissingSession,
    #[error("session expired; log in again")]
    ExpiredSession,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManualPrediction {
    #[serde(rename = "StudentID", default, deserialize_with = "de_opt_string_or_number")]
    pub student_id: Option<String>,
    #[serde(rename = "EngagementLevel", deserialize_with = "de_level")]
    pub engagement_level: i64,
    #[serde(rename = "Feedback", default)]
    pub feedback: Option<String>,
    #[serde(rename = "TopFeatures", default)]
    pub top_features: Vec<String>,
    #[serde(rename = "Severities", default)]
    pub severities: BTreeMap<String, Severity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchPrediction {
    #[serde(default, deserialize_with = "de_opt_string_or_number")]
    pub student_id: Option<String>,
    #[serde(flatten)]
    pub reading: SensorReading,
    #[serde(rename = "PredictedEngagementLevel", deserialize_with = "de_level")]
    pub engagement_level: i64,
    #[serde(rename = "Feedback", default)]
    pub feedback: Option<String>,
    #[serde(rename = "TopFeatures", default)]
    pub top_features: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ManualRequest<'a> {
    student_id: &'a str,
    #[serde(flatten)]
    reading: SensorReading,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
pub struct MonitorClient {
    base_url: String,
    client: reqwest::Client,
}

impl MonitorClient {
    pub fn from_config(config: &ApiConfig) -> Result<Self, ClientError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        MonitorClient::new(config.base_url.clone(), timeout)
    }

    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<String, ClientError> {
        let request = self.client.post(self.endpoint("auth/register")).json(&Credentials {
            username,
            password,
            email: Some(email),
        });
        let response: MessageResponse = self.send(request).await?;
        Ok(response.message)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let request = self.client.post(self.endpoint("auth/login")).json(&Credentials {
            username,
            password,
            email: None,
        });
        let response: TokenResponse = self.send(request).await?;
        tracing::info!(username, "logged in");
        Ok(Session::from_token(response.token))
    }

    pub async fn profile(&self, session: &Session) -> Result<Profile, ClientError> {
        let request = self.authorized(self.client.get(self.endpoint("auth/profile")), session);
        self.send(request).await
    }

    pub async fn predict_manual(
        &self,
        session: &Session,
        student_id: &str,
        reading: SensorReading,
    ) -> Result<ManualPrediction, ClientError> {
        let request = self.authorized(
            self.client
                .post(self.endpoint("predict/manual"))
                .json(&ManualRequest { student_id, reading }),
            session,
        );
        self.send(request).await
    }

    pub async fn predict_csv(
        &self,
        session: &Session,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Vec<BatchPrediction>, ClientError> {
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);
        let request = self.authorized(
            self.client.post(self.endpoint("predict/csv")).multipart(form),
            session,
        );
        self.send(request).await
    }

    // newest first, capped at 50
    pub async fn history(&self, session: &Session) -> Result<Vec<EngagementRecord>, ClientError> {
        let request = self.authorized(self.client.get(self.endpoint("predict/history")), session);
        self.send(request).await
    }

    pub async fn delete_history(&self, session: &Session, history_id: &str) -> Result<String, ClientError> {
        let path = format!("predict/history/{}", urlencoding::encode(history_id));
        let request = self.authorized(self.client.delete(self.endpoint(&path)), session);
        let response: MessageResponse = self.send(request).await?;
        Ok(response.message)
    }

    pub async fn history_for_student(
        &self,
        session: &Session,
        student_id: &str,
    ) -> Result<Vec<EngagementRecord>, ClientError> {
        let path = format!("predict/history/student/{}", urlencoding::encode(student_id));
        let request = self.authorized(self.client.get(self.endpoint(&path)), session);
        let records: Vec<EngagementRecord> = self.send(request).await?;
        tracing::debug!(student_id, count = records.len(), "fetched student history");
        Ok(records)
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request.header(AUTHORIZATION, session.authorization())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            tracing::warn!(status = status.as_u16(), %message, "request rejected");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|error| error.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let client = MonitorClient::new("http://localhost:5000/api/".to_string(), Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint("/auth/login"), "http://localhost:5000/api/auth/login");
        assert_eq!(client.endpoint("predict/history"), "http://localhost:5000/api/predict/history");
    }

    #[test]
    fn manual_request_uses_service_field_names() {
        let body = serde_json::to_value(ManualRequest {
            student_id: "S-17",
            reading: SensorReading::new(72.0, 4.5, 10.0),
        })
        .unwrap();
        assert_eq!(body["student_id"], "S-17");
        assert_eq!(body["HeartRate"], 72.0);
        assert_eq!(body["SkinConductance"], 4.5);
        assert_eq!(body["EEG"], 10.0);
    }

    #[test]
    fn decodes_manual_prediction() {
        let body = r#"{
            "StudentID": "S-17",
            "EngagementLevel": 1,
            "Feedback": "Moderate focus detected.",
            "TopFeatures": ["EEG", "HeartRate"],
            "Severities": {"EEG": "mild", "HeartRate": "normal", "SkinConductance": "severe"}
        }"#;
        let prediction: ManualPrediction = serde_json::from_str(body).unwrap();
        assert_eq!(prediction.engagement_level, 1);
        assert_eq!(prediction.top_features, vec!["EEG", "HeartRate"]);
        assert_eq!(prediction.severities.get("SkinConductance"), Some(&Severity::Severe));
    }

    #[test]
    fn decodes_batch_rows_with_numeric_student_ids() {
        let body = r#"[{
            "student_id": 42,
            "HeartRate": 55.0,
            "SkinConductance": 3.2,
            "EEG": 9.0,
            "PredictedEngagementLevel": 2,
            "Feedback": "Great job!",
            "TopFeatures": [],
            "Severities": {},
            "timestamp": "2024-05-02 14:00:00"
        }]"#;
        let rows: Vec<BatchPrediction> = serde_json::from_str(body).unwrap();
        assert_eq!(rows[0].student_id.as_deref(), Some("42"));
        assert_eq!(rows[0].reading.eeg, 9.0);
        assert_eq!(rows[0].engagement_level, 2);
    }

    #[test]
    fn error_bodies_prefer_the_error_field() {
        assert_eq!(error_message(r#"{"error": "Token is missing!"}"#), "Token is missing!");
        assert_eq!(error_message("  <h1>Bad Gateway</h1>\n"), "<h1>Bad Gateway</h1>");
        assert_eq!(error_message(r#"{"message": "nope"}"#), r#"{"message": "nope"}"#);
        assert_eq!(error_message(""), "");
    }

    #[test]
    fn status_errors_expose_code() {
        let error = ClientError::Status {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(error.status(), Some(401));
        assert_eq!(error.to_string(), "server returned 401: Unauthorized");
        assert_eq!(ClientError::MissingSession.status(), None);
    }
}
