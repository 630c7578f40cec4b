// Hub REST client.
//
// Only the service-call endpoint is needed: notification action buttons
// of type `ha_service` map onto `POST /api/services/<domain>/<service>`.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::error::Error;

/// Authenticated client for the hub's REST API.
#[derive(Debug, Clone)]
pub struct HubRestClient {
    http: reqwest::Client,
    base: Url,
    token: SecretString,
}

impl HubRestClient {
    /// Build from an existing `reqwest::Client` and the hub's http(s) base URL.
    pub fn from_reqwest(base: &str, http: reqwest::Client, token: SecretString) -> Result<Self, Error> {
        let trimmed = base.trim_end_matches('/');
        let base = Url::parse(&format!("{trimmed}/"))?;
        Ok(Self { http, base, token })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Call a hub service, e.g. `call_service("light", "turn_on", &data)`.
    ///
    /// Returns the hub's JSON response (the list of changed states).
    pub async fn call_service(&self, domain: &str, service: &str, data: &Value) -> Result<Value, Error> {
        let url = self.base.join(&format!("api/services/{domain}/{service}"))?;
        tracing::debug!(url = %url, "calling hub service");

        let resp = self
            .http
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(data)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "hub rejected access token".into(),
            });
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| Error::Protocol(format!("service response: {e}")))
    }
}

/// Split a `domain.service` identifier.
pub fn split_service(id: &str) -> Option<(&str, &str)> {
    let (domain, service) = id.split_once('.')?;
    if domain.is_empty() || service.is_empty() {
        return None;
    }
    Some((domain, service))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn splits_service_ids() {
        assert_eq!(split_service("light.turn_on"), Some(("light", "turn_on")));
        assert_eq!(split_service("script.run.now"), Some(("script", "run.now")));
        assert_eq!(split_service("light"), None);
        assert_eq!(split_service(".turn_on"), None);
        assert_eq!(split_service("light."), None);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = HubRestClient::from_reqwest(
            "http://hub.local:8123//",
            reqwest::Client::new(),
            SecretString::from("t".to_string()),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "http://hub.local:8123/");
    }
}
