//! RouterOS REST API client.
//!
//! Each fetch is one authenticated `GET <scheme>://<target>/rest/<path>`
//! returning either a JSON array of flat objects or a single object, with
//! every value encoded as a string.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use thiserror::Error;

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from a single device fetch.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Connection could not be established or was interrupted.
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The per-fetch timeout elapsed.
    #[error("request to {path} timed out")]
    Timeout { path: String },

    /// The device answered with a non-success status.
    #[error("request to {path} returned HTTP {status}")]
    Status { path: String, status: StatusCode },

    /// The body was not the expected JSON shape.
    #[error("malformed response from {path}: {message}")]
    Body { path: String, message: String },
}

impl DeviceError {
    /// Whether this is a transport-level failure (as opposed to a protocol one).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    fn from_reqwest(path: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                path: path.to_string(),
            }
        } else if err.is_decode() || err.is_body() {
            Self::Body {
                path: path.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                path: path.to_string(),
                source: err,
            }
        }
    }

    fn body(path: &str, message: impl Into<String>) -> Self {
        Self::Body {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Username/password pair for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One flat object returned by a RouterOS endpoint.
///
/// Fields keep the order the device sent them in. A missing field reads as
/// the empty string, which every decoder treats as "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
    fields: Vec<(String, String)>,
}

impl ResourceRecord {
    /// Raw value of a field, or `""` if the device did not send it.
    pub fn get(&self, field: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn from_json(path: &str, value: Value) -> Result<Self, DeviceError> {
        let Value::Object(map) = value else {
            return Err(DeviceError::body(path, "expected a JSON object"));
        };

        let fields = map
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                other => Err(DeviceError::body(
                    path,
                    format!("field '{}' is not a string: {}", key, other),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { fields })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResourceRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Decode a response body into records.
///
/// Arrays yield one record per element; a bare object yields one record.
pub fn parse_records(path: &str, body: &[u8]) -> Result<Vec<ResourceRecord>, DeviceError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DeviceError::body(path, format!("invalid JSON: {}", e)))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| ResourceRecord::from_json(path, item))
            .collect(),
        object @ Value::Object(_) => Ok(vec![ResourceRecord::from_json(path, object)?]),
        _ => Err(DeviceError::body(path, "expected a JSON array or object")),
    }
}

/// Shared HTTP client for RouterOS devices.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: Client,
    scheme: String,
}

impl DeviceClient {
    /// Create a client with the given scheme and per-fetch timeout.
    pub fn new(
        scheme: &str,
        fetch_timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(fetch_timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent(concat!("mikrotik-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            scheme: scheme.to_string(),
        })
    }

    /// Build the REST URL for a resource path on a target.
    pub fn url(&self, target: &str, resource_path: &str) -> String {
        format!(
            "{}://{}/rest/{}",
            self.scheme,
            target,
            resource_path.trim_start_matches('/')
        )
    }

    /// Fetch a collection endpoint.
    pub async fn fetch(
        &self,
        target: &str,
        resource_path: &str,
        credential: &Credential,
    ) -> Result<Vec<ResourceRecord>, DeviceError> {
        let url = self.url(target, resource_path);

        let response = self
            .http
            .get(&url)
            .basic_auth(&credential.username, Some(&credential.password))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DeviceError::from_reqwest(resource_path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Status {
                path: resource_path.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DeviceError::from_reqwest(resource_path, e))?;

        let records = parse_records(resource_path, &body)?;

        tracing::trace!(
            device = %target,
            path = %resource_path,
            records = records.len(),
            "Fetched resource"
        );

        Ok(records)
    }

    /// Fetch a scalar endpoint that returns a single object.
    pub async fn fetch_one(
        &self,
        target: &str,
        resource_path: &str,
        credential: &Credential,
    ) -> Result<ResourceRecord, DeviceError> {
        self.fetch(target, resource_path, credential)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DeviceError::body(resource_path, "empty response"))
    }
}

/// One device as seen by a single probe: client, address and credential.
#[derive(Debug, Clone)]
pub struct Device {
    client: DeviceClient,
    target: String,
    credential: Credential,
}

impl Device {
    pub fn new(client: DeviceClient, target: impl Into<String>, credential: Credential) -> Self {
        Self {
            client,
            target: target.into(),
            credential,
        }
    }

    /// The probed `host:port`.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Fetch a collection endpoint from this device.
    pub async fn fetch(&self, resource_path: &str) -> Result<Vec<ResourceRecord>, DeviceError> {
        self.client
            .fetch(&self.target, resource_path, &self.credential)
            .await
    }

    /// Fetch a scalar endpoint from this device.
    pub async fn fetch_one(&self, resource_path: &str) -> Result<ResourceRecord, DeviceError> {
        self.client
            .fetch_one(&self.target, resource_path, &self.credential)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_array() {
        let body = br#"[{".id":"*1","name":"ether1","mtu":"1500"},{".id":"*2","name":"ether2"}]"#;
        let records = parse_records("interface", body).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), "ether1");
        assert_eq!(records[0].get("mtu"), "1500");
        assert_eq!(records[1].get("mtu"), "");
    }

    #[test]
    fn test_parse_records_object() {
        let body = br#"{"uptime":"1w2d","cpu-load":"3"}"#;
        let records = parse_records("system/resource", body).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("cpu-load"), "3");
    }

    #[test]
    fn test_parse_records_keeps_field_order() {
        let body = br#"{"zeta":"1","alpha":"2","mid":"3"}"#;
        let records = parse_records("x", body).unwrap();

        let keys: Vec<_> = records[0].fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_records_rejects_non_string_values() {
        let body = br#"[{"name":"ether1","mtu":1500}]"#;
        let err = parse_records("interface", body).unwrap_err();

        assert!(matches!(err, DeviceError::Body { .. }));
        assert!(!err.is_transport());
        assert!(err.to_string().contains("mtu"));
    }

    #[test]
    fn test_parse_records_rejects_invalid_json() {
        let err = parse_records("interface", b"<html>login</html>").unwrap_err();
        assert!(matches!(err, DeviceError::Body { .. }));

        let err = parse_records("interface", b"\"text\"").unwrap_err();
        assert!(matches!(err, DeviceError::Body { .. }));

        let err = parse_records("interface", b"[1,2]").unwrap_err();
        assert!(matches!(err, DeviceError::Body { .. }));
    }

    #[test]
    fn test_record_from_iter() {
        let record: ResourceRecord = [("name", "wlan1"), ("ssid", "office")]
            .into_iter()
            .collect();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("ssid"), "office");
        assert_eq!(record.get("missing"), "");
    }

    #[test]
    fn test_client_url() {
        let client = DeviceClient::new("http", DEFAULT_FETCH_TIMEOUT, false).unwrap();

        assert_eq!(
            client.url("192.168.88.1:80", "ip/dhcp-server/lease"),
            "http://192.168.88.1:80/rest/ip/dhcp-server/lease"
        );
        assert_eq!(
            client.url("10.0.0.1", "/interface"),
            "http://10.0.0.1/rest/interface"
        );
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let credential = Credential::new("admin", "hunter2");
        let debug = format!("{:?}", credential);

        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_error_classes() {
        let timeout = DeviceError::Timeout {
            path: "interface".to_string(),
        };
        let status = DeviceError::Status {
            path: "interface".to_string(),
            status: StatusCode::UNAUTHORIZED,
        };

        assert!(timeout.is_transport());
        assert!(!status.is_transport());
        assert_eq!(
            status.to_string(),
            "request to interface returned HTTP 401 Unauthorized"
        );
    }
}
