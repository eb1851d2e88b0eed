//! Confluent-compatible REST transport

use apache_avro::Schema;
use base64::Engine;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::transport::{RegistryEntry, RegistryTransport, TransportError, TransportResult};
use crate::config::RegistryOptions;
use crate::error::{Direction, RegistryError, Result};
use crate::version::VersionRef;

const CONTENT_TYPE_V1: &str = "application/vnd.schemaregistry.v1+json";

#[derive(Debug, Serialize)]
struct SchemaRequest {
    schema: String,
    #[serde(rename = "schemaType")]
    schema_type: &'static str,
}

impl SchemaRequest {
    fn avro(schema: &Schema) -> TransportResult<Self> {
        let schema = serde_json::to_string(schema)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        Ok(Self {
            schema,
            schema_type: "AVRO",
        })
    }
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    schema: String,
}

#[derive(Debug, Deserialize)]
struct SubjectVersionResponse {
    subject: String,
    version: i32,
    id: i32,
    schema: String,
}

#[derive(Debug, Deserialize)]
struct CompatibilityResponse {
    is_compatible: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_code: Option<i32>,
    message: Option<String>,
}

/// Blocking client for a Confluent-compatible schema registry
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(options: &RegistryOptions) -> Result<Self> {
        let base_url = Url::parse(&options.url).map_err(|e| {
            RegistryError::configuration(
                format!("invalid registry url '{}': {}", options.url, e),
                Direction::Value,
            )
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::configuration(
                format!("registry url '{}' cannot carry paths", options.url),
                Direction::Value,
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(CONTENT_TYPE_V1));

        if let Some(user_info) = &options.basic_auth_user_info {
            let encoded = base64::engine::general_purpose::STANDARD.encode(user_info);
            let value = HeaderValue::from_str(&format!("Basic {}", encoded)).map_err(|e| {
                RegistryError::configuration(
                    format!("invalid basic auth credentials: {}", e),
                    Direction::Value,
                )
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                RegistryError::configuration(
                    format!("cannot build HTTP client: {}", e),
                    Direction::Value,
                )
            })?;

        Ok(Self { client, base_url })
    }

    /// Base url with `segments` appended, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, url: Url) -> TransportResult<Response> {
        let response = self.client.get(url).send().map_err(network)?;
        check_status(response)
    }

    fn post(&self, url: Url, body: &SchemaRequest) -> TransportResult<Response> {
        self.client
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_V1)
            .json(body)
            .send()
            .map_err(network)
    }
}

impl RegistryTransport for HttpTransport {
    fn register(&self, subject: &str, schema: &Schema) -> TransportResult<i32> {
        let response = self.post(
            self.endpoint(&["subjects", subject, "versions"]),
            &SchemaRequest::avro(schema)?,
        )?;
        let result: RegisterResponse = check_status(response)?.json().map_err(invalid)?;
        tracing::info!(subject = %subject, schema_id = result.id, "Registered schema");
        Ok(result.id)
    }

    fn schema_by_id(&self, id: i32, subject: Option<&str>) -> TransportResult<Schema> {
        let mut url = self.endpoint(&["schemas", "ids", &id.to_string()]);
        if let Some(subject) = subject {
            url.query_pairs_mut().append_pair("subject", subject);
        }
        let result: SchemaResponse = self.get(url)?.json().map_err(invalid)?;
        parse_schema(&result.schema)
    }

    fn subject_version(&self, subject: &str, version: VersionRef) -> TransportResult<RegistryEntry> {
        let result: SubjectVersionResponse = self
            .get(self.endpoint(&["subjects", subject, "versions", &version.to_string()]))?
            .json()
            .map_err(invalid)?;
        Ok(RegistryEntry {
            subject: result.subject,
            id: result.id,
            version: result.version,
            schema: parse_schema(&result.schema)?,
        })
    }

    fn versions(&self, subject: &str) -> TransportResult<Vec<i32>> {
        self.get(self.endpoint(&["subjects", subject, "versions"]))?
            .json()
            .map_err(invalid)
    }

    fn test_compatibility(&self, subject: &str, schema: &Schema) -> TransportResult<bool> {
        let response = self.post(
            self.endpoint(&["compatibility", "subjects", subject, "versions", "latest"]),
            &SchemaRequest::avro(schema)?,
        )?;

        // no existing version to be incompatible with
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(true);
        }

        let result: CompatibilityResponse = check_status(response)?.json().map_err(invalid)?;
        Ok(result.is_compatible)
    }
}

fn check_status(response: Response) -> TransportResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().unwrap_or_default();
    Err(parse_error(status, &body))
}

fn parse_error(status: StatusCode, body: &str) -> TransportError {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
        let message = err.message.unwrap_or_else(|| body.to_string());
        return match err.error_code {
            Some(40401) | Some(40402) | Some(40403) => TransportError::NotFound(message),
            code => TransportError::Rejected {
                status: status.as_u16(),
                code: code.unwrap_or(status.as_u16() as i32),
                message,
            },
        };
    }

    if status == StatusCode::NOT_FOUND {
        return TransportError::NotFound(body.to_string());
    }
    TransportError::Rejected {
        status: status.as_u16(),
        code: status.as_u16() as i32,
        message: body.to_string(),
    }
}

fn parse_schema(raw: &str) -> TransportResult<Schema> {
    Schema::parse_str(raw).map_err(|e| TransportError::InvalidResponse(e.to_string()))
}

fn network(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.to_string())
}

fn invalid(e: reqwest::Error) -> TransportError {
    TransportError::InvalidResponse(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confluent_error_codes() {
        let not_found = parse_error(
            StatusCode::NOT_FOUND,
            r#"{"error_code": 40403, "message": "Schema not found"}"#,
        );
        assert_eq!(not_found, TransportError::NotFound("Schema not found".into()));

        let conflict = parse_error(
            StatusCode::CONFLICT,
            r#"{"error_code": 409, "message": "incompatible"}"#,
        );
        assert_eq!(
            conflict,
            TransportError::Rejected {
                status: 409,
                code: 409,
                message: "incompatible".into()
            }
        );
    }

    fn transport(url: &str) -> HttpTransport {
        HttpTransport::new(&RegistryOptions::new(url)).unwrap()
    }

    #[test]
    fn test_subjects_are_percent_encoded() {
        let http = transport("http://localhost:8081");
        assert_eq!(
            http.endpoint(&["subjects", "orders/eu-value", "versions"]).as_str(),
            "http://localhost:8081/subjects/orders%2Feu-value/versions"
        );

        let mut url = http.endpoint(&["schemas", "ids", "7"]);
        url.query_pairs_mut().append_pair("subject", "a&b=c value");
        assert_eq!(
            url.as_str(),
            "http://localhost:8081/schemas/ids/7?subject=a%26b%3Dc+value"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let http = transport("https://registry.example.com/api/");
        assert_eq!(
            http.endpoint(&["subjects", "t-value", "versions", "latest"]).as_str(),
            "https://registry.example.com/api/subjects/t-value/versions/latest"
        );
    }

    #[test]
    fn test_unusable_url_is_configuration_error() {
        assert!(matches!(
            HttpTransport::new(&RegistryOptions::new("not a url")),
            Err(RegistryError::Configuration { .. })
        ));
    }

    #[test]
    fn test_plain_text_errors() {
        assert!(parse_error(StatusCode::NOT_FOUND, "gone").is_not_found());
        assert!(matches!(
            parse_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            TransportError::Rejected { status: 500, .. }
        ));
    }
}
