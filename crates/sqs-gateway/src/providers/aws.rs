//! AWS SQS provider implementation using the HTTP query API.
//!
//! Requests are plain HTTPS calls signed with AWS Signature Version 4 and
//! answered with XML documents, which keeps the provider small and lets unit
//! tests run against a mock HTTP server instead of real AWS infrastructure.
//!
//! Only the three actions the gateway needs are implemented:
//!
//! - `GetQueueUrl` resolves the configured queue name once at startup
//! - `ReceiveMessage` with visibility timeout, wait time and batch size
//! - `DeleteMessage` by receipt handle
//!
//! ## Example
//!
//! ```no_run
//! use sqs_gateway::{AwsCredentials, GatewayConfig, SqsHttpApi};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig {
//!     endpoint: Some("http://localhost:4566".to_string()),
//!     ..Default::default()
//! };
//! let credentials = AwsCredentials::new("test", "test");
//! let api = SqsHttpApi::new(&config, credentials)?;
//! # Ok(())
//! # }
//! ```

use crate::credentials::AwsCredentials;
use crate::error::{ConfigurationError, ProviderError};
use crate::message::{QueueName, ReceiptHandle, ReceiveOptions, ReceivedMessage};
use crate::provider::{GatewayConfig, ProviderType, SqsApi};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client as HttpClient;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;

const API_VERSION: &str = "2012-11-05";

// ============================================================================
// AWS Signature V4 Signing
// ============================================================================

type HmacSha256 = Hmac<Sha256>;

/// AWS Signature Version 4 signer for request authentication
///
/// 1. Create canonical request (method, URI, query, headers, payload)
/// 2. Create string to sign (algorithm, timestamp, scope, request hash)
/// 3. Derive signing key (4-level HMAC chain)
/// 4. Calculate signature and build Authorization header
///
/// See <https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html>.
#[derive(Clone)]
struct AwsV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

impl AwsV4Signer {
    fn new(credentials: AwsCredentials, region: String) -> Self {
        Self {
            credentials,
            region,
            service: "sqs".to_string(),
        }
    }

    /// Sign a request, returning the headers to attach to it
    ///
    /// The result always contains `Authorization`, `x-amz-date` and `host`,
    /// plus `x-amz-security-token` when temporary credentials are in use.
    fn sign_request(
        &self,
        method: &str,
        host: &str,
        path: &str,
        query_params: &BTreeMap<String, String>,
        body: &str,
        timestamp: &DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        let mut canonical_query_string = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>();
        canonical_query_string.sort();
        let canonical_query_string = canonical_query_string.join("&");

        // Canonical headers must be sorted by name
        let mut canonical_headers = format!("host:{}\nx-amz-date:{}\n", host, amz_date);
        let mut signed_headers = "host;x-amz-date".to_string();
        if let Some(token) = &self.credentials.session_token {
            canonical_headers.push_str(&format!("x-amz-security-token:{}\n", token));
            signed_headers.push_str(";x-amz-security-token");
        }

        let payload_hash = format!("{:x}", Sha256::digest(body.as_bytes()));

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, path, canonical_query_string, canonical_headers, signed_headers, payload_hash
        );

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let canonical_request_hash = format!("{:x}", Sha256::digest(canonical_request.as_bytes()));

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm, amz_date, credential_scope, canonical_request_hash
        );

        let signature = self.calculate_signature(&string_to_sign, &date_stamp);

        let authorization_header = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.credentials.access_key_id, credential_scope, signed_headers, signature
        );

        let mut headers = vec![
            ("Authorization".to_string(), authorization_header),
            ("x-amz-date".to_string(), amz_date),
            ("host".to_string(), host.to_string()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        headers
    }

    /// kSecret -> kDate -> kRegion -> kService -> kSigning -> signature
    fn calculate_signature(&self, string_to_sign: &str, date_stamp: &str) -> String {
        let k_secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        let signature = hmac_sha256(&k_signing, string_to_sign.as_bytes());

        hex::encode(signature)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// ============================================================================
// AWS SQS Provider
// ============================================================================

/// [`SqsApi`] implementation backed by the SQS HTTP query API
///
/// Holds no per-queue state; it can be shared across tasks behind an `Arc`.
pub struct SqsHttpApi {
    http_client: HttpClient,
    signer: AwsV4Signer,
    endpoint: String,
    host: String,
}

impl SqsHttpApi {
    /// Create new HTTP provider
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint cannot be parsed or the HTTP client
    /// cannot be built.
    pub fn new(
        config: &GatewayConfig,
        credentials: AwsCredentials,
    ) -> Result<Self, ConfigurationError> {
        if config.region.is_empty() {
            return Err(ConfigurationError::Invalid {
                message: "region cannot be empty".to_string(),
            });
        }

        let endpoint = config.endpoint_url();
        let parsed = url::Url::parse(&endpoint).map_err(|e| ConfigurationError::Invalid {
            message: format!("invalid endpoint '{}': {}", endpoint, e),
        })?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ConfigurationError::Invalid {
                    message: format!("endpoint '{}' has no host", endpoint),
                })
            }
        };

        let http_client = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(
                config.request_timeout_seconds,
            ))
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            signer: AwsV4Signer::new(credentials, config.region.clone()),
            endpoint,
            host,
        })
    }

    /// Make a signed query API call and return the response body
    async fn make_request(&self, params: BTreeMap<String, String>) -> Result<String, ProviderError> {
        let timestamp = Utc::now();
        let auth_headers =
            self.signer
                .sign_request("POST", &self.host, "/", &params, "", &timestamp);

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}/?{}", self.endpoint, query_string);

        let mut request = self.http_client.post(&url);
        for (key, value) in auth_headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Network(format!("Request timeout: {}", e))
            } else if e.is_connect() {
                ProviderError::Network(format!("Connection failed: {}", e))
            } else {
                ProviderError::Network(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(parse_error_response(&response_body, status.as_u16()));
        }

        Ok(response_body)
    }
}

fn action_params(action: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("Action".to_string(), action.to_string());
    params.insert("Version".to_string(), API_VERSION.to_string());
    params
}

impl fmt::Debug for SqsHttpApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqsHttpApi")
            .field("endpoint", &self.endpoint)
            .field("region", &self.signer.region)
            .field("credentials", &self.signer.credentials)
            .finish()
    }
}

#[async_trait]
impl SqsApi for SqsHttpApi {
    async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, ProviderError> {
        let mut params = action_params("GetQueueUrl");
        params.insert("QueueName".to_string(), queue_name.as_str().to_string());

        let response = self.make_request(params).await?;
        parse_queue_url_response(&response)
    }

    async fn receive_message(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, ProviderError> {
        let mut params = action_params("ReceiveMessage");
        params.insert("QueueUrl".to_string(), queue_url.to_string());
        params.insert(
            "MaxNumberOfMessages".to_string(),
            options.max_messages.to_string(),
        );
        params.insert(
            "VisibilityTimeout".to_string(),
            options.visibility_timeout.to_string(),
        );
        params.insert("WaitTimeSeconds".to_string(), options.wait_time.to_string());

        let response = self.make_request(params).await?;
        let messages = parse_receive_message_response(&response)?;

        debug!(queue_url, count = messages.len(), "ReceiveMessage completed");
        Ok(messages)
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        handle: &ReceiptHandle,
    ) -> Result<(), ProviderError> {
        let mut params = action_params("DeleteMessage");
        params.insert("QueueUrl".to_string(), queue_url.to_string());
        params.insert("ReceiptHandle".to_string(), handle.as_str().to_string());

        // DeleteMessage answers with an empty result on success
        self.make_request(params).await?;
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Aws
    }
}

// ============================================================================
// XML Parsing
// ============================================================================

/// Parse GetQueueUrl XML response
fn parse_queue_url_response(xml: &str) -> Result<String, ProviderError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_queue_url = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"QueueUrl" => {
                in_queue_url = true;
            }
            Ok(Event::Text(e)) if in_queue_url => {
                return e.unescape().map(|s| s.into_owned()).map_err(|e| {
                    ProviderError::Serialization(format!("Failed to parse XML: {}", e))
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ProviderError::Serialization(format!(
                    "XML parsing error: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Err(ProviderError::Serialization(
        "QueueUrl not found in response".to_string(),
    ))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MessageField {
    ReceiptHandle,
    Body,
}

/// Parse ReceiveMessage XML response, preserving message order
///
/// Bodies are taken verbatim (no trimming); an empty `<Body/>` yields an
/// empty string rather than dropping the message.
fn parse_receive_message_response(xml: &str) -> Result<Vec<ReceivedMessage>, ProviderError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);

    let mut messages = Vec::new();
    let mut in_message = false;
    let mut field: Option<MessageField> = None;
    let mut receipt_handle = String::new();
    let mut body = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Message" => {
                    in_message = true;
                    receipt_handle.clear();
                    body.clear();
                }
                b"ReceiptHandle" if in_message => field = Some(MessageField::ReceiptHandle),
                b"Body" if in_message => field = Some(MessageField::Body),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(target) = field {
                    let text = e.unescape().map_err(|e| {
                        ProviderError::Serialization(format!("Failed to parse XML: {}", e))
                    })?;
                    match target {
                        MessageField::ReceiptHandle => receipt_handle.push_str(text.trim()),
                        MessageField::Body => body.push_str(&text),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if field == Some(MessageField::Body) {
                    body.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"ReceiptHandle" | b"Body" => field = None,
                b"Message" => {
                    in_message = false;
                    if receipt_handle.is_empty() {
                        return Err(ProviderError::Serialization(
                            "Message without ReceiptHandle in response".to_string(),
                        ));
                    }
                    messages.push(ReceivedMessage::new(
                        std::mem::take(&mut receipt_handle),
                        std::mem::take(&mut body),
                    ));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ProviderError::Serialization(format!(
                    "XML parsing error: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(messages)
}

/// Parse error response from XML and map SQS error codes
fn parse_error_response(xml: &str, status_code: u16) -> ProviderError {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut error_code = None;
    let mut error_message = None;
    let mut in_error = false;
    let mut in_code = false;
    let mut in_message = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Error" => in_error = true,
                b"Code" if in_error => in_code = true,
                b"Message" if in_error => in_message = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_code {
                    error_code = e.unescape().ok().map(|s| s.into_owned());
                    in_code = false;
                } else if in_message {
                    error_message = e.unescape().ok().map(|s| s.into_owned());
                    in_message = false;
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Error" => {
                in_error = false;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let code = error_code.unwrap_or_else(|| "Unknown".to_string());
    let message = error_message.unwrap_or_else(|| format!("HTTP status {}", status_code));

    match code.as_str() {
        "AWS.SimpleQueueService.NonExistentQueue" | "QueueDoesNotExist" => {
            ProviderError::QueueNotFound(message)
        }
        "InvalidClientTokenId" | "UnrecognizedClientException" | "SignatureDoesNotMatch" => {
            ProviderError::Authentication(format!("{}: {}", code, message))
        }
        "InvalidReceiptHandle" | "ReceiptHandleIsInvalid" => ProviderError::InvalidReceipt(message),
        _ if status_code == 401 || status_code == 403 => {
            ProviderError::Authentication(format!("{}: {}", code, message))
        }
        _ => ProviderError::Service { code, message },
    }
}
