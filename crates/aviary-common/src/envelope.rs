//! Wire envelopes shared by the backend and frontend services.
//!
//! Both services wrap every JSON reply in the same outer shape: a `metadata`
//! object that is always present, plus `response` and `error` fields that are
//! omitted when unset. The frontend decodes the backend's [`BirdEnvelope`]
//! and reshapes it into a [`ShuffleEnvelope`] with proxy-side metadata.

use serde::{Deserialize, Serialize};

/// Identity block attached to every backend reply.
///
/// `hostname` is resolved once at startup; if resolution failed the error
/// text is carried instead so the demo UI can surface it. `version` is the
/// active dataset tag (`v1` or `v2`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMetadata {
    pub hostname: String,
    pub version: String,
}

impl BackendMetadata {
    pub fn new(hostname: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            version: version.into(),
        }
    }
}

/// One bird fact on the wire, derived 1:1 from a dataset record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirdResponse {
    pub name: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    pub extract: String,
}

/// Reply envelope for the backend `/bird` endpoint.
///
/// Exactly one of `response` (200) or `error` (400/503) is set; the unset
/// field is omitted from the serialized JSON. Decoding tolerates missing
/// fields so the frontend can digest anything shaped roughly like a backend
/// reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirdEnvelope {
    #[serde(default)]
    pub metadata: BackendMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BirdResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BirdEnvelope {
    /// Creates a success envelope carrying a bird.
    ///
    /// # Example
    ///
    /// ```
    /// use aviary_common::envelope::{BackendMetadata, BirdEnvelope, BirdResponse};
    ///
    /// let envelope = BirdEnvelope::success(
    ///     BackendMetadata::new("backend-0", "v1"),
    ///     BirdResponse {
    ///         name: "Kea".to_string(),
    ///         image_url: "https://example.com/kea.jpg".to_string(),
    ///         extract: "<p>An alpine parrot.</p>".to_string(),
    ///     },
    /// );
    /// assert!(envelope.error.is_none());
    /// assert_eq!(envelope.response.unwrap().name, "Kea");
    /// ```
    pub fn success(metadata: BackendMetadata, response: BirdResponse) -> Self {
        Self {
            metadata,
            response: Some(response),
            error: None,
        }
    }

    /// Creates an error envelope carrying a message.
    ///
    /// # Example
    ///
    /// ```
    /// use aviary_common::envelope::{BackendMetadata, BirdEnvelope};
    ///
    /// let envelope = BirdEnvelope::error(
    ///     BackendMetadata::new("backend-0", "v1"),
    ///     "randomly generated error",
    /// );
    /// assert_eq!(envelope.error.as_deref(), Some("randomly generated error"));
    /// assert!(envelope.response.is_none());
    /// ```
    pub fn error(metadata: BackendMetadata, message: impl Into<String>) -> Self {
        Self {
            metadata,
            response: None,
            error: Some(message.into()),
        }
    }
}

/// Proxy-side metadata attached to every `/shuffle` reply.
///
/// Every field is omitted when unset; `backend_duration` is always set in
/// practice since the proxy measures the call in all outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub backend_duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_version: Option<String>,
}

/// Reply envelope for the frontend `/shuffle` endpoint.
///
/// The proxy reports failures in the body rather than the HTTP status, so
/// callers always receive parseable JSON: `error` set on any failure,
/// `response` set on success, `metadata` always present (possibly empty).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleEnvelope {
    #[serde(default)]
    pub metadata: ShuffleMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BirdResponse>,
}

impl ShuffleEnvelope {
    /// Creates a failure envelope carrying only the measured duration.
    ///
    /// # Example
    ///
    /// ```
    /// use aviary_common::envelope::ShuffleEnvelope;
    ///
    /// let envelope =
    ///     ShuffleEnvelope::error("235ms".to_string(), "unable to call backend: refused");
    /// let json = serde_json::to_value(&envelope).unwrap();
    /// assert_eq!(json["metadata"]["backendDuration"], "235ms");
    /// assert_eq!(json["error"], "unable to call backend: refused");
    /// assert!(json.get("response").is_none());
    /// ```
    pub fn error(backend_duration: String, message: impl Into<String>) -> Self {
        Self {
            metadata: ShuffleMetadata {
                backend_duration,
                ..ShuffleMetadata::default()
            },
            error: Some(message.into()),
            response: None,
        }
    }
}

/// Body of the `/healthz` endpoint on both services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn meta() -> BackendMetadata {
        BackendMetadata::new("host-1", "v1")
    }

    fn bird() -> BirdResponse {
        BirdResponse {
            name: "Common Raven".to_string(),
            image_url: "https://example.com/raven.jpg".to_string(),
            extract: "<p>A large all-black passerine bird.</p>".to_string(),
        }
    }

    #[test]
    fn test_bird_envelope_success_omits_error() {
        let envelope = BirdEnvelope::success(meta(), bird());
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "metadata": {"hostname": "host-1", "version": "v1"},
                "response": {
                    "name": "Common Raven",
                    "imageURL": "https://example.com/raven.jpg",
                    "extract": "<p>A large all-black passerine bird.</p>"
                }
            })
        );
    }

    #[test]
    fn test_bird_envelope_error_omits_response() {
        let envelope = BirdEnvelope::error(meta(), "randomly generated error");
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "metadata": {"hostname": "host-1", "version": "v1"},
                "error": "randomly generated error"
            })
        );
    }

    #[test]
    fn test_bird_envelope_decodes_without_optional_fields() {
        let envelope: BirdEnvelope = serde_json::from_value(json!({
            "metadata": {"hostname": "h", "version": "v2"},
            "error": "boom"
        }))
        .unwrap();

        assert_eq!(envelope.metadata.version, "v2");
        assert_eq!(envelope.error.as_deref(), Some("boom"));
        assert!(envelope.response.is_none());
    }

    #[test]
    fn test_bird_envelope_decodes_unrelated_json_to_defaults() {
        // The frontend may receive JSON that is not a backend envelope at
        // all; missing fields decode to empty defaults rather than failing.
        let envelope: BirdEnvelope = serde_json::from_value(json!({"status": "healthy"})).unwrap();

        assert_eq!(envelope.metadata, BackendMetadata::default());
        assert!(envelope.response.is_none());
        assert!(envelope.error.is_none());
    }

    #[test]
    fn test_shuffle_metadata_empty_serializes_to_empty_object() {
        let value = serde_json::to_value(ShuffleMetadata::default()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_shuffle_envelope_error_keeps_metadata_object() {
        let envelope = ShuffleEnvelope::error("12µs".to_string(), "unable to call backend: x");
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "metadata": {"backendDuration": "12µs"},
                "error": "unable to call backend: x"
            })
        );
    }

    #[test]
    fn test_shuffle_envelope_success_field_names() {
        let envelope = ShuffleEnvelope {
            metadata: ShuffleMetadata {
                backend_duration: "235ms".to_string(),
                backend_status_code: Some(200),
                backend_hostname: Some("host-1".to_string()),
                backend_version: Some("v1".to_string()),
            },
            error: None,
            response: Some(bird()),
        };
        let value = serde_json::to_value(&envelope).unwrap();

        let metadata = value.get("metadata").unwrap();
        assert_eq!(metadata.get("backendDuration").unwrap(), "235ms");
        assert_eq!(metadata.get("backendStatusCode").unwrap(), 200);
        assert_eq!(metadata.get("backendHostname").unwrap(), "host-1");
        assert_eq!(metadata.get("backendVersion").unwrap(), "v1");
        assert_eq!(value.get("error"), None);
        assert_eq!(
            value.pointer("/response/imageURL").unwrap(),
            "https://example.com/raven.jpg"
        );
    }

    #[test]
    fn test_health_status_body() {
        let value = serde_json::to_value(HealthStatus::healthy()).unwrap();
        assert_eq!(value, json!({"status": "healthy"}));
    }

    #[test]
    fn test_bird_response_round_trip() {
        let original = bird();
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: BirdResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, original);

        // The wire name for the image field is fixed.
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert!(value.get("imageURL").is_some());
        assert!(value.get("image_url").is_none());
    }
}
