use crate::error::StoreError;
use crate::store::blob::{Blob, BlobStore, VersionToken};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const ACCEPT_CONTENTS: &str = "application/vnd.github.v3+json";

/// Blob store backed by the GitHub repository contents API. The file
/// `sha` is the version token; GitHub rejects a put carrying a stale
/// sha, which is exactly the compare-and-swap the engine needs.
pub struct GitHubStore {
    repo: String,
    token: String,
}

impl GitHubStore {
    pub fn new(repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            token: token.into(),
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!("https://api.github.com/repos/{}/contents/{}", self.repo, path)
    }

    fn client(&self) -> Result<Client, StoreError> {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

/// GitHub wraps file content in newline-chunked base64.
fn decode_content(path: &str, payload: &Value) -> Result<String, StoreError> {
    let malformed = |reason: &str| StoreError::Malformed {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let encoded = payload
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("response missing content field"))?;
    let compact: String = encoded.chars().filter(|c| *c != '\n').collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|_| malformed("content is not valid base64"))?;
    String::from_utf8(bytes).map_err(|_| malformed("content is not valid UTF-8"))
}

/// `message` field of a failure body, when the body is JSON at all.
fn body_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .as_ref()
        .and_then(|payload| payload.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Map a failed contents-API response onto the store taxonomy.
fn classify_failure(path: &str, status: u16, message: &str) -> StoreError {
    if status == 401 || message.contains("Bad credentials") {
        return StoreError::AuthFailure;
    }
    if status == 409 || (status == 422 && message.contains("sha")) {
        return StoreError::Conflict {
            path: path.to_string(),
        };
    }
    StoreError::Unavailable(format!("github returned {status} for {path}: {message}"))
}

impl BlobStore for GitHubStore {
    fn fetch(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let response = self
            .client()?
            .get(self.contents_url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_CONTENTS)
            .header("User-Agent", "kiroku")
            .send()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        let text = response
            .text()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(classify_failure(path, status, &body_message(&text)));
        }
        let payload: Value =
            serde_json::from_str(&text).map_err(|err| StoreError::Malformed {
                path: path.to_string(),
                reason: err.to_string(),
            })?;

        let content = decode_content(path, &payload)?;
        let version = payload
            .get("sha")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed {
                path: path.to_string(),
                reason: "response missing sha".to_string(),
            })?
            .to_string();
        Ok(Some(Blob { content, version }))
    }

    fn put(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected: Option<&VersionToken>,
    ) -> Result<VersionToken, StoreError> {
        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
        });
        if let Some(sha) = expected {
            body["sha"] = Value::String(sha.clone());
        }

        let response = self
            .client()?
            .put(self.contents_url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_CONTENTS)
            .header("User-Agent", "kiroku")
            .json(&body)
            .send()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(classify_failure(path, status, &body_message(&text)));
        }
        let payload: Value =
            serde_json::from_str(&text).map_err(|err| StoreError::Malformed {
                path: path.to_string(),
                reason: err.to_string(),
            })?;

        payload
            .get("content")
            .and_then(|v| v.get("sha"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Malformed {
                path: path.to_string(),
                reason: "put response missing content.sha".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_newline_chunked_base64() {
        // "# 2024年3月\n", split across two lines as the API does
        let payload = serde_json::json!({
            "content": "IyAyMDI0\n5bm0M+aciAo=",
        });
        let got = decode_content("logs/2024-03.md", &payload).expect("decode");
        assert_eq!(got, "# 2024年3月\n");
    }

    #[test]
    fn missing_content_field_is_malformed() {
        let payload = serde_json::json!({ "sha": "abc" });
        let err = decode_content("a.md", &payload).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn bad_credentials_map_to_auth_failure() {
        let err = classify_failure("a.md", 401, "Bad credentials");
        assert!(matches!(err, StoreError::AuthFailure));
        let err = classify_failure("a.md", 403, "Bad credentials");
        assert!(matches!(err, StoreError::AuthFailure));
    }

    #[test]
    fn stale_sha_maps_to_conflict() {
        let err = classify_failure("a.md", 409, "a.md does not match");
        assert!(matches!(err, StoreError::Conflict { .. }));
        let err = classify_failure("a.md", 422, "sha mismatch for a.md");
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn other_failures_are_unavailable() {
        let err = classify_failure("a.md", 500, "boom");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
