//! EdgeGrid request signing
//!
//! PAPI requests carry an `EG1-HMAC-SHA256` authorization header: a signing
//! key derived from the client secret and the request timestamp, applied to
//! a tab-separated canonical form of the request. Credentials come from the
//! environment at process start and are immutable afterwards.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

use crate::error::PapiError;

type HmacSha256 = Hmac<Sha256>;

const HOST_ENV: &str = "AKAMAI_HOST";
const CLIENT_TOKEN_ENV: &str = "AKAMAI_CLIENT_TOKEN";
const CLIENT_SECRET_ENV: &str = "AKAMAI_CLIENT_SECRET";
const ACCESS_TOKEN_ENV: &str = "AKAMAI_ACCESS_TOKEN";

/// Tokens shorter than this are certainly not real EdgeGrid credentials.
const MIN_TOKEN_LEN: usize = 20;

/// EdgeGrid API credentials.
#[derive(Debug, Clone)]
pub struct EdgeGridCredentials {
    /// API host without scheme, e.g. "akab-xxxx.luna.akamaiapis.net".
    pub host: String,
    pub client_token: String,
    pub client_secret: String,
    pub access_token: String,
}

impl EdgeGridCredentials {
    /// Reads credentials from `AKAMAI_HOST`, `AKAMAI_CLIENT_TOKEN`,
    /// `AKAMAI_CLIENT_SECRET`, and `AKAMAI_ACCESS_TOKEN`.
    ///
    /// The host is trimmed of any scheme and must carry the vendor API
    /// suffix; tokens get a minimum-length sanity check.
    pub fn from_env() -> Result<Self, PapiError> {
        let host = read_env(HOST_ENV)?;
        let client_token = read_env(CLIENT_TOKEN_ENV)?;
        let client_secret = read_env(CLIENT_SECRET_ENV)?;
        let access_token = read_env(ACCESS_TOKEN_ENV)?;
        Self::new(host, client_token, client_secret, access_token)
    }

    /// Builds credentials from explicit values, applying the same checks as
    /// `from_env`.
    pub fn new(
        host: String,
        client_token: String,
        client_secret: String,
        access_token: String,
    ) -> Result<Self, PapiError> {
        let host = host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        if !host.contains(".akamaiapis.net") {
            return Err(PapiError::Credentials(format!(
                "{HOST_ENV} does not look like an EdgeGrid host: {host}"
            )));
        }
        for (name, value) in [
            (CLIENT_TOKEN_ENV, &client_token),
            (CLIENT_SECRET_ENV, &client_secret),
            (ACCESS_TOKEN_ENV, &access_token),
        ] {
            if value.len() < MIN_TOKEN_LEN {
                return Err(PapiError::Credentials(format!("{name} is implausibly short")));
            }
        }

        Ok(Self {
            host,
            client_token,
            client_secret,
            access_token,
        })
    }

    /// Base URL for API requests.
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }

    /// Produces the `Authorization` header value for one request.
    pub fn sign(&self, method: &str, url: &Url, body: &[u8]) -> String {
        let timestamp = chrono::Utc::now().format("%Y%m%dT%H:%M:%S+0000").to_string();
        let nonce = Uuid::new_v4().to_string();
        self.sign_at(method, url, body, &timestamp, &nonce)
    }

    /// Deterministic signing core, separated so tests can pin the timestamp
    /// and nonce.
    fn sign_at(&self, method: &str, url: &Url, body: &[u8], timestamp: &str, nonce: &str) -> String {
        let auth_header = format!(
            "EG1-HMAC-SHA256 client_token={};access_token={};timestamp={};nonce={};",
            self.client_token, self.access_token, timestamp, nonce
        );

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let content_hash = if body.is_empty() {
            String::new()
        } else {
            BASE64.encode(Sha256::digest(body))
        };

        let data_to_sign = format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            method,
            url.scheme(),
            url.host_str().unwrap_or_default(),
            path,
            auth_header,
            content_hash
        );

        let signing_key = hmac_sha256(self.client_secret.as_bytes(), timestamp.as_bytes());
        let signature = BASE64.encode(hmac_sha256(&signing_key, data_to_sign.as_bytes()));

        format!("{auth_header}signature={signature}")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so new_from_slice cannot fail.
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn read_env(name: &str) -> Result<String, PapiError> {
    std::env::var(name).map_err(|_| PapiError::Credentials(format!("{name} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> EdgeGridCredentials {
        EdgeGridCredentials::new(
            "akab-test-host.luna.akamaiapis.net".into(),
            "akab-client-token-xxxxxxxx".into(),
            "client-secret-xxxxxxxxxxxxxxxx".into(),
            "akab-access-token-xxxxxxxx".into(),
        )
        .unwrap()
    }

    #[test]
    fn host_scheme_is_trimmed() {
        let creds = EdgeGridCredentials::new(
            "https://akab-test-host.luna.akamaiapis.net/".into(),
            "akab-client-token-xxxxxxxx".into(),
            "client-secret-xxxxxxxxxxxxxxxx".into(),
            "akab-access-token-xxxxxxxx".into(),
        )
        .unwrap();
        assert_eq!(creds.host, "akab-test-host.luna.akamaiapis.net");
        assert_eq!(creds.base_url(), "https://akab-test-host.luna.akamaiapis.net");
    }

    #[test]
    fn rejects_non_edgegrid_host() {
        let err = EdgeGridCredentials::new(
            "example.com".into(),
            "akab-client-token-xxxxxxxx".into(),
            "client-secret-xxxxxxxxxxxxxxxx".into(),
            "akab-access-token-xxxxxxxx".into(),
        )
        .unwrap_err();
        assert!(matches!(err, PapiError::Credentials(_)));
    }

    #[test]
    fn rejects_short_tokens() {
        let err = EdgeGridCredentials::new(
            "akab-test-host.luna.akamaiapis.net".into(),
            "short".into(),
            "client-secret-xxxxxxxxxxxxxxxx".into(),
            "akab-access-token-xxxxxxxx".into(),
        )
        .unwrap_err();
        assert!(matches!(err, PapiError::Credentials(_)));
    }

    #[test]
    fn signature_is_deterministic_for_fixed_inputs() {
        let creds = credentials();
        let url = Url::parse(
            "https://akab-test-host.luna.akamaiapis.net/papi/v1/properties?contractId=ctr_1&groupId=grp_1",
        )
        .unwrap();
        let a = creds.sign_at("POST", &url, b"{}", "20240101T00:00:00+0000", "nonce-1");
        let b = creds.sign_at("POST", &url, b"{}", "20240101T00:00:00+0000", "nonce-1");
        assert_eq!(a, b);
        assert!(a.starts_with("EG1-HMAC-SHA256 client_token="));
        assert!(a.contains("signature="));
    }

    #[test]
    fn body_changes_the_signature() {
        let creds = credentials();
        let url =
            Url::parse("https://akab-test-host.luna.akamaiapis.net/papi/v1/properties").unwrap();
        let a = creds.sign_at("POST", &url, b"{\"a\":1}", "20240101T00:00:00+0000", "n");
        let b = creds.sign_at("POST", &url, b"{\"a\":2}", "20240101T00:00:00+0000", "n");
        assert_ne!(a, b);
    }
}
