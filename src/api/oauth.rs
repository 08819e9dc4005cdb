//! OAuth 1.0a request signing (HMAC-SHA1, header transport).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;
use sha1::Sha1;

use crate::config::Credentials;
use crate::http_client::{ApiError, RequestSigner};

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as they are
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const NONCE_LEN: usize = 32;

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE).to_string()
}

#[derive(Debug, Clone)]
pub struct OAuth1Signer {
    credentials: Credentials,
}

impl OAuth1Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), self.credentials.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.credentials.oauth_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]
    }

    /// Signature over `method`, `base_url` and every request parameter
    /// (query and form) plus the protocol parameters
    pub fn signature(
        &self,
        method: &str,
        base_url: &str,
        request_params: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, ApiError> {
        let mut params: Vec<(String, String)> = request_params
            .iter()
            .chain(self.oauth_params(nonce, timestamp).iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        params.sort();

        let param_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(base_url),
            encode(&param_string)
        );
        let key = format!(
            "{}&{}",
            encode(&self.credentials.consumer_secret),
            encode(&self.credentials.oauth_secret)
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| ApiError::Signing(e.to_string()))?;
        mac.update(base_string.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Full `Authorization` header value with explicit nonce and timestamp
    pub fn header(
        &self,
        method: &str,
        url: &Url,
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, ApiError> {
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let signature = self.signature(method, &base_url(url)?, &query, nonce, timestamp)?;

        let mut fields = self.oauth_params(nonce, timestamp);
        fields.push(("oauth_signature".to_string(), signature));
        fields.sort();

        let fields = fields
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {}", fields))
    }
}

/// Scheme, host, non-default port and path; no query or fragment
pub fn base_url(url: &Url) -> Result<String, ApiError> {
    let host = url
        .host_str()
        .ok_or_else(|| ApiError::InvalidUrl(url.to_string()))?;
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
    Ok(format!(
        "{}://{}{}{}",
        url.scheme(),
        host.to_lowercase(),
        port,
        url.path()
    ))
}

pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

impl RequestSigner for OAuth1Signer {
    fn authorization(&self, method: &str, url: &Url) -> Result<String, ApiError> {
        self.header(method, url, &generate_nonce(), chrono::Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_signer() -> OAuth1Signer {
        OAuth1Signer::new(Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            oauth_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            oauth_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        })
    }

    #[test]
    fn test_reference_signature() {
        // Published example from the Twitter OAuth 1.0a signing guide
        let params = vec![
            ("include_entities".to_string(), "true".to_string()),
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
        ];
        let signature = reference_signer()
            .signature(
                "POST",
                "https://api.twitter.com/1.1/statuses/update.json",
                &params,
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                1318622958,
            )
            .unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_encode_keeps_unreserved() {
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("Ladies + Gentlemen!"), "Ladies%20%2B%20Gentlemen%21");
    }

    #[test]
    fn test_base_url_drops_query() {
        let url = Url::parse("https://API.smugmug.com/api/v2/album/abc!images?start=1&count=100").unwrap();
        assert_eq!(
            base_url(&url).unwrap(),
            "https://api.smugmug.com/api/v2/album/abc!images"
        );

        let local = Url::parse("http://127.0.0.1:8080/x?y=1").unwrap();
        assert_eq!(base_url(&local).unwrap(), "http://127.0.0.1:8080/x");
    }

    #[test]
    fn test_header_layout() {
        let url = Url::parse("https://api.smugmug.com/api/v2!authuser").unwrap();
        let header = reference_signer().header("GET", &url, "abc", 1).unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(header.contains("oauth_version=\"1.0\""));
    }

    #[test]
    fn test_nonce_is_fresh() {
        let a = generate_nonce();
        assert_eq!(a.len(), NONCE_LEN);
        assert_ne!(a, generate_nonce());
    }
}
