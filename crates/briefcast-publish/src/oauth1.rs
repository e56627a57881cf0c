//! OAuth 1.0a request signing (HMAC-SHA1) for the X API.

use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

/// Build the `Authorization: OAuth ...` header value for one request.
///
/// `extra_params` are non-oauth request parameters that take part in the
/// signature (query or form-urlencoded body params). JSON and multipart
/// bodies contribute nothing.
pub fn authorization_header(
    method: &str,
    url: &str,
    creds: &OAuth1Credentials,
    extra_params: &[(&str, &str)],
) -> String {
    let nonce = nonce();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    build_header(method, url, creds, extra_params, &nonce, &timestamp)
}

/// RFC 3986 percent-encoding, as OAuth 1.0a requires.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
            chars[rng.gen_range(0..chars.len())] as char
        })
        .collect()
}

fn build_header(
    method: &str,
    url: &str,
    creds: &OAuth1Credentials,
    extra_params: &[(&str, &str)],
    nonce: &str,
    timestamp: &str,
) -> String {
    let oauth_params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", &creds.consumer_key),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", &creds.token),
        ("oauth_version", "1.0"),
    ];

    // Parameter string: all params percent-encoded, sorted, joined.
    let mut all: Vec<(String, String)> = oauth_params
        .iter()
        .chain(extra_params.iter())
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    all.sort();
    let param_string = all
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        encode(&creds.consumer_secret),
        encode(&creds.token_secret)
    );

    let mut mac =
        HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(base_string.as_bytes());
    let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    let header_params: Vec<(&str, String)> = oauth_params
        .iter()
        .map(|(k, v)| (*k, encode(v)))
        .chain(std::iter::once(("oauth_signature", encode(&signature))))
        .collect();
    let mut header_params = header_params;
    header_params.sort();

    format!(
        "OAuth {}",
        header_params
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> OAuth1Credentials {
        OAuth1Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".into(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
            token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
            token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".into(),
        }
    }

    #[test]
    fn test_signature_matches_known_vector() {
        // The classic example from the OAuth 1.0a spec walkthrough.
        let header = build_header(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &creds(),
            &[
                ("include_entities", "true"),
                ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ],
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            "1318622958",
        );
        assert!(header.contains("oauth_signature=\"tnnArxj06cWHq44gCs1OSKk%2FjLY%3D\""));
    }

    #[test]
    fn test_header_structure() {
        let header = authorization_header(
            "POST",
            "https://api.twitter.com/2/tweets",
            &creds(),
            &[],
        );
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key="));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_signature="));
    }

    #[test]
    fn test_rfc3986_encoding() {
        assert_eq!(encode("Hello Ladies + Gentlemen"), "Hello%20Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("safe-chars_.~"), "safe-chars_.~");
    }
}
