//! Shared GET path for the provider clients.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::entity::provider_type::ProviderType;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

use super::errors::{ProviderError, Result};
use super::rate_limit::{ApiRateLimiter, detect};

/// Send a paced GET and classify the response.
///
/// Throttling becomes [`ProviderError::RateLimited`]; 401 becomes
/// `Unauthorized`; 404 becomes `NotFound`; anything else outside 2xx is an
/// `Api` error carrying the status.
pub(crate) async fn send_get(
    provider: ProviderType,
    transport: &dyn HttpTransport,
    limiter: Option<&ApiRateLimiter>,
    request: HttpRequest,
) -> Result<HttpResponse> {
    if let Some(limiter) = limiter {
        limiter.wait().await;
    }

    let url = request.url.clone();
    debug!(%provider, url = %url, "GET");

    let response = transport
        .send(request)
        .await
        .map_err(|e| ProviderError::network(provider, e))?;

    let detection = detect(response.status, &response.headers, provider);
    if detection.is_rate_limited {
        debug!(
            %provider,
            status = response.status,
            retry_after_secs = detection.retry_after.map(|d| d.as_secs()),
            "Rate limited"
        );
        return Err(ProviderError::RateLimited {
            provider,
            retry_after: detection.retry_after,
            info: detection.rate_limit_info,
        });
    }

    match response.status {
        s if (200..300).contains(&s) => Ok(response),
        401 => Err(ProviderError::Unauthorized { provider }),
        404 => Err(ProviderError::not_found(provider, url)),
        status => Err(ProviderError::api(provider, status, response.body_text())),
    }
}

/// Decode a JSON body.
pub(crate) fn decode_json<T: DeserializeOwned>(
    provider: ProviderType,
    response: &HttpResponse,
) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| ProviderError::decode(provider, e.to_string()))
}

/// Decode a JSON array body into untyped values. A body that is not an
/// array is a decode error.
pub(crate) fn decode_array(
    provider: ProviderType,
    response: &HttpResponse,
) -> Result<Vec<serde_json::Value>> {
    decode_json(provider, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport};

    const URL: &str = "https://api.example.com/x";

    fn respond(transport: &MockTransport, status: u16, headers: Vec<(&str, &str)>, body: &str) {
        transport.push_response(
            HttpMethod::Get,
            URL,
            HttpResponse {
                status,
                headers: headers
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.as_bytes().to_vec(),
            },
        );
    }

    #[tokio::test]
    async fn maps_statuses_to_error_variants() {
        let transport = MockTransport::new();
        respond(&transport, 401, vec![], "");
        respond(&transport, 404, vec![], "");
        respond(&transport, 500, vec![], "  boom \n");
        respond(&transport, 429, vec![("Retry-After", "7")], "");
        respond(&transport, 200, vec![], "[]");

        let get = || send_get(ProviderType::GitLab, &transport, None, HttpRequest::get(URL));

        assert!(matches!(get().await, Err(ProviderError::Unauthorized { .. })));
        assert!(matches!(get().await, Err(ProviderError::NotFound { .. })));
        match get().await {
            Err(ProviderError::Api {
                status, message, ..
            }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
        let err = get().await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(7)));
        assert!(get().await.is_ok());
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let transport = MockTransport::new();
        let err = send_get(ProviderType::GitHub, &transport, None, HttpRequest::get(URL))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network { .. }));
        assert_eq!(err.provider(), Some(ProviderType::GitHub));
    }

    #[test]
    fn decode_reports_provider() {
        let resp = HttpResponse {
            status: 200,
            headers: vec![],
            body: b"{not json".to_vec(),
        };
        let err = decode_array(ProviderType::Bitbucket, &resp).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Decode {
                provider: ProviderType::Bitbucket,
                ..
            }
        ));
    }
}
