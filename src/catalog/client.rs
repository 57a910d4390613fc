//! HTTP client for the cataloguing service

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::config::CatalogConfig;
use crate::core::error::CatalogError;
use crate::core::traits::{
    CatalogPublication, CatalogPublishRequest, CatalogPublisher, CatalogStatus, FinalizeRequest,
    ResolvedDoi,
};
use crate::security::{ServiceTokenIssuer, mask_token};

#[derive(Serialize)]
struct ResolveRequest<'a> {
    dois: &'a [String],
}

#[derive(Deserialize)]
struct ResolveResponse {
    records: Vec<ResolvedDoi>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: CatalogStatus,
}

#[derive(Serialize)]
struct EmptyBody {}

/// Catalog client signing a fresh service token per call
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    tokens: ServiceTokenIssuer,
}

impl HttpCatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        tokens: ServiceTokenIssuer,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let secret = SecretString::new(config.signing_secret.expose_secret().into());
        let tokens = ServiceTokenIssuer::new(
            secret,
            config.issuer.clone(),
            config.organization_role.clone(),
            config.dataset_role.clone(),
        )
        .with_ttl(Duration::from_secs(config.token_ttl_secs));

        Self::new(config.base_url.clone(), tokens, config.timeout())
    }

    async fn post<B, T>(&self, path: &str, dataset: Option<&str>, body: &B) -> Result<T, CatalogError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let token = self.tokens.issue(dataset)?;
        debug!(url = %url, token = %mask_token(token.expose_secret()), "catalog request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogPublisher for HttpCatalogClient {
    async fn resolve_dois(&self, dois: &[String]) -> Result<Vec<ResolvedDoi>, CatalogError> {
        let response: ResolveResponse = self
            .post("/datasets/resolve", None, &ResolveRequest { dois })
            .await?;
        Ok(response.records)
    }

    async fn publish(
        &self,
        collection_node_id: &str,
        request: &CatalogPublishRequest,
    ) -> Result<CatalogPublication, CatalogError> {
        self.post(
            &format!("/collection/{}/publish", collection_node_id),
            Some(collection_node_id),
            request,
        )
        .await
    }

    async fn finalize(
        &self,
        collection_node_id: &str,
        request: &FinalizeRequest,
    ) -> Result<CatalogStatus, CatalogError> {
        let response: StatusResponse = self
            .post(
                &format!("/collection/{}/finalize", collection_node_id),
                Some(collection_node_id),
                request,
            )
            .await?;
        Ok(response.status)
    }

    async fn unpublish(&self, collection_node_id: &str) -> Result<CatalogStatus, CatalogError> {
        let response: StatusResponse = self
            .post(
                &format!("/collection/{}/unpublish", collection_node_id),
                Some(collection_node_id),
                &EmptyBody {},
            )
            .await?;
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Retryable;
    use crate::core::traits::{ContributorIdentity, RecordKind};
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "catalog-shared-secret";

    fn client(server: &MockServer) -> HttpCatalogClient {
        let tokens = ServiceTokenIssuer::new(
            SecretString::new(SECRET.into()),
            "collection-publisher",
            "publisher",
            "owner",
        );
        HttpCatalogClient::new(format!("{}/", server.uri()), tokens, Duration::from_secs(5))
            .unwrap()
    }

    fn publish_request() -> CatalogPublishRequest {
        let owner = ContributorIdentity {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.org".to_string(),
            orcid: None,
        };
        CatalogPublishRequest {
            name: "Coastal surveys".to_string(),
            description: "Tide gauges".to_string(),
            banner_urls: vec![],
            dois: vec!["10.1111/A".to_string()],
            license: "CC-BY-4.0".to_string(),
            tags: vec!["ocean".to_string()],
            owner,
            contributors: vec![],
        }
    }

    #[tokio::test]
    async fn test_resolve_dois() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/datasets/resolve"))
            .and(header_exists("authorization"))
            .and(body_json(json!({ "dois": ["10.1111/A", "10.1111/C"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [
                    { "doi": "10.1111/A", "kind": "dataset", "published": true },
                    { "doi": "10.1111/C", "kind": "collection", "published": true }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = client(&server)
            .resolve_dois(&["10.1111/A".to_string(), "10.1111/C".to_string()])
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind, RecordKind::Collection);
    }

    #[tokio::test]
    async fn test_publish_sends_scoped_service_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collection/node-1/publish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dataset_id": "10.1111/abc-123",
                "version": "1",
                "status": "in_progress"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let publication = client(&server)
            .publish("node-1", &publish_request())
            .await
            .unwrap();
        assert_eq!(publication.dataset_id, "10.1111/abc-123");
        assert_eq!(publication.status, CatalogStatus::InProgress);

        let requests = server.received_requests().await.unwrap();
        let authorization = requests[0]
            .headers
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let token = authorization.strip_prefix("Bearer ").unwrap();

        let claims = decode::<crate::security::ServiceClaims>(
            token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap()
        .claims;
        assert_eq!(claims.dataset.as_deref(), Some("node-1"));
        assert_eq!(claims.org_role, "publisher");
        assert_eq!(claims.exp - claims.iat, 300);

        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["banner_urls"], json!([]));
    }

    #[tokio::test]
    async fn test_finalize_and_unpublish_return_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collection/node-1/finalize"))
            .and(body_json(json!({ "success": false, "file_count": 0, "total_size": 0 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "failed" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collection/node-1/unpublish"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "removed" })),
            )
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(
            client
                .finalize("node-1", &FinalizeRequest::failure())
                .await
                .unwrap(),
            CatalogStatus::Failed
        );
        assert_eq!(
            client.unpublish("node-1").await.unwrap(),
            CatalogStatus::Removed
        );
    }

    #[tokio::test]
    async fn test_error_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collection/node-1/publish"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let error = client(&server)
            .publish("node-1", &publish_request())
            .await
            .unwrap_err();

        match &error {
            CatalogError::Status { status, body } => {
                assert_eq!(*status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/datasets/resolve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [] })))
            .mount(&server)
            .await;

        let error = client(&server)
            .resolve_dois(&["10.1111/A".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(error, CatalogError::Decode(_)));
    }
}
