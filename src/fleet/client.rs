//! HTTP client for the fleet allocator
//!
//! Logs in with the OAuth client-credentials grant and claims servers through
//! the allocator's claim-by-keys endpoint.

use crate::config::FleetSettings;
use crate::fleet::claimer::{ClaimError, FleetAuthenticator, FleetClaimer};
use crate::types::{ClaimRequest, ServerAllocation};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Allocator client backed by reqwest
pub struct HttpFleetClient {
    http: reqwest::Client,
    settings: FleetSettings,
    access_token: RwLock<Option<String>>,
}

impl HttpFleetClient {
    /// Create a client with the configured per-request timeout
    pub fn new(settings: FleetSettings) -> Result<Self, ClaimError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ClaimError::Transport {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            settings,
            access_token: RwLock::new(None),
        })
    }

    fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    /// OAuth token endpoint
    pub fn token_url(&self) -> String {
        format!("{}/iam/v3/oauth/token", self.base_url())
    }

    /// Claim-by-keys endpoint for the configured namespace
    pub fn claim_url(&self) -> String {
        format!(
            "{}/ams/v1/namespaces/{}/servers/claim",
            self.base_url(),
            self.settings.namespace
        )
    }

    /// Whether a login has succeeded
    pub async fn is_logged_in(&self) -> bool {
        self.access_token.read().await.is_some()
    }
}

fn transport_error(e: reqwest::Error) -> ClaimError {
    if e.is_timeout() {
        ClaimError::Transport {
            message: "request timed out".to_string(),
        }
    } else {
        ClaimError::Transport {
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl FleetAuthenticator for HttpFleetClient {
    async fn login(&self) -> Result<(), ClaimError> {
        info!(
            "Logging in to fleet allocator at {} as client '{}'",
            self.base_url(),
            self.settings.client_id
        );

        let response = self
            .http
            .post(self.token_url())
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Fleet login rejected with HTTP {}", status.as_u16());
            return Err(ClaimError::Unauthorized {
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| ClaimError::InvalidResponse {
                    message: format!("Failed to parse token response: {}", e),
                })?;

        debug!("Fleet token acquired, expires in {:?}s", token.expires_in);
        *self.access_token.write().await = Some(token.access_token);

        info!("✅ Logged in to fleet allocator");
        Ok(())
    }
}

impl HttpFleetClient {
    async fn current_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    async fn send_claim(
        &self,
        token: &str,
        request: &ClaimRequest,
    ) -> Result<ServerAllocation, ClaimError> {
        let response = self
            .http
            .put(self.claim_url())
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND
                | StatusCode::CONFLICT
                | StatusCode::SERVICE_UNAVAILABLE => ClaimError::Unavailable { reason: body },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ClaimError::Unauthorized { message: body }
                }
                _ => ClaimError::Http {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        response
            .json::<ServerAllocation>()
            .await
            .map_err(|e| ClaimError::InvalidResponse {
                message: format!("Failed to parse claim response: {}", e),
            })
    }
}

#[async_trait]
impl FleetClaimer for HttpFleetClient {
    /// Claim a server, logging in again once if the allocator rejects the token
    async fn claim(&self, request: &ClaimRequest) -> Result<ServerAllocation, ClaimError> {
        let token = self
            .current_token()
            .await
            .ok_or_else(|| ClaimError::Unauthorized {
                message: "claim attempted before login".to_string(),
            })?;

        debug!(
            "Claiming server - keys: {:?}, regions: {:?}, session: {}",
            request.claim_keys, request.regions, request.session_id
        );

        match self.send_claim(&token, request).await {
            Err(ClaimError::Unauthorized { message }) => {
                warn!("Fleet token rejected ({}), logging in again", message);
                self.login().await?;

                let token = self
                    .current_token()
                    .await
                    .ok_or_else(|| ClaimError::Unauthorized {
                        message: "no token after re-login".to_string(),
                    })?;
                self.send_claim(&token, request).await
            }
            outcome => outcome,
        }
    }
}
