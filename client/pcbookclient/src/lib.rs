// Copyright 2015-2019 Capital One Services, LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

use pcbook_protocol as protocol;
pub use auth::AuthClient;
pub use chunks::Chunks;
pub use credentials::{
    is_protected, Authenticator, CredentialLayer, CredentialService, Credentials, TokenRefresher,
};
pub use laptop::{LaptopClient, CHUNK_SIZE};
pub use protocol::catalog::{Filter, Laptop};
pub use protocol::stream::{RateLaptopResponse, UploadImageResponse};

pub mod auth;
pub mod chunks;
pub mod credentials;
pub mod laptop;

use std::time::Duration;
use tonic::transport::Endpoint;
use tower::Layer;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server URL {0}")]
    InvalidUrl(String),
    #[error("cannot connect: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("{}", .0.message())]
    Status(#[from] tonic::Status),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// The gRPC status code, if the server answered
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            ClientError::Status(status) => Some(status.code()),
            _ => None,
        }
    }
}

/// Where and as whom a client connects. The refresh interval must be shorter
/// than the server's token duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfiguration {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub refresh_interval_secs: u64,
}

impl Default for ConnectionConfiguration {
    fn default() -> Self {
        ConnectionConfiguration {
            server_url: "http://localhost:8080".to_string(),
            username: "admin1".to_string(),
            password: "secret".to_string(),
            refresh_interval_secs: 30,
        }
    }
}

impl ConnectionConfiguration {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// An instance of a pcbook client connection
pub struct Client {
    auth: AuthClient,
    laptops: LaptopClient,
    refresher: TokenRefresher,
}

impl Client {
    /// Connects, logs in and starts refreshing the access token every
    /// `refresh_interval`
    pub async fn connect_with_interval(
        config: &ConnectionConfiguration,
        refresh_interval: Duration,
    ) -> Result<Client, ClientError> {
        let endpoint = Endpoint::from_shared(config.server_url.clone())
            .map_err(|_| ClientError::InvalidUrl(config.server_url.clone()))?;
        let channel = endpoint.connect().await?;
        info!("connected to {}", config.server_url);

        let auth = AuthClient::new(channel.clone(), &config.username, &config.password);
        let refresher = TokenRefresher::start(auth.clone(), refresh_interval).await?;
        let laptops = LaptopClient::new(CredentialLayer::new(refresher.credentials()).layer(channel));

        Ok(Client {
            auth,
            laptops,
            refresher,
        })
    }

    pub async fn connect(config: &ConnectionConfiguration) -> Result<Client, ClientError> {
        Client::connect_with_interval(config, config.refresh_interval()).await
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn laptops(&self) -> &LaptopClient {
        &self.laptops
    }

    pub fn credentials(&self) -> Credentials {
        self.refresher.credentials()
    }

    pub async fn create_laptop(&self, laptop: Laptop) -> Result<String, ClientError> {
        self.laptops.create_laptop(laptop).await
    }

    pub async fn search_laptop(&self, filter: Filter) -> Result<Vec<Laptop>, ClientError> {
        self.laptops.search_laptop(filter).await
    }

    pub async fn rate_laptop(
        &self,
        ids: &[String],
        scores: &[f64],
    ) -> Result<Vec<RateLaptopResponse>, ClientError> {
        self.laptops.rate_laptop(ids, scores).await
    }

    /// Stops the token refresh loop
    pub async fn shutdown(self) {
        self.refresher.shutdown().await;
    }
}
