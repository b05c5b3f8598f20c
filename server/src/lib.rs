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

//! # pcbook server
//!
//! The gRPC front of the laptop catalog. Every call passes through the
//! [`AccessLayer`] before it reaches [`AuthServer`] or [`LaptopServer`];
//! handlers translate store failures into `tonic::Status` through
//! [`ServiceError`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;

use pcbook_protocol as protocol;

pub mod auth;
mod context;
pub mod error;
mod identity;
mod laptop;
pub mod middleware;
pub mod users;

pub use auth::{TokenError, TokenManager, UserClaims};
pub use context::{call_context, parse_grpc_timeout};
pub use error::ServiceError;
pub use identity::AuthServer;
pub use laptop::LaptopServer;
pub use middleware::{accessible_roles, AccessLayer};
pub use users::{seed_users, InMemoryUserStore, Role, User, UserError, UserStore};

use catalog::{InMemoryLaptopStore, InMemoryRatingStore};
use protocol::{AuthServiceServer, LaptopServiceServer};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use streams::{DiskImageStore, MAX_IMAGE_SIZE};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

/// Everything the server needs to know at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub secret: String,
    pub token_duration: Duration,
    pub image_dir: PathBuf,
    pub max_image_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            secret: "secret".to_string(),
            token_duration: Duration::from_secs(15 * 60),
            image_dir: PathBuf::from("img"),
            max_image_size: MAX_IMAGE_SIZE,
        }
    }
}

/// The assembled services, ready to serve on a listener
pub struct PcbookServer {
    tokens: Arc<TokenManager>,
    auth: AuthServer,
    laptops: LaptopServer,
}

impl PcbookServer {
    pub fn new(config: &ServerConfig, users: Arc<dyn UserStore>) -> PcbookServer {
        let tokens = Arc::new(TokenManager::new(config.secret.as_bytes(), config.token_duration));
        let laptops = LaptopServer::new(
            Arc::new(InMemoryLaptopStore::new()),
            Arc::new(DiskImageStore::new(config.image_dir.clone())),
            Arc::new(InMemoryRatingStore::new()),
        )
        .with_max_image_size(config.max_image_size);

        PcbookServer {
            auth: AuthServer::new(users, tokens.clone()),
            tokens,
            laptops,
        }
    }

    pub fn laptops(&self) -> &LaptopServer {
        &self.laptops
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Serves until `shutdown` resolves. In-flight calls are allowed to finish.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        match listener.local_addr() {
            Ok(addr) => info!("start server on {}", addr),
            Err(e) => warn!("cannot read listener address: {}", e),
        }

        Server::builder()
            .layer(AccessLayer::new(self.tokens))
            .add_service(AuthServiceServer::new(self.auth))
            .add_service(LaptopServiceServer::new(self.laptops))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
    }
}
