use crate::credentials::Authenticator;
use crate::protocol::auth::LoginRequest;
use crate::protocol::AuthServiceClient;
use crate::ClientError;
use tonic::transport::Channel;

/// Logs in to the auth service with a fixed username and password
#[derive(Clone)]
pub struct AuthClient {
    client: AuthServiceClient<Channel>,
    username: String,
    password: String,
}

impl AuthClient {
    pub fn new(channel: Channel, username: &str, password: &str) -> AuthClient {
        AuthClient {
            client: AuthServiceClient::new(channel),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for AuthClient {
    async fn login(&self) -> Result<String, ClientError> {
        let request = LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        let response = self.client.clone().login(request).await?;
        Ok(response.into_inner().access_token)
    }
}
