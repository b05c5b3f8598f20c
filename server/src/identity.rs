use crate::auth::TokenManager;
use crate::error::ServiceError;
use crate::protocol::auth::{LoginRequest, LoginResponse};
use crate::protocol::AuthService;
use crate::users::UserStore;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Exchanges a username and password for an access token
pub struct AuthServer {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenManager>,
}

impl AuthServer {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenManager>) -> AuthServer {
        AuthServer { users, tokens }
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let user = self
            .users
            .find(username)
            .map_err(|e| ServiceError::Internal(format!("cannot find user: {}", e)))?;

        // Unknown user and wrong password are indistinguishable to the caller.
        let user = match user {
            Some(user) if user.is_correct_password(password) => user,
            _ => {
                return Err(ServiceError::NotFound(
                    "incorrect username/password".to_string(),
                ))
            }
        };

        self.tokens
            .generate(&user)
            .map_err(|e| ServiceError::Internal(format!("cannot generate access token: {}", e)))
    }
}

#[tonic::async_trait]
impl AuthService for AuthServer {
    async fn login(&self, request: Request<LoginRequest>) -> Result<Response<LoginResponse>, Status> {
        let LoginRequest { username, password } = request.into_inner();
        info!("receive a login request for user {}", username);

        match self.authenticate(&username, &password) {
            Ok(access_token) => Ok(Response::new(LoginResponse { access_token })),
            Err(e) => {
                warn!("login failed for user {}: {}", username, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::users::test::TEST_COST;
    use crate::users::{seed_users, InMemoryUserStore, Role};
    use std::time::Duration;
    use tonic::Code;

    fn server() -> (AuthServer, Arc<TokenManager>) {
        let users = InMemoryUserStore::new();
        seed_users(&users, TEST_COST).unwrap();
        let tokens = Arc::new(TokenManager::new(b"secret", Duration::from_secs(60)));
        (AuthServer::new(Arc::new(users), tokens.clone()), tokens)
    }

    #[tokio::test]
    async fn correct_password_gets_token() {
        let (server, tokens) = server();
        let response = AuthService::login(
            &server,
            Request::new(LoginRequest {
                username: "user1".to_string(),
                password: "secret".to_string(),
            }),
        )
        .await
        .unwrap();

        let claims = tokens.verify(&response.into_inner().access_token).unwrap();
        assert_eq!(claims.sub, "user1");
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_alike() {
        let (server, _) = server();
        for (username, password) in [("admin1", "wrong"), ("nobody", "secret")].iter() {
            let status = AuthService::login(
                &server,
                Request::new(LoginRequest {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
            )
            .await
            .unwrap_err();
            assert_eq!(status.code(), Code::NotFound);
            assert_eq!(status.message(), "incorrect username/password");
        }
    }
}
