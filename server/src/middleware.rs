//! Per-method access control.
//!
//! [`AccessLayer`] wraps the whole router, so it sees every call exactly once,
//! before the first message of a stream is decoded. Methods missing from
//! [`accessible_roles`] are public.

use crate::auth::{TokenManager, UserClaims};
use crate::error::ServiceError;
use crate::protocol::{catalog, stream};
use crate::users::Role;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::codegen::http::{header::AUTHORIZATION, HeaderMap, Request, Response};
use tonic::Status;

lazy_static! {
    static ref ACCESSIBLE_ROLES: HashMap<&'static str, Vec<Role>> = {
        let mut roles = HashMap::new();
        roles.insert(catalog::METHOD_CREATE_LAPTOP, vec![Role::Admin]);
        roles.insert(stream::METHOD_UPLOAD_IMAGE, vec![Role::Admin]);
        roles.insert(stream::METHOD_RATE_LAPTOP, vec![Role::Admin, Role::User]);
        roles
    };
}

/// Roles allowed to call each protected method
pub fn accessible_roles() -> &'static HashMap<&'static str, Vec<Role>> {
    &ACCESSIBLE_ROLES
}

/// Checks one call against the role table. Returns the caller's claims for a
/// protected method, `None` for a public one.
pub fn authorize(
    tokens: &TokenManager,
    method: &str,
    headers: &HeaderMap,
) -> Result<Option<UserClaims>, ServiceError> {
    let roles = match accessible_roles().get(method) {
        Some(roles) => roles,
        None => return Ok(None),
    };

    let token = bearer_token(headers).ok_or_else(|| {
        ServiceError::Unauthenticated("authorization token is not provided".to_string())
    })?;
    let claims = tokens
        .verify(token)
        .map_err(|e| ServiceError::Unauthenticated(format!("access token is invalid: {}", e)))?;

    if !roles.contains(&claims.role) {
        return Err(ServiceError::PermissionDenied(
            "no permission to access this RPC".to_string(),
        ));
    }
    Ok(Some(claims))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[derive(Clone)]
pub struct AccessLayer {
    tokens: Arc<TokenManager>,
}

impl AccessLayer {
    pub fn new(tokens: Arc<TokenManager>) -> AccessLayer {
        AccessLayer { tokens }
    }
}

impl<S> tower::Layer<S> for AccessLayer {
    type Service = AccessService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessService {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

/// Rejects calls the role table doesn't allow, and hands the verified
/// [`UserClaims`] to handlers through the request extensions.
#[derive(Clone)]
pub struct AccessService<S> {
    inner: S,
    tokens: Arc<TokenManager>,
}

impl<S, ReqBody, ResBody> tower::Service<Request<ReqBody>> for AccessService<S>
where
    S: tower::Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let method = request.uri().path().to_string();
        match authorize(&self.tokens, &method, request.headers()) {
            Ok(claims) => {
                if let Some(claims) = claims {
                    debug!("{} called by {} ({})", method, claims.sub, claims.role);
                    request.extensions_mut().insert(claims);
                }
                Box::pin(self.inner.call(request))
            }
            Err(e) => {
                warn!("rejected call to {}: {}", method, e);
                let response = Status::from(e).into_http();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::auth;
    use crate::users::test::TEST_COST;
    use crate::users::User;
    use std::convert::Infallible;
    use std::time::Duration;
    use tonic::codegen::http::HeaderValue;
    use tonic::Code;
    use tower::{service_fn, Layer, ServiceExt};

    fn manager() -> Arc<TokenManager> {
        Arc::new(TokenManager::new(b"secret", Duration::from_secs(60)))
    }

    fn token_for(tokens: &TokenManager, role: Role) -> String {
        let user = User::with_cost("someone", "pw", role, TEST_COST).unwrap();
        tokens.generate(&user).unwrap()
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn public_methods_need_no_token() {
        let tokens = manager();
        for method in [auth::METHOD_LOGIN, catalog::METHOD_SEARCH_LAPTOP].iter() {
            assert!(authorize(&tokens, method, &HeaderMap::new()).unwrap().is_none());
        }
    }

    #[test]
    fn missing_token_is_unauthenticated() {
        let tokens = manager();
        let err = authorize(&tokens, catalog::METHOD_CREATE_LAPTOP, &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(ref m) if m == "authorization token is not provided"));
    }

    #[test]
    fn bad_token_is_unauthenticated() {
        let tokens = manager();
        let err = authorize(&tokens, stream::METHOD_RATE_LAPTOP, &headers_with("Bearer nonsense")).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(ref m) if m.starts_with("access token is invalid")));
    }

    #[test]
    fn user_cannot_call_admin_method() {
        let tokens = manager();
        let token = token_for(&tokens, Role::User);
        let headers = headers_with(&format!("Bearer {}", token));

        let err = authorize(&tokens, stream::METHOD_UPLOAD_IMAGE, &headers).unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let claims = authorize(&tokens, stream::METHOD_RATE_LAPTOP, &headers).unwrap().unwrap();
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn bare_token_is_accepted() {
        let tokens = manager();
        let token = token_for(&tokens, Role::Admin);
        let claims = authorize(&tokens, catalog::METHOD_CREATE_LAPTOP, &headers_with(&token))
            .unwrap()
            .unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    fn request(method: &str, token: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri(method);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(()).unwrap()
    }

    fn grpc_status(response: &Response<String>) -> Option<Code> {
        response
            .headers()
            .get("grpc-status")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i32>().ok())
            .map(Code::from)
    }

    #[tokio::test]
    async fn layer_rejects_before_handler() {
        let tokens = manager();
        let handler = service_fn(|_req: Request<()>| async {
            Ok::<_, Infallible>(Response::new("reached".to_string()))
        });
        let service = AccessLayer::new(tokens.clone()).layer(handler);

        let response = service
            .clone()
            .oneshot(request(catalog::METHOD_CREATE_LAPTOP, None))
            .await
            .unwrap();
        assert_eq!(grpc_status(&response), Some(Code::Unauthenticated));
        assert_eq!(response.body(), "");

        let user = token_for(&tokens, Role::User);
        let response = service
            .oneshot(request(catalog::METHOD_CREATE_LAPTOP, Some(&user)))
            .await
            .unwrap();
        assert_eq!(grpc_status(&response), Some(Code::PermissionDenied));
    }

    #[tokio::test]
    async fn layer_passes_claims_to_handler() {
        let tokens = manager();
        let handler = service_fn(|req: Request<()>| async move {
            let who = req
                .extensions()
                .get::<UserClaims>()
                .map(|c| c.role.to_string())
                .unwrap_or_else(|| "anonymous".to_string());
            Ok::<_, Infallible>(Response::new(who))
        });
        let service = AccessLayer::new(tokens.clone()).layer(handler);

        let admin = token_for(&tokens, Role::Admin);
        let response = service
            .clone()
            .oneshot(request(catalog::METHOD_CREATE_LAPTOP, Some(&admin)))
            .await
            .unwrap();
        assert_eq!(response.body(), "admin");

        let response = service
            .oneshot(request(catalog::METHOD_SEARCH_LAPTOP, None))
            .await
            .unwrap();
        assert_eq!(response.body(), "anonymous");
    }
}
