//! # pcbook authentication protocol
//!
//! Exchanging a username and password for a signed access token:
//! * `Login` - Returns a token carrying the user's role, valid for a fixed duration

pub static METHOD_LOGIN: &str = "/pcbook.AuthService/Login";

/// Credentials submitted to `Login`
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

/// A signed token to be sent as bearer metadata on protected calls
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
}
