use crate::users::UserError;
use catalog::{CatalogError, ContextError, RatingError};
use streams::UploadError;
use tonic::Status;

/// Every failure that can leave the server, in the caller-facing taxonomy.
/// Store errors are converted here and nowhere else.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("{0}")]
    Unknown(String),
    #[error("{0}")]
    Internal(String),
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        let message = format!("cannot save laptop to the store: {}", err);
        match err {
            CatalogError::InvalidId(_) => ServiceError::InvalidArgument(message),
            CatalogError::AlreadyExists(_) => ServiceError::AlreadyExists(message),
            CatalogError::Poisoned => ServiceError::Internal(message),
        }
    }
}

impl From<RatingError> for ServiceError {
    fn from(err: RatingError) -> Self {
        let message = format!("cannot rate laptop: {}", err);
        match err {
            RatingError::LengthMismatch { .. } | RatingError::InvalidScore(_) => {
                ServiceError::InvalidArgument(message)
            }
            RatingError::Poisoned => ServiceError::Internal(message),
        }
    }
}

impl From<UploadError> for ServiceError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        match err {
            UploadError::MissingInfo
            | UploadError::MalformedInfo(_)
            | UploadError::DuplicateInfo
            | UploadError::EmptyMessage
            | UploadError::LaptopNotFound(_)
            | UploadError::TooLarge { .. } => ServiceError::InvalidArgument(message),
            UploadError::Receive(_) => ServiceError::Unknown(message),
            UploadError::Context(e) => ServiceError::Context(e),
            UploadError::Catalog(_) | UploadError::Store(_) | UploadError::Closed => {
                ServiceError::Internal(message)
            }
        }
    }
}

impl From<UserError> for ServiceError {
    fn from(err: UserError) -> Self {
        let message = err.to_string();
        match err {
            UserError::AlreadyExists(_) => ServiceError::AlreadyExists(message),
            UserError::UnknownRole(_) => ServiceError::InvalidArgument(message),
            UserError::Hash(_) | UserError::Poisoned => ServiceError::Internal(message),
        }
    }
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::InvalidArgument(_) => Status::invalid_argument(message),
            ServiceError::AlreadyExists(_) => Status::already_exists(message),
            ServiceError::NotFound(_) => Status::not_found(message),
            ServiceError::Unauthenticated(_) => Status::unauthenticated(message),
            ServiceError::PermissionDenied(_) => Status::permission_denied(message),
            ServiceError::Context(ContextError::Canceled) => Status::cancelled(message),
            ServiceError::Context(ContextError::DeadlineExceeded) => Status::deadline_exceeded(message),
            ServiceError::Unknown(_) => Status::unknown(message),
            ServiceError::Internal(_) => Status::internal(message),
        }
    }
}
