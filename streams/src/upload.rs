use crate::image::{ImageRecord, ImageStore, ImageStoreError};
use crate::protocol::stream::{upload_image_request::Data, ImageInfo, UploadImageRequest};
use catalog::{CatalogError, Context, ContextError, LaptopStore};
use std::mem;

/// Largest image accepted by default: 1 MiB
pub const MAX_IMAGE_SIZE: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload must start with image info")]
    MissingInfo,
    #[error("image info is malformed: {0}")]
    MalformedInfo(String),
    #[error("image info was already received")]
    DuplicateInfo,
    #[error("upload message carries neither image info nor chunk data")]
    EmptyMessage,
    #[error("laptop {0} doesn't exist")]
    LaptopNotFound(String),
    #[error("image is too large: {size} > {max}")]
    TooLarge { size: usize, max: usize },
    #[error("cannot receive chunk data: {0}")]
    Receive(String),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("cannot find laptop: {0}")]
    Catalog(#[from] CatalogError),
    #[error("cannot save image to the store: {0}")]
    Store(#[from] ImageStoreError),
    #[error("upload is already finished")]
    Closed,
}

/// Where an upload stands. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    AwaitingMetadata,
    ReceivingChunks {
        laptop_id: String,
        image_type: String,
        data: Vec<u8>,
    },
    Finalizing {
        laptop_id: String,
        size: usize,
    },
    Done {
        image_id: String,
        size: usize,
    },
    Failed {
        reason: String,
    },
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Done { .. } | UploadState::Failed { .. })
    }
}

/// Assembles one image from the messages of one upload call. Owned by the
/// handler of that call, so it needs no locking.
pub struct ImageUpload<'a> {
    laptops: &'a dyn LaptopStore,
    max_size: usize,
    state: UploadState,
}

impl<'a> ImageUpload<'a> {
    pub fn new(laptops: &'a dyn LaptopStore, max_size: usize) -> ImageUpload<'a> {
        ImageUpload {
            laptops,
            max_size,
            state: UploadState::AwaitingMetadata,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Bytes accepted so far
    pub fn size(&self) -> usize {
        match &self.state {
            UploadState::ReceivingChunks { data, .. } => data.len(),
            UploadState::Finalizing { size, .. } | UploadState::Done { size, .. } => *size,
            _ => 0,
        }
    }

    /// Drives the state machine with the next inbound message
    pub fn receive(&mut self, ctx: &Context, msg: UploadImageRequest) -> Result<(), UploadError> {
        let next = match self.take_state() {
            UploadState::AwaitingMetadata => self.accept_info(msg),
            UploadState::ReceivingChunks {
                laptop_id,
                image_type,
                data,
            } => self.accept_chunk(ctx, laptop_id, image_type, data, msg),
            terminal => {
                self.state = terminal;
                return Err(UploadError::Closed);
            }
        };
        match next {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Fails the upload unless its context is still live. Called before
    /// waiting on the next message.
    pub fn ensure_active(&mut self, ctx: &Context) -> Result<(), UploadError> {
        if self.state.is_terminal() {
            return Err(UploadError::Closed);
        }
        ctx.err().map_err(|e| self.fail(e.into()))
    }

    /// Fails the upload with an error raised outside the state machine, such
    /// as a broken transport
    pub fn abort(&mut self, err: UploadError) -> UploadError {
        self.fail(err)
    }

    /// Ends the stream: writes the accumulated bytes to `images` under a new
    /// image ID. Nothing is written unless every chunk was accepted.
    pub fn finish(&mut self, ctx: &Context, images: &dyn ImageStore) -> Result<ImageRecord, UploadError> {
        let (laptop_id, image_type, data) = match self.take_state() {
            UploadState::ReceivingChunks {
                laptop_id,
                image_type,
                data,
            } => (laptop_id, image_type, data),
            UploadState::AwaitingMetadata => return Err(self.fail(UploadError::MissingInfo)),
            terminal => {
                self.state = terminal;
                return Err(UploadError::Closed);
            }
        };
        if let Err(e) = ctx.err() {
            return Err(self.fail(e.into()));
        }

        self.state = UploadState::Finalizing {
            laptop_id: laptop_id.clone(),
            size: data.len(),
        };
        match images.save(&laptop_id, &image_type, &data) {
            Ok(record) => {
                self.state = UploadState::Done {
                    image_id: record.id.clone(),
                    size: record.size,
                };
                Ok(record)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    fn accept_info(&self, msg: UploadImageRequest) -> Result<UploadState, UploadError> {
        let ImageInfo { laptop_id, image_type } = match msg.data {
            Some(Data::Info(info)) => info,
            Some(Data::ChunkData(_)) => return Err(UploadError::MissingInfo),
            None => return Err(UploadError::EmptyMessage),
        };
        if laptop_id.is_empty() {
            return Err(UploadError::MalformedInfo("laptop ID is empty".to_string()));
        }
        if self.laptops.find(&laptop_id)?.is_none() {
            return Err(UploadError::LaptopNotFound(laptop_id));
        }

        info!("receive an upload-image request for laptop {} with image type {}", laptop_id, image_type);
        Ok(UploadState::ReceivingChunks {
            laptop_id,
            image_type,
            data: Vec::new(),
        })
    }

    fn accept_chunk(
        &self,
        ctx: &Context,
        laptop_id: String,
        image_type: String,
        mut data: Vec<u8>,
        msg: UploadImageRequest,
    ) -> Result<UploadState, UploadError> {
        ctx.err()?;
        let chunk = match msg.data {
            Some(Data::ChunkData(chunk)) => chunk,
            Some(Data::Info(_)) => return Err(UploadError::DuplicateInfo),
            None => return Err(UploadError::EmptyMessage),
        };

        let size = data.len() + chunk.len();
        if size > self.max_size {
            return Err(UploadError::TooLarge {
                size,
                max: self.max_size,
            });
        }
        debug!("received a chunk with size: {}", chunk.len());
        data.extend_from_slice(&chunk);
        Ok(UploadState::ReceivingChunks {
            laptop_id,
            image_type,
            data,
        })
    }

    fn take_state(&mut self) -> UploadState {
        mem::replace(
            &mut self.state,
            UploadState::Failed {
                reason: "upload interrupted".to_string(),
            },
        )
    }

    fn fail(&mut self, err: UploadError) -> UploadError {
        warn!("upload failed: {}", err);
        self.state = UploadState::Failed {
            reason: err.to_string(),
        };
        err
    }
}
