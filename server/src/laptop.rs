use crate::context::call_context;
use crate::error::ServiceError;
use crate::protocol::catalog::{
    CreateLaptopRequest, CreateLaptopResponse, Laptop, SearchLaptopRequest, SearchLaptopResponse,
};
use crate::protocol::stream::{
    RateLaptopRequest, RateLaptopResponse, UploadImageRequest, UploadImageResponse,
};
use crate::protocol::LaptopService;
use catalog::{Context, ContextError, InMemoryLaptopStore, LaptopStore, RatingStore};
use std::sync::Arc;
use streams::{ImageRecord, ImageStore, ImageUpload, UploadError, MAX_IMAGE_SIZE};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use uuid::Uuid;

const STREAM_BUFFER: usize = 4;

fn upload_response(record: ImageRecord) -> Result<UploadImageResponse, ServiceError> {
    let size = u32::try_from(record.size).map_err(|_| {
        ServiceError::Internal(format!("image size {} does not fit the response", record.size))
    })?;
    Ok(UploadImageResponse {
        id: record.id,
        size,
    })
}

/// Handlers for the laptop service. Clones share the same stores.
#[derive(Clone)]
pub struct LaptopServer {
    laptops: Arc<InMemoryLaptopStore>,
    images: Arc<dyn ImageStore>,
    ratings: Arc<dyn RatingStore>,
    max_image_size: usize,
}

impl LaptopServer {
    pub fn new(
        laptops: Arc<InMemoryLaptopStore>,
        images: Arc<dyn ImageStore>,
        ratings: Arc<dyn RatingStore>,
    ) -> LaptopServer {
        LaptopServer {
            laptops,
            images,
            ratings,
            max_image_size: MAX_IMAGE_SIZE,
        }
    }

    pub fn with_max_image_size(mut self, max_image_size: usize) -> LaptopServer {
        self.max_image_size = max_image_size;
        self
    }

    pub fn laptops(&self) -> &Arc<InMemoryLaptopStore> {
        &self.laptops
    }

    pub fn images(&self) -> &Arc<dyn ImageStore> {
        &self.images
    }

    pub fn ratings(&self) -> &Arc<dyn RatingStore> {
        &self.ratings
    }

    /// Stores a new laptop, assigning a random ID when it has none
    pub fn create(&self, ctx: &Context, laptop: Option<Laptop>) -> Result<String, ServiceError> {
        let mut laptop =
            laptop.ok_or_else(|| ServiceError::InvalidArgument("laptop is missing".to_string()))?;

        if laptop.id.is_empty() {
            laptop.id = Uuid::new_v4().to_string();
        } else if let Err(e) = Uuid::parse_str(&laptop.id) {
            return Err(ServiceError::InvalidArgument(format!(
                "laptop ID is not a valid UUID: {}",
                e
            )));
        }

        ctx.err()?;
        self.laptops.save(&laptop)?;
        info!("saved laptop with id: {}", laptop.id);
        Ok(laptop.id)
    }

    /// Applies one score and reports the laptop's new totals
    pub fn rate(&self, ctx: &Context, request: RateLaptopRequest) -> Result<RateLaptopResponse, ServiceError> {
        ctx.err()?;
        let RateLaptopRequest { laptop_id, score } = request;
        debug!("received a rate-laptop request: id = {}, score = {:.2}", laptop_id, score);

        let found = self
            .laptops
            .find(&laptop_id)
            .map_err(|e| ServiceError::Internal(format!("cannot find laptop: {}", e)))?;
        if found.is_none() {
            return Err(ServiceError::NotFound(format!("laptop {} is not found", laptop_id)));
        }

        let results = self.ratings.add(&[laptop_id.clone()], &[score])?;
        let rating = results
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal("rating store returned no result".to_string()))?;
        Ok(RateLaptopResponse {
            laptop_id,
            rated_count: rating.count,
            average_score: rating.average,
        })
    }
}

#[tonic::async_trait]
impl LaptopService for LaptopServer {
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let ctx = call_context(request.metadata());
        let laptop = request.into_inner().laptop;
        info!(
            "receive a create-laptop request with id: {}",
            laptop.as_ref().map(|l| l.id.as_str()).unwrap_or("")
        );

        match self.create(&ctx, laptop) {
            Ok(id) => Ok(Response::new(CreateLaptopResponse { id })),
            Err(e) => {
                warn!("cannot create laptop: {}", e);
                Err(e.into())
            }
        }
    }

    type SearchLaptopStream = ReceiverStream<Result<SearchLaptopResponse, Status>>;

    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let ctx = call_context(request.metadata());
        let filter = request.into_inner().filter.unwrap_or_default();
        info!("receive a search-laptop request with filter: {:?}", filter);

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let laptops = self.laptops.clone();
        tokio::task::spawn_blocking(move || {
            let result = laptops.search(&ctx, &filter, |laptop| {
                debug!("found laptop with id: {}", laptop.id);
                let response = SearchLaptopResponse { laptop: Some(laptop) };
                tx.blocking_send(Ok(response)).map_err(|_| {
                    // Nobody is reading anymore.
                    ctx.cancel();
                    ServiceError::Context(ContextError::Canceled)
                })
            });
            if let Err(e) = result {
                warn!("search stopped: {}", e);
                let _ = tx.blocking_send(Err(e.into()));
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let ctx = call_context(request.metadata());
        let mut stream = request.into_inner();
        let mut upload = ImageUpload::new(self.laptops.as_ref(), self.max_image_size);

        loop {
            upload.ensure_active(&ctx).map_err(ServiceError::from)?;
            match stream.message().await {
                Ok(Some(message)) => upload.receive(&ctx, message).map_err(ServiceError::from)?,
                Ok(None) => {
                    debug!("no more data");
                    break;
                }
                Err(status) => {
                    let err = upload.abort(UploadError::Receive(status.message().to_string()));
                    return Err(ServiceError::from(err).into());
                }
            }
        }

        let record = upload
            .finish(&ctx, self.images.as_ref())
            .map_err(ServiceError::from)?;
        info!("saved image with id: {}, size: {}", record.id, record.size);

        Ok(Response::new(upload_response(record)?))
    }

    type RateLaptopStream = ReceiverStream<Result<RateLaptopResponse, Status>>;

    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        let ctx = call_context(request.metadata());
        let mut stream = request.into_inner();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let server = self.clone();

        tokio::spawn(async move {
            loop {
                if let Err(e) = ctx.err() {
                    let _ = tx.send(Err(ServiceError::from(e).into())).await;
                    break;
                }
                let request = match stream.message().await {
                    Ok(Some(request)) => request,
                    Ok(None) => {
                        debug!("no more data");
                        break;
                    }
                    Err(status) => {
                        warn!("cannot receive rate request: {}", status.message());
                        let err = ServiceError::Unknown(format!(
                            "cannot receive stream request: {}",
                            status.message()
                        ));
                        let _ = tx.send(Err(err.into())).await;
                        break;
                    }
                };

                match server.rate(&ctx, request) {
                    Ok(response) => {
                        if tx.send(Ok(response)).await.is_err() {
                            ctx.cancel();
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("cannot rate laptop: {}", e);
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::catalog::{memory::Unit, Cpu, Filter, Memory};
    use catalog::InMemoryRatingStore;
    use streams::DiskImageStore;
    use tokio_stream::StreamExt;
    use tonic::Code;

    fn server(dir: &tempfile::TempDir) -> LaptopServer {
        LaptopServer::new(
            Arc::new(InMemoryLaptopStore::new()),
            Arc::new(DiskImageStore::new(dir.path())),
            Arc::new(InMemoryRatingStore::new()),
        )
    }

    fn laptop(price: f64, cores: u32) -> Laptop {
        Laptop {
            brand: "Lenovo".to_string(),
            name: "Thinkpad X1".to_string(),
            cpu: Some(Cpu {
                number_cores: cores,
                min_ghz: 2.5,
                max_ghz: 4.5,
                ..Default::default()
            }),
            ram: Some(Memory {
                value: 16,
                unit: Unit::Gigabyte as i32,
            }),
            price_usd: price,
            ..Default::default()
        }
    }

    #[test]
    fn upload_size_beyond_u32_is_internal() {
        let record = |size| ImageRecord {
            id: "img-1".to_string(),
            laptop_id: "laptop-1".to_string(),
            image_type: "png".to_string(),
            path: "img/img-1.png".into(),
            size,
        };

        assert_eq!(upload_response(record(2500)).unwrap().size, 2500);
        let status = Status::from(upload_response(record(u32::MAX as usize + 1)).unwrap_err());
        assert_eq!(status.code(), Code::Internal);
    }

    #[test]
    fn create_assigns_missing_id() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);

        let id = server.create(&Context::background(), Some(laptop(1000.0, 4))).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(server.laptops().find(&id).unwrap().unwrap().brand, "Lenovo");
    }

    #[test]
    fn create_rejects_bad_and_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let ctx = Context::background();

        let mut bad = laptop(1000.0, 4);
        bad.id = "invalid-uuid".to_string();
        assert!(matches!(server.create(&ctx, Some(bad)), Err(ServiceError::InvalidArgument(_))));

        let mut first = laptop(1000.0, 4);
        first.id = Uuid::new_v4().to_string();
        server.create(&ctx, Some(first.clone())).unwrap();
        assert!(matches!(server.create(&ctx, Some(first)), Err(ServiceError::AlreadyExists(_))));

        assert!(matches!(server.create(&ctx, None), Err(ServiceError::InvalidArgument(_))));
    }

    #[test]
    fn create_checks_context_before_saving() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let ctx = Context::background();
        ctx.cancel();

        let err = server.create(&ctx, Some(laptop(1000.0, 4))).unwrap_err();
        assert!(matches!(err, ServiceError::Context(ContextError::Canceled)));
        assert!(server.laptops().is_empty().unwrap());
    }

    #[test]
    fn rate_unknown_laptop_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let request = RateLaptopRequest {
            laptop_id: Uuid::new_v4().to_string(),
            score: 5.0,
        };

        let err = server.rate(&Context::background(), request).unwrap_err();
        assert_eq!(Status::from(err).code(), Code::NotFound);
    }

    #[test]
    fn rate_reports_running_average() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let ctx = Context::background();
        let id = server.create(&ctx, Some(laptop(1000.0, 4))).unwrap();

        let rate = |score| RateLaptopRequest {
            laptop_id: id.clone(),
            score,
        };
        server.rate(&ctx, rate(4.0)).unwrap();
        let response = server.rate(&ctx, rate(2.0)).unwrap();
        assert_eq!(response.rated_count, 2);
        assert!((response.average_score - 3.0).abs() < 1e-9);

        let err = server.rate(&ctx, rate(f64::NAN)).unwrap_err();
        assert_eq!(Status::from(err).code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn create_laptop_requires_valid_id() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let mut bad = laptop(1000.0, 4);
        bad.id = "not-a-uuid".to_string();

        let status = server
            .create_laptop(Request::new(CreateLaptopRequest { laptop: Some(bad) }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn search_streams_matching_laptops() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let ctx = Context::background();
        let cheap = server.create(&ctx, Some(laptop(2999.0, 4))).unwrap();
        server.create(&ctx, Some(laptop(3001.0, 4))).unwrap();
        server.create(&ctx, Some(laptop(1500.0, 2))).unwrap();

        let filter = Filter {
            max_price_usd: 3000.0,
            min_cpu_cores: 4,
            min_cpu_ghz: 2.5,
            min_ram: Some(Memory {
                value: 8,
                unit: Unit::Gigabyte as i32,
            }),
        };
        let response = server
            .search_laptop(Request::new(SearchLaptopRequest { filter: Some(filter) }))
            .await
            .unwrap();

        let found: Vec<String> = response
            .into_inner()
            .map(|r| r.unwrap().laptop.unwrap().id)
            .collect()
            .await;
        assert_eq!(found, vec![cheap]);
    }
}
