use crate::chunks::Chunks;
use crate::credentials::CredentialService;
use crate::protocol::catalog::{CreateLaptopRequest, Filter, Laptop, SearchLaptopRequest};
use crate::protocol::stream::{
    upload_image_request::Data, RateLaptopRequest, RateLaptopResponse, UploadImageRequest,
    UploadImageResponse,
};
use crate::protocol::LaptopServiceClient;
use crate::ClientError;
use std::io::Read;
use std::time::Duration;
use tokio_stream::StreamExt;
use tonic::transport::Channel;
use tonic::Request;

/// Size of each image chunk sent to the server
pub const CHUNK_SIZE: usize = 1024;

/// Calls the laptop service. Protected calls carry the cached access token.
#[derive(Clone)]
pub struct LaptopClient {
    client: LaptopServiceClient<CredentialService<Channel>>,
    timeout: Option<Duration>,
}

impl LaptopClient {
    pub fn new(service: CredentialService<Channel>) -> LaptopClient {
        LaptopClient {
            client: LaptopServiceClient::new(service),
            timeout: None,
        }
    }

    /// Gives every call a deadline `timeout` from when it is sent
    pub fn with_timeout(mut self, timeout: Duration) -> LaptopClient {
        self.timeout = Some(timeout);
        self
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        if let Some(timeout) = self.timeout {
            request.set_timeout(timeout);
        }
        request
    }

    /// Returns the ID the server stored the laptop under
    pub async fn create_laptop(&self, laptop: Laptop) -> Result<String, ClientError> {
        let request = self.request(CreateLaptopRequest {
            laptop: Some(laptop),
        });
        let response = self.client.clone().create_laptop(request).await?;
        let id = response.into_inner().id;
        info!("created laptop with id: {}", id);
        Ok(id)
    }

    pub async fn search_laptop(&self, filter: Filter) -> Result<Vec<Laptop>, ClientError> {
        let request = self.request(SearchLaptopRequest {
            filter: Some(filter),
        });
        let mut stream = self.client.clone().search_laptop(request).await?.into_inner();

        let mut laptops = Vec::new();
        while let Some(response) = stream.message().await? {
            if let Some(laptop) = response.laptop {
                debug!("found laptop with id: {}", laptop.id);
                laptops.push(laptop);
            }
        }
        Ok(laptops)
    }

    /// Streams an image in [`CHUNK_SIZE`] pieces. `progress` is called with
    /// the length of each chunk as it is handed to the transport.
    pub async fn upload_image<R, F>(
        &self,
        laptop_id: &str,
        image_type: &str,
        reader: R,
        mut progress: F,
    ) -> Result<UploadImageResponse, ClientError>
    where
        R: Read + Send,
        F: FnMut(usize) + Send + 'static,
    {
        let mut requests = vec![UploadImageRequest::info(laptop_id, image_type)];
        for chunk in Chunks::new(reader, CHUNK_SIZE) {
            requests.push(UploadImageRequest::chunk(chunk?));
        }

        let outbound = tokio_stream::iter(requests).map(move |request| {
            if let Some(Data::ChunkData(chunk)) = &request.data {
                progress(chunk.len());
            }
            request
        });
        let response = self
            .client
            .clone()
            .upload_image(self.request(outbound))
            .await?
            .into_inner();
        info!("image uploaded with id: {}, size: {}", response.id, response.size);
        Ok(response)
    }

    /// Rates `ids[i]` with `scores[i]` over one stream and returns the
    /// server's running averages in order
    pub async fn rate_laptop(
        &self,
        ids: &[String],
        scores: &[f64],
    ) -> Result<Vec<RateLaptopResponse>, ClientError> {
        if ids.len() != scores.len() {
            return Err(ClientError::InvalidArgument(format!(
                "got {} laptop IDs but {} scores",
                ids.len(),
                scores.len()
            )));
        }

        let requests: Vec<RateLaptopRequest> = ids
            .iter()
            .zip(scores)
            .map(|(id, &score)| RateLaptopRequest {
                laptop_id: id.clone(),
                score,
            })
            .collect();
        let mut stream = self
            .client
            .clone()
            .rate_laptop(self.request(tokio_stream::iter(requests)))
            .await?
            .into_inner();

        let mut responses = Vec::new();
        while let Some(response) = stream.message().await? {
            debug!(
                "laptop {} rated {} times, average {:.2}",
                response.laptop_id, response.rated_count, response.average_score
            );
            responses.push(response);
        }
        Ok(responses)
    }
}
