//! # pcbook streaming protocol
//!
//! Operations that carry more than one message in the request direction:
//! * `UploadImage` - Send an image for a laptop as one info message followed by raw chunks
//! * `RateLaptop` - Send scores for laptops, receiving the running average for each

pub static METHOD_UPLOAD_IMAGE: &str = "/pcbook.LaptopService/UploadImage";
pub static METHOD_RATE_LAPTOP: &str = "/pcbook.LaptopService/RateLaptop";

/// Identifies the laptop an upload belongs to, and what kind of image it is
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageInfo {
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    /// Either a file extension (`.jpg`) or a MIME type (`image/jpeg`)
    #[prost(string, tag = "2")]
    pub image_type: String,
}

/// A single message of an upload. The first carries `Info`, the rest `ChunkData`.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadImageRequest {
    #[prost(oneof = "upload_image_request::Data", tags = "1, 2")]
    pub data: Option<upload_image_request::Data>,
}

pub mod upload_image_request {
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    pub enum Data {
        #[prost(message, tag = "1")]
        Info(super::ImageInfo),
        #[prost(bytes = "vec", tag = "2")]
        ChunkData(Vec<u8>),
    }
}

impl UploadImageRequest {
    pub fn info(laptop_id: &str, image_type: &str) -> UploadImageRequest {
        UploadImageRequest {
            data: Some(upload_image_request::Data::Info(ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
            })),
        }
    }

    pub fn chunk(bytes: Vec<u8>) -> UploadImageRequest {
        UploadImageRequest {
            data: Some(upload_image_request::Data::ChunkData(bytes)),
        }
    }
}

/// Terminal response of an upload
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadImageResponse {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(uint32, tag = "2")]
    pub size: u32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLaptopRequest {
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    #[prost(double, tag = "2")]
    pub score: f64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLaptopResponse {
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    #[prost(uint32, tag = "2")]
    pub rated_count: u32,
    #[prost(double, tag = "3")]
    pub average_score: f64,
}
