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

//! # pcbook image streams
//!
//! An image arrives as one `ImageInfo` message naming its laptop, followed by
//! raw chunks. [`ImageUpload`] checks each message against the size ceiling
//! and the call's context, and only a stream that ends cleanly is written to
//! an [`ImageStore`].

#[macro_use]
extern crate log;

use pcbook_protocol as protocol;

mod image;
mod upload;

pub use image::{extension, DiskImageStore, ImageRecord, ImageStore, ImageStoreError};
pub use upload::{ImageUpload, UploadError, UploadState, MAX_IMAGE_SIZE};
