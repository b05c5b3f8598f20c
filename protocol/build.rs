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

//! Generates the tonic client/server stubs for the pcbook services.
//!
//! The message types are declared by hand in `src/` (prost derives), so the
//! services are described with the manual builder and no `protoc` is needed.

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic_prost::ProstCodec";

fn method(
    name: &str,
    route: &str,
    input: &str,
    output: &str,
    client_streaming: bool,
    server_streaming: bool,
) -> Method {
    let mut builder = Method::builder()
        .name(name)
        .route_name(route)
        .input_type(input)
        .output_type(output)
        .codec_path(CODEC);
    if client_streaming {
        builder = builder.client_streaming();
    }
    if server_streaming {
        builder = builder.server_streaming();
    }
    builder.build()
}

fn main() {
    let auth = Service::builder()
        .name("AuthService")
        .package("pcbook")
        .method(method(
            "login",
            "Login",
            "crate::auth::LoginRequest",
            "crate::auth::LoginResponse",
            false,
            false,
        ))
        .build();

    let laptop = Service::builder()
        .name("LaptopService")
        .package("pcbook")
        .method(method(
            "create_laptop",
            "CreateLaptop",
            "crate::catalog::CreateLaptopRequest",
            "crate::catalog::CreateLaptopResponse",
            false,
            false,
        ))
        .method(method(
            "search_laptop",
            "SearchLaptop",
            "crate::catalog::SearchLaptopRequest",
            "crate::catalog::SearchLaptopResponse",
            false,
            true,
        ))
        .method(method(
            "upload_image",
            "UploadImage",
            "crate::stream::UploadImageRequest",
            "crate::stream::UploadImageResponse",
            true,
            false,
        ))
        .method(method(
            "rate_laptop",
            "RateLaptop",
            "crate::stream::RateLaptopRequest",
            "crate::stream::RateLaptopResponse",
            true,
            true,
        ))
        .build();

    Builder::new().compile(&[auth, laptop]);
}
