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

#[macro_use]
extern crate serde_derive;

pub mod auth;
pub mod catalog;
pub mod stream;

/// Generated tonic clients and servers for `pcbook.AuthService` and `pcbook.LaptopService`
pub mod services {
    #![allow(clippy::all)]
    include!(concat!(env!("OUT_DIR"), "/pcbook.AuthService.rs"));
    include!(concat!(env!("OUT_DIR"), "/pcbook.LaptopService.rs"));
}

pub use services::auth_service_client::AuthServiceClient;
pub use services::auth_service_server::{AuthService, AuthServiceServer};
pub use services::laptop_service_client::LaptopServiceClient;
pub use services::laptop_service_server::{LaptopService, LaptopServiceServer};
