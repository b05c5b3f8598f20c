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

//! # pcbook catalog
//!
//! The concurrent, volatile stores behind the laptop service:
//! * [`InMemoryLaptopStore`] - laptops keyed by UUID, with filtered search
//! * [`InMemoryRatingStore`] - running score totals per laptop
//!
//! Both guard their map with a single lock held for one read or write, and
//! copy records in and out so callers never alias store state.

#[macro_use]
extern crate log;

use pcbook_protocol as protocol;

mod catalog;
mod context;
mod rating;
pub mod search;

pub use crate::catalog::{CatalogError, InMemoryLaptopStore, LaptopStore};
pub use context::{Context, ContextError};
pub use rating::{InMemoryRatingStore, Rating, RatingError, RatingResult, RatingStore};
