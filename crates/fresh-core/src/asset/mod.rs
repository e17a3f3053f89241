// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The contracts of the asset pipeline.
//!
//! An asset is an object whose contents come from outside the engine (a
//! texture, a sound, a mesh). Each asset is populated by an [`AssetLoader`],
//! itself an object, which knows where the data lives. This module only
//! defines the contracts; the packages that wire assets to loaders live in
//! the `fresh-assets` crate.
//!
//! Both contracts are reached from an erased [`Object`] through
//! [`Object::as_asset`] and [`Object::as_asset_loader`], so concrete types
//! must override the matching hook to return `Some(self)`.

mod loader;

pub use loader::*;

use crate::object::Object;

/// An object loaded from external data.
pub trait Asset: Object {
    /// The memory the asset occupies, in bytes.
    ///
    /// This is what asset packages reclaim when they release unused assets.
    fn memory_size(&self) -> usize;

    /// Returns `true` once the asset's contents are available.
    fn is_loaded(&self) -> bool {
        true
    }
}
