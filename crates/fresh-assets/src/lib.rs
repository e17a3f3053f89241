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

//! # Fresh Assets
//!
//! Asset packages: packages that create a missing asset on request by
//! resolving a loader for its class and letting the loader populate it.
//!
//! Each [`AssetPackage`] owns an [`AssetLoaderPackage`] holding one loader
//! per asset. Loaders come from an [`AssetDatabase`] or are synthesised on
//! demand. Call [`register_classes`] (or [`AssetPackage::create`], which
//! does so) before loading manifests that mention these package classes.

#![warn(missing_docs)]

pub mod asset_package;
pub mod database;
pub mod loader_package;
pub mod report;

pub use asset_package::{AssetPackage, AssetPackageBehavior, ASSET_PACKAGE_CLASS};
pub use database::{AssetDatabase, ClassMap};
pub use loader_package::{
    resolve_loader_class, AssetLoaderPackage, LoaderPackageBehavior, ASSET_LOADER_PACKAGE_CLASS,
};
pub use report::{byte_count_string, dump_asset_report};

use fresh_core::object::PACKAGE_CLASS;
use fresh_core::{register_class, ObjectRef, Package, Result};
use std::rc::Rc;

/// Registers the `AssetLoaderPackage` and `AssetPackage` classes with the
/// current thread's class registry. Repeated calls keep the first
/// registration.
pub fn register_classes() -> Result<()> {
    let loader_package_class = register_class(ASSET_LOADER_PACKAGE_CLASS, PACKAGE_CLASS, |core| {
        Rc::new(Package::from_core(core, Box::new(LoaderPackageBehavior::default()))) as ObjectRef
    })?;
    register_class(ASSET_PACKAGE_CLASS, PACKAGE_CLASS, move |core| {
        asset_package::build_asset_package(core, &loader_package_class)
    })?;
    Ok(())
}
