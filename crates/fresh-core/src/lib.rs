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

//! # Fresh Core
//!
//! The object model of the engine: reflective classes, named objects,
//! packages that own them, and the load context that lets objects refer to
//! each other before they all exist.
//!
//! Everything here is single-threaded. Registries live in thread-local
//! storage, so each thread sees its own classes and packages.

#![warn(missing_docs)]

pub mod asset;
pub mod context;
pub mod error;
pub mod link;
pub mod object;
pub mod objects;
pub mod package;
pub mod registry;
pub mod switch_ptr;

pub use asset::{Asset, AssetLoader, AssetLoaderCore, DefaultAssetLoader};
pub use context::{
    active_package, ActivePackageScope, FixupCapturer, FixupSuppressor, PendingFixup,
};
pub use error::{FreshError, Result};
pub use link::ObjectLink;
pub use object::{
    get_class, register_abstract_class, register_class, ClassInfo, NameFilter, Object,
    ObjectClass, ObjectCore, ObjectId, ObjectRef, PropertyMap,
};
pub use objects::{
    create_object, create_object_by_id, create_object_of, create_or_get_object,
    get_filtered_objects, get_filtered_objects_in_rooted_packages, get_filtered_objects_of,
    get_object, get_object_of,
};
pub use package::{
    DefaultPackageBehavior, MergePolicy, ObjectDecl, Package, PackageBehavior, PackageManifest,
};
pub use registry::{
    add_search_package, create_package, create_package_of, get_package, load_package,
    remove_search_package, root_package, transient_package,
};
pub use switch_ptr::SwitchPtr;
