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

//! Defines the error type shared by the object, package and asset layers.
//!
//! Only configuration and environment failures are represented here. An
//! ordinary miss (an object that simply is not there) is reported as `None`,
//! and caller bugs such as adding an object twice are assertions.

use std::path::PathBuf;
use thiserror::Error;

/// A convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, FreshError>;

/// An error raised by a package or object operation.
#[derive(Debug, Error)]
pub enum FreshError {
    /// The class name is not present in the class registry.
    #[error("Unrecognized class '{0}'")]
    UnknownClass(String),

    /// The class cannot be instantiated because it is abstract.
    #[error("The class '{class}' is abstract and cannot be instantiated (while creating {object})")]
    AbstractClass {
        /// The abstract class.
        class: String,
        /// The string form of the object id being created.
        object: String,
    },

    /// The class is not a kind of the class the caller required.
    #[error("The class '{class}' is not a kind of '{required}'")]
    NotKindOf {
        /// The class that was supplied.
        class: String,
        /// The class the caller required.
        required: String,
    },

    /// No loader class could be resolved for an asset class.
    #[error("Could not find loader for apparent asset class '{0}'")]
    MissingLoader(String),

    /// A qualified lookup named a package that does not exist.
    #[error("The package '{0}' could not be found")]
    PackageNotFound(String),

    /// An object-name or package-name filter is not a valid regular expression.
    #[error("Invalid filter '{pattern}': {source}")]
    InvalidFilter {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The string is not a valid object id.
    #[error("Invalid object id '{0}'")]
    InvalidObjectId(String),

    /// A property value could not be applied to an object.
    #[error("Invalid value '{value}' for property '{property}' of {object}")]
    InvalidProperty {
        /// The object being configured.
        object: String,
        /// The property name.
        property: String,
        /// The rejected value.
        value: String,
    },

    /// A package file has an extension no loader understands.
    #[error("Cannot load '{}': the extension is not supported", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A manifest could not be parsed.
    #[error("Malformed manifest: {0}")]
    Manifest(#[from] ron::error::SpannedError),

    /// A manifest could not be written.
    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] ron::Error),

    /// An I/O error occurred while reading or writing a package file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A loader failed to populate an asset.
    #[error("Loader '{loader}' failed to load asset '{asset}': {reason}")]
    LoadFailed {
        /// The loader object.
        loader: String,
        /// The asset object.
        asset: String,
        /// What went wrong.
        reason: String,
    },
}
