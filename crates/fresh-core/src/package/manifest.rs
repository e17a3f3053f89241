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

//! The on-disk form of a package: a list of object declarations in RON.
//!
//! ```ron
//! (
//!   objects: [
//!     (class: "Texture", name: "hero.png", properties: { "filter": "nearest" }),
//!     (class: "Font", name: "ui"),
//!   ],
//! )
//! ```

use crate::error::Result;
use crate::object::{ObjectId, PropertyMap};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The extension of package manifest files.
pub const MANIFEST_EXTENSION: &str = "ron";

/// A serializable package: the objects to create, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageManifest {
    /// Object declarations, created in this order.
    pub objects: Vec<ObjectDecl>,
}

/// One object in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDecl {
    /// The class to instantiate.
    pub class: String,
    /// The object name, optionally qualified as `package::name`. Empty for an
    /// anonymous object.
    #[serde(default)]
    pub name: String,
    /// Properties applied through [`Object::apply_properties`](crate::Object::apply_properties).
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
}

impl ObjectDecl {
    /// Declares an object with no properties.
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            properties: PropertyMap::new(),
        }
    }

    /// Adds a property, builder style.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The id this declaration names, splitting a `package::name` qualifier.
    pub fn object_id(&self) -> ObjectId {
        match self.name.split_once("::") {
            Some((package, name)) => ObjectId::qualified(package, self.class.as_str(), name),
            None => ObjectId::new(self.class.as_str(), self.name.as_str()),
        }
    }
}

impl PackageManifest {
    /// Parses a manifest from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Writes the manifest as pretty RON text.
    pub fn to_ron_string(&self) -> Result<String> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty_config)?)
    }

    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }
}
