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

//! The asset database: which loader serves which asset class, and the
//! loaders declared up front.

use fresh_core::{ObjectDecl, PackageManifest, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Maps an asset class name to the name of its loader class.
pub type ClassMap = BTreeMap<String, String>;

/// The RON document read by [`AssetPackage::load_database`](crate::AssetPackage::load_database).
///
/// ```ron
/// (
///     class_map: { "Texture": "TextureLoader" },
///     loaders: [
///         (class: "TextureLoader", name: "hero", properties: {
///             "asset_class": "Texture",
///             "base_path": "assets/textures",
///             "extension": "png",
///         }),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetDatabase {
    /// Explicit asset class to loader class mapping. Classes not listed fall
    /// back to the `<AssetClass>Loader` convention.
    pub class_map: ClassMap,
    /// Loader objects to create. Each loader is named after the asset it loads.
    pub loaders: Vec<ObjectDecl>,
}

impl AssetDatabase {
    /// Parses a database from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Writes the database as pretty RON text.
    pub fn to_ron_string(&self) -> Result<String> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty_config)?)
    }

    /// Reads and parses a database file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// The loader declarations as a package manifest.
    pub fn loader_manifest(&self) -> PackageManifest {
        PackageManifest {
            objects: self.loaders.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database() {
        let database = AssetDatabase::from_ron_str(
            r#"(
                class_map: { "Sound": "StreamingSoundLoader" },
                loaders: [
                    (class: "DefaultAssetLoader", name: "click", properties: { "asset_class": "Sound" }),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(database.class_map["Sound"], "StreamingSoundLoader");
        assert_eq!(database.loaders.len(), 1);
        assert_eq!(database.loader_manifest().objects[0].name, "click");
    }

    #[test]
    fn test_sections_are_optional() {
        let database = AssetDatabase::from_ron_str("(loaders: [])").unwrap();
        assert!(database.class_map.is_empty());
        assert_eq!(database, AssetDatabase::default());
    }

    #[test]
    fn test_database_survives_text_form() {
        let mut database = AssetDatabase::default();
        database
            .class_map
            .insert("Texture".to_owned(), "TextureLoader".to_owned());
        database
            .loaders
            .push(ObjectDecl::new("TextureLoader", "hero").with_property("extension", "png"));

        let text = database.to_ron_string().unwrap();
        assert_eq!(AssetDatabase::from_ron_str(&text).unwrap(), database);
    }
}
