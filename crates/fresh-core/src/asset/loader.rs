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

use crate::error::{FreshError, Result};
use crate::object::{get_class, ClassInfo, Object, ObjectClass, ObjectCore, PropertyMap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Property prefix that [`DefaultAssetLoader`] forwards to the assets it loads.
pub const PASSTHROUGH_PREFIX: &str = "passthrough.";

/// Joins a base path, a file path and an extension.
///
/// A `/` is inserted after a non-empty base path when missing, and a `.`
/// before a non-empty extension when missing. An empty file path yields an
/// empty result.
pub fn decorate_path(base_path: &str, file_path: &str, extension: &str) -> String {
    if file_path.is_empty() {
        return String::new();
    }

    let mut complete = String::with_capacity(base_path.len() + file_path.len() + extension.len() + 2);
    complete.push_str(base_path);
    if !complete.is_empty() && !complete.ends_with('/') {
        complete.push('/');
    }
    complete.push_str(file_path);

    if !extension.is_empty() {
        if !extension.starts_with('.') {
            complete.push('.');
        }
        complete.push_str(extension);
    }
    complete
}

/// State shared by every asset loader.
///
/// A loader is named after the asset it loads, and its file path starts out
/// as that name.
pub struct AssetLoaderCore {
    object: ObjectCore,
    base_path: RefCell<String>,
    file_path: RefCell<String>,
    extension: RefCell<String>,
    asset_class: RefCell<Option<Rc<ClassInfo>>>,
    times_loaded: Cell<usize>,
}

impl AssetLoaderCore {
    /// Wraps the object core of a new loader.
    pub fn new(object: ObjectCore) -> Self {
        let file_path = object.name();
        Self {
            object,
            base_path: RefCell::default(),
            file_path: RefCell::new(file_path),
            extension: RefCell::default(),
            asset_class: RefCell::default(),
            times_loaded: Cell::new(0),
        }
    }

    /// The loader's own object core.
    pub fn object(&self) -> &ObjectCore {
        &self.object
    }

    /// The directory prefixed to the file path.
    pub fn base_path(&self) -> String {
        self.base_path.borrow().clone()
    }

    /// Sets the directory prefixed to the file path.
    pub fn set_base_path(&self, base_path: &str) {
        *self.base_path.borrow_mut() = base_path.to_owned();
    }

    /// The path of the asset's data relative to the base path.
    pub fn file_path(&self) -> String {
        self.file_path.borrow().clone()
    }

    /// Sets the path of the asset's data.
    pub fn set_file_path(&self, file_path: &str) {
        *self.file_path.borrow_mut() = file_path.to_owned();
    }

    /// The extension appended to the file path.
    pub fn extension(&self) -> String {
        self.extension.borrow().clone()
    }

    /// Sets the extension appended to the file path.
    pub fn set_extension(&self, extension: &str) {
        *self.extension.borrow_mut() = extension.to_owned();
    }

    /// The class of the assets this loader produces, once known.
    pub fn asset_class(&self) -> Option<Rc<ClassInfo>> {
        self.asset_class.borrow().clone()
    }

    /// Records the class of the assets this loader produces.
    pub fn set_asset_class(&self, class: Rc<ClassInfo>) {
        *self.asset_class.borrow_mut() = Some(class);
    }

    /// How many times this loader has loaded an asset.
    pub fn times_loaded(&self) -> usize {
        self.times_loaded.get()
    }

    /// Counts one more load.
    pub fn record_load(&self) {
        self.times_loaded.set(self.times_loaded.get() + 1);
    }

    /// The base path, file path and extension joined by [`decorate_path`].
    pub fn complete_path(&self) -> String {
        decorate_path(
            &self.base_path.borrow(),
            &self.file_path.borrow(),
            &self.extension.borrow(),
        )
    }

    /// Applies the `base_path`, `file_path`, `extension` and `asset_class`
    /// properties. Other keys are ignored.
    pub fn apply_properties(&self, properties: &PropertyMap) -> Result<()> {
        if let Some(base_path) = properties.get("base_path") {
            self.set_base_path(base_path);
        }
        if let Some(file_path) = properties.get("file_path") {
            self.set_file_path(file_path);
        }
        if let Some(extension) = properties.get("extension") {
            self.set_extension(extension);
        }
        if let Some(class_name) = properties.get("asset_class") {
            let class =
                get_class(class_name).ok_or_else(|| FreshError::UnknownClass(class_name.clone()))?;
            self.set_asset_class(class);
        }
        Ok(())
    }

    /// The properties [`apply_properties`](Self::apply_properties) understands,
    /// omitting empty ones.
    pub fn properties(&self) -> PropertyMap {
        let mut properties = PropertyMap::new();
        let mut put = |key: &str, value: String| {
            if !value.is_empty() {
                properties.insert(key.to_owned(), value);
            }
        };
        put("base_path", self.base_path());
        put("file_path", self.file_path());
        put("extension", self.extension());
        if let Some(class) = self.asset_class() {
            put("asset_class", class.name().to_owned());
        }
        properties
    }
}

/// An object that populates assets.
pub trait AssetLoader: Object {
    /// The shared loader state.
    fn loader_core(&self) -> &AssetLoaderCore;

    /// Fills `asset` with its contents. Does nothing by default.
    fn load_asset(&self, asset: &dyn Object) -> Result<()> {
        let _ = asset;
        Ok(())
    }
}

/// The loader used when an asset class has no dedicated loader.
///
/// Any property named `passthrough.<key>` is stripped of its prefix and
/// applied to every asset this loader loads, which lets a database configure
/// simple assets without writing a loader for them.
pub struct DefaultAssetLoader {
    loader: AssetLoaderCore,
    passthrough: RefCell<PropertyMap>,
}

impl DefaultAssetLoader {
    /// Builds the loader around a fresh object core.
    pub fn from_core(core: ObjectCore) -> Self {
        Self {
            loader: AssetLoaderCore::new(core),
            passthrough: RefCell::default(),
        }
    }

    /// The properties forwarded to loaded assets.
    pub fn passthrough(&self) -> PropertyMap {
        self.passthrough.borrow().clone()
    }
}

impl Object for DefaultAssetLoader {
    fn core(&self) -> &ObjectCore {
        self.loader.object()
    }

    fn apply_properties(&self, properties: &PropertyMap) -> Result<()> {
        self.loader.apply_properties(properties)?;
        let mut passthrough = self.passthrough.borrow_mut();
        for (key, value) in properties {
            if let Some(key) = key.strip_prefix(PASSTHROUGH_PREFIX) {
                passthrough.insert(key.to_owned(), value.clone());
            }
        }
        Ok(())
    }

    fn properties(&self) -> PropertyMap {
        let mut properties = self.loader.properties();
        for (key, value) in self.passthrough.borrow().iter() {
            properties.insert(format!("{PASSTHROUGH_PREFIX}{key}"), value.clone());
        }
        properties
    }

    fn as_asset_loader(&self) -> Option<&dyn AssetLoader> {
        Some(self)
    }
}

impl ObjectClass for DefaultAssetLoader {
    const CLASS_NAME: &'static str = crate::object::DEFAULT_ASSET_LOADER_CLASS;
}

impl AssetLoader for DefaultAssetLoader {
    fn loader_core(&self) -> &AssetLoaderCore {
        &self.loader
    }

    fn load_asset(&self, asset: &dyn Object) -> Result<()> {
        let passthrough = self.passthrough();
        if passthrough.is_empty() {
            Ok(())
        } else {
            asset.apply_properties(&passthrough)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::test_support::thing;
    use crate::object::{asset_class, default_asset_loader_class, ObjectRef};

    #[test]
    fn test_decorate_path() {
        assert_eq!(decorate_path("assets", "hero", "png"), "assets/hero.png");
        assert_eq!(decorate_path("assets/", "hero", ".png"), "assets/hero.png");
        assert_eq!(decorate_path("", "hero.png", ""), "hero.png");
        assert_eq!(decorate_path("assets", "", "png"), "");
    }

    #[test]
    fn test_loader_file_path_defaults_to_name() {
        let object = default_asset_loader_class().instantiate("hero").unwrap();
        let loader = object.as_asset_loader().unwrap().loader_core();
        assert_eq!(loader.file_path(), "hero");
        assert_eq!(loader.times_loaded(), 0);
        assert!(loader.asset_class().is_none());
    }

    #[test]
    fn test_loader_properties() {
        // --- 1. SETUP ---
        let object = default_asset_loader_class().instantiate("hero").unwrap();
        let properties = PropertyMap::from([
            ("base_path".to_owned(), "textures".to_owned()),
            ("extension".to_owned(), "png".to_owned()),
            ("passthrough.size".to_owned(), "64".to_owned()),
        ]);

        // --- 2. ACTION ---
        object.apply_properties(&properties).unwrap();

        // --- 3. ASSERTIONS ---
        let loader = object.downcast_ref::<DefaultAssetLoader>().unwrap();
        assert_eq!(loader.loader_core().complete_path(), "textures/hero.png");
        assert_eq!(loader.passthrough()["size"], "64");

        let saved = object.properties();
        assert_eq!(saved["passthrough.size"], "64");
        assert_eq!(saved["file_path"], "hero");
        assert!(!saved.contains_key("asset_class"));
    }

    #[test]
    fn test_unknown_asset_class_is_rejected() {
        let object = default_asset_loader_class().instantiate("hero").unwrap();
        let properties = PropertyMap::from([("asset_class".to_owned(), "Nope".to_owned())]);
        let result = object.apply_properties(&properties);
        assert!(matches!(result, Err(FreshError::UnknownClass(_))));

        let properties = PropertyMap::from([("asset_class".to_owned(), "Asset".to_owned())]);
        object.apply_properties(&properties).unwrap();
        let class = object.as_asset_loader().unwrap().loader_core().asset_class();
        assert!(Rc::ptr_eq(&class.unwrap(), &asset_class()));
    }

    #[test]
    fn test_default_loader_applies_passthrough() {
        let loader = default_asset_loader_class().instantiate("hero").unwrap();
        let properties = PropertyMap::from([("passthrough.size".to_owned(), "128".to_owned())]);
        loader.apply_properties(&properties).unwrap();

        let target = thing("hero", 0);
        let erased: ObjectRef = target.clone();
        loader.as_asset_loader().unwrap().load_asset(&*erased).unwrap();

        assert_eq!(target.size.get(), 128);
    }
}
