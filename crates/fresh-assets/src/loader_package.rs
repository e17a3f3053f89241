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

//! The package that owns an asset package's loaders.
//!
//! Loaders are named after the asset they load. When an asset is requested
//! and its loader was never declared, the loader package synthesises one
//! whose file path is the asset name.

use crate::database::ClassMap;
use fresh_core::object::{asset_loader_class, get_class, ClassInfo, DEFAULT_ASSET_LOADER_CLASS};
use fresh_core::{create_object, FreshError, ObjectRef, Package, PackageBehavior, Result};
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

/// Class name of loader packages.
pub const ASSET_LOADER_PACKAGE_CLASS: &str = "AssetLoaderPackage";

/// Suffix appended to an asset class name to find its loader by convention.
pub const LOADER_CLASS_SUFFIX: &str = "Loader";

/// Picks the loader class for `asset_class`.
///
/// An explicit mapping wins, then the `<AssetClass>Loader` convention, then
/// the default loader. A candidate that is abstract or not a kind of
/// `AssetLoader` is skipped.
pub fn resolve_loader_class(class_map: &ClassMap, asset_class: &ClassInfo) -> Result<Rc<ClassInfo>> {
    let base = asset_loader_class();
    let usable = |name: &str| {
        get_class(name).filter(|class| class.is_kind_of(&base) && !class.is_abstract())
    };

    if let Some(mapped) = class_map.get(asset_class.name()) {
        match usable(mapped) {
            Some(class) => return Ok(class),
            None => log::warn!(
                "The loader class '{mapped}' mapped to asset class '{}' is not an instantiable asset loader class.",
                asset_class.name()
            ),
        }
    }

    let conventional = format!("{}{LOADER_CLASS_SUFFIX}", asset_class.name());
    if let Some(class) = usable(&conventional) {
        return Ok(class);
    }

    usable(DEFAULT_ASSET_LOADER_CLASS)
        .ok_or_else(|| FreshError::MissingLoader(asset_class.name().to_owned()))
}

/// Package behavior that synthesises missing loaders.
#[derive(Debug, Default)]
pub struct LoaderPackageBehavior {
    class_map: RefCell<ClassMap>,
}

impl LoaderPackageBehavior {
    /// The explicit asset class to loader class mapping.
    pub fn class_map(&self) -> ClassMap {
        self.class_map.borrow().clone()
    }

    /// Adds mappings, replacing any existing entry for the same asset class.
    pub fn extend_class_map(&self, entries: ClassMap) {
        self.class_map.borrow_mut().extend(entries);
    }

    /// Picks the loader class for `asset_class`. See [`resolve_loader_class`].
    pub fn loader_class_for(&self, asset_class: &ClassInfo) -> Result<Rc<ClassInfo>> {
        resolve_loader_class(&self.class_map.borrow(), asset_class)
    }
}

impl PackageBehavior for LoaderPackageBehavior {
    fn request_generic(
        &self,
        package: &Rc<Package>,
        class: &Rc<ClassInfo>,
        name: &str,
    ) -> Result<Option<ObjectRef>> {
        if let Some(found) = package.find_generic(class, name) {
            return Ok(Some(found));
        }
        if !class.is_kind_of(&asset_loader_class()) {
            return Ok(None);
        }

        let loader = create_object(Some(Rc::clone(package)), class, name, None)?;
        if let Some(asset_loader) = loader.as_asset_loader() {
            asset_loader.loader_core().set_file_path(name);
        }
        log::debug!(
            "Package '{}' synthesised loader {}",
            package.name(),
            loader.object_id()
        );
        Ok(Some(loader))
    }
}

/// A handle to a package driven by [`LoaderPackageBehavior`].
#[derive(Clone)]
pub struct AssetLoaderPackage(Rc<Package>);

impl AssetLoaderPackage {
    /// Builds a loader package of `class`. It is not registered anywhere.
    pub fn new(class: Rc<ClassInfo>, name: &str) -> Self {
        Self(Package::with_behavior(
            class,
            name,
            Box::new(LoaderPackageBehavior::default()),
        ))
    }

    /// Views `package` as a loader package, if that is how it was built.
    pub fn from_package(package: Rc<Package>) -> Option<Self> {
        package.behavior_as::<LoaderPackageBehavior>()?;
        Some(Self(package))
    }

    /// The underlying package.
    pub fn package(&self) -> &Rc<Package> {
        &self.0
    }

    fn behavior(&self) -> Option<&LoaderPackageBehavior> {
        self.0.behavior_as::<LoaderPackageBehavior>()
    }

    /// The explicit asset class to loader class mapping.
    pub fn class_map(&self) -> ClassMap {
        self.behavior()
            .map(LoaderPackageBehavior::class_map)
            .unwrap_or_default()
    }

    /// Adds mappings, replacing any existing entry for the same asset class.
    pub fn extend_class_map(&self, entries: ClassMap) {
        if let Some(behavior) = self.behavior() {
            behavior.extend_class_map(entries);
        }
    }

    /// Picks the loader class for `asset_class`.
    pub fn loader_class_for(&self, asset_class: &ClassInfo) -> Result<Rc<ClassInfo>> {
        match self.behavior() {
            Some(behavior) => behavior.loader_class_for(asset_class),
            None => resolve_loader_class(&ClassMap::new(), asset_class),
        }
    }

    /// The members that are asset loaders.
    pub fn loaders(&self) -> Vec<ObjectRef> {
        self.0
            .members()
            .into_iter()
            .filter(|member| member.as_asset_loader().is_some())
            .collect()
    }
}

impl Deref for AssetLoaderPackage {
    type Target = Package;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for AssetLoaderPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoaderPackage")
            .field("name", &self.0.name())
            .field("loaders", &self.0.len())
            .field("class_map", &self.class_map())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fresh_core::object::{asset_class, default_asset_loader_class, register_abstract_class};
    use fresh_core::{
        register_class, AssetLoader, AssetLoaderCore, DefaultAssetLoader, Object, ObjectClass,
        ObjectCore,
    };

    struct SoundLoader {
        loader: AssetLoaderCore,
    }

    impl Object for SoundLoader {
        fn core(&self) -> &ObjectCore {
            self.loader.object()
        }

        fn as_asset_loader(&self) -> Option<&dyn AssetLoader> {
            Some(self)
        }
    }

    impl AssetLoader for SoundLoader {
        fn loader_core(&self) -> &AssetLoaderCore {
            &self.loader
        }
    }

    fn register_sound() -> (Rc<ClassInfo>, Rc<ClassInfo>) {
        let sound = register_abstract_class("Sound", "Asset").unwrap();
        let loader = register_class("SoundLoader", "AssetLoader", |core| {
            Rc::new(SoundLoader {
                loader: AssetLoaderCore::new(core),
            }) as ObjectRef
        })
        .unwrap();
        (sound, loader)
    }

    fn loader_package() -> AssetLoaderPackage {
        let class = register_class(ASSET_LOADER_PACKAGE_CLASS, "Package", |core| {
            Rc::new(Package::from_core(core, Box::new(LoaderPackageBehavior::default())))
                as ObjectRef
        })
        .unwrap();
        AssetLoaderPackage::new(class, "loaders")
    }

    #[test]
    fn test_loader_resolution_order() {
        // --- 1. SETUP ---
        let (sound, sound_loader) = register_sound();
        let mut class_map = ClassMap::new();

        // --- 2. ACTION & 3. ASSERTIONS ---
        // Convention.
        let resolved = resolve_loader_class(&class_map, &sound).unwrap();
        assert!(Rc::ptr_eq(&resolved, &sound_loader));

        // Explicit mapping beats convention.
        class_map.insert("Sound".to_owned(), DefaultAssetLoader::CLASS_NAME.to_owned());
        let resolved = resolve_loader_class(&class_map, &sound).unwrap();
        assert!(Rc::ptr_eq(&resolved, &default_asset_loader_class()));

        // A mapping to a class that is not a loader is skipped.
        class_map.insert("Sound".to_owned(), "Package".to_owned());
        let resolved = resolve_loader_class(&class_map, &sound).unwrap();
        assert!(Rc::ptr_eq(&resolved, &sound_loader));

        // So is a mapping to an abstract loader class.
        class_map.insert("Sound".to_owned(), "AssetLoader".to_owned());
        let resolved = resolve_loader_class(&class_map, &sound).unwrap();
        assert!(Rc::ptr_eq(&resolved, &sound_loader));

        // Anything else gets the default loader, never the abstract
        // `AssetLoader` the convention would name for `Asset`.
        let resolved = resolve_loader_class(&ClassMap::new(), &asset_class()).unwrap();
        assert!(Rc::ptr_eq(&resolved, &default_asset_loader_class()));
    }

    #[test]
    fn test_request_synthesises_missing_loader() {
        let (_, sound_loader) = register_sound();
        let loaders = loader_package();

        let loader = loaders
            .package()
            .request_generic(&sound_loader, "click.wav")
            .unwrap()
            .expect("a loader class should be synthesised");

        assert!(loaders.has(&*loader));
        let core = loader.as_asset_loader().unwrap().loader_core();
        assert_eq!(core.file_path(), "click.wav");

        // The second request finds the same loader.
        let again = loaders
            .package()
            .request_generic(&sound_loader, "click.wav")
            .unwrap()
            .unwrap();
        assert!(Rc::ptr_eq(&loader, &again));
    }

    #[test]
    fn test_request_of_non_loader_class_is_a_miss() {
        let loaders = loader_package();
        let class = get_class("Package").unwrap();
        assert!(loaders
            .package()
            .request_generic(&class, "nothing")
            .unwrap()
            .is_none());
        assert!(loaders.is_empty());
    }

    #[test]
    fn test_class_map_is_extended() {
        let loaders = loader_package();
        loaders.extend_class_map(ClassMap::from([("A".to_owned(), "ALoader".to_owned())]));
        loaders.extend_class_map(ClassMap::from([("B".to_owned(), "BLoader".to_owned())]));
        assert_eq!(loaders.class_map().len(), 2);
    }
}
