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

//! Packages that load their assets on demand.

use crate::database::AssetDatabase;
use crate::loader_package::AssetLoaderPackage;
use crate::report;
use fresh_core::object::{asset_class, get_class, ClassInfo};
use fresh_core::{
    add_search_package, create_object, create_package_of, root_package, FreshError, Object,
    ObjectClass, ObjectCore, ObjectId, ObjectRef, Package, PackageBehavior, Result,
};
use std::io::Write;
use std::ops::Deref;
use std::path::Path;
use std::rc::Rc;

/// Class name of asset packages.
pub const ASSET_PACKAGE_CLASS: &str = "AssetPackage";

/// Suffix of the name of the loader package owned by each asset package.
pub const LOADER_PACKAGE_SUFFIX: &str = "~asset-database";

/// Package behavior that creates missing assets through their loaders and
/// weighs zombies by their memory size.
#[derive(Debug)]
pub struct AssetPackageBehavior {
    loaders: AssetLoaderPackage,
}

impl AssetPackageBehavior {
    /// The loader package consulted on a miss.
    pub fn loaders(&self) -> &AssetLoaderPackage {
        &self.loaders
    }

    fn load(&self, package: &Rc<Package>, class: &Rc<ClassInfo>, name: &str) -> Result<Option<ObjectRef>> {
        let loader_class = self.loaders.loader_class_for(class)?;
        let loader = match self.loaders.package().request_generic(&loader_class, name) {
            Ok(Some(loader)) => loader,
            Ok(None) => {
                log::warn!(
                    "No {} could be created for asset {}'{name}'.",
                    loader_class.name(),
                    class.name()
                );
                return Ok(None);
            }
            Err(error) => {
                log::warn!(
                    "Could not create {} for asset {}'{name}': {error}",
                    loader_class.name(),
                    class.name()
                );
                return Ok(None);
            }
        };
        let Some(asset_loader) = loader.as_asset_loader() else {
            log::warn!("{} does not expose the asset loader interface.", loader.object_id());
            return Ok(None);
        };

        let asset = match create_object(Some(Rc::clone(package)), class, name, None) {
            Ok(asset) => asset,
            Err(error) => {
                log::warn!("Could not create asset {}'{name}': {error}", class.name());
                return Ok(None);
            }
        };

        let core = asset_loader.loader_core();
        if core.asset_class().is_none() {
            core.set_asset_class(Rc::clone(class));
        }
        if let Err(error) = asset_loader.load_asset(&*asset) {
            package.remove(&*asset);
            return Err(match error {
                error @ FreshError::LoadFailed { .. } => error,
                other => FreshError::LoadFailed {
                    loader: loader.object_id().to_string(),
                    asset: asset.object_id().to_string(),
                    reason: other.to_string(),
                },
            });
        }
        core.record_load();

        log::trace!(
            "Asset {} loaded by {} ({} bytes).",
            asset.object_id(),
            loader.object_id(),
            asset.as_asset().map_or(0, |asset| asset.memory_size())
        );
        Ok(Some(asset))
    }
}

impl PackageBehavior for AssetPackageBehavior {
    fn request_generic(
        &self,
        package: &Rc<Package>,
        class: &Rc<ClassInfo>,
        name: &str,
    ) -> Result<Option<ObjectRef>> {
        package.tidy();
        if let Some(found) = package.find_generic(class, name) {
            return Ok(Some(found));
        }
        if !class.is_kind_of(&asset_class()) {
            return Ok(None);
        }
        self.load(package, class, name)
    }

    fn zombie_size_bytes(&self, zombie: &dyn Object) -> usize {
        zombie.as_asset().map_or(0, |asset| asset.memory_size())
    }
}

/// Class factory for `AssetPackage`.
///
/// Builds the package with its own loader package (registered with the root
/// package), lists it as a search package and switches it to retained mode.
pub(crate) fn build_asset_package(core: ObjectCore, loader_package_class: &Rc<ClassInfo>) -> ObjectRef {
    let loaders = AssetLoaderPackage::new(
        Rc::clone(loader_package_class),
        &format!("{}{LOADER_PACKAGE_SUFFIX}", core.name()),
    );
    loaders.retain_members();
    let loader_package: ObjectRef = loaders.package().clone();
    root_package().add(loader_package);

    let package = Rc::new(Package::from_core(core, Box::new(AssetPackageBehavior { loaders })));
    add_search_package(&package);
    package.retain_members();
    package
}

/// A handle to a package driven by [`AssetPackageBehavior`].
///
/// Dereferences to the underlying [`Package`].
#[derive(Clone)]
pub struct AssetPackage {
    package: Rc<Package>,
    loaders: AssetLoaderPackage,
}

impl AssetPackage {
    /// Creates an asset package and registers it with the root package.
    ///
    /// Registers the asset package classes first if needed.
    pub fn create(name: &str) -> Result<Self> {
        crate::register_classes()?;
        let class = get_class(ASSET_PACKAGE_CLASS)
            .ok_or_else(|| FreshError::UnknownClass(ASSET_PACKAGE_CLASS.to_owned()))?;
        let package = create_package_of(&class, name)?;
        Self::from_package(package).ok_or_else(|| FreshError::NotKindOf {
            class: class.name().to_owned(),
            required: ASSET_PACKAGE_CLASS.to_owned(),
        })
    }

    /// Views `package` as an asset package, if that is how it was built.
    pub fn from_package(package: Rc<Package>) -> Option<Self> {
        let loaders = package.behavior_as::<AssetPackageBehavior>()?.loaders.clone();
        Some(Self { package, loaders })
    }

    /// The underlying package.
    pub fn package(&self) -> &Rc<Package> {
        &self.package
    }

    /// The package holding this package's loaders.
    pub fn loaders(&self) -> &AssetLoaderPackage {
        &self.loaders
    }

    /// Returns the asset `name` of type `T`, loading it if needed.
    pub fn request_asset<T: ObjectClass>(&self, name: &str) -> Result<Option<Rc<T>>> {
        self.package.request::<T>(name)
    }

    /// Returns the object `name` of `class`, loading it if it is an asset.
    pub fn request_generic(&self, class: &Rc<ClassInfo>, name: &str) -> Result<Option<ObjectRef>> {
        self.package.request_generic(class, name)
    }

    /// Reads an [`AssetDatabase`] file and applies it.
    pub fn load_database(&self, path: &Path) -> Result<Vec<ObjectRef>> {
        let database = AssetDatabase::load(path)?;
        log::debug!(
            "Loading asset database {} into '{}'",
            path.display(),
            self.package.name()
        );
        Ok(self.apply_database(&database))
    }

    /// Adds the database's class mappings and creates its loaders.
    ///
    /// Returns the loaders that were created or reconfigured.
    pub fn apply_database(&self, database: &AssetDatabase) -> Vec<ObjectRef> {
        self.loaders.retain_members();
        self.loaders.extend_class_map(database.class_map.clone());
        self.loaders
            .package()
            .load_manifest(&database.loader_manifest())
    }

    /// Finds a loader by id.
    pub fn get_loader(&self, id: &ObjectId) -> Option<ObjectRef> {
        self.loaders
            .find_object(id)
            .filter(|loader| loader.as_asset_loader().is_some())
    }

    /// Preloads and keeps every asset whose loader declares an asset class
    /// and is accepted by `predicate`. Returns how many assets were loaded.
    pub fn load_assets(&self, mut predicate: impl FnMut(&ClassInfo, &str) -> bool) -> Result<usize> {
        let mut loaded = 0;
        for loader in self.loaders.loaders() {
            let Some(class) = loader
                .as_asset_loader()
                .and_then(|loader| loader.loader_core().asset_class())
            else {
                log::debug!("{} declares no asset class; skipping preload.", loader.object_id());
                continue;
            };
            let name = loader.name();
            if !predicate(&class, &name) {
                continue;
            }
            if let Some(asset) = self.package.request_generic(&class, &name)? {
                if !self.package.has(&*asset) {
                    self.package.add(asset);
                }
                loaded += 1;
            }
        }
        log::debug!("Package '{}' preloaded {loaded} asset(s).", self.package.name());
        Ok(loaded)
    }

    /// Writes a human-readable table of loaders and the assets they loaded.
    pub fn dump_asset_report(&self, out: &mut impl Write) -> Result<()> {
        report::dump_asset_report(self, out)
    }
}

impl Deref for AssetPackage {
    type Target = Package;

    fn deref(&self) -> &Self::Target {
        &self.package
    }
}

impl std::fmt::Debug for AssetPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPackage")
            .field("name", &self.package.name())
            .field("assets", &self.package.len())
            .field("loaders", &self.loaders)
            .finish()
    }
}
