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

//! The class registry: named classes with a parent chain and a factory.
//!
//! Every object is created through the factory of a registered class, keyed
//! by class name. Classes form a single-inheritance tree rooted at `Object`,
//! which is what `find_filtered`'s class filter and the asset pipeline's
//! "is this class a kind of `Asset`?" questions walk.
//!
//! The registry is per thread. Objects are `Rc`-based and never cross a
//! thread boundary, so neither do the classes that build them.

use super::{ObjectCore, ObjectRef};
use crate::asset::DefaultAssetLoader;
use crate::error::{FreshError, Result};
use crate::package::{DefaultPackageBehavior, Package};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Builds a concrete object from its freshly constructed [`ObjectCore`].
pub type ObjectFactory = dyn Fn(ObjectCore) -> ObjectRef;

/// Name of the root class.
pub const OBJECT_CLASS: &str = "Object";
/// Name of the base package class.
pub const PACKAGE_CLASS: &str = "Package";
/// Name of the abstract asset class.
pub const ASSET_CLASS: &str = "Asset";
/// Name of the abstract asset loader class.
pub const ASSET_LOADER_CLASS: &str = "AssetLoader";
/// Name of the loader used when no other loader class resolves.
pub const DEFAULT_ASSET_LOADER_CLASS: &str = "DefaultAssetLoader";

/// Runtime description of a class.
pub struct ClassInfo {
    name: String,
    parent: Option<Rc<ClassInfo>>,
    factory: Option<Box<ObjectFactory>>,
}

impl ClassInfo {
    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent class, `None` only for the root class.
    pub fn parent(&self) -> Option<&Rc<ClassInfo>> {
        self.parent.as_ref()
    }

    /// Returns `true` if the class has no factory and cannot be instantiated.
    pub fn is_abstract(&self) -> bool {
        self.factory.is_none()
    }

    /// Iterates this class and then each of its ancestors up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &ClassInfo> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Returns `true` if this class is `base` or descends from it.
    pub fn is_kind_of(&self, base: &ClassInfo) -> bool {
        self.ancestors().any(|class| std::ptr::eq(class, base))
    }

    /// Returns `true` if this class or one of its ancestors is named `base`.
    pub fn is_kind_of_named(&self, base: &str) -> bool {
        self.ancestors().any(|class| class.name == base)
    }

    /// Builds a new object of this class, or `None` if the class is abstract.
    ///
    /// The object is not added to any package; see
    /// [`create_object`](crate::create_object) for the full creation protocol.
    pub fn instantiate(self: &Rc<Self>, name: &str) -> Option<ObjectRef> {
        let factory = self.factory.as_ref()?;
        Some(factory(ObjectCore::new(Rc::clone(self), name)))
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

struct ClassRegistry {
    classes: HashMap<String, Rc<ClassInfo>>,
    package: Rc<ClassInfo>,
    asset: Rc<ClassInfo>,
    asset_loader: Rc<ClassInfo>,
    default_asset_loader: Rc<ClassInfo>,
}

impl ClassRegistry {
    fn with_builtins() -> Self {
        let object = Rc::new(ClassInfo {
            name: OBJECT_CLASS.to_owned(),
            parent: None,
            factory: None,
        });
        let package = Rc::new(ClassInfo {
            name: PACKAGE_CLASS.to_owned(),
            parent: Some(Rc::clone(&object)),
            factory: Some(Box::new(|core| {
                Rc::new(Package::from_core(core, Box::new(DefaultPackageBehavior))) as ObjectRef
            })),
        });
        let asset = Rc::new(ClassInfo {
            name: ASSET_CLASS.to_owned(),
            parent: Some(Rc::clone(&object)),
            factory: None,
        });
        let asset_loader = Rc::new(ClassInfo {
            name: ASSET_LOADER_CLASS.to_owned(),
            parent: Some(Rc::clone(&object)),
            factory: None,
        });
        let default_asset_loader = Rc::new(ClassInfo {
            name: DEFAULT_ASSET_LOADER_CLASS.to_owned(),
            parent: Some(Rc::clone(&asset_loader)),
            factory: Some(Box::new(|core| {
                Rc::new(DefaultAssetLoader::from_core(core)) as ObjectRef
            })),
        });

        let classes = [&object, &package, &asset, &asset_loader, &default_asset_loader]
            .into_iter()
            .map(|class| (class.name.clone(), Rc::clone(class)))
            .collect();

        Self {
            classes,
            package,
            asset,
            asset_loader,
            default_asset_loader,
        }
    }

    fn insert(
        &mut self,
        name: &str,
        parent: &str,
        factory: Option<Box<ObjectFactory>>,
    ) -> Result<Rc<ClassInfo>> {
        if let Some(existing) = self.classes.get(name) {
            log::debug!("Class '{name}' is already registered; keeping the first registration.");
            return Ok(Rc::clone(existing));
        }
        let parent = self
            .classes
            .get(parent)
            .cloned()
            .ok_or_else(|| FreshError::UnknownClass(parent.to_owned()))?;

        let class = Rc::new(ClassInfo {
            name: name.to_owned(),
            parent: Some(parent),
            factory,
        });
        self.classes.insert(name.to_owned(), Rc::clone(&class));
        log::trace!("Registered class {class:?}");
        Ok(class)
    }
}

thread_local! {
    static CLASSES: RefCell<ClassRegistry> = RefCell::new(ClassRegistry::with_builtins());
}

/// Registers a concrete class deriving from `parent`.
///
/// Registering a name twice keeps the first registration and returns it.
///
/// # Errors
///
/// Returns [`FreshError::UnknownClass`] if `parent` is not registered.
pub fn register_class<F>(name: &str, parent: &str, factory: F) -> Result<Rc<ClassInfo>>
where
    F: Fn(ObjectCore) -> ObjectRef + 'static,
{
    CLASSES.with(|classes| classes.borrow_mut().insert(name, parent, Some(Box::new(factory))))
}

/// Registers an abstract class deriving from `parent`.
pub fn register_abstract_class(name: &str, parent: &str) -> Result<Rc<ClassInfo>> {
    CLASSES.with(|classes| classes.borrow_mut().insert(name, parent, None))
}

/// Looks a class up by name.
pub fn get_class(name: &str) -> Option<Rc<ClassInfo>> {
    CLASSES.with(|classes| classes.borrow().classes.get(name).cloned())
}

/// Returns `true` if `name` is a registered class.
pub fn is_class(name: &str) -> bool {
    CLASSES.with(|classes| classes.borrow().classes.contains_key(name))
}

/// Looks up the class registered under `T::CLASS_NAME`.
pub fn class_of<T: super::ObjectClass>() -> Option<Rc<ClassInfo>> {
    get_class(T::CLASS_NAME)
}

/// Looks up a class and checks that it is a kind of `base`.
pub fn require_class(name: &str, base: &ClassInfo) -> Result<Rc<ClassInfo>> {
    let class = get_class(name).ok_or_else(|| FreshError::UnknownClass(name.to_owned()))?;
    if class.is_kind_of(base) {
        Ok(class)
    } else {
        Err(FreshError::NotKindOf {
            class: name.to_owned(),
            required: base.name().to_owned(),
        })
    }
}

/// The built-in `Package` class.
pub fn package_class() -> Rc<ClassInfo> {
    CLASSES.with(|classes| Rc::clone(&classes.borrow().package))
}

/// The built-in abstract `Asset` class.
pub fn asset_class() -> Rc<ClassInfo> {
    CLASSES.with(|classes| Rc::clone(&classes.borrow().asset))
}

/// The built-in abstract `AssetLoader` class.
pub fn asset_loader_class() -> Rc<ClassInfo> {
    CLASSES.with(|classes| Rc::clone(&classes.borrow().asset_loader))
}

/// The built-in `DefaultAssetLoader` class.
pub fn default_asset_loader_class() -> Rc<ClassInfo> {
    CLASSES.with(|classes| Rc::clone(&classes.borrow().default_asset_loader))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_hierarchy() {
        let loader = get_class(DEFAULT_ASSET_LOADER_CLASS).unwrap();
        assert!(loader.is_kind_of(&asset_loader_class()));
        assert!(loader.is_kind_of_named(OBJECT_CLASS));
        assert!(!loader.is_kind_of(&asset_class()));
        assert!(!loader.is_abstract());

        assert!(asset_class().is_abstract());
        assert!(get_class(OBJECT_CLASS).unwrap().parent().is_none());
    }

    #[test]
    fn test_register_abstract_and_query() {
        // --- 1. SETUP & ACTION ---
        let shape = register_abstract_class("Shape", OBJECT_CLASS).unwrap();

        // --- 2. ASSERTIONS ---
        assert!(is_class("Shape"));
        assert!(shape.is_abstract());
        assert_eq!(shape.parent().unwrap().name(), OBJECT_CLASS);
        let names: Vec<_> = shape.ancestors().map(ClassInfo::name).collect();
        assert_eq!(names, ["Shape", "Object"]);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let first = register_abstract_class("Widget", OBJECT_CLASS).unwrap();
        let second = register_abstract_class("Widget", ASSET_CLASS).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(!second.is_kind_of_named(ASSET_CLASS));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let result = register_abstract_class("Orphan", "NoSuchParent");
        assert!(matches!(result, Err(FreshError::UnknownClass(name)) if name == "NoSuchParent"));
        assert!(!is_class("Orphan"));
    }

    #[test]
    fn test_require_class_checks_kind() {
        assert!(require_class(PACKAGE_CLASS, &get_class(OBJECT_CLASS).unwrap()).is_ok());
        let result = require_class(PACKAGE_CLASS, &asset_class());
        assert!(matches!(result, Err(FreshError::NotKindOf { .. })));
        let result = require_class("Nope", &asset_class());
        assert!(matches!(result, Err(FreshError::UnknownClass(_))));
    }

    #[test]
    fn test_abstract_class_does_not_instantiate() {
        assert!(asset_class().instantiate("x").is_none());
        let package = package_class().instantiate("made").unwrap();
        assert_eq!(package.name(), "made");
        assert!(package.is_a(&package_class()));
    }
}
