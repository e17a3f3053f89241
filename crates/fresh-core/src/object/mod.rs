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

//! The object model: reference-counted, class-tagged entities.
//!
//! An object is any type implementing [`Object`]. Objects are shared as
//! [`ObjectRef`] (`Rc<dyn Object>`), so every hook takes `&self` and any
//! mutable state lives behind interior mutability. Each object embeds an
//! [`ObjectCore`] holding its class and its name.
//!
//! Typed access goes through [`ObjectClass`], which ties a Rust type to the
//! name of the class that constructs it.

mod class;
mod filter;
mod id;

pub use class::*;
pub use filter::NameFilter;
pub use id::ObjectId;

use crate::asset::{Asset, AssetLoader};
use crate::error::Result;
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A shared handle to an object.
pub type ObjectRef = Rc<dyn Object>;

/// Named string properties used to configure objects and to save them.
pub type PropertyMap = BTreeMap<String, String>;

static OBJECTS_CREATED: AtomicU64 = AtomicU64::new(0);

/// Separates the ordinal of a generated name from its time code.
const TIME_CODE_TOKEN: &str = "~t";

/// Generates a fresh name for an object created without one.
///
/// The name is an ordinal followed by a time code, so it never reads as a
/// plain number a caller might have picked.
pub fn default_object_name() -> String {
    let ordinal = OBJECTS_CREATED.fetch_add(1, Ordering::Relaxed);
    let time_code = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    format!("{ordinal}{TIME_CODE_TOKEN}{time_code:x}")
}

/// Upcasting support so objects can be downcast to their concrete type.
pub trait AsAny: Any {
    /// Borrows `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Converts a shared handle into `Rc<dyn Any>`.
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// State shared by every object: its class and its name.
pub struct ObjectCore {
    class: Rc<ClassInfo>,
    name: RefCell<String>,
}

impl ObjectCore {
    /// Creates the core of a new object. An empty `name` is replaced by a
    /// generated unique name.
    pub fn new(class: Rc<ClassInfo>, name: &str) -> Self {
        let name = if name.is_empty() {
            default_object_name()
        } else {
            name.to_owned()
        };
        Self {
            class,
            name: RefCell::new(name),
        }
    }

    /// The class the object was constructed as.
    pub fn class(&self) -> &Rc<ClassInfo> {
        &self.class
    }

    /// The current object name.
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Renames the object. An empty name is replaced by a generated one.
    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = if name.is_empty() {
            default_object_name()
        } else {
            name.to_owned()
        };
    }
}

/// A reference-counted engine entity with a class and a name.
pub trait Object: AsAny {
    /// The embedded class and name.
    fn core(&self) -> &ObjectCore;

    /// Configures the object from a property map, as read from a manifest or
    /// passed to [`create_object`](crate::create_object).
    ///
    /// Unrecognised properties are ignored by default.
    fn apply_properties(&self, properties: &PropertyMap) -> Result<()> {
        let _ = properties;
        Ok(())
    }

    /// The properties needed to recreate this object when its package is saved.
    fn properties(&self) -> PropertyMap {
        PropertyMap::new()
    }

    /// Called once the object and its cross-references are in place.
    fn post_load(&self) {}

    /// Called after every object of the enclosing load has run `post_load`.
    fn on_all_loaded(&self) {}

    /// The objects this object refers to; walked by
    /// [`Package::collect`](crate::Package::collect).
    fn referenced_objects(&self) -> Vec<ObjectRef> {
        Vec::new()
    }

    /// Returns the asset view of this object, if it is an asset.
    fn as_asset(&self) -> Option<&dyn Asset> {
        None
    }

    /// Returns the loader view of this object, if it is an asset loader.
    fn as_asset_loader(&self) -> Option<&dyn AssetLoader> {
        None
    }
}

/// Ties a concrete object type to the class name that constructs it.
pub trait ObjectClass: Object + Sized {
    /// The registered class name.
    const CLASS_NAME: &'static str;
}

impl dyn Object {
    /// The class the object was constructed as.
    pub fn class(&self) -> &Rc<ClassInfo> {
        self.core().class()
    }

    /// The class name.
    pub fn class_name(&self) -> &str {
        self.core().class().name()
    }

    /// The current object name.
    pub fn name(&self) -> String {
        self.core().name()
    }

    /// Renames the object.
    ///
    /// Renaming does not re-check uniqueness within the owning package; use
    /// [`Package::unique_name`](crate::Package::unique_name) first if needed.
    pub fn rename(&self, name: &str) {
        self.core().set_name(name);
    }

    /// Returns `true` if the object is currently named `name`.
    pub fn has_name(&self, name: &str) -> bool {
        *self.core().name.borrow() == name
    }

    /// The unqualified id of the object.
    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(self.class_name(), self.name())
    }

    /// Returns `true` if the object's class is `class` or descends from it.
    pub fn is_a(&self, class: &ClassInfo) -> bool {
        self.class().is_kind_of(class)
    }

    /// Returns `true` if the object's class or an ancestor is named `class`.
    pub fn is_a_named(&self, class: &str) -> bool {
        self.class().is_kind_of_named(class)
    }

    /// Returns `true` if the object's class hierarchy contains `class_name`
    /// (or `class_name` is empty) and its name passes `name_filter`.
    pub fn matches_filters(&self, class_name: &str, name_filter: &NameFilter) -> bool {
        (class_name.is_empty() || self.is_a_named(class_name))
            && name_filter.is_match(&self.core().name.borrow())
    }

    /// Borrows the object as its concrete type.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref::<T>()
    }

    /// Returns `true` if the concrete type of the object is `T`.
    pub fn is<T: Object>(&self) -> bool {
        AsAny::as_any(self).is::<T>()
    }
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object_id())
    }
}

/// Converts a shared object into a shared handle of its concrete type.
pub fn downcast_object<T: Object>(object: ObjectRef) -> Option<Rc<T>> {
    AsAny::into_any_rc(object).downcast::<T>().ok()
}

/// Returns `true` if both handles point at the same object.
pub fn same_object(a: &dyn Object, b: &dyn Object) -> bool {
    std::ptr::addr_eq(a, b)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A minimal concrete object type shared by the unit tests.

    use super::*;
    use std::cell::Cell;

    pub(crate) const THING_CLASS: &str = "TestThing";
    pub(crate) const SUB_THING_CLASS: &str = "TestSubThing";

    /// A plain object that can refer to others and report a size.
    pub(crate) struct Thing {
        core: ObjectCore,
        pub(crate) size: Cell<usize>,
        pub(crate) refs: RefCell<Vec<ObjectRef>>,
        pub(crate) post_loads: Cell<usize>,
        pub(crate) all_loads: Cell<usize>,
    }

    impl Object for Thing {
        fn core(&self) -> &ObjectCore {
            &self.core
        }

        fn apply_properties(&self, properties: &PropertyMap) -> Result<()> {
            if let Some(size) = properties.get("size") {
                let size = size.parse().map_err(|_| crate::FreshError::InvalidProperty {
                    object: self.core.name(),
                    property: "size".into(),
                    value: size.clone(),
                })?;
                self.size.set(size);
            }
            Ok(())
        }

        fn properties(&self) -> PropertyMap {
            PropertyMap::from([("size".to_owned(), self.size.get().to_string())])
        }

        fn post_load(&self) {
            self.post_loads.set(self.post_loads.get() + 1);
        }

        fn on_all_loaded(&self) {
            self.all_loads.set(self.all_loads.get() + 1);
        }

        fn referenced_objects(&self) -> Vec<ObjectRef> {
            self.refs.borrow().clone()
        }
    }

    impl ObjectClass for Thing {
        const CLASS_NAME: &'static str = THING_CLASS;
    }

    /// Registers `TestThing` and its subclass `TestSubThing`.
    pub(crate) fn register_things() -> Rc<ClassInfo> {
        let make = |core| -> ObjectRef {
            Rc::new(Thing {
                core,
                size: Cell::new(0),
                refs: RefCell::new(Vec::new()),
                post_loads: Cell::new(0),
                all_loads: Cell::new(0),
            })
        };
        let thing = register_class(THING_CLASS, OBJECT_CLASS, make).unwrap();
        register_class(SUB_THING_CLASS, THING_CLASS, make).unwrap();
        thing
    }

    /// Builds a `TestThing` that belongs to no package.
    pub(crate) fn thing(name: &str, size: usize) -> Rc<Thing> {
        let class = register_things();
        let object = class.instantiate(name).unwrap();
        let thing = downcast_object::<Thing>(object).unwrap();
        thing.size.set(size);
        thing
    }

    /// Builds a `TestSubThing` that belongs to no package.
    pub(crate) fn sub_thing(name: &str) -> Rc<Thing> {
        register_things();
        let object = get_class(SUB_THING_CLASS).unwrap().instantiate(name).unwrap();
        downcast_object::<Thing>(object).unwrap()
    }
}
