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

//! Object creation and global lookup.
//!
//! These functions tie the class registry, the load context and the package
//! registry together. Creation follows a two-phase protocol: the object is
//! built, added and configured inside a fixup capture, and only once the
//! capture has resolved its references (and no enclosing package load is
//! still running) does it receive `post_load` and `on_all_loaded`.

use crate::context::{active_package, ActivePackageScope, FixupCapturer};
use crate::error::{FreshError, Result};
use crate::object::{
    downcast_object, get_class, ClassInfo, Object, ObjectClass, ObjectId, ObjectRef, PropertyMap,
};
use crate::package::Package;
use crate::registry::{for_each_search_package, get_package, root_package};
use std::rc::Rc;

/// Creates an object of `class` named `name`.
///
/// The object goes into `package`, or into the active package when `package`
/// is `None`; with neither, it belongs to no package. `properties` are
/// applied after the object has been added.
///
/// # Errors
///
/// - [`FreshError::AbstractClass`] if `class` cannot be instantiated.
/// - Any error from [`Object::apply_properties`]; the half-built object is
///   then taken back out of its package.
///
/// # Panics
///
/// Panics if the target package already has a member with the same id.
pub fn create_object(
    package: Option<Rc<Package>>,
    class: &Rc<ClassInfo>,
    name: &str,
    properties: Option<&PropertyMap>,
) -> Result<ObjectRef> {
    let package = package.or_else(active_package);
    let _scope = package.clone().map(ActivePackageScope::enter);

    let object = {
        let id = ObjectId::new(class.name(), name);
        let _capture = FixupCapturer::new(format!("While creating object {id}: "));

        let object = class
            .instantiate(name)
            .ok_or_else(|| FreshError::AbstractClass {
                class: class.name().to_owned(),
                object: id.to_string(),
            })?;

        if let Some(package) = &package {
            package.add(Rc::clone(&object));
        }

        if let Some(properties) = properties {
            if let Err(error) = object.apply_properties(properties) {
                if let Some(package) = &package {
                    package.remove(&*object);
                }
                return Err(error);
            }
        }
        object
    };

    if !package.as_ref().is_some_and(|package| package.is_loading()) {
        object.post_load();
        object.on_all_loaded();
    }

    Ok(object)
}

/// Creates an object of type `T`, using the class registered for it.
pub fn create_object_of<T: ObjectClass>(
    package: Option<Rc<Package>>,
    name: &str,
    properties: Option<&PropertyMap>,
) -> Result<Rc<T>> {
    let class =
        get_class(T::CLASS_NAME).ok_or_else(|| FreshError::UnknownClass(T::CLASS_NAME.to_owned()))?;
    let object = create_object(package, &class, name, properties)?;
    downcast_object::<T>(object).ok_or_else(|| FreshError::NotKindOf {
        class: class.name().to_owned(),
        required: std::any::type_name::<T>().to_owned(),
    })
}

/// Creates the object `id` names, in the package it names.
///
/// An unknown package name is reported and creation falls back to the
/// active package.
pub fn create_object_by_id(id: &ObjectId, properties: Option<&PropertyMap>) -> Result<ObjectRef> {
    let package = if id.is_qualified() {
        let package = get_package(id.package_name());
        if package.is_none() {
            log::warn!(
                "When creating object {id}: the package '{}' could not be found.",
                id.package_name()
            );
        }
        package
    } else {
        None
    };

    if id.class_name().is_empty() {
        return Err(FreshError::UnknownClass(String::new()));
    }
    let class =
        get_class(id.class_name()).ok_or_else(|| FreshError::UnknownClass(id.class_name().to_owned()))?;

    create_object(package, &class, id.object_name(), properties)
}

/// Returns the object `id` names, creating it if no package can produce it.
///
/// Anonymous ids are never looked up. When the object is found and
/// `apply_if_found` is set, `properties` are applied to it.
pub fn create_or_get_object(
    id: &ObjectId,
    properties: Option<&PropertyMap>,
    apply_if_found: bool,
) -> Result<ObjectRef> {
    if !id.object_name().is_empty() {
        if let Some(found) = get_object(id)? {
            if let (Some(properties), true) = (properties, apply_if_found) {
                found.apply_properties(properties)?;
            }
            return Ok(found);
        }
    }
    create_object_by_id(id, properties)
}

/// Looks up the object `id` names.
///
/// A qualified id is requested from the named package. An unqualified id is
/// requested from the active package and then from each search package in
/// turn. "Requested" means a package may synthesise the object on a miss.
///
/// # Errors
///
/// [`FreshError::PackageNotFound`] if the id names an unknown package, and
/// any configuration error raised while a package synthesises the object.
pub fn get_object(id: &ObjectId) -> Result<Option<ObjectRef>> {
    if id.object_name().is_empty() {
        return Ok(None);
    }

    if id.is_qualified() {
        let package = get_package(id.package_name())
            .ok_or_else(|| FreshError::PackageNotFound(id.package_name().to_owned()))?;
        return package.request_object(id);
    }

    let active = active_package();
    if let Some(active) = &active {
        if let Some(found) = active.request_object(id)? {
            return Ok(Some(found));
        }
    }

    let mut outcome = Ok(None);
    for_each_search_package(|package| {
        if active.as_ref().is_some_and(|active| Rc::ptr_eq(active, package)) {
            return false;
        }
        outcome = package.request_object(id);
        !matches!(outcome, Ok(None))
    });
    outcome
}

/// Like [`get_object`], viewing the result as `T`.
pub fn get_object_of<T: Object>(id: &ObjectId) -> Result<Option<Rc<T>>> {
    Ok(get_object(id)?.and_then(downcast_object))
}

/// Returns every object accepted by `filter` across the searchable packages.
///
/// If the filter's package name is the name of an existing package, only
/// that package is searched. Otherwise the package name is a pattern, and
/// the active package and every search package whose name matches it
/// contribute.
pub fn get_filtered_objects(filter: &ObjectId) -> Result<Vec<ObjectRef>> {
    if let Some(package) = named_package(filter) {
        return package.find_filtered(&filter.unqualified());
    }

    let mut results = Vec::new();
    let active = active_package();
    if let Some(active) = &active {
        results.extend(active.find_filtered(filter)?);
    }

    let mut failure = None;
    for_each_search_package(|package| {
        if active.as_ref().is_some_and(|active| Rc::ptr_eq(active, package)) {
            return false;
        }
        match package.find_filtered(filter) {
            Ok(found) => {
                results.extend(found);
                false
            }
            Err(error) => {
                failure = Some(error);
                true
            }
        }
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(results),
    }
}

/// Like [`get_filtered_objects`], but searches every package known to the
/// root package rather than only the search packages.
pub fn get_filtered_objects_in_rooted_packages(filter: &ObjectId) -> Result<Vec<ObjectRef>> {
    if let Some(package) = named_package(filter) {
        return package.find_filtered(&filter.unqualified());
    }

    let mut results = Vec::new();
    for package in root_package().members() {
        if let Some(package) = downcast_object::<Package>(package) {
            results.extend(package.find_filtered(filter)?);
        }
    }
    Ok(results)
}

/// Like [`get_filtered_objects`], keeping only objects of type `T`.
pub fn get_filtered_objects_of<T: Object>(filter: &ObjectId) -> Result<Vec<Rc<T>>> {
    Ok(get_filtered_objects(filter)?
        .into_iter()
        .filter_map(downcast_object)
        .collect())
}

fn named_package(filter: &ObjectId) -> Option<Rc<Package>> {
    if filter.is_qualified() {
        get_package(filter.package_name())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{active_package, FixupCapturer};
    use crate::object::test_support::{register_things, Thing, SUB_THING_CLASS, THING_CLASS};
    use crate::object::{asset_class, OBJECT_CLASS};
    use crate::registry::{add_search_package, create_package};

    #[test]
    fn test_create_object_into_explicit_package() {
        // --- 1. SETUP ---
        let class = register_things();
        let package = create_package("level");
        let properties = PropertyMap::from([("size".to_owned(), "9".to_owned())]);

        // --- 2. ACTION ---
        let object =
            create_object(Some(package.clone()), &class, "crate", Some(&properties)).unwrap();

        // --- 3. ASSERTIONS ---
        assert!(package.has(&*object));
        let thing = object.downcast_ref::<Thing>().unwrap();
        assert_eq!(thing.size.get(), 9);
        assert_eq!(thing.post_loads.get(), 1);
        assert_eq!(thing.all_loads.get(), 1);
        assert!(active_package().is_none(), "The package scope must be closed again.");
    }

    #[test]
    fn test_create_object_uses_active_package() {
        register_things();
        let package = create_package("active");
        let object = {
            let _scope = ActivePackageScope::enter(package.clone());
            create_object_of::<Thing>(None, "implicit", None).unwrap()
        };
        assert!(package.has(&*object));
    }

    #[test]
    fn test_create_object_without_any_package() {
        let class = register_things();
        let object = create_object(None, &class, "loose", None).unwrap();
        assert!(object.downcast_ref::<Thing>().is_some());
        assert!(active_package().is_none());
    }

    #[test]
    fn test_abstract_class_is_rejected() {
        let result = create_object(None, &asset_class(), "nope", None);
        assert!(matches!(result, Err(FreshError::AbstractClass { .. })));
    }

    #[test]
    fn test_failed_configuration_leaves_no_member() {
        let class = register_things();
        let package = create_package("level");
        let properties = PropertyMap::from([("size".to_owned(), "huge".to_owned())]);

        let result = create_object(Some(package.clone()), &class, "broken", Some(&properties));

        assert!(matches!(result, Err(FreshError::InvalidProperty { .. })));
        assert!(package.is_empty());
    }

    #[test]
    fn test_create_by_id_validates_class() {
        let result = create_object_by_id(&ObjectId::new("", "x"), None);
        assert!(matches!(result, Err(FreshError::UnknownClass(name)) if name.is_empty()));
        let result = create_object_by_id(&ObjectId::new("Missing", "x"), None);
        assert!(matches!(result, Err(FreshError::UnknownClass(name)) if name == "Missing"));
    }

    #[test]
    fn test_create_by_qualified_id_targets_named_package() {
        register_things();
        let level = create_package("level");
        let object = create_object_by_id(&ObjectId::qualified("level", THING_CLASS, "x"), None).unwrap();
        assert!(level.has(&*object));

        // An unknown package is only a warning.
        let orphan =
            create_object_by_id(&ObjectId::qualified("ghost", THING_CLASS, "y"), None).unwrap();
        assert!(!level.has(&*orphan));
    }

    #[test]
    fn test_get_object_search_order() {
        // --- 1. SETUP ---
        register_things();
        let older = create_package("older");
        let newer = create_package("newer");
        let in_older = create_object_of::<Thing>(Some(older.clone()), "shared", None).unwrap();
        let in_newer = create_object_of::<Thing>(Some(newer.clone()), "shared", None).unwrap();
        add_search_package(&older);
        add_search_package(&newer);

        // --- 2. ACTION & ASSERTIONS ---
        let id = ObjectId::new(THING_CLASS, "shared");
        let found = get_object_of::<Thing>(&id).unwrap().unwrap();
        assert!(Rc::ptr_eq(&found, &in_newer), "The most recent search package wins.");

        let qualified = ObjectId::qualified("older", THING_CLASS, "shared");
        let found = get_object_of::<Thing>(&qualified).unwrap().unwrap();
        assert!(Rc::ptr_eq(&found, &in_older));

        let generic = ObjectId::new(OBJECT_CLASS, "shared");
        assert!(get_object(&generic).unwrap().is_some(), "Lookups match by kind.");

        assert!(get_object(&ObjectId::new(THING_CLASS, "absent")).unwrap().is_none());
    }

    #[test]
    fn test_get_object_with_unknown_package_is_an_error() {
        register_things();
        let result = get_object(&ObjectId::qualified("ghost", THING_CLASS, "x"));
        assert!(matches!(result, Err(FreshError::PackageNotFound(name)) if name == "ghost"));
    }

    #[test]
    fn test_create_or_get_reuses_and_reconfigures() {
        register_things();
        let package = create_package("level");
        add_search_package(&package);
        let original = create_object_of::<Thing>(Some(package.clone()), "box", None).unwrap();

        let id = ObjectId::new(THING_CLASS, "box");
        let properties = PropertyMap::from([("size".to_owned(), "4".to_owned())]);
        let again = create_or_get_object(&id, Some(&properties), true).unwrap();

        assert!(std::ptr::addr_eq(Rc::as_ptr(&again), Rc::as_ptr(&original)));
        assert_eq!(original.size.get(), 4);
    }

    #[test]
    fn test_filtered_lookup_across_packages() {
        register_things();
        let a = create_package("zone-a");
        let b = create_package("zone-b");
        let other = create_package("other");
        for package in [&a, &b, &other] {
            package.retain_members();
        }
        create_object_of::<Thing>(Some(a.clone()), "rock1", None).unwrap();
        create_object_of::<Thing>(Some(b.clone()), "rock2", None).unwrap();
        create_object_of::<Thing>(Some(other.clone()), "rock3", None).unwrap();
        let sub = get_class(SUB_THING_CLASS).unwrap();
        create_object(Some(b.clone()), &sub, "pebble", None).unwrap();
        for package in [&a, &b, &other] {
            add_search_package(package);
        }

        let rocks = get_filtered_objects(&ObjectId::new(THING_CLASS, "rock.*")).unwrap();
        assert_eq!(rocks.len(), 3);

        let zoned = get_filtered_objects(&ObjectId::qualified("zone-.*", THING_CLASS, "")).unwrap();
        assert_eq!(zoned.len(), 3);

        let named = get_filtered_objects_of::<Thing>(&ObjectId::qualified("zone-b", "", "")).unwrap();
        assert_eq!(named.len(), 2);

        remove_all(&[&a, &b, &other]);
        assert!(get_filtered_objects(&ObjectId::new(THING_CLASS, "")).unwrap().is_empty());
        let rooted =
            get_filtered_objects_in_rooted_packages(&ObjectId::new(THING_CLASS, "")).unwrap();
        assert_eq!(rooted.len(), 4);
    }

    fn remove_all(packages: &[&Rc<Package>]) {
        for package in packages {
            crate::registry::remove_search_package(package);
        }
    }

    #[test]
    fn test_capture_outside_any_package_still_creates() {
        let class = register_things();
        let _capture = FixupCapturer::new("test: ");
        let object = create_object(None, &class, "captured", None).unwrap();
        let temp = active_package().unwrap();
        assert!(temp.has(&*object), "The capture's temporary package receives the object.");
    }
}
