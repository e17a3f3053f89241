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

//! Process-wide packages: the root, the transient package and the search list.
//!
//! - The **root package** (`~`) holds every package made with
//!   [`create_package`], weakly, so [`get_package`] can find packages by name
//!   without keeping them alive.
//! - The **transient package** (`~transient`) is a scratch package for objects
//!   that should not be found by unqualified lookups.
//! - The **search packages** are consulted, most recently added first, by
//!   unqualified lookups such as [`get_object`](crate::get_object).
//!
//! Like the rest of the load context this state is per thread.

use crate::context::FixupSuppressor;
use crate::error::{FreshError, Result};
use crate::object::{downcast_object, ClassInfo, ObjectClass};
use crate::objects::create_object;
use crate::package::Package;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::{Rc, Weak};

/// Name of the root package.
pub const ROOT_PACKAGE_NAME: &str = "~";
/// Name of the transient package.
pub const TRANSIENT_PACKAGE_NAME: &str = "~transient";

thread_local! {
    static ROOT: Rc<Package> = Package::new(ROOT_PACKAGE_NAME);
    static TRANSIENT: RefCell<Option<Rc<Package>>> = const { RefCell::new(None) };
    static SEARCH: RefCell<VecDeque<Weak<Package>>> = const { RefCell::new(VecDeque::new()) };
}

/// The package that (weakly) contains every package created by name.
pub fn root_package() -> Rc<Package> {
    ROOT.with(Rc::clone)
}

/// The scratch package, created on first use and kept for the thread's lifetime.
pub fn transient_package() -> Rc<Package> {
    if let Some(package) = TRANSIENT.with(|transient| transient.borrow().clone()) {
        return package;
    }
    let package = create_package(TRANSIENT_PACKAGE_NAME);
    TRANSIENT.with(|transient| *transient.borrow_mut() = Some(Rc::clone(&package)));
    package
}

/// Finds a live package by name.
///
/// # Panics
///
/// Panics if `name` is empty.
pub fn get_package(name: &str) -> Option<Rc<Package>> {
    root_package().find::<Package>(name)
}

/// Creates a plain package and registers it with the root package.
///
/// The caller owns the package: the root only observes it.
///
/// # Panics
///
/// Panics if a package named `name` is already registered.
pub fn create_package(name: &str) -> Rc<Package> {
    let _suppress = FixupSuppressor::new();
    let package = Package::new(name);
    root_package().add(package.clone());
    log::debug!("Created package '{}'", package.name());
    package
}

/// Creates a package of a registered package class and registers it with
/// the root package.
///
/// # Errors
///
/// Fails if the class is abstract or does not construct a [`Package`].
pub fn create_package_of(class: &Rc<ClassInfo>, name: &str) -> Result<Rc<Package>> {
    let _suppress = FixupSuppressor::new();
    let object = create_object(Some(root_package()), class, name, None)?;
    let Some(package) = downcast_object::<Package>(object.clone()) else {
        root_package().remove(&*object);
        return Err(FreshError::NotKindOf {
            class: class.name().to_owned(),
            required: Package::CLASS_NAME.to_owned(),
        });
    };
    log::debug!("Created {} '{}'", class.name(), package.name());
    Ok(package)
}

/// Creates a package, retains its members and loads a manifest file into it.
pub fn load_package(path: &Path, name: &str) -> Result<Rc<Package>> {
    let package = create_package(name);
    package.retain_members();
    package.load_file(path)?;
    Ok(package)
}

fn prune_search_packages(packages: &mut VecDeque<Weak<Package>>) {
    packages.retain(|package| package.strong_count() > 0);
}

/// Adds `package` to the front of the search list. Adding a package that
/// is already listed does nothing.
pub fn add_search_package(package: &Rc<Package>) {
    if package.name() == TRANSIENT_PACKAGE_NAME {
        log::warn!("Adding the {TRANSIENT_PACKAGE_NAME} package to the search packages. Is that really intended?");
    }
    SEARCH.with(|search| {
        let mut packages = search.borrow_mut();
        prune_search_packages(&mut packages);
        let weak = Rc::downgrade(package);
        if !packages.iter().any(|listed| listed.ptr_eq(&weak)) {
            packages.push_front(weak);
        }
    });
}

/// Removes `package` from the search list, if present.
pub fn remove_search_package(package: &Rc<Package>) {
    SEARCH.with(|search| {
        let mut packages = search.borrow_mut();
        prune_search_packages(&mut packages);
        let weak = Rc::downgrade(package);
        packages.retain(|listed| !listed.ptr_eq(&weak));
    });
}

/// A snapshot of the live search packages, most recently added first.
pub fn search_packages() -> Vec<Rc<Package>> {
    SEARCH.with(|search| {
        let mut packages = search.borrow_mut();
        prune_search_packages(&mut packages);
        packages.iter().filter_map(Weak::upgrade).collect()
    })
}

/// Calls `f` on each search package, most recently added first, until it
/// returns `true`.
///
/// `f` may add or remove search packages. A package removed during the
/// traversal is not visited afterwards; a package added during it is not
/// visited at all.
pub fn for_each_search_package(mut f: impl FnMut(&Rc<Package>) -> bool) {
    for package in search_packages() {
        let still_listed = SEARCH.with(|search| {
            let weak = Rc::downgrade(&package);
            search.borrow().iter().any(|listed| listed.ptr_eq(&weak))
        });
        if still_listed && f(&package) {
            break;
        }
    }
}
