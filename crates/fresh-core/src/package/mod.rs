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

//! Packages: named, ordered containers that own or observe their objects.
//!
//! A [`Package`] stores its members as [`SwitchPtr`]s. In *retained* mode it
//! keeps every member alive; in *released* mode it only observes them, and a
//! member disappears once nothing else holds it. The dead slots ("slop") that
//! released mode leaves behind are compacted by [`Package::tidy`] or, a few
//! at a time, by [`Package::quick_tidy`].
//!
//! What a package does on a lookup miss and how it weighs zombies for
//! eviction is delegated to its [`PackageBehavior`].

mod behavior;
mod manifest;

pub use behavior::*;
pub use manifest::*;

use crate::context::{active_package, ActivePackageScope, FixupCapturer};
use crate::error::{FreshError, Result};
use crate::object::{
    class_of, downcast_object, get_class, package_class, same_object, AsAny, ClassInfo,
    NameFilter, Object, ObjectClass, ObjectCore, ObjectId, ObjectRef,
};
use crate::objects::create_or_get_object;
use crate::switch_ptr::SwitchPtr;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Marks the generated suffix appended by [`Package::unique_name`].
const MANGLING_TOKEN: &str = "~x";

static NEXT_UNIQUE_ORDINAL: AtomicU64 = AtomicU64::new(1);

/// How [`Package::merge`] resolves a name collision with an existing member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// Keep the existing member and drop the incoming object.
    IgnoreNew,
    /// Remove the existing member and add the incoming object.
    ReplaceExisting,
    /// Rename the incoming object to a unique name and keep both.
    KeepBothRenamingNew,
}

struct PackageState {
    retained: bool,
    loading: bool,
    members: Vec<SwitchPtr<dyn Object>>,
    next_quick_tidy: usize,
}

/// A named, ordered collection of objects. A package is itself an object.
pub struct Package {
    core: ObjectCore,
    behavior: Box<dyn PackageBehavior>,
    state: RefCell<PackageState>,
}

impl Package {
    /// Creates a plain package in released mode.
    ///
    /// The package is not registered anywhere; use
    /// [`create_package`](crate::create_package) to make it findable by name.
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self::from_core(
            ObjectCore::new(package_class(), name),
            Box::new(DefaultPackageBehavior),
        ))
    }

    /// Creates a package of `class` driven by `behavior`.
    pub fn with_behavior(
        class: Rc<ClassInfo>,
        name: &str,
        behavior: Box<dyn PackageBehavior>,
    ) -> Rc<Self> {
        debug_assert!(class.is_kind_of(&package_class()));
        Rc::new(Self::from_core(ObjectCore::new(class, name), behavior))
    }

    /// Builds a package around an existing core. Used by class factories.
    pub fn from_core(core: ObjectCore, behavior: Box<dyn PackageBehavior>) -> Self {
        Self {
            core,
            behavior,
            state: RefCell::new(PackageState {
                retained: false,
                loading: false,
                members: Vec::new(),
                next_quick_tidy: 0,
            }),
        }
    }

    /// The package name.
    pub fn name(&self) -> String {
        self.core.name()
    }

    /// The policy object driving this package.
    pub fn behavior(&self) -> &dyn PackageBehavior {
        &*self.behavior
    }

    /// The policy object, if it is of type `B`.
    pub fn behavior_as<B: PackageBehavior>(&self) -> Option<&B> {
        AsAny::as_any(&*self.behavior).downcast_ref::<B>()
    }

    // --- Lookup ---

    /// Returns `true` if `object` is a live member.
    pub fn has(&self, object: &dyn Object) -> bool {
        self.state
            .borrow()
            .members
            .iter()
            .any(|member| member.points_to(object))
    }

    /// Finds the first member named `name` whose class is `class` or derives
    /// from it. Never creates anything.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn find_generic(&self, class: &ClassInfo, name: &str) -> Option<ObjectRef> {
        assert!(!name.is_empty(), "find_generic requires a non-empty name");
        self.state
            .borrow()
            .members
            .iter()
            .filter_map(SwitchPtr::get)
            .find(|member| member.has_name(name) && member.is_a(class))
    }

    /// Finds a member of type `T` by name.
    pub fn find<T: ObjectClass>(&self, name: &str) -> Option<Rc<T>> {
        let class = class_of::<T>()?;
        self.find_generic(&class, name).and_then(downcast_object)
    }

    /// Finds a member by id. The id's package qualifier is ignored.
    pub fn find_object(&self, id: &ObjectId) -> Option<ObjectRef> {
        let class = get_class(id.class_name())?;
        self.find_generic(&class, id.object_name())
    }

    /// Finds a member by id and views it as `T`.
    pub fn find_by_id<T: Object>(&self, id: &ObjectId) -> Option<Rc<T>> {
        self.find_object(id).and_then(downcast_object)
    }

    /// Like [`find_generic`](Self::find_generic), but lets the package's
    /// behavior synthesise the object on a miss.
    pub fn request_generic(
        self: &Rc<Self>,
        class: &Rc<ClassInfo>,
        name: &str,
    ) -> Result<Option<ObjectRef>> {
        self.behavior.request_generic(self, class, name)
    }

    /// Requests a member of type `T` by name.
    pub fn request<T: ObjectClass>(self: &Rc<Self>, name: &str) -> Result<Option<Rc<T>>> {
        let class =
            get_class(T::CLASS_NAME).ok_or_else(|| FreshError::UnknownClass(T::CLASS_NAME.into()))?;
        Ok(self.request_generic(&class, name)?.and_then(downcast_object))
    }

    /// Requests a member by id. The id's package qualifier is ignored.
    pub fn request_object(self: &Rc<Self>, id: &ObjectId) -> Result<Option<ObjectRef>> {
        let class = get_class(id.class_name())
            .ok_or_else(|| FreshError::UnknownClass(id.class_name().to_owned()))?;
        self.request_generic(&class, id.object_name())
    }

    /// Returns every member accepted by `filter`.
    ///
    /// The filter's class name, when not empty, must exactly equal a class
    /// in the member's hierarchy. Its object name and package name are
    /// whole-name regular expressions; the package name is matched against
    /// this package's own name.
    pub fn find_filtered(&self, filter: &ObjectId) -> Result<Vec<ObjectRef>> {
        let package_filter = NameFilter::new(filter.package_name())?;
        if !package_filter.is_match(&self.name()) {
            return Ok(Vec::new());
        }
        let name_filter = NameFilter::new(filter.object_name())?;
        Ok(self
            .live_members()
            .into_iter()
            .filter(|member| member.matches_filters(filter.class_name(), &name_filter))
            .collect())
    }

    /// Like [`find_filtered`](Self::find_filtered), keeping only members of type `T`.
    pub fn find_filtered_of<T: Object>(&self, filter: &ObjectId) -> Result<Vec<Rc<T>>> {
        Ok(self
            .find_filtered(filter)?
            .into_iter()
            .filter_map(downcast_object)
            .collect())
    }

    // --- Membership ---

    /// Adds `object` with the package's current retention mode.
    ///
    /// # Panics
    ///
    /// Panics if `object` is this package, is already a member, or shares
    /// its id with an existing member.
    pub fn add(&self, object: ObjectRef) {
        assert!(
            !same_object(&*object, self),
            "package '{}' cannot contain itself",
            self.name()
        );
        assert!(
            !self.has(&*object),
            "{object:?} is already a member of package '{}'",
            self.name()
        );
        let id = object.object_id();
        assert!(
            !self.has_member_with_id(&id),
            "package '{}' already has a member with id {id}",
            self.name()
        );

        self.quick_tidy();

        let mut state = self.state.borrow_mut();
        let retained = state.retained;
        state.members.push(SwitchPtr::with_mode(object, retained));
        log::trace!("Added {id} to package '{}'", self.core.name());
    }

    /// Adds each object in turn.
    pub fn add_all(&self, objects: impl IntoIterator<Item = ObjectRef>) {
        for object in objects {
            self.add(object);
        }
    }

    /// Adds `object`, resolving a collision with a same-named member of a
    /// related class according to `policy`.
    ///
    /// # Panics
    ///
    /// Panics if `object` is this package or is already a member.
    pub fn merge(&self, object: ObjectRef, policy: MergePolicy) {
        assert!(
            !same_object(&*object, self),
            "package '{}' cannot contain itself",
            self.name()
        );
        assert!(
            !self.has(&*object),
            "{object:?} is already a member of package '{}'",
            self.name()
        );

        if let Some(existing) = self.find_generic(object.class(), &object.name()) {
            match policy {
                MergePolicy::IgnoreNew => return,
                MergePolicy::ReplaceExisting => self.remove(&*existing),
                MergePolicy::KeepBothRenamingNew => {
                    let unique = self.unique_name(object.class(), &object.name());
                    object.rename(&unique);
                }
            }
        }

        self.add(object);
    }

    /// Merges each object in turn.
    pub fn merge_all(&self, objects: impl IntoIterator<Item = ObjectRef>, policy: MergePolicy) {
        for object in objects {
            self.merge(object, policy);
        }
    }

    /// Merges every member of `other` that is not already a member here.
    /// Merging a package into itself does nothing.
    pub fn merge_package(&self, other: &Package, policy: MergePolicy) {
        if std::ptr::eq(self, other) {
            return;
        }
        for member in other.members() {
            if !self.has(&*member) {
                self.merge(member, policy);
            }
        }
    }

    /// Removes `object` from the package. The object itself lives on if
    /// something else holds it.
    ///
    /// # Panics
    ///
    /// Panics if `object` is not a member.
    pub fn remove(&self, object: &dyn Object) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let index = state
                .members
                .iter()
                .position(|member| member.points_to(object));
            let Some(index) = index else {
                drop(state);
                panic!("{object:?} is not a member of package '{}'", self.name());
            };
            if index < state.next_quick_tidy {
                state.next_quick_tidy -= 1;
            }
            state.members.remove(index)
        };
        // The slot may hold the last strong reference; let it go outside the borrow.
        drop(removed);
    }

    /// Pulls into the package every object reachable from the members
    /// through [`Object::referenced_objects`] that `filter` accepts.
    ///
    /// Rejected objects are not traversed further. An object whose id
    /// collides with an existing member is skipped with a warning. Returns
    /// the number of objects added.
    pub fn collect(&self, mut filter: impl FnMut(&dyn Object) -> bool) -> usize {
        let mut pending: VecDeque<ObjectRef> = self.live_members().into();
        let mut visited = HashSet::new();
        // Keeps visited objects alive so their addresses stay unique.
        let mut seen = Vec::new();
        let mut added = 0;

        while let Some(object) = pending.pop_front() {
            if !visited.insert(Rc::as_ptr(&object) as *const ()) {
                continue;
            }
            seen.push(Rc::clone(&object));

            if same_object(&*object, self) || !filter(&*object) {
                continue;
            }

            if !self.has(&*object) {
                if self.has_member_with_id(&object.object_id()) {
                    log::warn!(
                        "Package '{}' cannot collect {object:?}: a member already has that id.",
                        self.name()
                    );
                    continue;
                }
                self.add(Rc::clone(&object));
                added += 1;
            }

            pending.extend(object.referenced_objects());
        }
        added
    }

    /// Returns a name based on `name` that no member of `class` uses.
    ///
    /// A previous `~x<hex>` suffix is stripped before a new one is appended.
    pub fn unique_name(&self, class: &ClassInfo, name: &str) -> String {
        assert!(!name.is_empty(), "unique_name requires a non-empty name");

        let base = name.find(MANGLING_TOKEN).map_or(name, |pos| &name[..pos]);
        let mut candidate = name.to_owned();
        while self.find_generic(class, &candidate).is_some() {
            let ordinal = NEXT_UNIQUE_ORDINAL.fetch_add(1, Ordering::Relaxed);
            candidate = format!("{base}{MANGLING_TOKEN}{ordinal:x}");
        }
        candidate
    }

    // --- Retention ---

    /// Returns `true` if members are held strongly.
    pub fn are_members_retained(&self) -> bool {
        self.state.borrow().retained
    }

    /// Switches to retained mode, promoting every existing member.
    pub fn retain_members(&self) {
        let mut state = self.state.borrow_mut();
        if !state.retained {
            state.members.iter_mut().for_each(SwitchPtr::retain);
            state.retained = true;
        }
    }

    /// Switches to released mode, demoting every existing member, then tidies.
    pub fn release_members(&self) {
        let held: Vec<ObjectRef> = {
            let mut state = self.state.borrow_mut();
            if !state.retained {
                return;
            }
            let held = state.members.iter().filter_map(SwitchPtr::get).collect();
            state.members.iter_mut().for_each(SwitchPtr::release);
            state.retained = false;
            held
        };
        // Members nobody else owns die here, after the borrow ends.
        drop(held);
        self.tidy();
    }

    /// Releases retained members that nothing outside this package holds,
    /// largest first, until at least `min_bytes_to_reduce` bytes (as measured
    /// by the behavior) have been freed. A target of `0` releases every
    /// such member.
    ///
    /// Releasing a member can leave others unreferenced, so the pass repeats
    /// while it still makes progress toward the target. Returns the number
    /// of bytes freed.
    ///
    /// # Panics
    ///
    /// Panics if the package is not in retained mode.
    pub fn release_retained_zombies(&self, min_bytes_to_reduce: usize) -> usize {
        assert!(
            self.are_members_retained(),
            "release_retained_zombies requires package '{}' to retain its members",
            self.name()
        );

        let mut total_freed = 0;
        let mut remaining = min_bytes_to_reduce;

        loop {
            self.tidy();

            let mut zombies: Vec<ObjectRef> = self
                .state
                .borrow()
                .members
                .iter()
                .filter(|member| member.is_retained() && member.strong_count() == 1)
                .filter_map(SwitchPtr::get)
                .collect();
            if zombies.is_empty() {
                break;
            }
            self.behavior.sort_zombies(&mut zombies);

            let mut freed = 0;
            let mut released = Vec::new();
            for zombie in zombies {
                if min_bytes_to_reduce != 0 && freed >= remaining {
                    break;
                }
                let bytes = self.behavior.zombie_size_bytes(&*zombie);
                freed += bytes;
                if let Some(slot) = self
                    .state
                    .borrow_mut()
                    .members
                    .iter_mut()
                    .find(|member| member.points_to(&*zombie))
                {
                    slot.release();
                }
                log::trace!("Releasing zombie {zombie:?} ({bytes} bytes)");
                released.push(zombie);
            }

            let released_any = !released.is_empty();
            // Dropping the last strong handles destroys the zombies.
            drop(released);
            total_freed += freed;

            if !released_any {
                break;
            }
            if min_bytes_to_reduce != 0 {
                if freed == 0 || freed >= remaining {
                    break;
                }
                remaining -= freed;
            }
        }

        self.tidy();
        log::debug!(
            "Package '{}' released zombies, freeing {total_freed} bytes.",
            self.name()
        );
        total_freed
    }

    // --- Compaction ---

    /// The number of slots whose object has died.
    pub fn num_null_members(&self) -> usize {
        self.state
            .borrow()
            .members
            .iter()
            .filter(|member| member.is_null())
            .count()
    }

    /// Removes every dead slot.
    pub fn tidy(&self) {
        let mut state = self.state.borrow_mut();
        state.members.retain(|member| !member.is_null());
        if state.next_quick_tidy > state.members.len() {
            state.next_quick_tidy = 0;
        }
    }

    /// Removes dead slots from the next small window of the member list,
    /// resuming where the previous call stopped.
    pub fn quick_tidy(&self) {
        let mut state = self.state.borrow_mut();
        let count = self.behavior.quick_tidy_size(state.members.len());
        if count == 0 {
            return;
        }

        let len = state.members.len();
        let begin = if state.next_quick_tidy >= len {
            0
        } else {
            state.next_quick_tidy
        };
        let mut end = (begin + count).min(len);

        let mut index = begin;
        while index < end {
            if state.members[index].is_null() {
                state.members.remove(index);
                end -= 1;
            } else {
                index += 1;
            }
        }
        state.next_quick_tidy = end;
    }

    /// The number of live members. Tidies first.
    pub fn len(&self) -> usize {
        self.tidy();
        self.state.borrow().members.len()
    }

    /// Returns `true` if there are no live members. Tidies first.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the live members, in insertion order. Tidies first.
    pub fn members(&self) -> Vec<ObjectRef> {
        self.tidy();
        self.live_members()
    }

    /// Calls `f` on a snapshot of the members, so `f` may change the package.
    pub fn for_each_member(&self, mut f: impl FnMut(&ObjectRef)) {
        for member in self.members() {
            f(&member);
        }
    }

    /// Calls `f` on each member whose concrete type is `T`.
    pub fn for_each_member_of_type<T: Object>(&self, mut f: impl FnMut(&Rc<T>)) {
        for member in self.members() {
            if let Some(typed) = downcast_object::<T>(member) {
                f(&typed);
            }
        }
    }

    // --- Loading & saving ---

    /// Returns `true` while a manifest load is in progress.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Creates (or reconfigures) every object a manifest declares.
    ///
    /// The package is active for the duration of the load and references
    /// between declared objects are resolved once all of them exist. Only
    /// then does every member get `post_load` and, after that,
    /// `on_all_loaded`. An object that fails to be created is reported and
    /// skipped. Returns the declared objects that were created or found.
    pub fn load_manifest(self: &Rc<Self>, manifest: &PackageManifest) -> Vec<ObjectRef> {
        self.tidy();
        self.state.borrow_mut().loading = true;
        log::debug!(
            "Package '{}' loading {} object(s).",
            self.name(),
            manifest.objects.len()
        );

        let already_active = active_package().is_some_and(|active| Rc::ptr_eq(&active, self));
        let scope = (!already_active).then(|| ActivePackageScope::enter(Rc::clone(self)));

        let mut objects = Vec::with_capacity(manifest.objects.len());
        {
            let _capture =
                FixupCapturer::for_package(format!("While loading package '{}': ", self.name()));
            for decl in &manifest.objects {
                let id = decl.object_id();
                match create_or_get_object(&id, Some(&decl.properties), true) {
                    Ok(object) => objects.push(object),
                    Err(error) => log::error!(
                        "Package '{}' failed to create {id}: {error}",
                        self.name()
                    ),
                }
            }
        }

        self.for_each_member(|member| member.post_load());
        self.for_each_member(|member| member.on_all_loaded());

        self.state.borrow_mut().loading = false;
        drop(scope);
        self.tidy();
        objects
    }

    /// Loads a `.ron` manifest file into the package.
    pub fn load_file(self: &Rc<Self>, path: &Path) -> Result<Vec<ObjectRef>> {
        let supported = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case(MANIFEST_EXTENSION));
        if !supported {
            return Err(FreshError::UnsupportedFormat(path.to_path_buf()));
        }
        let manifest = PackageManifest::load(path)?;
        Ok(self.load_manifest(&manifest))
    }

    /// Describes the members as a manifest.
    pub fn to_manifest(&self) -> PackageManifest {
        PackageManifest {
            objects: self
                .members()
                .iter()
                .map(|member| ObjectDecl {
                    class: member.class_name().to_owned(),
                    name: member.name(),
                    properties: member.properties(),
                })
                .collect(),
        }
    }

    /// Writes the members to a `.ron` manifest file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_manifest().to_ron_string()?;
        std::fs::write(path, text)?;
        log::debug!("Saved package '{}' to {}", self.name(), path.display());
        Ok(())
    }

    // --- Internals ---

    fn live_members(&self) -> Vec<ObjectRef> {
        self.state
            .borrow()
            .members
            .iter()
            .filter_map(SwitchPtr::get)
            .collect()
    }

    fn has_member_with_id(&self, id: &ObjectId) -> bool {
        self.state
            .borrow()
            .members
            .iter()
            .filter_map(SwitchPtr::get)
            .any(|member| member.class_name() == id.class_name() && member.has_name(id.object_name()))
    }
}

impl Object for Package {
    fn core(&self) -> &ObjectCore {
        &self.core
    }
}

impl ObjectClass for Package {
    const CLASS_NAME: &'static str = crate::object::PACKAGE_CLASS;
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Package")
            .field("name", &self.core.name())
            .field("class", &self.core.class().name())
            .field("retained", &state.retained)
            .field("loading", &state.loading)
            .field("slots", &state.members.len())
            .finish()
    }
}
