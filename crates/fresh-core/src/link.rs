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

//! Typed references to other objects that can be resolved late.
//!
//! An [`ObjectLink`] remembers the [`ObjectId`] it was bound to. If the
//! target already exists the link resolves at once. If it does not and a
//! fixup capture is open (for example while a package manifest is loading),
//! the link queues itself and is resolved when the outermost capture closes,
//! by which point forward references have usually been created.

use crate::context::{defer_fixup, is_capturing_fixups, PendingFixup};
use crate::object::{downcast_object, Object, ObjectId, ObjectRef};
use crate::objects::get_object;
use crate::switch_ptr::SwitchPtr;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

struct LinkSlot<T> {
    id: RefCell<ObjectId>,
    target: RefCell<SwitchPtr<dyn Object>>,
    retained: bool,
    _target_type: PhantomData<fn() -> T>,
}

impl<T: Object> LinkSlot<T> {
    fn resolve_now(&self) -> bool {
        let id = self.id.borrow().clone();
        let found = match get_object(&id) {
            Ok(found) => found,
            Err(error) => {
                log::warn!("Could not resolve link to {id}: {error}");
                None
            }
        };

        match found {
            Some(object) if object.is::<T>() => {
                *self.target.borrow_mut() = SwitchPtr::with_mode(object, self.retained);
                true
            }
            Some(object) => {
                log::warn!(
                    "Link to {id} found {object:?}, which is not a {}",
                    std::any::type_name::<T>()
                );
                false
            }
            None => false,
        }
    }
}

impl<T: Object> PendingFixup for LinkSlot<T> {
    fn describe(&self) -> String {
        self.id.borrow().to_string()
    }

    fn try_resolve(&self) -> bool {
        // Rebinding or clearing the link while it waited makes the fixup moot.
        if self.id.borrow().is_null() || !self.target.borrow().is_null() {
            return true;
        }
        self.resolve_now()
    }
}

/// A reference to an object of type `T`, bound by id.
pub struct ObjectLink<T: Object> {
    slot: Rc<LinkSlot<T>>,
}

impl<T: Object> ObjectLink<T> {
    fn with_retention(retained: bool) -> Self {
        Self {
            slot: Rc::new(LinkSlot {
                id: RefCell::new(ObjectId::null()),
                target: RefCell::new(SwitchPtr::default()),
                retained,
                _target_type: PhantomData,
            }),
        }
    }

    /// Creates an unbound link that keeps its target alive once resolved.
    pub fn new() -> Self {
        Self::with_retention(true)
    }

    /// Creates an unbound link that only observes its target.
    pub fn weak() -> Self {
        Self::with_retention(false)
    }

    /// Binds the link to `id`.
    ///
    /// The target is looked up at once. On a miss inside a fixup capture the
    /// link is queued and resolved when the capture closes; outside a
    /// capture it stays unresolved until [`resolve`](Self::resolve) is called.
    pub fn bind(&self, id: ObjectId) {
        *self.slot.target.borrow_mut() = SwitchPtr::default();
        *self.slot.id.borrow_mut() = id;
        if self.slot.id.borrow().is_null() {
            return;
        }

        if self.slot.resolve_now() {
            return;
        }

        if is_capturing_fixups() {
            let slot: Rc<dyn PendingFixup> = self.slot.clone();
            let pending: Weak<dyn PendingFixup> = Rc::downgrade(&slot);
            defer_fixup(pending);
        } else {
            log::warn!("Link to {} could not be resolved.", self.slot.id.borrow());
        }
    }

    /// Retries the lookup for a bound but unresolved link.
    pub fn resolve(&self) -> bool {
        self.slot.try_resolve()
    }

    /// Points the link straight at `target`, or clears it with `None`.
    pub fn set(&self, target: Option<Rc<T>>) {
        match target {
            Some(target) => {
                let object: ObjectRef = target;
                *self.slot.id.borrow_mut() = object.object_id();
                *self.slot.target.borrow_mut() = SwitchPtr::with_mode(object, self.slot.retained);
            }
            None => self.clear(),
        }
    }

    /// Unbinds the link.
    pub fn clear(&self) {
        *self.slot.id.borrow_mut() = ObjectId::null();
        *self.slot.target.borrow_mut() = SwitchPtr::default();
    }

    /// The target, if resolved and still alive.
    pub fn get(&self) -> Option<Rc<T>> {
        self.get_object().and_then(downcast_object)
    }

    /// The target as an untyped object handle.
    pub fn get_object(&self) -> Option<ObjectRef> {
        self.slot.target.borrow().get()
    }

    /// The id the link is bound to; the null id when unbound.
    pub fn id(&self) -> ObjectId {
        self.slot.id.borrow().clone()
    }

    /// Returns `true` if the link currently points at a live object.
    pub fn is_resolved(&self) -> bool {
        !self.slot.target.borrow().is_null()
    }
}

impl<T: Object> Default for ObjectLink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object> fmt::Debug for ObjectLink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectLink")
            .field("id", &*self.slot.id.borrow())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
