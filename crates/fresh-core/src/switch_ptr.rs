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

//! A reference that switches between owning and observing its target.

use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

/// Holds a shared object either strongly ("retained") or weakly ("released").
///
/// Exactly one of the two slots is in use at any time, which the enum makes
/// structural. A retained pointer keeps its target alive; a released pointer
/// observes it and reads as null once every other owner is gone.
///
/// This is what lets a [`Package`](crate::Package) act either as an owning
/// container or as a cache without changing its storage.
pub enum SwitchPtr<T: ?Sized> {
    /// Owns a strong reference.
    Retained(Option<Rc<T>>),
    /// Observes the target through a weak reference.
    Released(Option<Weak<T>>),
}

impl<T: ?Sized> SwitchPtr<T> {
    /// Creates a retained pointer to `target`.
    pub fn new(target: Rc<T>) -> Self {
        Self::Retained(Some(target))
    }

    /// Creates a pointer to `target` that is retained or released as requested.
    pub fn with_mode(target: Rc<T>, retained: bool) -> Self {
        if retained {
            Self::Retained(Some(target))
        } else {
            Self::Released(Some(Rc::downgrade(&target)))
        }
    }

    /// Returns `true` if the pointer currently owns its target.
    pub fn is_retained(&self) -> bool {
        matches!(self, Self::Retained(_))
    }

    /// Promotes a released pointer to a retained one.
    ///
    /// Does nothing when already retained. If the observed target has already
    /// been destroyed, the pointer becomes a null retained pointer.
    pub fn retain(&mut self) {
        if let Self::Released(weak) = self {
            let strong = weak.as_ref().and_then(Weak::upgrade);
            *self = Self::Retained(strong);
        }
    }

    /// Demotes a retained pointer to a released one.
    ///
    /// Does nothing when already released. The target survives only if
    /// something else still owns it.
    pub fn release(&mut self) {
        if let Self::Retained(strong) = self {
            let weak = strong.as_ref().map(Rc::downgrade);
            *self = Self::Released(weak);
        }
    }

    /// Resolves the pointer to a strong handle, or `None` if it is null.
    pub fn get(&self) -> Option<Rc<T>> {
        match self {
            Self::Retained(strong) => strong.clone(),
            Self::Released(weak) => weak.as_ref().and_then(Weak::upgrade),
        }
    }

    /// Returns `true` if the pointer is empty or its target is gone.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Retained(strong) => strong.is_none(),
            Self::Released(weak) => weak.as_ref().map_or(true, |weak| weak.strong_count() == 0),
        }
    }

    /// Returns `true` if the pointer resolves to the object at `target`.
    ///
    /// Only the address is compared, so `target` may be viewed through any
    /// type, such as a trait object of a different lifetime.
    pub fn points_to<U: ?Sized>(&self, target: &U) -> bool {
        self.address() == Some(target as *const U as *const ())
    }

    /// The number of strong references to the target, `0` when null.
    pub fn strong_count(&self) -> usize {
        match self {
            Self::Retained(strong) => strong.as_ref().map_or(0, Rc::strong_count),
            Self::Released(weak) => weak.as_ref().map_or(0, Weak::strong_count),
        }
    }

    fn address(&self) -> Option<*const ()> {
        if self.is_null() {
            return None;
        }
        match self {
            Self::Retained(strong) => strong.as_ref().map(|rc| Rc::as_ptr(rc) as *const ()),
            Self::Released(weak) => weak.as_ref().map(|weak| weak.as_ptr() as *const ()),
        }
    }
}

impl<T: ?Sized> Default for SwitchPtr<T> {
    fn default() -> Self {
        Self::Released(None)
    }
}

impl<T: ?Sized> Clone for SwitchPtr<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Retained(strong) => Self::Retained(strong.clone()),
            Self::Released(weak) => Self::Released(weak.clone()),
        }
    }
}

impl<T: ?Sized> From<Rc<T>> for SwitchPtr<T> {
    fn from(target: Rc<T>) -> Self {
        Self::new(target)
    }
}

impl<T: ?Sized> PartialEq for SwitchPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<T: ?Sized> Eq for SwitchPtr<T> {}

impl<T: ?Sized> PartialOrd for SwitchPtr<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for SwitchPtr<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address().cmp(&other.address())
    }
}

impl<T: ?Sized> fmt::Debug for SwitchPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_retained() { "Retained" } else { "Released" };
        f.debug_tuple(mode).field(&self.address()).finish()
    }
}
