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

//! The load context: the active-package stack and deferred fixup capture.
//!
//! Object construction deep in a call chain needs to know which package
//! receives new objects, and serialized graphs routinely refer forward to
//! objects that do not exist yet. Both concerns live here:
//!
//! - The **active-package stack** names the package that implicitly receives
//!   new objects. [`ActivePackageScope`] pushes and pops it.
//! - A [`FixupCapturer`] scope defers reference resolution. Links bound while
//!   a capture is open and whose target is missing are queued, and the
//!   outermost capturer resolves the queue when it closes.
//! - A [`FixupSuppressor`] scope turns capture off for nested work that must
//!   resolve synchronously.
//!
//! All of this is thread-local. Packages and objects are `Rc`-based, so each
//! thread has its own independent load context.

use crate::package::Package;
use std::cell::RefCell;
use std::mem;
use std::rc::{Rc, Weak};

/// A reference waiting to be resolved when the outermost capture closes.
pub trait PendingFixup {
    /// Describes the unresolved reference for diagnostics.
    fn describe(&self) -> String;

    /// Attempts the resolution again. Returns `true` on success.
    fn try_resolve(&self) -> bool;
}

#[derive(Default)]
struct LoadContext {
    active: Vec<Rc<Package>>,
    capturers: usize,
    suppression: usize,
    pending: Vec<Weak<dyn PendingFixup>>,
}

thread_local! {
    static CONTEXT: RefCell<LoadContext> = RefCell::new(LoadContext::default());
}

/// The package on top of the active-package stack.
pub fn active_package() -> Option<Rc<Package>> {
    CONTEXT.with(|context| context.borrow().active.last().cloned())
}

/// Pushes `package` onto the active-package stack.
///
/// Pushing a package that is already active is allowed.
pub fn push_active_package(package: Rc<Package>) {
    CONTEXT.with(|context| context.borrow_mut().active.push(package));
}

/// Pops the active-package stack.
///
/// # Panics
///
/// Panics if the stack is empty.
pub fn pop_active_package() -> Rc<Package> {
    let popped = CONTEXT.with(|context| context.borrow_mut().active.pop());
    match popped {
        Some(package) => package,
        None => panic!("pop_active_package called with an empty active-package stack"),
    }
}

/// Keeps a package active for the lifetime of the guard.
#[must_use = "the package is popped as soon as the scope is dropped"]
pub struct ActivePackageScope {
    package: Rc<Package>,
}

impl ActivePackageScope {
    /// Pushes `package` and pops it again when the guard drops.
    pub fn enter(package: Rc<Package>) -> Self {
        push_active_package(Rc::clone(&package));
        Self { package }
    }

    /// The package this scope made active.
    pub fn package(&self) -> &Rc<Package> {
        &self.package
    }
}

impl Drop for ActivePackageScope {
    fn drop(&mut self) {
        let popped = pop_active_package();
        debug_assert!(
            Rc::ptr_eq(&popped, &self.package),
            "active-package scopes must be strictly nested"
        );
    }
}

/// Returns `true` while an unsuppressed capture is open.
pub fn is_capturing_fixups() -> bool {
    CONTEXT.with(|context| {
        let context = context.borrow();
        context.capturers > 0 && context.suppression == 0
    })
}

/// Queues a reference for resolution when the outermost capture closes.
pub fn defer_fixup(fixup: Weak<dyn PendingFixup>) {
    CONTEXT.with(|context| context.borrow_mut().pending.push(fixup));
}

/// The number of references waiting for the capture to close.
pub fn num_pending_fixups() -> usize {
    CONTEXT.with(|context| {
        context
            .borrow()
            .pending
            .iter()
            .filter(|fixup| fixup.strong_count() > 0)
            .count()
    })
}

/// Resolves every queued reference, including ones queued while resolving.
///
/// References that still cannot be resolved are reported and dropped.
fn run_fixups(message: &str) {
    let mut unresolved = Vec::new();
    loop {
        let batch = CONTEXT.with(|context| mem::take(&mut context.borrow_mut().pending));
        if batch.is_empty() {
            break;
        }
        for fixup in batch.iter().filter_map(Weak::upgrade) {
            if !fixup.try_resolve() {
                unresolved.push(fixup);
            }
        }
    }

    if !unresolved.is_empty() {
        log::warn!(
            "{message}Found {} reference(s) to objects that don't (yet?) exist.",
            unresolved.len()
        );
        for fixup in &unresolved {
            log::warn!("    unresolved: {}", fixup.describe());
        }
    }
}

/// Defers reference resolution until the outermost capturer is dropped.
///
/// If no package is active when the capture opens, a temporary unnamed
/// package is made active for the duration of the capture so lookups made
/// while loading have somewhere to land. A capturer opened while a
/// [`FixupSuppressor`] is alive does nothing.
#[must_use = "fixups run as soon as the capturer is dropped"]
pub struct FixupCapturer {
    message: String,
    armed: bool,
    force: bool,
    temp_package: Option<Rc<Package>>,
}

impl FixupCapturer {
    /// Opens a capture. `message` prefixes any report of unresolved links.
    pub fn new(message: impl Into<String>) -> Self {
        Self::begin(message.into(), false)
    }

    /// Opens a capture that resolves its fixups when it closes even if an
    /// outer capture is still open.
    pub fn for_package(message: impl Into<String>) -> Self {
        Self::begin(message.into(), true)
    }

    fn begin(message: String, force: bool) -> Self {
        let armed = CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            if context.suppression == 0 {
                context.capturers += 1;
                true
            } else {
                false
            }
        });

        let temp_package = if armed && active_package().is_none() {
            let package = Package::new("");
            push_active_package(Rc::clone(&package));
            Some(package)
        } else {
            None
        };

        Self {
            message,
            armed,
            force,
            temp_package,
        }
    }
}

impl Drop for FixupCapturer {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let outermost = CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            context.capturers -= 1;
            context.capturers == 0
        });

        if self.force || outermost {
            run_fixups(&self.message);
        }

        if self.temp_package.take().is_some() {
            pop_active_package();
        }
    }
}

/// Disables fixup capture for the lifetime of the guard.
#[must_use = "suppression ends as soon as the guard is dropped"]
pub struct FixupSuppressor {
    _private: (),
}

impl FixupSuppressor {
    /// Begins suppressing capture.
    pub fn new() -> Self {
        CONTEXT.with(|context| context.borrow_mut().suppression += 1);
        Self { _private: () }
    }
}

impl Default for FixupSuppressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FixupSuppressor {
    fn drop(&mut self) {
        CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            debug_assert!(context.suppression > 0, "unbalanced fixup suppression");
            context.suppression = context.suppression.saturating_sub(1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Countdown {
        attempts_left: Cell<usize>,
    }

    impl PendingFixup for Countdown {
        fn describe(&self) -> String {
            "countdown".to_owned()
        }

        fn try_resolve(&self) -> bool {
            let left = self.attempts_left.get();
            self.attempts_left.set(left.saturating_sub(1));
            left <= 1
        }
    }

    #[test]
    fn test_active_package_stack_is_lifo() {
        let a = Package::new("a");
        let b = Package::new("b");
        assert!(active_package().is_none());

        push_active_package(a.clone());
        {
            let _scope = ActivePackageScope::enter(b.clone());
            assert!(Rc::ptr_eq(&active_package().unwrap(), &b));
        }
        assert!(Rc::ptr_eq(&active_package().unwrap(), &a));
        assert!(Rc::ptr_eq(&pop_active_package(), &a));
        assert!(active_package().is_none());
    }

    #[test]
    #[should_panic(expected = "empty active-package stack")]
    fn test_pop_of_empty_stack_panics() {
        pop_active_package();
    }

    #[test]
    fn test_capturer_establishes_temporary_package() {
        assert!(active_package().is_none());
        {
            let _capture = FixupCapturer::new("test: ");
            assert!(is_capturing_fixups());
            assert!(active_package().is_some());
        }
        assert!(!is_capturing_fixups());
        assert!(active_package().is_none());
    }

    #[test]
    fn test_only_outermost_capturer_runs_fixups() {
        // --- 1. SETUP ---
        let fixup: Rc<dyn PendingFixup> = Rc::new(Countdown {
            attempts_left: Cell::new(1),
        });

        // --- 2. ACTION ---
        let outer = FixupCapturer::new("outer: ");
        {
            let _inner = FixupCapturer::new("inner: ");
            defer_fixup(Rc::downgrade(&fixup));
        }

        // --- 3. ASSERTIONS ---
        assert_eq!(num_pending_fixups(), 1, "An inner capturer must not resolve.");
        drop(outer);
        assert_eq!(num_pending_fixups(), 0);
    }

    #[test]
    fn test_forced_capturer_resolves_inside_outer_capture() {
        let fixup: Rc<dyn PendingFixup> = Rc::new(Countdown {
            attempts_left: Cell::new(1),
        });
        let _outer = FixupCapturer::new("outer: ");
        {
            let _inner = FixupCapturer::for_package("package: ");
            defer_fixup(Rc::downgrade(&fixup));
        }
        assert_eq!(num_pending_fixups(), 0);
    }

    #[test]
    fn test_unresolvable_fixups_are_dropped() {
        let fixup: Rc<dyn PendingFixup> = Rc::new(Countdown {
            attempts_left: Cell::new(usize::MAX),
        });
        {
            let _capture = FixupCapturer::new("test: ");
            defer_fixup(Rc::downgrade(&fixup));
        }
        assert_eq!(num_pending_fixups(), 0);
    }

    #[test]
    fn test_suppressor_disables_capture() {
        let _capture = FixupCapturer::new("outer: ");
        {
            let _suppress = FixupSuppressor::new();
            assert!(!is_capturing_fixups());
            let _nested = FixupCapturer::new("ignored: ");
            assert!(!is_capturing_fixups());
        }
        assert!(is_capturing_fixups());
    }
}
