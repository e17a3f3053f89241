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

//! Per-package policy hooks.
//!
//! Every package shares the same storage and bookkeeping. What differs
//! between a plain package, an asset cache and a loader registry is decided
//! by the [`PackageBehavior`] it was built with.

use super::Package;
use crate::error::Result;
use crate::object::{AsAny, ClassInfo, Object, ObjectRef};
use std::cmp::Reverse;
use std::rc::Rc;

/// Policy hooks consulted by a [`Package`].
pub trait PackageBehavior: AsAny {
    /// Produces the object named `name` of class `class`, creating it on a
    /// miss if this kind of package knows how.
    ///
    /// The default only looks among existing members.
    fn request_generic(
        &self,
        package: &Rc<Package>,
        class: &Rc<ClassInfo>,
        name: &str,
    ) -> Result<Option<ObjectRef>> {
        Ok(package.find_generic(class, name))
    }

    /// The memory reclaimed by releasing `zombie`. Defaults to `0`.
    fn zombie_size_bytes(&self, zombie: &dyn Object) -> usize {
        let _ = zombie;
        0
    }

    /// Orders zombie candidates so the ones to release first come first.
    ///
    /// The default puts the largest first, keeping the original order among
    /// equal sizes.
    fn sort_zombies(&self, zombies: &mut [ObjectRef]) {
        zombies.sort_by_key(|zombie| Reverse(self.zombie_size_bytes(&**zombie)));
    }

    /// How many member slots one [`Package::quick_tidy`] call examines.
    fn quick_tidy_size(&self, num_members: usize) -> usize {
        if num_members == 0 {
            0
        } else {
            (num_members / 10).max(1)
        }
    }
}

/// The behavior of a plain package: no synthesis, no size accounting.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPackageBehavior;

impl PackageBehavior for DefaultPackageBehavior {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_tidy_size() {
        let behavior = DefaultPackageBehavior;
        assert_eq!(behavior.quick_tidy_size(0), 0);
        assert_eq!(behavior.quick_tidy_size(3), 1);
        assert_eq!(behavior.quick_tidy_size(10), 1);
        assert_eq!(behavior.quick_tidy_size(250), 25);
    }
}
