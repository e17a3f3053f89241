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

//! Compound identity keys for objects.

use crate::error::FreshError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Separates the package name from the object name in the string form.
const PACKAGE_DELIMITER: &str = "::";

/// The object name used by the null id.
const NULL_NAME: &str = "null";

/// Identifies an object by `{ package, class, name }`.
///
/// The package name is optional: an empty package name means "unspecified",
/// and lookups then go through the active package and the search packages.
///
/// The string form is `Class'package::name'`, or `Class'name'` without a
/// package, and `null` for the null id.
///
/// Two ids are equal when they name the same class and object. The package
/// component only routes a lookup and does not take part in identity.
#[derive(Debug, Clone, Default)]
pub struct ObjectId {
    package_name: String,
    class_name: String,
    object_name: String,
}

impl ObjectId {
    /// Creates an id without a package qualifier.
    pub fn new(class_name: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            package_name: String::new(),
            class_name: class_name.into(),
            object_name: object_name.into(),
        }
    }

    /// Creates an id qualified with a package name.
    pub fn qualified(
        package_name: impl Into<String>,
        class_name: impl Into<String>,
        object_name: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            class_name: class_name.into(),
            object_name: object_name.into(),
        }
    }

    /// The id that names no object.
    pub fn null() -> Self {
        Self::new("", NULL_NAME)
    }

    /// The package qualifier, empty when unspecified.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// The class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The object name.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Returns `true` if a package qualifier is present.
    pub fn is_qualified(&self) -> bool {
        !self.package_name.is_empty()
    }

    /// Returns `true` for the null id.
    pub fn is_null(&self) -> bool {
        self.class_name.is_empty() && (self.object_name.is_empty() || self.object_name == NULL_NAME)
    }

    /// Returns `true` if the id is null or names both a class and an object.
    pub fn is_valid(&self) -> bool {
        self.is_null() || (!self.class_name.is_empty() && !self.object_name.is_empty())
    }

    /// Returns a copy of this id without its package qualifier.
    pub fn unqualified(&self) -> Self {
        Self::new(self.class_name.clone(), self.object_name.clone())
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        (self.is_null() && other.is_null())
            || (self.class_name == other.class_name && self.object_name == other.object_name)
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_null() {
            NULL_NAME.hash(state);
        } else {
            self.class_name.hash(state);
            self.object_name.hash(state);
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str(NULL_NAME);
        }
        if self.package_name.is_empty() {
            write!(f, "{}'{}'", self.class_name, self.object_name)
        } else {
            write!(
                f,
                "{}'{}{}{}'",
                self.class_name, self.package_name, PACKAGE_DELIMITER, self.object_name
            )
        }
    }
}

impl FromStr for ObjectId {
    type Err = FreshError;

    /// Parses `Class'package::name'`, `Class'name'`, `null`, or a bare class
    /// name (which yields an empty object name).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == NULL_NAME {
            return Ok(Self::null());
        }

        let Some(first_tick) = s.find('\'') else {
            return Ok(Self::new(s, ""));
        };

        let class_name = &s[..first_tick];
        let rest = &s[first_tick + 1..];
        let Some(closing) = rest.find('\'') else {
            return Err(FreshError::InvalidObjectId(s.to_owned()));
        };
        if !rest[closing + 1..].is_empty() {
            return Err(FreshError::InvalidObjectId(s.to_owned()));
        }

        let body = &rest[..closing];
        Ok(match body.split_once(PACKAGE_DELIMITER) {
            Some((package, name)) => Self::qualified(package, class_name, name),
            None => Self::new(class_name, body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_agree() {
        let id = ObjectId::qualified("level1", "Texture", "hero.png");
        assert_eq!(id.to_string(), "Texture'level1::hero.png'");

        let parsed: ObjectId = "Texture'level1::hero.png'".parse().unwrap();
        assert_eq!(parsed.package_name(), "level1");
        assert_eq!(parsed.class_name(), "Texture");
        assert_eq!(parsed.object_name(), "hero.png");

        let plain: ObjectId = "Texture'hero.png'".parse().unwrap();
        assert!(!plain.is_qualified());
        assert_eq!(plain.to_string(), "Texture'hero.png'");
    }

    #[test]
    fn test_null_id() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert!(null.is_valid());
        assert_eq!(null.to_string(), "null");
        assert_eq!("null".parse::<ObjectId>().unwrap(), null);
        assert_eq!(ObjectId::default(), null, "An empty id is the null id.");
    }

    #[test]
    fn test_bare_class_name_parses_with_empty_object_name() {
        let id: ObjectId = "Texture".parse().unwrap();
        assert_eq!(id.class_name(), "Texture");
        assert_eq!(id.object_name(), "");
        assert!(!id.is_valid());
    }

    #[test]
    fn test_missing_closing_tick_is_rejected() {
        let result = "Texture'hero.png".parse::<ObjectId>();
        assert!(matches!(result, Err(FreshError::InvalidObjectId(_))));
    }

    #[test]
    fn test_equality_ignores_package_qualifier() {
        let a = ObjectId::qualified("a", "Texture", "hero");
        let b = ObjectId::qualified("b", "Texture", "hero");
        let c = ObjectId::new("Texture", "villain");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
