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

use crate::error::{FreshError, Result};
use regex::Regex;

/// A whole-string regular expression used to filter object and package names.
///
/// An empty pattern accepts every name. Any other pattern must match the
/// entire name, so `hero` does not accept `superhero`, while `.*hero` does.
#[derive(Debug, Clone)]
pub struct NameFilter {
    regex: Option<Regex>,
}

impl NameFilter {
    /// Compiles `pattern` into a filter.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self::any());
        }
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            FreshError::InvalidFilter {
                pattern: pattern.to_owned(),
                source,
            }
        })?;
        Ok(Self { regex: Some(regex) })
    }

    /// A filter that accepts every name.
    pub fn any() -> Self {
        Self { regex: None }
    }

    /// A filter that accepts exactly `name`.
    pub fn exact(name: &str) -> Self {
        // An escaped literal always compiles.
        Self::new(&regex::escape(name)).unwrap_or_else(|_| Self::any())
    }

    /// Returns `true` if `name` passes the filter.
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |regex| regex.is_match(name))
    }
}
