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

//! The development report of managed assets.

use crate::AssetPackage;
use fresh_core::object::ASSET_CLASS;
use fresh_core::{get_filtered_objects, ObjectId, Result};
use std::io::Write;
use std::rc::Rc;

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Formats a byte count with two decimals in the largest unit (up to TiB)
/// that keeps the value at or above one.
pub fn byte_count_string(bytes: usize) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Writes one line per loader of `assets`: its name, how many times it
/// loaded, and for the asset it produced, the references held outside this
/// report and the memory size. Ends with the total size of all assets.
pub fn dump_asset_report(assets: &AssetPackage, out: &mut impl Write) -> Result<()> {
    let mut total_bytes = 0;

    writeln!(out, "============================ MANAGED ASSETS ==============================")?;
    writeln!(out, "Asset                                             Loaded Used?  Refs Bytes")?;

    for loader in assets.loaders().loaders() {
        let Some(asset_loader) = loader.as_asset_loader() else {
            continue;
        };
        let name = loader.name();
        let times_loaded = asset_loader.loader_core().times_loaded();
        write!(out, "{name:<50}{times_loaded:<7}")?;

        let instances =
            get_filtered_objects(&ObjectId::new(ASSET_CLASS, regex::escape(&name)))?;

        if times_loaded == 0 {
            write!(out, "{:<7}", "UNUSED")?;
            if !instances.is_empty() {
                write!(
                    out,
                    "WARNING: Supposedly unused asset actually has {} instances.\t",
                    instances.len()
                )?;
            }
        } else {
            write!(out, "{:<7}", "Y")?;
            match instances.first() {
                None => write!(out, "(none)")?,
                Some(instance) => {
                    let bytes = instance.as_asset().map_or(0, |asset| asset.memory_size());
                    total_bytes += bytes;
                    // Every instance in `instances` holds one reference.
                    let refs = Rc::strong_count(instance) - 1;
                    write!(out, "{refs:<5}{:<15}", byte_count_string(bytes))?;
                    if instances.len() > 1 {
                        write!(
                            out,
                            " WARNING: More than one ({}) asset instance created.\t",
                            instances.len()
                        )?;
                    }
                }
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "---------------------------------------------------------------------------")?;
    writeln!(out, "Total instantiated Asset bytes: {}", byte_count_string(total_bytes))?;
    writeln!(out, "===========================================================================")?;
    Ok(())
}
