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

//! Loads a small asset database and a level that references its assets,
//! then prints the asset report.
//!
//! Usage: `fresh-sandbox [ASSET_DATABASE.ron]`. Set `RUST_LOG=debug` to
//! follow package lifecycles.

use anyhow::{Context, Result};
use fresh_assets::{AssetDatabase, AssetPackage};
use fresh_core::object::{ASSET_CLASS, ASSET_LOADER_CLASS, OBJECT_CLASS};
use fresh_core::{
    create_package, register_class, Asset, AssetLoader, AssetLoaderCore, FreshError, Object,
    ObjectClass, ObjectCore, ObjectLink, ObjectRef, PackageManifest, PropertyMap,
};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

const DEMO_DATABASE: &str = r#"(
    class_map: { "Sprite": "SpriteLoader" },
    loaders: [
        (class: "SpriteLoader", name: "hero", properties: {
            "asset_class": "Sprite",
            "base_path": "sprites",
            "extension": "png",
            "pixels": "4096",
        }),
        (class: "SpriteLoader", name: "villain", properties: {
            "asset_class": "Sprite",
            "base_path": "sprites",
            "extension": "png",
            "pixels": "16384",
        }),
    ],
)"#;

const DEMO_LEVEL: &str = r#"(
    objects: [
        (class: "Actor", name: "player", properties: { "sprite": "Sprite'hero'", "target": "Actor'boss'" }),
        (class: "Actor", name: "boss", properties: { "sprite": "Sprite'villain'", "target": "Actor'player'" }),
        (class: "Actor", name: "extra", properties: { "sprite": "Sprite'crowd'" }),
    ],
)"#;

// --- Demo classes ---

struct Sprite {
    core: ObjectCore,
    pixels: Cell<usize>,
}

impl Object for Sprite {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn as_asset(&self) -> Option<&dyn Asset> {
        Some(self)
    }
}

impl ObjectClass for Sprite {
    const CLASS_NAME: &'static str = "Sprite";
}

impl Asset for Sprite {
    fn memory_size(&self) -> usize {
        self.pixels.get() * 4
    }
}

struct SpriteLoader {
    loader: AssetLoaderCore,
    pixels: Cell<usize>,
}

impl Object for SpriteLoader {
    fn core(&self) -> &ObjectCore {
        self.loader.object()
    }

    fn apply_properties(&self, properties: &PropertyMap) -> fresh_core::Result<()> {
        self.loader.apply_properties(properties)?;
        if let Some(pixels) = properties.get("pixels") {
            let parsed = pixels.parse().map_err(|_| FreshError::InvalidProperty {
                object: self.loader.object().name(),
                property: "pixels".to_owned(),
                value: pixels.clone(),
            })?;
            self.pixels.set(parsed);
        }
        Ok(())
    }

    fn as_asset_loader(&self) -> Option<&dyn AssetLoader> {
        Some(self)
    }
}

impl AssetLoader for SpriteLoader {
    fn loader_core(&self) -> &AssetLoaderCore {
        &self.loader
    }

    fn load_asset(&self, asset: &dyn Object) -> fresh_core::Result<()> {
        let sprite = asset
            .downcast_ref::<Sprite>()
            .ok_or_else(|| FreshError::LoadFailed {
                loader: self.loader.object().name(),
                asset: asset.object_id().to_string(),
                reason: "not a sprite".to_owned(),
            })?;
        log::info!("Loading {}", self.loader.complete_path());
        sprite.pixels.set(self.pixels.get().max(64));
        Ok(())
    }
}

struct Actor {
    core: ObjectCore,
    sprite: ObjectLink<Sprite>,
    target: ObjectLink<Actor>,
}

impl Object for Actor {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn apply_properties(&self, properties: &PropertyMap) -> fresh_core::Result<()> {
        if let Some(sprite) = properties.get("sprite") {
            self.sprite.bind(sprite.parse()?);
        }
        if let Some(target) = properties.get("target") {
            self.target.bind(target.parse()?);
        }
        Ok(())
    }

    fn on_all_loaded(&self) {
        log::info!(
            "{} ready: sprite {:?}, target {:?}",
            self.core.name(),
            self.sprite.get().map(|sprite| sprite.core.name()),
            self.target.get().map(|target| target.core.name()),
        );
    }

    fn referenced_objects(&self) -> Vec<ObjectRef> {
        self.sprite.get_object().into_iter().collect()
    }
}

impl ObjectClass for Actor {
    const CLASS_NAME: &'static str = "Actor";
}

fn register_demo_classes() -> Result<()> {
    fresh_assets::register_classes()?;
    register_class(Sprite::CLASS_NAME, ASSET_CLASS, |core| {
        Rc::new(Sprite {
            core,
            pixels: Cell::new(0),
        }) as ObjectRef
    })?;
    register_class("SpriteLoader", ASSET_LOADER_CLASS, |core| {
        Rc::new(SpriteLoader {
            loader: AssetLoaderCore::new(core),
            pixels: Cell::new(0),
        }) as ObjectRef
    })?;
    register_class(Actor::CLASS_NAME, OBJECT_CLASS, |core| {
        Rc::new(Actor {
            core,
            sprite: ObjectLink::new(),
            target: ObjectLink::weak(),
        }) as ObjectRef
    })?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    register_demo_classes().context("Failed to register demo classes")?;

    let assets = AssetPackage::create("demo").context("Failed to create the asset package")?;
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            assets
                .load_database(&path)
                .with_context(|| format!("Failed to load asset database {}", path.display()))?;
        }
        None => {
            let database = AssetDatabase::from_ron_str(DEMO_DATABASE)
                .context("The built-in asset database is malformed")?;
            assets.apply_database(&database);
        }
    }

    let preloaded = assets.load_assets(|_, name| name == "hero")?;
    log::info!("Preloaded {preloaded} asset(s)");

    {
        let level = create_package("level");
        level.retain_members();
        let manifest =
            PackageManifest::from_ron_str(DEMO_LEVEL).context("The built-in level is malformed")?;
        let actors = level.load_manifest(&manifest);
        log::info!("Level loaded with {} actor(s)", actors.len());

        let mut report = Vec::new();
        assets.dump_asset_report(&mut report)?;
        println!("{}", String::from_utf8_lossy(&report));
    }

    // With the level gone, only the asset package still holds the sprites.
    let freed = assets.release_retained_zombies(0);
    log::info!("Released {} of unused assets", fresh_assets::byte_count_string(freed));

    let mut stdout = std::io::stdout().lock();
    assets.dump_asset_report(&mut stdout)?;
    Ok(())
}
