//! Named sprite windows inside one audio asset

use rf_core::TimeWindow;
use std::collections::{BTreeMap, HashMap};

use crate::config::SpriteDef;

/// Sprite covering the full asset, synthesized once the duration is known
pub const DEFAULT_SPRITE: &str = "__default";

/// A named window: offset and length in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub offset_ms: f64,
    pub duration_ms: f64,
    pub looping: bool,
}

impl Sprite {
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_ms(self.offset_ms, self.duration_ms)
    }

    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms / 1000.0
    }
}

impl From<SpriteDef> for Sprite {
    fn from(def: SpriteDef) -> Self {
        Self {
            offset_ms: def.offset_ms,
            duration_ms: def.duration_ms,
            looping: def.looping,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpriteTable {
    sprites: HashMap<String, Sprite>,
}

impl SpriteTable {
    pub fn from_config(defs: &BTreeMap<String, SpriteDef>) -> Self {
        Self {
            sprites: defs
                .iter()
                .map(|(name, def)| (name.clone(), Sprite::from(*def)))
                .collect(),
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Sprite> {
        self.sprites.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.sprites.contains_key(name)
    }

    /// Add `__default` spanning the whole asset unless already configured
    pub fn ensure_default(&mut self, duration_secs: f64) {
        self.sprites
            .entry(DEFAULT_SPRITE.to_string())
            .or_insert(Sprite {
                offset_ms: 0.0,
                duration_ms: duration_secs * 1000.0,
                looping: false,
            });
    }

    /// Rewrite the `__default` length once a stream reports its real duration
    pub fn update_default_duration(&mut self, duration_secs: f64) {
        if let Some(sprite) = self.sprites.get_mut(DEFAULT_SPRITE) {
            sprite.duration_ms = duration_secs * 1000.0;
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sprites.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
