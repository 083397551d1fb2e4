//! Group and registry configuration
//!
//! `SoundConfig` mirrors the JSON options object hosts pass when creating a
//! group:
//!
//! ```json
//! {
//!   "src": ["laser.webm", "laser.mp3"],
//!   "sprite": { "blast": [0, 300], "hum": [400, 1200, true] },
//!   "volume": 0.8,
//!   "pool": 5,
//!   "preload": "metadata"
//! }
//! ```
//!
//! Unknown keys are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{SoundError, SoundResult};
use crate::source::SourceCandidate;

/// Default instance pool size per group
pub const DEFAULT_POOL_SIZE: usize = 5;
/// Default element pool capacity in the registry
pub const DEFAULT_ELEMENT_POOL_SIZE: usize = 10;
/// Default idle delay before the audio device is suspended
pub const DEFAULT_AUTO_SUSPEND_DELAY_MS: u64 = 30_000;

// ═══════════════════════════════════════════════════════════════════════════════
// PRELOAD
// ═══════════════════════════════════════════════════════════════════════════════

/// Preload hint. Accepts `true`, `false`, `"auto"`, `"metadata"` or `"none"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PreloadRepr", into = "PreloadRepr")]
pub enum Preload {
    /// Do not load until `load()` is called
    None,
    /// Load fully at construction
    #[default]
    Auto,
    /// Load at construction; element backends only fetch metadata
    Metadata,
}

impl Preload {
    #[inline]
    pub fn loads_eagerly(self) -> bool {
        !matches!(self, Preload::None)
    }

    /// Element `preload` attribute value
    pub fn as_attribute(self) -> &'static str {
        match self {
            Preload::None => "none",
            Preload::Auto => "auto",
            Preload::Metadata => "metadata",
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PreloadRepr {
    Flag(bool),
    Mode(String),
}

impl TryFrom<PreloadRepr> for Preload {
    type Error = String;

    fn try_from(repr: PreloadRepr) -> Result<Self, Self::Error> {
        match repr {
            PreloadRepr::Flag(true) => Ok(Preload::Auto),
            PreloadRepr::Flag(false) => Ok(Preload::None),
            PreloadRepr::Mode(mode) => match mode.as_str() {
                "auto" => Ok(Preload::Auto),
                "metadata" => Ok(Preload::Metadata),
                "none" => Ok(Preload::None),
                other => Err(format!("unknown preload mode: {other}")),
            },
        }
    }
}

impl From<Preload> for PreloadRepr {
    fn from(preload: Preload) -> Self {
        match preload {
            Preload::None => PreloadRepr::Flag(false),
            other => PreloadRepr::Mode(other.as_attribute().to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPRITE DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Sprite entry as written in config: `[offset_ms, duration_ms, loop?]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpriteRepr", into = "SpriteRepr")]
pub struct SpriteDef {
    pub offset_ms: f64,
    pub duration_ms: f64,
    pub looping: bool,
}

impl SpriteDef {
    pub fn new(offset_ms: f64, duration_ms: f64) -> Self {
        Self {
            offset_ms,
            duration_ms,
            looping: false,
        }
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SpriteRepr {
    Full(f64, f64, bool),
    Short(f64, f64),
}

impl From<SpriteRepr> for SpriteDef {
    fn from(repr: SpriteRepr) -> Self {
        match repr {
            SpriteRepr::Full(offset_ms, duration_ms, looping) => Self {
                offset_ms,
                duration_ms,
                looping,
            },
            SpriteRepr::Short(offset_ms, duration_ms) => Self::new(offset_ms, duration_ms),
        }
    }
}

impl From<SpriteDef> for SpriteRepr {
    fn from(def: SpriteDef) -> Self {
        SpriteRepr::Full(def.offset_ms, def.duration_ms, def.looping)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOUND CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Options for one sound group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Candidate sources in preference order (urls or data URIs)
    #[serde(rename = "src", deserialize_with = "one_or_many")]
    pub sources: Vec<String>,
    /// Explicit format per source index, overriding extension detection
    #[serde(deserialize_with = "one_or_many")]
    pub format: Vec<String>,
    pub sprite: BTreeMap<String, SpriteDef>,
    pub autoplay: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub mute: bool,
    pub volume: f32,
    pub rate: f64,
    /// Soft cap on retained instances
    pub pool: usize,
    pub preload: Preload,
    /// Force the media-element backend
    pub html5: bool,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            format: Vec::new(),
            sprite: BTreeMap::new(),
            autoplay: false,
            looping: false,
            mute: false,
            volume: 1.0,
            rate: 1.0,
            pool: DEFAULT_POOL_SIZE,
            preload: Preload::Auto,
            html5: false,
        }
    }
}

impl SoundConfig {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON options object
    pub fn from_json(json: &str) -> SoundResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SoundResult<()> {
        if self.sources.is_empty() {
            return Err(SoundError::Config(
                "at least one audio source is required".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(SoundError::InvalidVolume(self.volume));
        }
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(SoundError::InvalidRate(self.rate));
        }
        if self.pool == 0 {
            return Err(SoundError::Config("pool must be at least 1".into()));
        }
        for (name, def) in &self.sprite {
            if !(def.offset_ms >= 0.0 && def.duration_ms >= 0.0) {
                return Err(SoundError::Config(format!(
                    "sprite {name} has a negative or invalid window"
                )));
            }
        }
        Ok(())
    }

    /// Pair each source with its explicit format, if any
    pub(crate) fn candidates(&self) -> Vec<SourceCandidate> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, url)| SourceCandidate {
                url: url.clone(),
                format: self.format.get(i).filter(|f| !f.is_empty()).cloned(),
            })
            .collect()
    }

    pub fn with_format<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.format = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sprite(mut self, name: impl Into<String>, offset_ms: f64, duration_ms: f64) -> Self {
        self.sprite
            .insert(name.into(), SpriteDef::new(offset_ms, duration_ms));
        self
    }

    pub fn with_looping_sprite(
        mut self,
        name: impl Into<String>,
        offset_ms: f64,
        duration_ms: f64,
    ) -> Self {
        self.sprite.insert(
            name.into(),
            SpriteDef::new(offset_ms, duration_ms).with_loop(true),
        );
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_pool(mut self, pool: usize) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_preload(mut self, preload: Preload) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_html5(mut self, html5: bool) -> Self {
        self.html5 = html5;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-wide settings held by the device registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum unlocked media elements kept for reuse
    pub element_pool_size: usize,
    /// Suspend the audio device after a period with nothing playing
    pub auto_suspend: bool,
    pub auto_suspend_delay_ms: u64,
    /// Let `DeviceRegistry::user_gesture` unlock playback
    pub auto_unlock: bool,
    /// Host page is served over a secure transport
    pub secure_transport: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            element_pool_size: DEFAULT_ELEMENT_POOL_SIZE,
            auto_suspend: true,
            auto_suspend_delay_ms: DEFAULT_AUTO_SUSPEND_DELAY_MS,
            auto_unlock: true,
            secure_transport: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_defaults() {
        let cfg = SoundConfig::from_json(r#"{ "src": "a.mp3" }"#).unwrap();
        assert_eq!(cfg.sources, vec!["a.mp3".to_string()]);
        assert_eq!(cfg.volume, 1.0);
        assert_eq!(cfg.rate, 1.0);
        assert_eq!(cfg.pool, DEFAULT_POOL_SIZE);
        assert_eq!(cfg.preload, Preload::Auto);
        assert!(!cfg.looping);
    }

    #[test]
    fn test_json_full_surface() {
        let json = r#"{
            "src": ["a.webm", "a.mp3"],
            "format": ["webm", "mp3"],
            "sprite": { "blast": [0, 300], "hum": [400, 1200, true] },
            "autoplay": true,
            "loop": true,
            "mute": true,
            "volume": 0.5,
            "rate": 1.5,
            "pool": 3,
            "preload": "metadata",
            "html5": true,
            "somethingElse": 42
        }"#;
        let cfg = SoundConfig::from_json(json).unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.sprite["blast"], SpriteDef::new(0.0, 300.0));
        assert!(cfg.sprite["hum"].looping);
        assert!(cfg.autoplay && cfg.looping && cfg.mute && cfg.html5);
        assert_eq!(cfg.pool, 3);
        assert_eq!(cfg.preload, Preload::Metadata);

        let candidates = cfg.candidates();
        assert_eq!(candidates[1].format.as_deref(), Some("mp3"));
    }

    #[test]
    fn test_preload_forms() {
        let parse = |v: &str| serde_json::from_str::<Preload>(v);
        assert_eq!(parse("true").unwrap(), Preload::Auto);
        assert_eq!(parse("false").unwrap(), Preload::None);
        assert_eq!(parse("\"none\"").unwrap(), Preload::None);
        assert!(parse("\"eager\"").is_err());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            SoundConfig::from_json("{}"),
            Err(SoundError::Config(_))
        ));
        assert_eq!(
            SoundConfig::new(["a.mp3"]).with_volume(1.5).validate(),
            Err(SoundError::InvalidVolume(1.5))
        );
        assert_eq!(
            SoundConfig::new(["a.mp3"]).with_rate(0.0).validate(),
            Err(SoundError::InvalidRate(0.0))
        );
        assert!(SoundConfig::new(["a.mp3"]).with_pool(0).validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let cfg = SoundConfig::new(["a.mp3"])
            .with_sprite("foo", 500.0, 1000.0)
            .with_looping_sprite("bar", 0.0, 250.0)
            .with_preload(Preload::None);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SoundConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);

        let registry = RegistryConfig {
            element_pool_size: 4,
            ..RegistryConfig::default()
        };
        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(serde_json::from_str::<RegistryConfig>(&json).unwrap(), registry);
    }
}
