use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{expected_actual, read_json_document, validation_err, JsonDocumentError};

pub const DEFAULT_CLIP_SECONDS: f32 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimatorId(String);

impl AnimatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AnimatorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnimatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// References a scene hands over when it becomes active: the animators it
/// contains and how long each of their clips runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneBindings {
    animators: BTreeMap<AnimatorId, BTreeMap<String, f32>>,
}

impl SceneBindings {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_animator(mut self, animator: &str, clips: &[(&str, f32)]) -> Self {
        let clips = clips
            .iter()
            .map(|(clip, seconds)| ((*clip).to_string(), *seconds))
            .collect();
        self.animators.insert(AnimatorId::new(animator), clips);
        self
    }

    pub fn has_animator(&self, animator: &str) -> bool {
        self.animators.contains_key(animator)
    }

    pub fn animator(&self, animator: &str) -> Option<AnimatorId> {
        self.animators
            .get_key_value(animator)
            .map(|(id, _)| id.clone())
    }

    /// Duration of `clip` on `animator`. Clips the manifest does not list play
    /// for [`DEFAULT_CLIP_SECONDS`]; `None` means the animator is absent.
    pub fn clip_seconds(&self, animator: &str, clip: &str) -> Option<f32> {
        let clips = self.animators.get(animator)?;
        Some(clips.get(clip).copied().unwrap_or(DEFAULT_CLIP_SECONDS))
    }

    pub fn animator_count(&self) -> usize {
        self.animators.len()
    }
}

#[derive(Debug, Error)]
pub enum SceneRegistryError {
    #[error("failed to load scene manifest '{path}': {source}")]
    Document {
        path: String,
        #[source]
        source: JsonDocumentError,
    },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct SceneManifest {
    scenes: Vec<SceneManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct SceneManifestEntry {
    id: SceneId,
    #[serde(default)]
    animators: BTreeMap<AnimatorId, BTreeMap<String, f32>>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneRegistry {
    scenes: HashMap<SceneId, SceneBindings>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, SceneRegistryError> {
        let manifest = read_json_document::<SceneManifest>(path).map_err(|source| {
            SceneRegistryError::Document {
                path: path.display().to_string(),
                source,
            }
        })?;
        Self::from_manifest(manifest)
    }

    fn from_manifest(manifest: SceneManifest) -> Result<Self, SceneRegistryError> {
        let mut registry = Self::new();
        for (index, entry) in manifest.scenes.into_iter().enumerate() {
            if entry.id.as_str().trim().is_empty() {
                return Err(SceneRegistryError::Invalid(validation_err(
                    &format!("scenes[{index}].id"),
                    "scene id cannot be empty",
                )));
            }
            for (animator, clips) in &entry.animators {
                for (clip, seconds) in clips {
                    if !seconds.is_finite() || *seconds < 0.0 {
                        return Err(SceneRegistryError::Invalid(expected_actual(
                            &format!("scenes[{index}].animators.{animator}.{clip}"),
                            "finite non-negative seconds",
                            seconds,
                        )));
                    }
                }
            }
            if registry.scenes.contains_key(&entry.id) {
                return Err(SceneRegistryError::Invalid(validation_err(
                    &format!("scenes[{index}].id"),
                    format!("duplicate scene id '{}'", entry.id),
                )));
            }
            registry.scenes.insert(
                entry.id,
                SceneBindings {
                    animators: entry.animators,
                },
            );
        }
        Ok(registry)
    }

    pub fn register(&mut self, scene: SceneId, bindings: SceneBindings) {
        self.scenes.insert(scene, bindings);
    }

    pub fn bindings_for(&self, scene: &SceneId) -> Option<&SceneBindings> {
        self.scenes.get(scene)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_manifest(temp: &TempDir, text: &str) -> std::path::PathBuf {
        let path = temp.path().join("scenes.json");
        fs::write(&path, text).expect("write manifest");
        path
    }

    #[test]
    fn load_reads_animators_and_durations() {
        let temp = TempDir::new().expect("temp");
        let path = write_manifest(
            &temp,
            r#"{"scenes":[
                {"id":"MainMenu","animators":{"transition":{"fade_in":0.25,"fade_out":0.75}}},
                {"id":"Credits"}
            ]}"#,
        );

        let registry = SceneRegistry::load(&path).expect("registry");

        let menu = registry
            .bindings_for(&SceneId::new("MainMenu"))
            .expect("menu");
        assert!(menu.has_animator("transition"));
        assert_eq!(menu.clip_seconds("transition", "fade_in"), Some(0.25));
        assert_eq!(
            menu.clip_seconds("transition", "unlisted"),
            Some(DEFAULT_CLIP_SECONDS)
        );
        assert_eq!(menu.clip_seconds("level_intro", "display"), None);
        let credits = registry
            .bindings_for(&SceneId::new("Credits"))
            .expect("credits");
        assert_eq!(credits.animator_count(), 0);
    }

    #[test]
    fn duplicate_scene_ids_are_rejected() {
        let temp = TempDir::new().expect("temp");
        let path = write_manifest(&temp, r#"{"scenes":[{"id":"A"},{"id":"A"}]}"#);

        let error = SceneRegistry::load(&path).expect_err("duplicate");
        assert_eq!(
            error.to_string(),
            "validation failed at scenes[1].id: duplicate scene id 'A'"
        );
    }

    #[test]
    fn negative_clip_duration_is_rejected() {
        let temp = TempDir::new().expect("temp");
        let path = write_manifest(
            &temp,
            r#"{"scenes":[{"id":"A","animators":{"transition":{"fade_in":-1.0}}}]}"#,
        );

        assert!(matches!(
            SceneRegistry::load(&path),
            Err(SceneRegistryError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_manifest_is_document_error() {
        let temp = TempDir::new().expect("temp");
        let path = write_manifest(&temp, r#"{"scenes":[{"animators":{}}]}"#);

        assert!(matches!(
            SceneRegistry::load(&path),
            Err(SceneRegistryError::Document { .. })
        ));
    }

    #[test]
    fn animator_lookup_returns_owned_id() {
        let bindings = SceneBindings::empty().with_animator("transition", &[("fade_in", 1.0)]);
        assert_eq!(
            bindings.animator("transition"),
            Some(AnimatorId::new("transition"))
        );
        assert_eq!(bindings.animator("level_outro"), None);
    }
}
