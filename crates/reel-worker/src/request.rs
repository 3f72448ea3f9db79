//! Render requests: a composition plus the uploaded files it refers to.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reel_models::{CompositionSpec, DualSourceSpec};

use crate::error::{WorkerError, WorkerResult};

/// Single-track render request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub composition: CompositionSpec,

    /// Uploaded clip files in timeline order; replace the clip sources when present
    #[serde(default)]
    pub clip_files: Vec<PathBuf>,

    /// Uploaded background music; replaces the audio source when present
    #[serde(default)]
    pub music_file: Option<PathBuf>,
}

impl RenderRequest {
    /// Request whose sources are already in place.
    pub fn new(composition: CompositionSpec) -> Self {
        Self {
            composition,
            clip_files: Vec::new(),
            music_file: None,
        }
    }

    /// Files owned by this request and removed when it ends.
    pub fn upload_paths(&self) -> Vec<PathBuf> {
        self.clip_files
            .iter()
            .cloned()
            .chain(self.music_file.clone())
            .collect()
    }

    /// The composition with uploaded files bound to their roles.
    pub fn bound_composition(&self) -> WorkerResult<CompositionSpec> {
        let mut spec = self.composition.clone();

        if !self.clip_files.is_empty() {
            if self.clip_files.len() != spec.clips.len() {
                return Err(WorkerError::invalid_request(format!(
                    "{} clip files uploaded for {} clips",
                    self.clip_files.len(),
                    spec.clips.len()
                )));
            }
            for (clip, file) in spec.clips.iter_mut().zip(&self.clip_files) {
                clip.source = file.clone();
            }
        }

        if let Some(music) = &self.music_file {
            match spec.audio.as_mut() {
                Some(audio) => audio.source = music.clone(),
                None => {
                    return Err(WorkerError::invalid_request(
                        "Music file uploaded without audio settings",
                    ))
                }
            }
        }

        Ok(spec)
    }
}

/// Two-source render request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DualRenderRequest {
    pub spec: DualSourceSpec,

    #[serde(default)]
    pub primary_file: Option<PathBuf>,

    #[serde(default)]
    pub secondary_file: Option<PathBuf>,
}

impl DualRenderRequest {
    /// Uploaded files owned by this request.
    pub fn upload_paths(&self) -> Vec<PathBuf> {
        self.primary_file
            .iter()
            .chain(self.secondary_file.iter())
            .cloned()
            .collect()
    }

    /// Spec with sources replaced by the uploaded files.
    pub fn bound_spec(&self) -> DualSourceSpec {
        let mut spec = self.spec.clone();
        if let Some(primary) = &self.primary_file {
            spec.primary = primary.clone();
        }
        if let Some(secondary) = &self.secondary_file {
            spec.secondary = secondary.clone();
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> RenderRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_uploads_replace_sources() {
        let req = request(json!({
            "composition": {
                "clips": [
                    { "source": "a.mp4", "duration": 2 },
                    { "source": "b.mp4", "duration": 3 }
                ],
                "audio": { "source": "song.mp3", "volume": 0.4 }
            },
            "clipFiles": ["/up/1.mp4", "/up/2.mp4"],
            "musicFile": "/up/music.mp3"
        }));

        let spec = req.bound_composition().unwrap();
        assert_eq!(spec.clips[1].source, PathBuf::from("/up/2.mp4"));
        assert_eq!(spec.audio.unwrap().source, PathBuf::from("/up/music.mp3"));
        assert_eq!(req.upload_paths().len(), 3);
    }

    #[test]
    fn test_clip_file_count_must_match() {
        let req = request(json!({
            "composition": { "clips": [{ "source": "a.mp4", "duration": 2 }] },
            "clipFiles": ["/up/1.mp4", "/up/2.mp4"]
        }));
        assert!(req.bound_composition().is_err());
    }

    #[test]
    fn test_music_needs_audio_settings() {
        let req = request(json!({
            "composition": { "clips": [{ "source": "a.mp4", "duration": 2 }] },
            "musicFile": "/up/music.mp3"
        }));
        assert!(req.bound_composition().is_err());
    }

    #[test]
    fn test_dual_binding() {
        let req: DualRenderRequest = serde_json::from_value(json!({
            "spec": { "primary": "a.mp4", "secondary": "b.mp4" },
            "secondaryFile": "/up/b.mp4"
        }))
        .unwrap();
        let spec = req.bound_spec();
        assert_eq!(spec.primary, PathBuf::from("a.mp4"));
        assert_eq!(spec.secondary, PathBuf::from("/up/b.mp4"));
        assert_eq!(req.upload_paths(), vec![PathBuf::from("/up/b.mp4")]);
    }
}
