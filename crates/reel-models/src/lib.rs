//! Shared data models for reel composition rendering.
//!
//! This crate provides Serde-serializable types for:
//! - Composition requests (clips, title, captions, overlays, ranking, audio)
//! - The two-source stacked variant
//! - Quality tiers and their encoding parameters
//! - Render ids and success/failure payloads

pub mod composition;
pub mod dual;
pub mod quality;
pub mod render;
pub mod timestamp;

// Re-export common types
pub use composition::{
    AudioConfig, CaptionAnimation, CaptionPosition, CaptionSpec, ClipSpec, CompositionSpec,
    OverlayKind, OverlaySpec, RankingConfig, RankingPosition, RelativePosition, TitleSpec,
    TitleStyle, TransitionConfig,
};
pub use dual::DualSourceSpec;
pub use quality::{EncodingProfile, QualityTier};
pub use render::{FailureKind, RenderFailure, RenderId, RenderOutput, RenderProgress};
