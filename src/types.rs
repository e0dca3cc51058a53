//! Host-native types shared by the bridge, the host traits and the
//! reference host, plus bridge configuration and stats.

use crate::handle::{ActorHandle, ComponentHandle};
use crate::protocol::{ActorClass, Color, ComponentKind, Entity};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// Host-side transform (translation, rotation, scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl HostTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }
}

impl Default for HostTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::fmt::Display for HostTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[t={:.2} r={:.3} s={:.2}]",
            self.translation, self.rotation, self.scale
        )
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Nearest hit reported by the host collision system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostHit {
    pub actor: ActorHandle,
    pub distance: f32,
    pub location: Vec3,
    pub normal: Vec3,
    pub impact_point: Vec3,
    pub penetration_depth: f32,
}

/// One sub-object of an actor as advertised by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    pub handle: ComponentHandle,
    pub kind: ComponentKind,
    /// Stored id when `kind` is [`ComponentKind::EntityMarker`].
    pub marker: Option<Entity>,
}

/// Edge and level state of one bound key this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub down: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

/// A debug line attached to an actor's visual-log context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebugSegment {
    pub actor: ActorHandle,
    pub start: Vec3,
    pub end: Vec3,
    pub color: Color,
}

// ---------------------------------------------------------------------------
// Config & stats
// ---------------------------------------------------------------------------

/// What binding an already-bound actor to a different entity does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebindPolicy {
    /// Drop the existing marker, attach a fresh one.
    #[default]
    Replace,
    /// Keep the existing marker and refuse the bind.
    Reject,
    /// Attach another marker alongside the existing one.
    Stack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub rebind_policy: RebindPolicy,
    /// Class spawned when the logic engine sends an unknown class tag.
    pub fallback_class: ActorClass,
    /// Emit a warning each time a stale handle is rejected.
    pub log_stale_handles: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            rebind_policy: RebindPolicy::Replace,
            fallback_class: ActorClass::DefaultActor,
            log_stale_handles: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    pub spawned: u64,
    pub bound: u64,
    pub traces: u64,
    pub trace_hits: u64,
    pub log_lines: u64,
    pub stale_handles: u64,
    pub fallbacks: u64,
}
