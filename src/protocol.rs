//! Boundary wire types.
//!
//! This module owns **every value that crosses the boundary** between the
//! logic engine and the host engine.  Nothing here knows about the host's
//! object model; values are plain data passed by value or written into
//! caller-supplied memory.
//!
//! ## Design rules
//!
//! 1. Every struct is `#[repr(C)]` + `Copy` with no padding surprises
//!    (all fields are `f32`, `u8`, `u32` or `u64`).
//! 2. No host-native types (`glam`, trait objects) appear here; conversion
//!    lives in [`crate::geometry`].
//! 3. Enumerations the logic engine *sends* (class tags, filters) cross as a
//!    raw `u32` and are decoded here with a fallback, so an unknown value is
//!    never materialised as an invalid Rust enum.
//! 4. Handles are `u64`; the raw value `0` is the wire `null`.

use crate::handle::{ActorHandle, BodyHandle, ComponentHandle};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Spatial primitives
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Vector3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Rotation as a unit quaternion, scalar last.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position, rotation and scale of an actor.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialData {
    pub position: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
}

impl SpatialData {
    pub const IDENTITY: Self = Self {
        position: Vector3::ZERO,
        rotation: Quaternion::IDENTITY,
        scale: Vector3::ONE,
    };

    pub fn at(position: Vector3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }
}

impl Default for SpatialData {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 8-bit RGBA colour used by debug draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Logic-engine entity identifier.  Stored and returned verbatim.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
}

impl Entity {
    pub const fn new(id: u64) -> Self {
        Self { id }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.id)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Discrete state of a named action for the current tick.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionState {
    #[default]
    Nothing = 0,
    Pressed = 1,
    Released = 2,
    Held = 3,
}

// ---------------------------------------------------------------------------
// Actor classes
// ---------------------------------------------------------------------------

/// Closed set of actor classes both sides agree on.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorClass {
    #[default]
    DefaultActor = 0,
    CameraActor = 1,
}

impl ActorClass {
    pub const ALL: [ActorClass; 2] = [ActorClass::DefaultActor, ActorClass::CameraActor];

    /// Decode a raw wire tag; `None` for values outside the closed set.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::DefaultActor),
            1 => Some(Self::CameraActor),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Kind tag carried by every [`ComponentDescriptor`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Physical / renderable primitive; the handle is also a [`BodyHandle`].
    Primitive = 0,
    Camera = 1,
    EntityMarker = 2,
    /// Transform-only scene node with no physical presence.
    Scene = 3,
}

/// Selection applied by component enumeration.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentFilter {
    /// Only components advertising a physical/renderable capability.
    #[default]
    Primitive = 0,
    Any = 1,
}

impl ComponentFilter {
    /// Unknown raw values select the narrowest filter.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Any,
            _ => Self::Primitive,
        }
    }

    pub fn matches(self, kind: ComponentKind) -> bool {
        match self {
            Self::Primitive => kind == ComponentKind::Primitive,
            Self::Any => true,
        }
    }
}

/// Typed reference to a sub-object of an actor.
///
/// The kind tag must be inspected before the handle is treated as anything
/// more specific; [`ComponentDescriptor::as_body`] is the only checked path.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub kind: ComponentKind,
    pub handle: ComponentHandle,
}

impl ComponentDescriptor {
    pub fn as_body(&self) -> Option<BodyHandle> {
        (self.kind == ComponentKind::Primitive).then(|| self.handle.cast())
    }
}

impl Default for ComponentDescriptor {
    fn default() -> Self {
        Self {
            kind: ComponentKind::Scene,
            handle: ComponentHandle::NULL,
        }
    }
}

// ---------------------------------------------------------------------------
// Traces
// ---------------------------------------------------------------------------

/// Nearest hit of a line trace.  Only meaningful when the trace reported a hit.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    /// Struck actor, or null.
    pub actor: ActorHandle,
    pub distance: f32,
    pub location: Vector3,
    pub normal: Vector3,
    pub impact_location: Vector3,
    pub penetration_depth: f32,
}
