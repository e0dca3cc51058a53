//! Logic Bridge
//!
//! Boundary layer between an external logic runtime (the "logic engine")
//! and a host simulation engine.  The logic engine owns gameplay state and
//! calls in through a flat `extern "C"` surface; the bridge marshals each
//! call onto the host's actor, physics, collision, input and logging
//! subsystems.
//!
//! ## Architecture
//!
//! ```text
//! logic engine ──C ABI──► ffi.rs       thread-local context, panic guard,
//!                           │          neutral values on failure
//!                           ▼
//!                        Bridge  (bridge.rs)  handle liveness, binding,
//!                           │                 two-phase sizing, stats
//!                           ▼
//!                        dyn Host  (host.rs)
//!                           ├── ActorRegistry
//!                           ├── InputSource
//!                           ├── PhysicsSystem
//!                           ├── CollisionQuery
//!                           └── VisualLogger
//! ```
//!
//! `protocol` holds the `#[repr(C)]` wire types, `handle` the generational
//! handles the host issues, and `geometry` the conversions between wire and
//! host-native (`glam`) math.
//!
//! With the `headless` feature, `headless::HeadlessHost` provides an
//! in-memory host used by the integration tests and the
//! `logic-bridge-headless` driver binary.

// Boundary types and the bridge itself are always available.
pub mod bridge;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod handle;
pub mod host;
pub mod protocol;
pub mod types;

// Reference host requires the `headless` feature.
#[cfg(feature = "headless")]
pub mod collision;
#[cfg(feature = "headless")]
pub mod headless;
#[cfg(feature = "headless")]
pub mod input;

pub use bridge::{resolve_action, Bridge};
pub use error::{BridgeError, Result};
pub use handle::{ActorHandle, BodyHandle, ComponentHandle, Handle};
pub use host::Host;
pub use protocol::{
    ActionState, ActorClass, Color, ComponentDescriptor, ComponentFilter, ComponentKind, Entity,
    HitResult, Quaternion, SpatialData, Vector3,
};
pub use types::{BridgeConfig, BridgeStats, RebindPolicy};

// Convenience re-exports (headless only)
#[cfg(feature = "headless")]
pub use headless::{HeadlessHost, Recorder, RigidBody};
