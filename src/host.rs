//! Host collaborators consumed by the bridge.
//!
//! The host engine owns the world; the bridge reaches it only through these
//! traits.  Each one mirrors a host subsystem and exposes exactly the
//! operations the boundary needs.  Implementations must never reuse a
//! handle value for a different object, and must treat any handle they did
//! not issue (or have since destroyed) as "not alive".

use crate::handle::{ActorHandle, BodyHandle, ComponentHandle};
use crate::protocol::{ActorClass, Color, Entity};
use crate::types::{ComponentInfo, HostHit, HostTransform, KeyState};
use glam::Vec3;
use std::any::Any;

// ---------------------------------------------------------------------------
// World / actor registry
// ---------------------------------------------------------------------------

pub trait ActorRegistry {
    /// Construct an actor of `class` at `transform`.  The class table is
    /// closed; every `ActorClass` must be constructible.
    fn spawn_actor(&mut self, class: ActorClass, transform: HostTransform) -> ActorHandle;

    fn is_actor_alive(&self, actor: ActorHandle) -> bool;

    /// Every live actor, in a stable order.
    fn actors(&self) -> Box<dyn Iterator<Item = ActorHandle> + '_>;

    fn actor_transform(&self, actor: ActorHandle) -> Option<HostTransform>;

    fn set_actor_transform(&mut self, actor: ActorHandle, transform: HostTransform) -> bool;

    fn tick_actor(&mut self, actor: ActorHandle, dt: f32);

    /// Components of `actor` (empty when the actor is not alive).
    fn components(&self, actor: ActorHandle) -> Box<dyn Iterator<Item = ComponentInfo> + '_>;

    /// Attach a new entity marker component.  `None` if the actor is gone.
    fn attach_entity_marker(&mut self, actor: ActorHandle, entity: Entity)
        -> Option<ComponentHandle>;

    /// Detach a marker previously returned by `attach_entity_marker`.
    fn remove_entity_marker(&mut self, marker: ComponentHandle) -> bool;

    fn set_view_target(&mut self, actor: ActorHandle);
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

pub trait InputSource {
    /// State of every key bound to `action`, in binding order.  Empty when
    /// the action is unknown.
    fn action_keys(&self, action: &str) -> Vec<KeyState>;

    /// `None` when the axis is unknown.
    fn axis_value(&self, axis: &str) -> Option<f32>;

    /// Pointer movement since the previous call.
    fn take_mouse_delta(&mut self) -> (f32, f32);
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

pub trait PhysicsSystem {
    /// True iff `body` is a live primitive component.
    fn is_body(&self, body: BodyHandle) -> bool;

    fn add_force(&mut self, body: BodyHandle, force: Vec3);

    fn add_impulse(&mut self, body: BodyHandle, impulse: Vec3);

    fn velocity(&self, body: BodyHandle) -> Vec3;

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3);

    fn is_simulating(&self, body: BodyHandle) -> bool;
}

// ---------------------------------------------------------------------------
// Collision
// ---------------------------------------------------------------------------

pub trait CollisionQuery {
    /// Nearest blocking hit on the segment `start → end` against the
    /// broadest collision category.
    fn line_trace(&self, start: Vec3, end: Vec3) -> Option<HostHit>;
}

// ---------------------------------------------------------------------------
// Logging / visual debug
// ---------------------------------------------------------------------------

pub trait VisualLogger {
    fn log_line(&mut self, line: &str);

    fn segment(&mut self, actor: ActorHandle, start: Vec3, end: Vec3, color: Color, category: &str);
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Everything the bridge needs from the host engine.
///
/// Implemented automatically for any type providing all subsystems.  The
/// `as_any` methods let the owner of a boxed host reach its concrete type.
pub trait Host: ActorRegistry + InputSource + PhysicsSystem + CollisionQuery + VisualLogger {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> Host for T
where
    T: ActorRegistry + InputSource + PhysicsSystem + CollisionQuery + VisualLogger + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
