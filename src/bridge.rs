//! Bridge – every boundary operation, expressed against the host traits.
//!
//! The bridge is the only place that dereferences a logic-engine handle.
//! Before any host call it checks that the handle is still live; stale
//! handles surface as [`BridgeError::StaleHandle`] and are counted in
//! [`BridgeStats`].  All calls are synchronous and run on the caller's
//! thread; the bridge holds no locks and queues nothing.

use crate::error::{BridgeError, Result};
use crate::handle::{ActorHandle, BodyHandle, Handle, HandleKind};
use crate::host::Host;
use crate::protocol::{
    ActionState, ActorClass, Color, ComponentDescriptor, ComponentFilter, ComponentKind, Entity,
    HitResult, SpatialData, Vector3,
};
use crate::types::{BridgeConfig, BridgeStats, KeyState, RebindPolicy};
use log::{debug, warn};
use std::borrow::Cow;
use std::mem::MaybeUninit;

/// Visual-log category for segments drawn on behalf of the logic engine.
pub const VISUAL_LOG_CATEGORY: &str = "logic-bridge";

pub struct Bridge {
    config: BridgeConfig,
    host: Box<dyn Host>,
    stats: BridgeStats,
}

impl Bridge {
    pub fn new(config: BridgeConfig, host: Box<dyn Host>) -> Self {
        Self {
            config,
            host,
            stats: BridgeStats::default(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    /// Reach the concrete host type (e.g. to advance a headless world).
    pub fn downcast_host<H: 'static>(&self) -> Option<&H> {
        self.host.as_any().downcast_ref::<H>()
    }

    pub fn downcast_host_mut<H: 'static>(&mut self) -> Option<&mut H> {
        self.host.as_any_mut().downcast_mut::<H>()
    }

    pub fn into_host(self) -> Box<dyn Host> {
        self.host
    }

    // -----------------------------------------------------------------------
    // Liveness
    // -----------------------------------------------------------------------

    fn live_actor(&mut self, actor: ActorHandle) -> Result<ActorHandle> {
        if !actor.is_null() && self.host.is_actor_alive(actor) {
            Ok(actor)
        } else {
            Err(self.reject(actor))
        }
    }

    fn live_body(&mut self, body: BodyHandle) -> Result<BodyHandle> {
        if !body.is_null() && self.host.is_body(body) {
            Ok(body)
        } else {
            Err(self.reject(body))
        }
    }

    fn reject<K: HandleKind>(&mut self, handle: Handle<K>) -> BridgeError {
        self.stats.stale_handles += 1;
        let err = BridgeError::stale(handle);
        if self.config.log_stale_handles {
            warn!("{}", err);
        }
        err
    }

    // -----------------------------------------------------------------------
    // Spatial
    // -----------------------------------------------------------------------

    pub fn spatial_data(&mut self, actor: ActorHandle) -> Result<SpatialData> {
        let actor = self.live_actor(actor)?;
        self.host
            .actor_transform(actor)
            .map(SpatialData::from)
            .ok_or_else(|| BridgeError::stale(actor))
    }

    pub fn set_spatial_data(&mut self, actor: ActorHandle, data: SpatialData) -> Result<()> {
        let actor = self.live_actor(actor)?;
        if self.host.set_actor_transform(actor, data.into()) {
            Ok(())
        } else {
            Err(BridgeError::stale(actor))
        }
    }

    pub fn tick_actor(&mut self, actor: ActorHandle, dt: f32) -> Result<()> {
        let actor = self.live_actor(actor)?;
        self.host.tick_actor(actor, dt);
        Ok(())
    }

    pub fn set_view_target(&mut self, actor: ActorHandle) -> Result<()> {
        let actor = self.live_actor(actor)?;
        self.host.set_view_target(actor);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Entity–actor binding
    // -----------------------------------------------------------------------

    /// Attach a marker recording `entity` to `actor`, honouring the
    /// configured [`RebindPolicy`] when the actor is already bound.
    pub fn bind(&mut self, actor: ActorHandle, entity: Entity) -> Result<()> {
        let actor = self.live_actor(actor)?;

        let existing: Vec<_> = self
            .host
            .components(actor)
            .filter_map(|c| c.marker.map(|e| (c.handle, e)))
            .collect();

        if existing.iter().any(|(_, e)| *e == entity) {
            debug!("{} already bound to {}", actor, entity);
            return Ok(());
        }

        if let Some((_, current)) = existing.first() {
            match self.config.rebind_policy {
                RebindPolicy::Reject => {
                    return Err(BridgeError::AlreadyBound {
                        actor: actor.to_raw(),
                        existing: current.id,
                    });
                }
                RebindPolicy::Replace => {
                    for (marker, _) in &existing {
                        self.host.remove_entity_marker(*marker);
                    }
                    debug!("Rebinding {} from {} to {}", actor, current, entity);
                }
                RebindPolicy::Stack => {
                    warn!("Stacking {} onto {} (already {})", entity, actor, current);
                }
            }
        }

        self.host
            .attach_entity_marker(actor, entity)
            .ok_or_else(|| BridgeError::stale(actor))?;
        self.stats.bound += 1;
        Ok(())
    }

    /// The entity `actor` represents, if it carries a marker.
    pub fn entity_for_actor(&mut self, actor: ActorHandle) -> Result<Option<Entity>> {
        let actor = self.live_actor(actor)?;
        Ok(self.host.components(actor).find_map(|c| c.marker))
    }

    /// Two-phase enumeration of actors carrying a marker.  Each bound actor
    /// appears once no matter how many markers it carries.
    pub fn bound_actors(&self, out: Option<&mut [ActorHandle]>) -> usize {
        match out {
            None => self.bound().count(),
            Some(buf) => fill_two_phase(self.bound(), buf.len(), |i, actor| buf[i] = actor),
        }
    }

    /// Fill phase over a caller buffer that may be uninitialised.
    pub fn fill_bound_actors(&self, out: &mut [MaybeUninit<ActorHandle>]) -> usize {
        fill_two_phase(self.bound(), out.len(), |i, actor| {
            out[i].write(actor);
        })
    }

    fn bound(&self) -> impl Iterator<Item = ActorHandle> + '_ {
        let host = self.host.as_ref();
        host.actors().filter(move |actor| {
            host.components(*actor)
                .any(|c| c.kind == ComponentKind::EntityMarker)
        })
    }

    // -----------------------------------------------------------------------
    // World queries
    // -----------------------------------------------------------------------

    /// Decode a wire class tag, falling back for unknown values.
    pub fn resolve_class(&mut self, raw: u32) -> ActorClass {
        ActorClass::from_raw(raw).unwrap_or_else(|| {
            self.stats.fallbacks += 1;
            warn!(
                "Unknown actor class tag {}; spawning {:?}",
                raw, self.config.fallback_class
            );
            self.config.fallback_class
        })
    }

    pub fn spawn(&mut self, class: u32, spatial: SpatialData) -> ActorHandle {
        let class = self.resolve_class(class);
        let actor = self.host.spawn_actor(class, spatial.into());
        self.stats.spawned += 1;
        actor
    }

    /// Single ray query against all collidable geometry.
    pub fn trace(&mut self, start: Vector3, end: Vector3) -> Option<HitResult> {
        self.stats.traces += 1;
        let hit = self.host.line_trace(start.into(), end.into())?;
        self.stats.trace_hits += 1;
        Some(HitResult {
            actor: hit.actor,
            distance: hit.distance,
            location: hit.location.into(),
            normal: hit.normal.into(),
            impact_location: hit.impact_point.into(),
            penetration_depth: hit.penetration_depth,
        })
    }

    /// Two-phase enumeration of `actor`'s components matching `filter`.
    /// Both phases count matches only.
    pub fn components(
        &mut self,
        actor: ActorHandle,
        filter: ComponentFilter,
        out: Option<&mut [ComponentDescriptor]>,
    ) -> Result<usize> {
        let actor = self.live_actor(actor)?;
        let matching = self.matching(actor, filter);
        Ok(match out {
            None => matching.count(),
            Some(buf) => fill_two_phase(matching, buf.len(), |i, c| buf[i] = c),
        })
    }

    /// Fill phase of [`Bridge::components`] over a buffer that may be
    /// uninitialised.
    pub fn fill_components(
        &mut self,
        actor: ActorHandle,
        filter: ComponentFilter,
        out: &mut [MaybeUninit<ComponentDescriptor>],
    ) -> Result<usize> {
        let actor = self.live_actor(actor)?;
        Ok(fill_two_phase(self.matching(actor, filter), out.len(), |i, c| {
            out[i].write(c);
        }))
    }

    fn matching(
        &self,
        actor: ActorHandle,
        filter: ComponentFilter,
    ) -> impl Iterator<Item = ComponentDescriptor> + '_ {
        self.host
            .components(actor)
            .filter(move |c| filter.matches(c.kind))
            .map(|c| ComponentDescriptor {
                kind: c.kind,
                handle: c.handle,
            })
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn action_state(&self, action: &str) -> ActionState {
        resolve_action(&self.host.action_keys(action))
    }

    pub fn axis_value(&self, axis: &str) -> f32 {
        self.host.axis_value(axis).unwrap_or(0.0)
    }

    pub fn mouse_delta(&mut self) -> (f32, f32) {
        self.host.take_mouse_delta()
    }

    // -----------------------------------------------------------------------
    // Physics
    // -----------------------------------------------------------------------

    pub fn add_force(&mut self, body: BodyHandle, force: Vector3) -> Result<()> {
        let body = self.live_body(body)?;
        self.host.add_force(body, force.into());
        Ok(())
    }

    pub fn add_impulse(&mut self, body: BodyHandle, impulse: Vector3) -> Result<()> {
        let body = self.live_body(body)?;
        self.host.add_impulse(body, impulse.into());
        Ok(())
    }

    pub fn velocity(&mut self, body: BodyHandle) -> Result<Vector3> {
        let body = self.live_body(body)?;
        Ok(self.host.velocity(body).into())
    }

    pub fn set_velocity(&mut self, body: BodyHandle, velocity: Vector3) -> Result<()> {
        let body = self.live_body(body)?;
        self.host.set_velocity(body, velocity.into());
        Ok(())
    }

    pub fn is_simulating(&mut self, body: BodyHandle) -> Result<bool> {
        let body = self.live_body(body)?;
        Ok(self.host.is_simulating(body))
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// Forward a length-delimited UTF-8 buffer to the host log.
    ///
    /// Valid UTF-8 is forwarded without copying; invalid sequences are
    /// replaced, which allocates a temporary dropped before returning.
    pub fn log_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let text: Cow<'_, str> = String::from_utf8_lossy(bytes);
        self.host.log_line(&text);
        self.stats.log_lines += 1;
    }

    pub fn visual_segment(
        &mut self,
        actor: ActorHandle,
        start: Vector3,
        end: Vector3,
        color: Color,
    ) -> Result<()> {
        let actor = self.live_actor(actor)?;
        self.host
            .segment(actor, start.into(), end.into(), color, VISUAL_LOG_CATEGORY);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pick one state for an action across all of its bound keys.
///
/// Priority is `Pressed > Released > Held`, independent of binding order.
pub fn resolve_action(keys: &[KeyState]) -> ActionState {
    if keys.iter().any(|k| k.just_pressed) {
        ActionState::Pressed
    } else if keys.iter().any(|k| k.just_released) {
        ActionState::Released
    } else if keys.iter().any(|k| k.down) {
        ActionState::Held
    } else {
        ActionState::Nothing
    }
}

/// Fill phase of the two-phase protocol: hand at most `capacity` items to
/// `put` by position and return the number written.
fn fill_two_phase<T>(
    items: impl Iterator<Item = T>,
    capacity: usize,
    mut put: impl FnMut(usize, T),
) -> usize {
    let mut written = 0;
    for item in items.take(capacity) {
        put(written, item);
        written += 1;
    }
    written
}
