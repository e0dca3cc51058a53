//! Headless reference host.
//!
//! An in-memory implementation of every host collaborator so the bridge can
//! run (and be tested) without a real engine:
//!
//! ```text
//! HeadlessHost
//!   ├── SlotRegistry<ActorRecord>      actors + transforms
//!   ├── SlotRegistry<ComponentRecord>  primitives, cameras, markers
//!   ├── class table                    ActorClass → factory (built once)
//!   ├── HeadlessInput                  bindings + key edges  (input.rs)
//!   └── Recorder                       log lines + debug segments
//! ```
//!
//! Physics is deliberately simple: forces accumulate until the owning actor
//! ticks, impulses change velocity immediately, and simulating bodies carry
//! their actor along with them.

use crate::collision::{segment_hit, Shape};
use crate::handle::{
    ActorHandle, ActorKind, BodyHandle, ComponentHandle, ComponentKindTag, SlotRegistry,
};
use crate::host::{ActorRegistry, CollisionQuery, InputSource, PhysicsSystem, VisualLogger};
use crate::input::HeadlessInput;
use crate::protocol::{ActorClass, Color, ComponentKind, Entity};
use crate::types::{ComponentInfo, DebugSegment, HostHit, HostTransform, KeyState};
use glam::Vec3;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// `log` target used for lines forwarded from the logic engine.
pub const LOGIC_LOG_TARGET: &str = "logic";

const DEFAULT_RADIUS: f32 = 50.0;
const DEFAULT_FOV_DEGREES: f32 = 90.0;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub shape: Shape,
    pub simulating: bool,
    pub mass: f32,
    pub velocity: Vec3,
    /// Force accumulated since the owner last ticked.
    pub pending_force: Vec3,
}

impl RigidBody {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            simulating: false,
            mass: 1.0,
            velocity: Vec3::ZERO,
            pending_force: Vec3::ZERO,
        }
    }

    pub fn simulating(mut self, simulating: bool) -> Self {
        self.simulating = simulating;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentData {
    Primitive(RigidBody),
    Camera { fov_degrees: f32 },
    EntityMarker(Entity),
    Scene,
}

impl ComponentData {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentData::Primitive(_) => ComponentKind::Primitive,
            ComponentData::Camera { .. } => ComponentKind::Camera,
            ComponentData::EntityMarker(_) => ComponentKind::EntityMarker,
            ComponentData::Scene => ComponentKind::Scene,
        }
    }
}

struct ComponentRecord {
    owner: ActorHandle,
    data: ComponentData,
}

impl ComponentRecord {
    fn info(&self, handle: ComponentHandle) -> ComponentInfo {
        ComponentInfo {
            handle,
            kind: self.data.kind(),
            marker: match self.data {
                ComponentData::EntityMarker(entity) => Some(entity),
                _ => None,
            },
        }
    }
}

struct ActorRecord {
    class: ActorClass,
    transform: HostTransform,
    components: Vec<ComponentHandle>,
}

// ---------------------------------------------------------------------------
// Class table
// ---------------------------------------------------------------------------

type ClassFactory = fn() -> Vec<ComponentData>;

fn default_actor() -> Vec<ComponentData> {
    vec![
        ComponentData::Scene,
        ComponentData::Primitive(RigidBody::new(Shape::Sphere {
            radius: DEFAULT_RADIUS,
        })),
    ]
}

fn camera_actor() -> Vec<ComponentData> {
    vec![
        ComponentData::Scene,
        ComponentData::Camera {
            fov_degrees: DEFAULT_FOV_DEGREES,
        },
    ]
}

const CLASS_TABLE: [(ActorClass, ClassFactory); 2] = [
    (ActorClass::DefaultActor, default_actor),
    (ActorClass::CameraActor, camera_actor),
];

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RecorderState {
    lines: Vec<String>,
    segments: Vec<DebugSegment>,
}

/// Shared view of everything the host was asked to log or draw.
///
/// Clone it before handing the host to the bridge; the clone keeps working
/// after the host has moved into the context.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.clone()
    }

    pub fn segments(&self) -> Vec<DebugSegment> {
        self.inner.lock().segments.clone()
    }

    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.lines.clear();
        state.segments.clear();
    }

    fn push_line(&self, line: &str) {
        self.inner.lock().lines.push(line.to_string());
    }

    fn push_segment(&self, segment: DebugSegment) {
        self.inner.lock().segments.push(segment);
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

pub struct HeadlessHost {
    actors: SlotRegistry<ActorRecord, ActorKind>,
    components: SlotRegistry<ComponentRecord, ComponentKindTag>,
    classes: HashMap<ActorClass, ClassFactory>,
    input: HeadlessInput,
    recorder: Recorder,
    view_target: ActorHandle,
    frame: u64,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            actors: SlotRegistry::new(),
            components: SlotRegistry::new(),
            classes: CLASS_TABLE.into_iter().collect(),
            input: HeadlessInput::new(),
            recorder: Recorder::default(),
            view_target: ActorHandle::NULL,
            frame: 0,
        }
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    pub fn input(&self) -> &HeadlessInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut HeadlessInput {
        &mut self.input
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn class_of(&self, actor: ActorHandle) -> Option<ActorClass> {
        self.actors.get(actor).map(|a| a.class)
    }

    pub fn view_target(&self) -> Option<ActorHandle> {
        (!self.view_target.is_null() && self.actors.contains(self.view_target))
            .then_some(self.view_target)
    }

    // -----------------------------------------------------------------------
    // Host-side lifecycle (never reachable from the logic engine)
    // -----------------------------------------------------------------------

    /// Destroy an actor and every component it owns.
    pub fn destroy_actor(&mut self, actor: ActorHandle) -> bool {
        let Some(record) = self.actors.remove(actor) else {
            return false;
        };
        for component in record.components {
            self.components.remove(component);
        }
        if self.view_target == actor {
            self.view_target = ActorHandle::NULL;
        }
        debug!("Destroyed {}", actor);
        true
    }

    pub fn add_primitive(&mut self, actor: ActorHandle, body: RigidBody) -> Option<BodyHandle> {
        self.attach(actor, ComponentData::Primitive(body))
            .map(|handle| handle.cast())
    }

    pub fn set_simulating(&mut self, body: BodyHandle, simulating: bool) -> bool {
        match self.body_mut(body) {
            Some(b) => {
                b.simulating = simulating;
                if !simulating {
                    b.velocity = Vec3::ZERO;
                    b.pending_force = Vec3::ZERO;
                }
                true
            }
            None => false,
        }
    }

    /// Advance one frame: tick every actor, then roll input edges over.
    pub fn step(&mut self, dt: f32) {
        let actors: Vec<_> = self.actors.handles().collect();
        for actor in actors {
            self.tick_actor(actor, dt);
        }
        self.input.end_frame();
        self.frame += 1;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn attach(&mut self, actor: ActorHandle, data: ComponentData) -> Option<ComponentHandle> {
        if !self.actors.contains(actor) {
            return None;
        }
        let handle = self.components.insert(ComponentRecord { owner: actor, data });
        self.actors.get_mut(actor)?.components.push(handle);
        Some(handle)
    }

    fn body(&self, body: BodyHandle) -> Option<&RigidBody> {
        match &self.components.get(body.cast())?.data {
            ComponentData::Primitive(b) => Some(b),
            _ => None,
        }
    }

    fn body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        match &mut self.components.get_mut(body.cast())?.data {
            ComponentData::Primitive(b) => Some(b),
            _ => None,
        }
    }

    fn simulating_body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        self.body_mut(body).filter(|b| b.simulating)
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ActorRegistry
// ---------------------------------------------------------------------------

impl ActorRegistry for HeadlessHost {
    fn spawn_actor(&mut self, class: ActorClass, transform: HostTransform) -> ActorHandle {
        let factory = self
            .classes
            .get(&class)
            .copied()
            .unwrap_or(default_actor as ClassFactory);

        let actor = self.actors.insert(ActorRecord {
            class,
            transform,
            components: Vec::new(),
        });
        for data in factory() {
            self.attach(actor, data);
        }

        debug!("Spawned {:?} {} at {}", class, actor, transform);
        actor
    }

    fn is_actor_alive(&self, actor: ActorHandle) -> bool {
        self.actors.contains(actor)
    }

    fn actors(&self) -> Box<dyn Iterator<Item = ActorHandle> + '_> {
        Box::new(self.actors.handles())
    }

    fn actor_transform(&self, actor: ActorHandle) -> Option<HostTransform> {
        self.actors.get(actor).map(|a| a.transform)
    }

    fn set_actor_transform(&mut self, actor: ActorHandle, transform: HostTransform) -> bool {
        match self.actors.get_mut(actor) {
            Some(record) => {
                record.transform = transform;
                true
            }
            None => false,
        }
    }

    fn tick_actor(&mut self, actor: ActorHandle, dt: f32) {
        let Some(record) = self.actors.get(actor) else {
            return;
        };
        let components = record.components.clone();

        let mut displacement = None;
        for component in components {
            if let Some(body) = self.body_mut(component.cast()) {
                if !body.simulating {
                    continue;
                }
                body.velocity += body.pending_force / body.mass * dt;
                body.pending_force = Vec3::ZERO;
                // The first simulating primitive is the root body.
                displacement.get_or_insert(body.velocity * dt);
            }
        }

        if let (Some(delta), Some(record)) = (displacement, self.actors.get_mut(actor)) {
            record.transform.translation += delta;
        }
    }

    fn components(&self, actor: ActorHandle) -> Box<dyn Iterator<Item = ComponentInfo> + '_> {
        let handles = self
            .actors
            .get(actor)
            .map(|a| a.components.as_slice())
            .unwrap_or(&[]);
        Box::new(
            handles
                .iter()
                .filter_map(move |h| self.components.get(*h).map(|rec| rec.info(*h))),
        )
    }

    fn attach_entity_marker(
        &mut self,
        actor: ActorHandle,
        entity: Entity,
    ) -> Option<ComponentHandle> {
        let marker = self.attach(actor, ComponentData::EntityMarker(entity))?;
        debug!("Attached {} to {} via {}", entity, actor, marker);
        Some(marker)
    }

    fn remove_entity_marker(&mut self, marker: ComponentHandle) -> bool {
        let owner = match self.components.get(marker) {
            Some(ComponentRecord {
                owner,
                data: ComponentData::EntityMarker(_),
            }) => *owner,
            _ => return false,
        };
        self.components.remove(marker);
        if let Some(record) = self.actors.get_mut(owner) {
            record.components.retain(|c| *c != marker);
        }
        true
    }

    fn set_view_target(&mut self, actor: ActorHandle) {
        if self.actors.contains(actor) {
            self.view_target = actor;
        } else {
            warn!("Ignoring view target {}: not alive", actor);
        }
    }
}

// ---------------------------------------------------------------------------
// InputSource
// ---------------------------------------------------------------------------

impl InputSource for HeadlessHost {
    fn action_keys(&self, action: &str) -> Vec<KeyState> {
        self.input.action_keys(action)
    }

    fn axis_value(&self, axis: &str) -> Option<f32> {
        self.input.axis_value(axis)
    }

    fn take_mouse_delta(&mut self) -> (f32, f32) {
        self.input.take_mouse_delta()
    }
}

// ---------------------------------------------------------------------------
// PhysicsSystem
// ---------------------------------------------------------------------------

impl PhysicsSystem for HeadlessHost {
    fn is_body(&self, body: BodyHandle) -> bool {
        self.body(body).is_some()
    }

    fn add_force(&mut self, body: BodyHandle, force: Vec3) {
        if let Some(b) = self.simulating_body_mut(body) {
            b.pending_force += force;
        }
    }

    fn add_impulse(&mut self, body: BodyHandle, impulse: Vec3) {
        if let Some(b) = self.simulating_body_mut(body) {
            b.velocity += impulse / b.mass;
        }
    }

    fn velocity(&self, body: BodyHandle) -> Vec3 {
        self.body(body).map(|b| b.velocity).unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.simulating_body_mut(body) {
            b.velocity = velocity;
        }
    }

    fn is_simulating(&self, body: BodyHandle) -> bool {
        self.body(body).is_some_and(|b| b.simulating)
    }
}

// ---------------------------------------------------------------------------
// CollisionQuery
// ---------------------------------------------------------------------------

impl CollisionQuery for HeadlessHost {
    fn line_trace(&self, start: Vec3, end: Vec3) -> Option<HostHit> {
        self.components
            .iter()
            .filter_map(|(_, rec)| {
                let ComponentData::Primitive(body) = &rec.data else {
                    return None;
                };
                let owner = self.actors.get(rec.owner)?;
                let shape = body.shape.scaled(owner.transform.scale);
                segment_hit(start, end, shape, owner.transform.translation)
                    .map(|hit| (rec.owner, hit))
            })
            .min_by(|(_, a), (_, b)| a.distance.total_cmp(&b.distance))
            .map(|(actor, hit)| HostHit {
                actor,
                distance: hit.distance,
                location: hit.point,
                normal: hit.normal,
                impact_point: hit.point,
                penetration_depth: hit.penetration_depth,
            })
    }
}

// ---------------------------------------------------------------------------
// VisualLogger
// ---------------------------------------------------------------------------

impl VisualLogger for HeadlessHost {
    fn log_line(&mut self, line: &str) {
        warn!(target: LOGIC_LOG_TARGET, "{}", line);
        self.recorder.push_line(line);
    }

    fn segment(&mut self, actor: ActorHandle, start: Vec3, end: Vec3, color: Color, category: &str) {
        debug!(
            "[{}] segment on {}: {} -> {} {:?}",
            category, actor, start, end, color
        );
        self.recorder.push_segment(DebugSegment {
            actor,
            start,
            end,
            color,
        });
    }
}
