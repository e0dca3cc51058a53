//! `extern "C"` boundary surface.
//!
//! ## Context lifecycle
//!
//! The host installs one [`Bridge`] per simulation with [`install`] and
//! removes it with [`teardown`].  The context lives in a thread-local slot,
//! so it is reachable only from the thread that installed it (the host's
//! simulation thread).  A call from any other thread, or outside the
//! install/teardown window, finds no context and returns the neutral value.
//!
//! ## Caller obligations
//!
//! Entry points taking raw pointers are `unsafe`.  Every non-null pointer
//! must be valid for the documented access (reads of `len` bytes, writes of
//! one value, or writes of `*len` elements).  Null output pointers are
//! tolerated.  Handles need not be live: stale handles are detected and the
//! call degrades to its neutral result.
//!
//! No panic unwinds across this boundary; a panic inside an entry point is
//! logged and the neutral value is returned.

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::handle::{ActorHandle, BodyHandle};
use crate::protocol::{
    ActionState, Color, ComponentDescriptor, ComponentFilter, Entity, HitResult, Quaternion,
    SpatialData, Vector3,
};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static CONTEXT: RefCell<Option<Bridge>> = const { RefCell::new(None) };
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Install `bridge` as this thread's context.  Returns the context it
/// replaced, if any.
pub fn install(bridge: Bridge) -> Option<Bridge> {
    info!("Installing logic bridge context");
    CONTEXT.with(|slot| slot.borrow_mut().replace(bridge))
}

/// Remove and return this thread's context.
pub fn teardown() -> Option<Bridge> {
    let bridge = CONTEXT.with(|slot| slot.borrow_mut().take());
    if bridge.is_some() {
        info!("Logic bridge context torn down");
    }
    bridge
}

pub fn is_installed() -> bool {
    CONTEXT.with(|slot| slot.try_borrow().map(|b| b.is_some()).unwrap_or(true))
}

/// Run `f` against the installed context from host-side Rust code.
///
/// `None` when nothing is installed or when called from inside another
/// context call on this thread.
pub fn with_context<R>(f: impl FnOnce(&mut Bridge) -> R) -> Option<R> {
    CONTEXT.with(|slot| match slot.try_borrow_mut() {
        Ok(mut guard) => guard.as_mut().map(f),
        Err(_) => {
            warn!("with_context: re-entrant bridge access rejected");
            None
        }
    })
}

/// Run a boundary operation, degrading to `R::default()` when there is no
/// context, on re-entry, or on panic.
fn guarded<R: Default>(op: &'static str, f: impl FnOnce(&mut Bridge) -> R) -> R {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        CONTEXT.with(|slot| match slot.try_borrow_mut() {
            Ok(mut guard) => guard.as_mut().map(f),
            Err(_) => {
                warn!("{}: re-entrant bridge call rejected", op);
                None
            }
        })
    }));

    match outcome {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!("{}: {}", op, BridgeError::NoContext);
            R::default()
        }
        Err(_) => {
            error!("{}: panic caught at the boundary", op);
            R::default()
        }
    }
}

/// Collapse an internal result to the neutral value of the call.
fn neutral<T: Default>(op: &'static str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        debug!("{}: {}", op, e);
        T::default()
    })
}

unsafe fn write_out<T>(ptr: *mut T, value: T) {
    if !ptr.is_null() {
        ptr.write(value);
    }
}

/// Borrow a length-delimited UTF-8 name.  `None` for null, empty or
/// non-UTF-8 input.
unsafe fn name_arg<'a>(ptr: *const u8, len: usize) -> Option<&'a str> {
    if ptr.is_null() || len == 0 {
        return None;
    }
    std::str::from_utf8(std::slice::from_raw_parts(ptr, len)).ok()
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn bridge_set_spatial_data(
    actor: ActorHandle,
    position: Vector3,
    rotation: Quaternion,
    scale: Vector3,
) {
    guarded("set_spatial_data", |b| {
        let data = SpatialData {
            position,
            rotation,
            scale,
        };
        neutral("set_spatial_data", b.set_spatial_data(actor, data))
    })
}

/// # Safety
/// Each non-null output pointer must be valid for one write.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_spatial_data(
    actor: ActorHandle,
    position: *mut Vector3,
    rotation: *mut Quaternion,
    scale: *mut Vector3,
) {
    let Some(data) = guarded("get_spatial_data", |b| b.spatial_data(actor).ok()) else {
        return;
    };
    write_out(position, data.position);
    write_out(rotation, data.rotation);
    write_out(scale, data.scale);
}

#[no_mangle]
pub extern "C" fn bridge_tick_actor(actor: ActorHandle, dt: f32) {
    guarded("tick_actor", |b| neutral("tick_actor", b.tick_actor(actor, dt)))
}

#[no_mangle]
pub extern "C" fn bridge_set_view_target(actor: ActorHandle) {
    guarded("set_view_target", |b| {
        neutral("set_view_target", b.set_view_target(actor))
    })
}

// ---------------------------------------------------------------------------
// Entity–actor binding
// ---------------------------------------------------------------------------

/// Returns 1 when the actor carries `entity` afterwards, 0 otherwise.
#[no_mangle]
pub extern "C" fn bridge_set_entity_for_actor(actor: ActorHandle, entity: Entity) -> u32 {
    guarded("set_entity_for_actor", |b| b.bind(actor, entity).is_ok() as u32)
}

/// Two-phase enumeration of bound actors.
///
/// With `data == null`, writes the total into `*len`.  Otherwise fills up
/// to `*len` handles and writes the number written back into `*len`.
///
/// # Safety
/// `len` must be valid for read and write; a non-null `data` must be valid
/// for `*len` writes.  The buffer may be uninitialised; only the first
/// `*len` (as written back) elements are initialised on return.
#[no_mangle]
pub unsafe extern "C" fn bridge_iterate_actors(data: *mut ActorHandle, len: *mut u64) {
    if len.is_null() {
        return;
    }
    let count = if data.is_null() {
        guarded("iterate_actors", |b| b.bound_actors(None))
    } else {
        let buf = std::slice::from_raw_parts_mut(
            data.cast::<MaybeUninit<ActorHandle>>(),
            *len as usize,
        );
        guarded("iterate_actors", |b| b.fill_bound_actors(buf))
    };
    *len = count as u64;
}

/// # Safety
/// A non-null `entity` must be valid for one write.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_entity_for_actor(actor: ActorHandle, entity: *mut Entity) -> u32 {
    let found = guarded("get_entity_for_actor", |b| {
        neutral("get_entity_for_actor", b.entity_for_actor(actor))
    });
    match found {
        Some(e) => {
            write_out(entity, e);
            1
        }
        None => 0,
    }
}

// ---------------------------------------------------------------------------
// World queries
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn bridge_spawn_actor(
    class: u32,
    position: Vector3,
    rotation: Quaternion,
    scale: Vector3,
) -> ActorHandle {
    guarded("spawn_actor", |b| {
        b.spawn(
            class,
            SpatialData {
                position,
                rotation,
                scale,
            },
        )
    })
}

/// Returns 1 on hit and fills `*result`; returns 0 and leaves `*result`
/// untouched otherwise.
///
/// # Safety
/// A non-null `result` must be valid for one write.
#[no_mangle]
pub unsafe extern "C" fn bridge_line_trace(
    start: Vector3,
    end: Vector3,
    result: *mut HitResult,
) -> u32 {
    match guarded("line_trace", |b| b.trace(start, end)) {
        Some(hit) => {
            write_out(result, hit);
            1
        }
        None => 0,
    }
}

/// Two-phase enumeration of an actor's components matching `filter`
/// (`0` = primitives, `1` = any).  Same `data`/`len` protocol as
/// [`bridge_iterate_actors`].
///
/// # Safety
/// `len` must be valid for read and write; a non-null `data` must be valid
/// for `*len` writes.  The buffer may be uninitialised; only the first
/// `*len` (as written back) elements are initialised on return.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_actor_components(
    actor: ActorHandle,
    filter: u32,
    data: *mut ComponentDescriptor,
    len: *mut usize,
) {
    if len.is_null() {
        return;
    }
    let filter = ComponentFilter::from_raw(filter);
    let count = if data.is_null() {
        guarded("get_actor_components", |b| {
            neutral("get_actor_components", b.components(actor, filter, None))
        })
    } else {
        let buf =
            std::slice::from_raw_parts_mut(data.cast::<MaybeUninit<ComponentDescriptor>>(), *len);
        guarded("get_actor_components", |b| {
            neutral("get_actor_components", b.fill_components(actor, filter, buf))
        })
    };
    *len = count;
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// # Safety
/// `name` must be valid for `name_len` reads; a non-null `state` must be
/// valid for one write.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_action_state(
    name: *const u8,
    name_len: usize,
    state: *mut ActionState,
) {
    let value = match name_arg(name, name_len) {
        Some(action) => guarded("get_action_state", |b| b.action_state(action)),
        None => ActionState::Nothing,
    };
    write_out(state, value);
}

/// # Safety
/// `name` must be valid for `name_len` reads; a non-null `value` must be
/// valid for one write.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_axis_value(name: *const u8, name_len: usize, value: *mut f32) {
    let axis_value = match name_arg(name, name_len) {
        Some(axis) => guarded("get_axis_value", |b| b.axis_value(axis)),
        None => 0.0,
    };
    write_out(value, axis_value);
}

/// # Safety
/// Each non-null output pointer must be valid for one write.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_mouse_delta(x: *mut f32, y: *mut f32) {
    let (dx, dy) = guarded("get_mouse_delta", |b| b.mouse_delta());
    write_out(x, dx);
    write_out(y, dy);
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn bridge_add_force(body: BodyHandle, force: Vector3) {
    guarded("add_force", |b| neutral("add_force", b.add_force(body, force)))
}

#[no_mangle]
pub extern "C" fn bridge_add_impulse(body: BodyHandle, impulse: Vector3) {
    guarded("add_impulse", |b| {
        neutral("add_impulse", b.add_impulse(body, impulse))
    })
}

#[no_mangle]
pub extern "C" fn bridge_get_velocity(body: BodyHandle) -> Vector3 {
    guarded("get_velocity", |b| neutral("get_velocity", b.velocity(body)))
}

#[no_mangle]
pub extern "C" fn bridge_set_velocity(body: BodyHandle, velocity: Vector3) {
    guarded("set_velocity", |b| {
        neutral("set_velocity", b.set_velocity(body, velocity))
    })
}

#[no_mangle]
pub extern "C" fn bridge_is_simulating(body: BodyHandle) -> u32 {
    guarded("is_simulating", |b| {
        neutral("is_simulating", b.is_simulating(body)) as u32
    })
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Log `len` bytes of UTF-8 text.  The buffer need not be null-terminated
/// and is never read past `len`.  Non-positive lengths log nothing.
///
/// # Safety
/// `text` must be valid for `len` reads.
#[no_mangle]
pub unsafe extern "C" fn bridge_log(text: *const u8, len: i32) {
    if text.is_null() || len <= 0 {
        return;
    }
    let bytes = std::slice::from_raw_parts(text, len as usize);
    guarded("log", |b| b.log_bytes(bytes))
}

#[no_mangle]
pub extern "C" fn bridge_visual_log_segment(
    actor: ActorHandle,
    start: Vector3,
    end: Vector3,
    color: Color,
) {
    guarded("visual_log_segment", |b| {
        neutral("visual_log_segment", b.visual_segment(actor, start, end, color))
    })
}

// ---------------------------------------------------------------------------
// Function table
// ---------------------------------------------------------------------------

/// Entry points handed to the logic engine when it is loaded.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostApi {
    pub set_spatial_data: extern "C" fn(ActorHandle, Vector3, Quaternion, Vector3),
    pub get_spatial_data:
        unsafe extern "C" fn(ActorHandle, *mut Vector3, *mut Quaternion, *mut Vector3),
    pub tick_actor: extern "C" fn(ActorHandle, f32),
    pub set_view_target: extern "C" fn(ActorHandle),
    pub set_entity_for_actor: extern "C" fn(ActorHandle, Entity) -> u32,
    pub get_entity_for_actor: unsafe extern "C" fn(ActorHandle, *mut Entity) -> u32,
    pub iterate_actors: unsafe extern "C" fn(*mut ActorHandle, *mut u64),
    pub spawn_actor: extern "C" fn(u32, Vector3, Quaternion, Vector3) -> ActorHandle,
    pub line_trace: unsafe extern "C" fn(Vector3, Vector3, *mut HitResult) -> u32,
    pub get_actor_components:
        unsafe extern "C" fn(ActorHandle, u32, *mut ComponentDescriptor, *mut usize),
    pub get_action_state: unsafe extern "C" fn(*const u8, usize, *mut ActionState),
    pub get_axis_value: unsafe extern "C" fn(*const u8, usize, *mut f32),
    pub get_mouse_delta: unsafe extern "C" fn(*mut f32, *mut f32),
    pub add_force: extern "C" fn(BodyHandle, Vector3),
    pub add_impulse: extern "C" fn(BodyHandle, Vector3),
    pub get_velocity: extern "C" fn(BodyHandle) -> Vector3,
    pub set_velocity: extern "C" fn(BodyHandle, Vector3),
    pub is_simulating: extern "C" fn(BodyHandle) -> u32,
    pub log: unsafe extern "C" fn(*const u8, i32),
    pub visual_log_segment: extern "C" fn(ActorHandle, Vector3, Vector3, Color),
}

pub fn host_api() -> HostApi {
    HostApi {
        set_spatial_data: bridge_set_spatial_data,
        get_spatial_data: bridge_get_spatial_data,
        tick_actor: bridge_tick_actor,
        set_view_target: bridge_set_view_target,
        set_entity_for_actor: bridge_set_entity_for_actor,
        get_entity_for_actor: bridge_get_entity_for_actor,
        iterate_actors: bridge_iterate_actors,
        spawn_actor: bridge_spawn_actor,
        line_trace: bridge_line_trace,
        get_actor_components: bridge_get_actor_components,
        get_action_state: bridge_get_action_state,
        get_axis_value: bridge_get_axis_value,
        get_mouse_delta: bridge_get_mouse_delta,
        add_force: bridge_add_force,
        add_impulse: bridge_add_impulse,
        get_velocity: bridge_get_velocity,
        set_velocity: bridge_set_velocity,
        is_simulating: bridge_is_simulating,
        log: bridge_log,
        visual_log_segment: bridge_visual_log_segment,
    }
}
