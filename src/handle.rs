//! Handle registry: typed, generational, non-owning references to host objects.
//!
//! A handle packs a slot index and a generation into one `u64`:
//!
//! ```text
//!  63            32 31             0
//! ┌────────────────┬────────────────┐
//! │   generation   │     index      │
//! └────────────────┴────────────────┘
//! ```
//!
//! Generations start at 1, so the all-zero value is never live and doubles
//! as the wire `null`.  Removing an object bumps its slot's generation, which
//! turns every outstanding handle to it stale instead of dangling.  A slot
//! whose generation would wrap is retired, so a handle value is never
//! reissued to a different object.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const FIRST_GENERATION: u32 = 1;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Zero-sized tag distinguishing handle namespaces at compile time.
pub trait HandleKind: 'static {
    const NAME: &'static str;
}

/// Host world object.
pub enum ActorKind {}
/// Any sub-object of an actor.
pub enum ComponentKindTag {}
/// Physics-enabled primitive component.
pub enum BodyKind {}

impl HandleKind for ActorKind {
    const NAME: &'static str = "actor";
}
impl HandleKind for ComponentKindTag {
    const NAME: &'static str = "component";
}
impl HandleKind for BodyKind {
    const NAME: &'static str = "body";
}

pub type ActorHandle = Handle<ActorKind>;
pub type ComponentHandle = Handle<ComponentKindTag>;
/// Shares the component index space: a body handle is the handle of the
/// primitive component that owns the body.
pub type BodyHandle = Handle<BodyKind>;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[repr(transparent)]
pub struct Handle<K> {
    raw: u64,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    pub const NULL: Self = Self::from_raw(0);

    #[inline]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self::from_raw(((generation as u64) << INDEX_BITS) | index as u64)
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.raw
    }

    #[inline]
    pub const fn index(self) -> u32 {
        (self.raw & INDEX_MASK) as u32
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        (self.raw >> INDEX_BITS) as u32
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.raw == 0
    }

    /// Reinterpret in another namespace.  Only valid where the namespaces
    /// share a registry (component ↔ body).
    #[inline]
    pub(crate) const fn cast<J>(self) -> Handle<J> {
        Handle::from_raw(self.raw)
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "{}(null)", K::NAME)
        } else {
            write!(f, "{}({}v{})", K::NAME, self.index(), self.generation())
        }
    }
}

impl<K: HandleKind> fmt::Display for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<K> Serialize for Handle<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.raw)
    }
}

impl<'de, K> Deserialize<'de> for Handle<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self::from_raw)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Host-side store that issues handles for the objects it owns.
pub struct SlotRegistry<T, K> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<T, K> SlotRegistry<T, K> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _kind: PhantomData,
        }
    }

    pub fn insert(&mut self, value: T) -> Handle<K> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::from_parts(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: FIRST_GENERATION,
            value: Some(value),
        });
        Handle::from_parts(index, FIRST_GENERATION)
    }

    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        let slot = self.live_slot_mut(handle)?;
        let value = slot.value.take();
        let retired = slot.generation == u32::MAX;
        slot.generation = slot.generation.wrapping_add(1);

        if !retired {
            self.free.push(handle.index());
        }
        self.len -= 1;
        value
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut T> {
        self.live_slot_mut(handle).and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::from_parts(index as u32, slot.generation), value))
        })
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle<K>> + '_ {
        self.iter().map(|(handle, _)| handle)
    }

    fn live_slot_mut(&mut self, handle: Handle<K>) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation() && slot.value.is_some())
    }
}

impl<T, K> Default for SlotRegistry<T, K> {
    fn default() -> Self {
        Self::new()
    }
}
