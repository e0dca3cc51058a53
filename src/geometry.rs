//! Geometry codec: host-native `glam` types ↔ boundary wire structs.
//!
//! Pure component-wise conversions.  Quaternions keep `(x, y, z, w)` order
//! on both sides; no normalisation or axis swizzling happens here.

use crate::protocol::{Quaternion, SpatialData, Vector3};
use crate::types::HostTransform;
use glam::{Quat, Vec3};

impl From<Vec3> for Vector3 {
    #[inline]
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for Vec3 {
    #[inline]
    fn from(v: Vector3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Quat> for Quaternion {
    #[inline]
    fn from(q: Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

impl From<Quaternion> for Quat {
    #[inline]
    fn from(q: Quaternion) -> Self {
        Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

impl From<HostTransform> for SpatialData {
    fn from(t: HostTransform) -> Self {
        Self {
            position: t.translation.into(),
            rotation: t.rotation.into(),
            scale: t.scale.into(),
        }
    }
}

impl From<SpatialData> for HostTransform {
    fn from(s: SpatialData) -> Self {
        HostTransform::new(s.position.into(), s.rotation.into(), s.scale.into())
    }
}
