use captive_core::geometry::{Point3, Vector3};
use captive_core::kernel::{FaceId, GeometryKernel};
use tracing::trace;

use crate::errors::JointError;

/// 起点恰好落在面上时，射线容差可能把该面本身作为第一个命中返回，因此取前两个。
const RAY_HITS: usize = 2;

/// 从 `face` 上的 `point` 沿反法向投射射线，返回同一实体上下一个被击中的面以及射线方向。
pub fn resolve_opposite_face<K: GeometryKernel + ?Sized>(
    kernel: &K,
    face: FaceId,
    point: Point3,
) -> Result<(FaceId, Vector3), JointError> {
    let direction = kernel.face_normal_at(face, point)?.negate();
    let body = kernel.face_body(face)?;
    let hits = kernel.cast_ray(body, point, direction, RAY_HITS)?;

    let next = match hits.as_slice() {
        [first, rest @ ..] if *first == face => rest.first().copied(),
        [first, ..] => Some(*first),
        [] => None,
    };
    let next = next.ok_or(JointError::RayResolution { face })?;
    trace!(from = face.get(), to = next.get(), "已解析对侧面");
    Ok((next, direction))
}
