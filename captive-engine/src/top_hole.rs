use captive_core::config::HoleConfig;
use captive_core::geometry::Point3;
use captive_core::kernel::{FaceId, GeometryKernel, KernelError};
use tracing::{debug, warn};

use crate::errors::{CutStage, JointError, cut_failure};
use crate::resolver::resolve_opposite_face;

/// 在目标点所在面上画螺栓圆并"切除到下一个面"，返回孔底新露出的面。
pub fn build_top_hole<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    point: Point3,
    config: &HoleConfig,
) -> Result<FaceId, JointError> {
    let face = kernel
        .faces_at(point)?
        .first()
        .copied()
        .ok_or(JointError::Selection {
            point,
            source: None,
        })?;

    let sketch = kernel.create_sketch(face).map_err(|err| match err {
        KernelError::SketchRejected { .. } | KernelError::UnknownFace(_) => JointError::Selection {
            point,
            source: Some(err),
        },
        other => JointError::Kernel(other),
    })?;
    let center = kernel.project_point(sketch, point)?;
    kernel.add_circle(sketch, center, config.bolt_radius)?;

    // 终止面必须在切除之前解析，切除会改变射线所见的几何。
    let (termination, _) = resolve_opposite_face(&*kernel, face, center)?;
    let feature = kernel
        .cut_to_next(sketch, termination)
        .map_err(|err| cut_failure(CutStage::TopHole, err))?;

    let (exposed, _) = resolve_opposite_face(&*kernel, face, center)?;
    if exposed != termination {
        warn!(
            termination = termination.get(),
            exposed = exposed.get(),
            "切除前后解析到的对侧面不一致"
        );
    }
    debug!(
        face = face.get(),
        feature = feature.get(),
        exposed = exposed.get(),
        radius = config.bolt_radius,
        "顶孔已生成"
    );
    Ok(exposed)
}
