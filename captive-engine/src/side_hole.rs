use captive_core::config::HoleConfig;
use captive_core::geometry::Point3;
use captive_core::kernel::{FaceId, FeatureId, GeometryKernel};
use tracing::debug;

use crate::errors::{CutStage, JointError, cut_failure};
use crate::resolver::resolve_opposite_face;
use crate::side_profile::{SideProfile, build_side_profile};

#[derive(Debug, Clone)]
pub struct SideHole {
    pub feature: FeatureId,
    pub termination: FaceId,
    pub profile: SideProfile,
}

/// 生成侧槽轮廓并从侧壁"切除到下一个面"。这是单个连接孔的最后一步。
pub fn build_side_hole<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    exposed_face: FaceId,
    center: Point3,
    config: &HoleConfig,
) -> Result<SideHole, JointError> {
    let profile = build_side_profile(kernel, exposed_face, center, config)?;

    let anchor = kernel.point_on_face(profile.face)?;
    let (termination, _) = resolve_opposite_face(&*kernel, profile.face, anchor)?;
    let feature = kernel
        .cut_to_next(profile.sketch, termination)
        .map_err(|err| cut_failure(CutStage::SideHole, err))?;

    debug!(
        face = profile.face.get(),
        termination = termination.get(),
        feature = feature.get(),
        "侧槽已切除"
    );
    Ok(SideHole {
        feature,
        termination,
        profile,
    })
}
