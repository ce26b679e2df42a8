use captive_core::config::HoleConfig;
use captive_core::geometry::Point3;
use captive_core::kernel::{EdgeId, FaceId, GeometryKernel, SketchId};
use captive_core::profile::{ProfileFrame, SketchProfile};
use tracing::{debug, trace};

use crate::errors::JointError;

/// 露出面上最长的边界边以及它另一侧的相邻面（侧壁）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceEdge {
    pub edge: EdgeId,
    pub neighbor: FaceId,
    pub length: f64,
}

/// 侧槽草图：所在侧壁、草图以及轮廓几何。
#[derive(Debug, Clone)]
pub struct SideProfile {
    pub sketch: SketchId,
    pub face: FaceId,
    pub profile: SketchProfile,
    /// 顶孔穿过的材料厚度。
    pub mat_thickness: f64,
}

/// 选出 `face` 的最长边界边。长度相同时保留先遍历到的边；没有相邻面的边跳过。
pub fn longest_boundary_edge<K: GeometryKernel + ?Sized>(
    kernel: &K,
    face: FaceId,
) -> Result<ReferenceEdge, JointError> {
    let mut best: Option<ReferenceEdge> = None;
    for edge in kernel.face_edges(face)? {
        let Some(neighbor) = kernel
            .edge_faces(edge)?
            .into_iter()
            .find(|other| *other != face)
        else {
            trace!(edge = edge.get(), "边没有相邻面，跳过");
            continue;
        };
        let length = kernel.edge_length(edge)?;
        if best.is_none_or(|current| length > current.length) {
            best = Some(ReferenceEdge {
                edge,
                neighbor,
                length,
            });
        }
    }
    best.ok_or(JointError::NoSideWall { face })
}

/// 在与露出面相邻的侧壁上布置侧槽轮廓：螺杆段、螺母槽与张紧尾段，关于构造线镜像。
///
/// 局部 X 轴由投影后的孔中心指向孔底投影点（穿过材料厚度），Y 轴沿最长边界边。
/// 两半轮廓都从孔底投影点出发，终止于镜像轴端点，因而整体闭合。
pub fn build_side_profile<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    exposed_face: FaceId,
    center: Point3,
    config: &HoleConfig,
) -> Result<SideProfile, JointError> {
    let reference = longest_boundary_edge(&*kernel, exposed_face)?;

    let transfer = kernel.create_sketch(exposed_face)?;
    let far_point = kernel.project_point(transfer, center)?;
    kernel.set_sketch_visible(transfer, false)?;

    let sketch = kernel.create_sketch(reference.neighbor)?;
    let origin = kernel.project_point(sketch, center)?;
    let start = kernel.project_point(sketch, far_point)?;
    let degenerate = || JointError::DegenerateFrame {
        face: reference.neighbor,
    };
    let x_axis = origin.vector_to(start).normalize().ok_or_else(degenerate)?;

    let (edge_start, edge_end) = kernel.edge_endpoints(reference.edge)?;
    let edge_start = kernel.project_point(sketch, edge_start)?;
    let edge_end = kernel.project_point(sketch, edge_end)?;
    let y_axis = edge_start
        .vector_to(edge_end)
        .normalize()
        .ok_or_else(degenerate)?;

    let mat_thickness = origin.distance_to(start);
    let run = config.shaft_run(mat_thickness);
    if run <= 0.0 {
        return Err(JointError::ShaftTooShort {
            run,
            thickness: mat_thickness,
        });
    }

    let end_point = origin.offset_along(x_axis, config.slot_extent());
    let mut profile = SketchProfile::new(ProfileFrame::new(origin, x_axis, y_axis));
    profile.push_construction(origin, end_point);

    for sign in [1.0, -1.0] {
        let side = y_axis.scale(sign);
        let shaft_start = start.offset_along(side, config.bolt_radius);
        let shaft_end = shaft_start.offset_along(x_axis, run);
        let nut_top = shaft_end.offset_along(side, config.nut_offset());
        let nut_end = nut_top.offset_along(x_axis, config.nut_depth);
        let nut_return = nut_end.offset_along(side, -config.nut_offset());
        let tail = nut_return.offset_along(x_axis, config.extra_tail);

        for (from, to) in [
            (start, shaft_start),
            (shaft_start, shaft_end),
            (shaft_end, nut_top),
            (nut_top, nut_end),
            (nut_end, nut_return),
            (nut_return, tail),
            (tail, end_point),
        ] {
            profile.push_line(from, to);
        }
    }

    for line in profile.lines() {
        kernel.add_line(sketch, line.start, line.end, line.construction)?;
    }

    debug!(
        face = reference.neighbor.get(),
        edge = reference.edge.get(),
        mat_thickness,
        shaft_run = run,
        lines = profile.lines().len(),
        "侧槽轮廓已生成"
    );
    Ok(SideProfile {
        sketch,
        face: reference.neighbor,
        profile,
        mat_thickness,
    })
}
