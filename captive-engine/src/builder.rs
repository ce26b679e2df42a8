use captive_core::config::HoleConfig;
use captive_core::geometry::Point3;
use captive_core::kernel::{FaceId, FeatureId, JointKernel};
use tracing::{info, warn};

use crate::errors::{BatchError, JointError};
use crate::group::UndoGroup;
use crate::side_hole::build_side_hole;
use crate::top_hole::build_top_hole;

/// 单个目标点的加工结果。
#[derive(Debug, Clone, PartialEq)]
pub struct JointReport {
    pub point: Point3,
    pub exposed_face: FaceId,
    pub side_face: FaceId,
    pub side_feature: FeatureId,
    pub mat_thickness: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub joints: Vec<JointReport>,
}

/// 卡扣连接孔生成器。几何内核显式注入，参数在整个批次内只读共享。
pub struct JointHoleBuilder<'a, K: JointKernel + ?Sized> {
    kernel: &'a mut K,
    config: HoleConfig,
}

impl<'a, K: JointKernel + ?Sized> JointHoleBuilder<'a, K> {
    pub fn new(kernel: &'a mut K, config: HoleConfig) -> Self {
        Self { kernel, config }
    }

    /// 为单个点生成顶孔与侧槽，整个过程处于同一撤销分组内。
    pub fn build_one(&mut self, point: Point3) -> Result<JointReport, JointError> {
        self.config.validate()?;
        self.build_point(point)
    }

    /// 依次处理所有目标点；第一个失败的点终止批处理，失败点的几何已回滚。
    pub fn build_all(&mut self, points: &[Point3]) -> Result<BatchReport, BatchError> {
        self.config.validate()?;
        if points.is_empty() {
            return Err(BatchError::NoTargets);
        }

        let mut report = BatchReport::default();
        for (index, point) in points.iter().copied().enumerate() {
            match self.build_point(point) {
                Ok(joint) => report.joints.push(joint),
                Err(source) => {
                    warn!(index, error = %source, "目标点加工失败，终止批处理");
                    return Err(BatchError::Point {
                        index,
                        point,
                        source,
                    });
                }
            }
        }
        info!(joints = report.joints.len(), "卡扣连接孔批处理完成");
        Ok(report)
    }

    fn build_point(&mut self, point: Point3) -> Result<JointReport, JointError> {
        let mut group = UndoGroup::open(&mut *self.kernel);
        let exposed_face = build_top_hole(&mut *group, point, &self.config)?;
        let side = build_side_hole(&mut *group, exposed_face, point, &self.config)?;
        group.commit();

        info!(
            x = point.x(),
            y = point.y(),
            z = point.z(),
            thickness = side.profile.mat_thickness,
            "连接孔已生成"
        );
        Ok(JointReport {
            point,
            exposed_face,
            side_face: side.profile.face,
            side_feature: side.feature,
            mat_thickness: side.profile.mat_thickness,
        })
    }
}

#[cfg(test)]
mod tests {
    use captive_core::config::HoleConfigError;
    use captive_kernel::FaceSide;

    use super::*;
    use crate::errors::CutStage;
    use crate::test_support::{t_joint, t_joint_target};

    #[test]
    fn demo_point_produces_top_hole_and_side_slot() {
        let mut kernel = t_joint();
        let report = JointHoleBuilder::new(&mut kernel, HoleConfig::default())
            .build_all(&[t_joint_target()])
            .unwrap();

        let lid = kernel.body_named("lid").unwrap();
        let joint = &report.joints[0];
        assert_eq!(joint.exposed_face, kernel.face(lid, FaceSide::Bottom).unwrap());
        assert_eq!(joint.side_face, kernel.face(lid, FaceSide::Front).unwrap());
        assert!((joint.mat_thickness - 5.0).abs() < 1e-9);

        assert_eq!(kernel.features().len(), 2);
        assert_eq!(kernel.sketches().len(), 3);
        assert_eq!(kernel.committed_groups(), 1);
        assert_eq!(kernel.open_groups(), 0);
    }

    #[test]
    fn failing_point_is_rolled_back_and_stops_the_batch() {
        let mut kernel = t_joint();
        let points = [
            t_joint_target(),
            // 盖板右端下方没有立板，侧槽无材料可切。
            Point3::new(35.0, 10.0, 15.0),
            Point3::new(5.0, 10.0, 15.0),
        ];
        let err = JointHoleBuilder::new(&mut kernel, HoleConfig::default())
            .build_all(&points)
            .unwrap_err();

        match err {
            BatchError::Point {
                index,
                point,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(point, points[1]);
                assert!(matches!(
                    source,
                    JointError::GeometryTermination {
                        stage: CutStage::SideHole,
                        ..
                    }
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(kernel.features().len(), 2);
        assert_eq!(kernel.sketches().len(), 3);
        assert_eq!(kernel.committed_groups(), 1);
        assert_eq!(kernel.open_groups(), 0);
    }

    #[test]
    fn invalid_configuration_is_rejected_before_any_geometry() {
        let mut kernel = t_joint();
        let config = HoleConfig {
            nut_width: 2.0,
            ..HoleConfig::default()
        };
        let err = JointHoleBuilder::new(&mut kernel, config)
            .build_all(&[t_joint_target()])
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::Config(HoleConfigError::NutNarrowerThanShaft { .. })
        ));
        assert!(kernel.sketches().is_empty());
        assert_eq!(kernel.committed_groups(), 0);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let mut kernel = t_joint();
        let err = JointHoleBuilder::new(&mut kernel, HoleConfig::default())
            .build_all(&[])
            .unwrap_err();
        assert!(matches!(err, BatchError::NoTargets));
    }

    #[test]
    fn selection_error_leaves_no_geometry() {
        let mut kernel = t_joint();
        let err = JointHoleBuilder::new(&mut kernel, HoleConfig::default())
            .build_one(Point3::new(100.0, 100.0, 100.0))
            .unwrap_err();
        assert!(matches!(err, JointError::Selection { .. }));
        assert!(kernel.sketches().is_empty());
        assert_eq!(kernel.open_groups(), 0);
    }
}
