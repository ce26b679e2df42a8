pub mod builder;
pub mod command;
pub mod group;
pub mod resolver;
pub mod side_hole;
pub mod side_profile;
pub mod top_hole;

pub mod errors {
    use std::fmt;

    use captive_core::config::HoleConfigError;
    use captive_core::geometry::Point3;
    use captive_core::kernel::{FaceId, KernelError};
    use thiserror::Error;

    /// 产生"切除到面"特征的阶段。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CutStage {
        TopHole,
        SideHole,
    }

    impl fmt::Display for CutStage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CutStage::TopHole => f.write_str("top hole"),
                CutStage::SideHole => f.write_str("side hole"),
            }
        }
    }

    #[derive(Debug, Error)]
    pub enum JointError {
        #[error("the point you selected does not lie on a valid face ({point:?})")]
        Selection {
            point: Point3,
            #[source]
            source: Option<KernelError>,
        },
        #[error("your {stage} is not completely terminated by an opposite face")]
        GeometryTermination {
            stage: CutStage,
            #[source]
            source: KernelError,
        },
        #[error("no opposing face found behind {face}")]
        RayResolution { face: FaceId },
        #[error("face {face} has no neighbouring side wall")]
        NoSideWall { face: FaceId },
        #[error("cannot derive a profile frame on face {face}")]
        DegenerateFrame { face: FaceId },
        #[error(
            "bolt too short: shaft run {run:.3} after material thickness {thickness:.3} and nut depth"
        )]
        ShaftTooShort { run: f64, thickness: f64 },
        #[error("invalid joint configuration: {0}")]
        Config(#[from] HoleConfigError),
        #[error(transparent)]
        Kernel(#[from] KernelError),
    }

    /// 批处理失败：参数无效、没有目标点，或某个目标点失败（其后的点不再处理）。
    #[derive(Debug, Error)]
    pub enum BatchError {
        #[error("invalid joint configuration: {0}")]
        Config(#[from] HoleConfigError),
        #[error("no target points selected")]
        NoTargets,
        #[error("target point #{index} {point:?}: {source}")]
        Point {
            index: usize,
            point: Point3,
            #[source]
            source: JointError,
        },
    }

    /// 切除失败时，未被封闭与无材料可切都归为终止错误，其余保留为内核错误。
    pub(crate) fn cut_failure(stage: CutStage, err: KernelError) -> JointError {
        match err {
            KernelError::NotTerminated { .. } | KernelError::NothingToCut { .. } => {
                JointError::GeometryTermination { stage, source: err }
            }
            other => JointError::Kernel(other),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use captive_core::geometry::Point3;
    use captive_kernel::{BlockKernel, Workpiece};

    /// 40 x 20 x `thickness` 的单块平板，顶面位于 z = `thickness`。
    pub fn plate(thickness: f64) -> BlockKernel {
        let mut kernel = BlockKernel::new();
        kernel.add_block(
            "plate",
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(40.0, 20.0, thickness),
            &[],
        );
        kernel
    }

    /// 内置 T 形接头：盖板厚 5，顶面 z = 15，立板位于其下方。
    pub fn t_joint() -> BlockKernel {
        BlockKernel::from_workpiece(&Workpiece::demo()).expect("demo workpiece is valid")
    }

    pub fn t_joint_target() -> Point3 {
        Point3::new(20.0, 10.0, 15.0)
    }
}
