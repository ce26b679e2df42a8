//! 参考几何内核：轴对齐长方体组成的工件，以及工件描述文件的加载。

pub mod block;
pub mod workpiece;

pub use block::{BlockKernel, CutFeature, LINEAR_TOLERANCE, Sketch, SketchCurve};
pub use workpiece::{BodySpec, FaceSide, Workpiece, WorkpieceError};
