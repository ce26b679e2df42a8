use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use captive_core::geometry::Point3;
use serde::Deserialize;
use thiserror::Error;

/// 长方体的六个面。轴向约定：Left/Right 为 X，Front/Back 为 Y，Bottom/Top 为 Z。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSide {
    Bottom,
    Top,
    Front,
    Back,
    Left,
    Right,
}

impl FaceSide {
    pub const ALL: [FaceSide; 6] = [
        FaceSide::Bottom,
        FaceSide::Top,
        FaceSide::Front,
        FaceSide::Back,
        FaceSide::Left,
        FaceSide::Right,
    ];

    #[inline]
    pub fn axis(self) -> usize {
        match self {
            FaceSide::Left | FaceSide::Right => 0,
            FaceSide::Front | FaceSide::Back => 1,
            FaceSide::Bottom | FaceSide::Top => 2,
        }
    }

    /// 是否位于该轴的正向（max）一侧。
    #[inline]
    pub fn is_max(self) -> bool {
        matches!(self, FaceSide::Right | FaceSide::Back | FaceSide::Top)
    }

    pub fn from_axis(axis: usize, is_max: bool) -> FaceSide {
        match (axis % 3, is_max) {
            (0, false) => FaceSide::Left,
            (0, true) => FaceSide::Right,
            (1, false) => FaceSide::Front,
            (1, true) => FaceSide::Back,
            (2, false) => FaceSide::Bottom,
            _ => FaceSide::Top,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FaceSide::Bottom => "bottom",
            FaceSide::Top => "top",
            FaceSide::Front => "front",
            FaceSide::Back => "back",
            FaceSide::Left => "left",
            FaceSide::Right => "right",
        }
    }
}

/// 工件描述中的一个实体：轴对齐长方体，`open_faces` 中的面被省略（模拟开放壳体）。
#[derive(Debug, Clone, Deserialize)]
pub struct BodySpec {
    pub name: String,
    pub min: [f64; 3],
    pub max: [f64; 3],
    #[serde(default)]
    pub open_faces: Vec<FaceSide>,
}

/// 工件：若干实体以及待加工的目标点。
#[derive(Debug, Clone, Deserialize)]
pub struct Workpiece {
    #[serde(default)]
    pub targets: Vec<[f64; 3]>,
    #[serde(default)]
    pub bodies: Vec<BodySpec>,
}

impl Workpiece {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkpieceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| WorkpieceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let workpiece: Workpiece =
            toml::from_str(&content).map_err(|source| WorkpieceError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        workpiece.validate()?;
        Ok(workpiece)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, WorkpieceError> {
        let workpiece: Workpiece = toml::from_str(content).map_err(WorkpieceError::Syntax)?;
        workpiece.validate()?;
        Ok(workpiece)
    }

    /// 内置 T 形接头示例：5 厚的盖板压在 10 厚的立板上，目标点位于盖板顶面中央。
    pub fn demo() -> Self {
        Self {
            targets: vec![[20.0, 10.0, 15.0]],
            bodies: vec![
                BodySpec {
                    name: "lid".to_string(),
                    min: [0.0, 0.0, 10.0],
                    max: [40.0, 20.0, 15.0],
                    open_faces: Vec::new(),
                },
                BodySpec {
                    name: "wall".to_string(),
                    min: [15.0, 0.0, -20.0],
                    max: [25.0, 20.0, 10.0],
                    open_faces: Vec::new(),
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<(), WorkpieceError> {
        if self.bodies.is_empty() {
            return Err(WorkpieceError::Empty);
        }
        let mut names = HashSet::new();
        for body in &self.bodies {
            if !names.insert(body.name.as_str()) {
                return Err(WorkpieceError::InvalidBody {
                    name: body.name.clone(),
                    reason: "duplicate body name".to_string(),
                });
            }
            for axis in 0..3 {
                let (min, max) = (body.min[axis], body.max[axis]);
                if !min.is_finite() || !max.is_finite() || min >= max {
                    return Err(WorkpieceError::InvalidBody {
                        name: body.name.clone(),
                        reason: format!("axis {axis} has empty range [{min}, {max}]"),
                    });
                }
            }
        }
        for target in &self.targets {
            if target.iter().any(|value| !value.is_finite()) {
                return Err(WorkpieceError::InvalidTarget(*target));
            }
        }
        Ok(())
    }

    pub fn target_points(&self) -> Vec<Point3> {
        self.targets.iter().copied().map(Point3::from).collect()
    }
}

#[derive(Debug, Error)]
pub enum WorkpieceError {
    #[error("failed to read workpiece {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse workpiece {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid workpiece description: {0}")]
    Syntax(#[source] toml::de::Error),
    #[error("workpiece has no bodies")]
    Empty,
    #[error("body `{name}` is invalid: {reason}")]
    InvalidBody { name: String, reason: String },
    #[error("target point {0:?} is not finite")]
    InvalidTarget([f64; 3]),
}
