pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 草图局部坐标系中的二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 关于局部 X 轴的镜像点。
        #[inline]
        pub fn mirror_x(self) -> Self {
            Self(DVec2::new(self.0.x, -self.0.y))
        }

        #[inline]
        pub fn distance_to(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 世界坐标系中的三维点。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn translate(self, offset: Vector3) -> Self {
            Self(self.0 + offset.0)
        }

        /// 沿 `direction` 平移 `magnitude` 倍，`direction` 通常是单位向量。
        #[inline]
        pub fn offset_along(self, direction: Vector3, magnitude: f64) -> Self {
            self.translate(direction.scale(magnitude))
        }

        #[inline]
        pub fn vector_to(self, other: Point3) -> Vector3 {
            Vector3(other.0 - self.0)
        }

        #[inline]
        pub fn distance_to(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl From<[f64; 3]> for Point3 {
        fn from(value: [f64; 3]) -> Self {
            Self(DVec3::from_array(value))
        }
    }

    /// 三维向量，用于法向、射线方向以及轮廓局部坐标轴。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn negate(self) -> Self {
            Self(-self.0)
        }

        #[inline]
        pub fn dot(self, other: Vector3) -> f64 {
            self.0.dot(other.0)
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn offset_along_scales_direction() {
            let start = Point3::new(1.0, 2.0, 3.0);
            let moved = start.offset_along(Vector3::new(0.0, 0.0, -1.0), 4.5);
            assert_eq!(moved, Point3::new(1.0, 2.0, -1.5));
            assert!((start.distance_to(moved) - 4.5).abs() < 1e-12);
        }

        #[test]
        fn normalize_rejects_zero_vector() {
            assert!(Vector3::new(0.0, 0.0, 0.0).normalize().is_none());
            let unit = Vector3::new(3.0, 0.0, 4.0).normalize().expect("non-zero");
            assert!((unit.length() - 1.0).abs() < 1e-12);
            assert!((unit.as_vec3().x - 0.6).abs() < 1e-12);
        }

        #[test]
        fn mirror_flips_local_y() {
            let point = Point2::new(4.0, -2.5);
            assert_eq!(point.mirror_x(), Point2::new(4.0, 2.5));
            assert_eq!(point.mirror_x().mirror_x(), point);
        }
    }
}

pub mod config {
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    /// 卡扣连接孔参数。所有长度使用同一单位（参考界面中为毫米），核心算法与单位无关。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct HoleConfig {
        pub bolt_radius: f64,
        pub bolt_length: f64,
        pub nut_width: f64,
        pub nut_depth: f64,
        pub extra_tail: f64,
    }

    impl Default for HoleConfig {
        /// M3 螺栓的默认尺寸。
        fn default() -> Self {
            Self {
                bolt_radius: 1.5,
                bolt_length: 15.0,
                nut_width: 5.4,
                nut_depth: 2.37,
                extra_tail: 3.0,
            }
        }
    }

    impl HoleConfig {
        /// 校验参数：全部为正的有限值，螺母宽于螺杆，螺栓长于螺母厚度。
        pub fn validate(&self) -> Result<(), HoleConfigError> {
            for (name, value) in self.fields() {
                if !value.is_finite() || value <= 0.0 {
                    return Err(HoleConfigError::NonPositive { name, value });
                }
            }
            if self.nut_width <= 2.0 * self.bolt_radius {
                return Err(HoleConfigError::NutNarrowerThanShaft {
                    nut_width: self.nut_width,
                    bolt_diameter: 2.0 * self.bolt_radius,
                });
            }
            if self.bolt_length <= self.nut_depth {
                return Err(HoleConfigError::BoltShorterThanNut {
                    bolt_length: self.bolt_length,
                    nut_depth: self.nut_depth,
                });
            }
            Ok(())
        }

        /// 按名称覆盖单个参数，供命令行与命令总线使用。
        pub fn set(&mut self, name: &str, value: f64) -> Result<(), HoleConfigError> {
            let slot = match name {
                "bolt_radius" => &mut self.bolt_radius,
                "bolt_length" => &mut self.bolt_length,
                "nut_width" => &mut self.nut_width,
                "nut_depth" => &mut self.nut_depth,
                "extra_tail" => &mut self.extra_tail,
                other => return Err(HoleConfigError::UnknownParameter(other.to_string())),
            };
            *slot = value;
            Ok(())
        }

        /// 螺母槽相对螺杆半径向两侧各自加宽的距离。
        #[inline]
        pub fn nut_offset(&self) -> f64 {
            self.nut_width / 2.0 - self.bolt_radius
        }

        /// 侧槽沿 X 方向的总长度（从孔中心量起）。
        #[inline]
        pub fn slot_extent(&self) -> f64 {
            self.bolt_length + self.extra_tail
        }

        /// 扣除顶板厚度与螺母厚度后剩余的螺杆直段长度。
        #[inline]
        pub fn shaft_run(&self, mat_thickness: f64) -> f64 {
            self.bolt_length - mat_thickness - self.nut_depth
        }

        fn fields(&self) -> [(&'static str, f64); 5] {
            [
                ("bolt_radius", self.bolt_radius),
                ("bolt_length", self.bolt_length),
                ("nut_width", self.nut_width),
                ("nut_depth", self.nut_depth),
                ("extra_tail", self.extra_tail),
            ]
        }
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum HoleConfigError {
        #[error("{name} must be a positive length, got {value}")]
        NonPositive { name: &'static str, value: f64 },
        #[error("nut width {nut_width} must exceed the bolt diameter {bolt_diameter}")]
        NutNarrowerThanShaft { nut_width: f64, bolt_diameter: f64 },
        #[error("bolt length {bolt_length} must exceed the nut depth {nut_depth}")]
        BoltShorterThanNut { bolt_length: f64, nut_depth: f64 },
        #[error("unknown joint parameter `{0}`")]
        UnknownParameter(String),
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn defaults_validate() {
            let config = HoleConfig::default();
            config.validate().expect("default config is valid");
            assert!((config.slot_extent() - 18.0).abs() < 1e-12);
            assert!((config.nut_offset() - 1.2).abs() < 1e-12);
            assert!((config.shaft_run(5.0) - 7.63).abs() < 1e-12);
        }

        #[test]
        fn rejects_non_positive_and_nan() {
            let mut config = HoleConfig::default();
            config.extra_tail = 0.0;
            assert_eq!(
                config.validate(),
                Err(HoleConfigError::NonPositive {
                    name: "extra_tail",
                    value: 0.0
                })
            );

            let mut config = HoleConfig::default();
            config.bolt_radius = f64::NAN;
            assert!(matches!(
                config.validate(),
                Err(HoleConfigError::NonPositive {
                    name: "bolt_radius",
                    ..
                })
            ));
        }

        #[test]
        fn rejects_nut_narrower_than_shaft() {
            let mut config = HoleConfig::default();
            config.nut_width = 3.0;
            assert!(matches!(
                config.validate(),
                Err(HoleConfigError::NutNarrowerThanShaft { .. })
            ));
        }

        #[test]
        fn set_overrides_known_parameters_only() {
            let mut config = HoleConfig::default();
            config.set("nut_depth", 3.0).unwrap();
            assert_eq!(config.nut_depth, 3.0);
            let err = config.set("washer", 1.0).unwrap_err();
            assert_eq!(err, HoleConfigError::UnknownParameter("washer".into()));
        }
    }
}

pub mod profile {
    use crate::geometry::{Point2, Point3, Vector3};

    const VERTEX_TOLERANCE: f64 = 1e-9;

    /// 侧槽轮廓所在平面的局部坐标系：原点为投影后的孔中心，X 指向材料厚度方向。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ProfileFrame {
        origin: Point3,
        x_axis: Vector3,
        y_axis: Vector3,
    }

    impl ProfileFrame {
        /// `x_axis` 与 `y_axis` 需为单位向量。
        pub fn new(origin: Point3, x_axis: Vector3, y_axis: Vector3) -> Self {
            Self {
                origin,
                x_axis,
                y_axis,
            }
        }

        #[inline]
        pub fn origin(&self) -> Point3 {
            self.origin
        }

        #[inline]
        pub fn x_axis(&self) -> Vector3 {
            self.x_axis
        }

        #[inline]
        pub fn y_axis(&self) -> Vector3 {
            self.y_axis
        }

        pub fn to_local(&self, point: Point3) -> Point2 {
            let offset = self.origin.vector_to(point);
            Point2::new(offset.dot(self.x_axis), offset.dot(self.y_axis))
        }

        pub fn to_world(&self, local: Point2) -> Point3 {
            self.origin
                .offset_along(self.x_axis, local.x())
                .offset_along(self.y_axis, local.y())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct SketchLine {
        pub start: Point3,
        pub end: Point3,
        pub construction: bool,
    }

    /// 由线段组成的草图轮廓。构造线（镜像轴）不参与切除边界。
    #[derive(Debug, Clone, PartialEq)]
    pub struct SketchProfile {
        frame: ProfileFrame,
        lines: Vec<SketchLine>,
    }

    impl SketchProfile {
        pub fn new(frame: ProfileFrame) -> Self {
            Self {
                frame,
                lines: Vec::new(),
            }
        }

        #[inline]
        pub fn frame(&self) -> &ProfileFrame {
            &self.frame
        }

        pub fn push_line(&mut self, start: Point3, end: Point3) {
            self.lines.push(SketchLine {
                start,
                end,
                construction: false,
            });
        }

        pub fn push_construction(&mut self, start: Point3, end: Point3) {
            self.lines.push(SketchLine {
                start,
                end,
                construction: true,
            });
        }

        #[inline]
        pub fn lines(&self) -> &[SketchLine] {
            &self.lines
        }

        pub fn mirror_axis(&self) -> Option<&SketchLine> {
            self.lines.iter().find(|line| line.construction)
        }

        pub fn boundary(&self) -> impl Iterator<Item = &SketchLine> {
            self.lines.iter().filter(|line| !line.construction)
        }

        /// 边界顶点（局部坐标，去重，按首次出现顺序）。
        pub fn boundary_vertices(&self) -> Vec<Point2> {
            let mut vertices: Vec<Point2> = Vec::new();
            for line in self.boundary() {
                for point in [line.start, line.end] {
                    let local = self.frame.to_local(point);
                    if !vertices
                        .iter()
                        .any(|known| known.distance_to(local) <= VERTEX_TOLERANCE)
                    {
                        vertices.push(local);
                    }
                }
            }
            vertices
        }

        /// 每个边界顶点恰好连接两条边界线段时轮廓闭合。
        pub fn is_closed(&self) -> bool {
            let vertices = self.boundary_vertices();
            if vertices.len() < 3 {
                return false;
            }
            vertices.iter().all(|vertex| {
                let degree: usize = self
                    .boundary()
                    .map(|line| {
                        [line.start, line.end]
                            .into_iter()
                            .filter(|point| {
                                self.frame.to_local(*point).distance_to(*vertex)
                                    <= VERTEX_TOLERANCE
                            })
                            .count()
                    })
                    .sum();
                degree == 2
            })
        }

        /// 轮廓关于镜像轴（局部 X 轴）对称。
        pub fn is_symmetric(&self, tolerance: f64) -> bool {
            let vertices = self.boundary_vertices();
            vertices.iter().all(|vertex| {
                let mirrored = vertex.mirror_x();
                vertices
                    .iter()
                    .any(|other| other.distance_to(mirrored) <= tolerance)
            })
        }

        /// 包含镜像轴在内，沿局部 X 的总跨度。
        pub fn extent_along_x(&self) -> f64 {
            self.span(self.lines.iter(), |point| point.x())
        }

        /// 切除边界沿局部 Y 的宽度。
        pub fn width_along_y(&self) -> f64 {
            self.span(self.boundary(), |point| point.y())
        }

        fn span<'a>(
            &self,
            lines: impl Iterator<Item = &'a SketchLine>,
            coordinate: impl Fn(Point2) -> f64,
        ) -> f64 {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for line in lines {
                for point in [line.start, line.end] {
                    let value = coordinate(self.frame.to_local(point));
                    min = min.min(value);
                    max = max.max(value);
                }
            }
            if min > max { 0.0 } else { max - min }
        }
    }

}

pub mod kernel {
    use std::fmt;

    use thiserror::Error;

    use crate::geometry::{Point3, Vector3};

    macro_rules! handle_id {
        ($(#[$meta:meta])* $name:ident) => {
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(u64);

            impl $name {
                #[inline]
                pub fn new(raw: u64) -> Self {
                    Self(raw)
                }

                #[inline]
                pub fn get(self) -> u64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}#{}", stringify!($name), self.0)
                }
            }
        };
    }

    handle_id!(
        /// 几何内核中的面。内核保证同一几何面的 ID 稳定，可直接比较。
        FaceId
    );
    handle_id!(EdgeId);
    handle_id!(BodyId);
    handle_id!(SketchId);
    handle_id!(CurveId);
    handle_id!(FeatureId);

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum KernelError {
        #[error("face {0} does not exist")]
        UnknownFace(FaceId),
        #[error("edge {0} does not exist")]
        UnknownEdge(EdgeId),
        #[error("body {0} does not exist")]
        UnknownBody(BodyId),
        #[error("sketch {0} does not exist")]
        UnknownSketch(SketchId),
        #[error("point {point:?} does not lie on face {face}")]
        PointNotOnFace { face: FaceId, point: Point3 },
        #[error("cannot create a sketch on face {face}: {reason}")]
        SketchRejected { face: FaceId, reason: String },
        #[error("direction vector has zero length")]
        DegenerateDirection,
        #[error("invalid circle radius {0}")]
        InvalidRadius(f64),
        #[error("sketch {0} has no closed profile")]
        EmptyProfile(SketchId),
        #[error("cut from sketch {sketch} is not terminated by face {termination}")]
        NotTerminated {
            sketch: SketchId,
            termination: FaceId,
        },
        #[error("cut from sketch {sketch} does not intersect any body")]
        NothingToCut { sketch: SketchId },
    }

    /// 几何内核协作方。所有求交、投影与布尔切除都委托给实现者。
    pub trait GeometryKernel {
        /// 面在 `point` 处的外法向。
        fn face_normal_at(&self, face: FaceId, point: Point3) -> Result<Vector3, KernelError>;
        fn face_body(&self, face: FaceId) -> Result<BodyId, KernelError>;
        fn face_edges(&self, face: FaceId) -> Result<Vec<EdgeId>, KernelError>;
        /// 面上任意一个代表点。
        fn point_on_face(&self, face: FaceId) -> Result<Point3, KernelError>;

        fn edge_length(&self, edge: EdgeId) -> Result<f64, KernelError>;
        /// 与边相邻的面（至多两个）。
        fn edge_faces(&self, edge: EdgeId) -> Result<Vec<FaceId>, KernelError>;
        fn edge_endpoints(&self, edge: EdgeId) -> Result<(Point3, Point3), KernelError>;

        /// 沿射线按距离由近到远返回命中的面，至多 `max_hits` 个。
        /// 位于面上的起点可能命中该面本身。
        fn cast_ray(
            &self,
            body: BodyId,
            origin: Point3,
            direction: Vector3,
            max_hits: usize,
        ) -> Result<Vec<FaceId>, KernelError>;
        /// 包含该点的候选面。
        fn faces_at(&self, point: Point3) -> Result<Vec<FaceId>, KernelError>;

        fn create_sketch(&mut self, face: FaceId) -> Result<SketchId, KernelError>;
        fn set_sketch_visible(&mut self, sketch: SketchId, visible: bool)
        -> Result<(), KernelError>;
        /// 把世界坐标点正交投影到草图平面，返回投影点的世界坐标。
        fn project_point(&self, sketch: SketchId, point: Point3) -> Result<Point3, KernelError>;
        fn add_circle(
            &mut self,
            sketch: SketchId,
            center: Point3,
            radius: f64,
        ) -> Result<CurveId, KernelError>;
        fn add_line(
            &mut self,
            sketch: SketchId,
            start: Point3,
            end: Point3,
            construction: bool,
        ) -> Result<CurveId, KernelError>;

        /// 以草图轮廓做"切除到面"拉伸。无法由 `termination` 封闭时返回
        /// [`KernelError::NotTerminated`]。
        fn cut_to_next(
            &mut self,
            sketch: SketchId,
            termination: FaceId,
        ) -> Result<FeatureId, KernelError>;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GroupMarker(u64);

    impl GroupMarker {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum GroupOutcome {
        Committed,
        Abandoned,
    }

    /// 撤销分组。放弃的分组由宿主整体回滚。
    pub trait UndoGroups {
        fn begin_group(&mut self) -> GroupMarker;
        fn end_group(&mut self, marker: GroupMarker, outcome: GroupOutcome);
    }

    pub trait JointKernel: GeometryKernel + UndoGroups {}

    impl<T: GeometryKernel + UndoGroups + ?Sized> JointKernel for T {}
}
