use std::collections::HashMap;

use captive_core::geometry::{Point3, Vector3};
use captive_core::kernel::{
    BodyId, CurveId, EdgeId, FaceId, FeatureId, GeometryKernel, GroupMarker, GroupOutcome,
    KernelError, SketchId, UndoGroups,
};
use glam::DVec3;
use tracing::{debug, trace};

use crate::workpiece::{FaceSide, Workpiece, WorkpieceError};

/// 线性容差：点在面上、射线起点命中自身所在面都按此判定。
pub const LINEAR_TOLERANCE: f64 = 1e-7;
const DIRECTION_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
struct BlockBody {
    name: String,
    min: DVec3,
    max: DVec3,
    faces: Vec<FaceId>,
}

#[derive(Debug, Clone)]
struct BlockFace {
    body: BodyId,
    side: FaceSide,
    edges: Vec<EdgeId>,
}

#[derive(Debug, Clone)]
struct BlockEdge {
    start: DVec3,
    end: DVec3,
    faces: Vec<FaceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SketchCurve {
    Circle {
        id: CurveId,
        center: Point3,
        radius: f64,
    },
    Line {
        id: CurveId,
        start: Point3,
        end: Point3,
        construction: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Sketch {
    id: SketchId,
    face: FaceId,
    origin: DVec3,
    normal: DVec3,
    visible: bool,
    curves: Vec<SketchCurve>,
}

impl Sketch {
    #[inline]
    pub fn face(&self) -> FaceId {
        self.face
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn curves(&self) -> &[SketchCurve] {
        &self.curves
    }

    pub fn circles(&self) -> impl Iterator<Item = (Point3, f64)> + '_ {
        self.curves.iter().filter_map(|curve| match curve {
            SketchCurve::Circle { center, radius, .. } => Some((*center, *radius)),
            SketchCurve::Line { .. } => None,
        })
    }

    fn project(&self, point: DVec3) -> DVec3 {
        point - self.normal * (point - self.origin).dot(self.normal)
    }
}

/// 已提交的"切除到面"特征。
#[derive(Debug, Clone, PartialEq)]
pub struct CutFeature {
    pub id: FeatureId,
    pub sketch: SketchId,
    pub termination: FaceId,
    pub depth: f64,
    pub targets: Vec<BodyId>,
}

#[derive(Debug, Clone, Copy)]
struct OpenGroup {
    marker: GroupMarker,
    sketches: usize,
    features: usize,
}

/// 轴对齐长方体组成的参考几何内核。
///
/// 每个实体是一个长方体，带六个平面和十二条边；面 ID 在切除后保持不变，
/// 切除只记录为特征，不重建拓扑。
#[derive(Debug, Default)]
pub struct BlockKernel {
    bodies: Vec<BlockBody>,
    faces: Vec<BlockFace>,
    edges: Vec<BlockEdge>,
    sketches: Vec<Sketch>,
    features: Vec<CutFeature>,
    open_groups: Vec<OpenGroup>,
    committed_groups: usize,
    next_sketch: u64,
    next_curve: u64,
    next_feature: u64,
    next_group: u64,
}

impl BlockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_workpiece(workpiece: &Workpiece) -> Result<Self, WorkpieceError> {
        workpiece.validate()?;
        let mut kernel = Self::new();
        for body in &workpiece.bodies {
            kernel.add_block(
                &body.name,
                Point3::from(body.min),
                Point3::from(body.max),
                &body.open_faces,
            );
        }
        debug!(
            bodies = kernel.bodies.len(),
            faces = kernel.faces.len(),
            edges = kernel.edges.len(),
            "已由工件构建参考内核"
        );
        Ok(kernel)
    }

    /// 添加一个长方体实体，`open` 中列出的面不生成。
    pub fn add_block(
        &mut self,
        name: impl Into<String>,
        min: Point3,
        max: Point3,
        open: &[FaceSide],
    ) -> BodyId {
        let body_id = BodyId::new(self.bodies.len() as u64);
        let (min, max) = (min.as_vec3().min(max.as_vec3()), min.as_vec3().max(max.as_vec3()));

        let mut by_side: HashMap<FaceSide, FaceId> = HashMap::new();
        let mut face_ids = Vec::new();
        for side in FaceSide::ALL {
            if open.contains(&side) {
                continue;
            }
            let id = FaceId::new(self.faces.len() as u64);
            self.faces.push(BlockFace {
                body: body_id,
                side,
                edges: Vec::new(),
            });
            by_side.insert(side, id);
            face_ids.push(id);
        }

        // 每对不同轴向的面相交出一条边，边沿剩余轴从 min 延伸到 max。
        let mut edge_of: HashMap<(FaceSide, FaceSide), EdgeId> = HashMap::new();
        for (index, first) in FaceSide::ALL.iter().enumerate() {
            for second in &FaceSide::ALL[index + 1..] {
                if first.axis() == second.axis() {
                    continue;
                }
                let faces: Vec<FaceId> = [first, second]
                    .into_iter()
                    .filter_map(|side| by_side.get(side).copied())
                    .collect();
                if faces.is_empty() {
                    continue;
                }
                let along = 3 - first.axis() - second.axis();
                let mut start = DVec3::ZERO;
                for side in [first, second] {
                    start[side.axis()] = plane_coordinate(*side, min, max);
                }
                let mut end = start;
                start[along] = min[along];
                end[along] = max[along];

                let id = EdgeId::new(self.edges.len() as u64);
                self.edges.push(BlockEdge { start, end, faces });
                edge_of.insert((*first, *second), id);
                edge_of.insert((*second, *first), id);
            }
        }

        // 面的边界按固定环序排列：(v,min) (u,max) (v,max) (u,min)。
        for (side, face_id) in &by_side {
            let u = (side.axis() + 1) % 3;
            let v = (side.axis() + 2) % 3;
            let ring = [
                FaceSide::from_axis(v, false),
                FaceSide::from_axis(u, true),
                FaceSide::from_axis(v, true),
                FaceSide::from_axis(u, false),
            ];
            let edges = ring
                .iter()
                .filter_map(|other| edge_of.get(&(*side, *other)).copied())
                .collect();
            self.faces[face_id.get() as usize].edges = edges;
        }

        self.bodies.push(BlockBody {
            name: name.into(),
            min,
            max,
            faces: face_ids,
        });
        body_id
    }

    pub fn body_named(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .position(|body| body.name == name)
            .map(|index| BodyId::new(index as u64))
    }

    pub fn face(&self, body: BodyId, side: FaceSide) -> Option<FaceId> {
        self.bodies
            .get(body.get() as usize)?
            .faces
            .iter()
            .copied()
            .find(|face| self.faces[face.get() as usize].side == side)
    }

    /// 便于日志输出的面描述，如 `lid.bottom`。
    pub fn describe_face(&self, face: FaceId) -> String {
        match self.faces.get(face.get() as usize) {
            Some(data) => format!(
                "{}.{}",
                self.bodies[data.body.get() as usize].name,
                data.side.name()
            ),
            None => face.to_string(),
        }
    }

    pub fn sketch(&self, id: SketchId) -> Option<&Sketch> {
        self.sketches.iter().find(|sketch| sketch.id == id)
    }

    #[inline]
    pub fn sketches(&self) -> &[Sketch] {
        &self.sketches
    }

    #[inline]
    pub fn features(&self) -> &[CutFeature] {
        &self.features
    }

    #[inline]
    pub fn committed_groups(&self) -> usize {
        self.committed_groups
    }

    #[inline]
    pub fn open_groups(&self) -> usize {
        self.open_groups.len()
    }

    fn face_data(&self, face: FaceId) -> Result<&BlockFace, KernelError> {
        self.faces
            .get(face.get() as usize)
            .ok_or(KernelError::UnknownFace(face))
    }

    fn edge_data(&self, edge: EdgeId) -> Result<&BlockEdge, KernelError> {
        self.edges
            .get(edge.get() as usize)
            .ok_or(KernelError::UnknownEdge(edge))
    }

    fn sketch_data(&self, sketch: SketchId) -> Result<&Sketch, KernelError> {
        self.sketch(sketch).ok_or(KernelError::UnknownSketch(sketch))
    }

    fn sketch_data_mut(&mut self, sketch: SketchId) -> Result<&mut Sketch, KernelError> {
        self.sketches
            .iter_mut()
            .find(|data| data.id == sketch)
            .ok_or(KernelError::UnknownSketch(sketch))
    }

    fn face_geometry(&self, face: FaceId) -> Result<FacePlane, KernelError> {
        let data = self.face_data(face)?;
        let body = &self.bodies[data.body.get() as usize];
        Ok(FacePlane::new(data.side, body.min, body.max))
    }

    fn next_curve_id(&mut self) -> CurveId {
        let id = CurveId::new(self.next_curve);
        self.next_curve += 1;
        id
    }
}

/// 长方体某个面所在的平面及其矩形范围。
#[derive(Debug, Clone, Copy)]
struct FacePlane {
    axis: usize,
    coordinate: f64,
    normal: DVec3,
    min: DVec3,
    max: DVec3,
}

impl FacePlane {
    fn new(side: FaceSide, min: DVec3, max: DVec3) -> Self {
        let axis = side.axis();
        let mut normal = DVec3::ZERO;
        normal[axis] = if side.is_max() { 1.0 } else { -1.0 };
        Self {
            axis,
            coordinate: plane_coordinate(side, min, max),
            normal,
            min,
            max,
        }
    }

    fn contains(&self, point: DVec3) -> bool {
        if (point[self.axis] - self.coordinate).abs() > LINEAR_TOLERANCE {
            return false;
        }
        (0..3).filter(|axis| *axis != self.axis).all(|axis| {
            point[axis] >= self.min[axis] - LINEAR_TOLERANCE
                && point[axis] <= self.max[axis] + LINEAR_TOLERANCE
        })
    }

    fn center(&self) -> DVec3 {
        let mut center = (self.min + self.max) * 0.5;
        center[self.axis] = self.coordinate;
        center
    }
}

fn plane_coordinate(side: FaceSide, min: DVec3, max: DVec3) -> f64 {
    if side.is_max() {
        max[side.axis()]
    } else {
        min[side.axis()]
    }
}

fn overlaps(a_min: DVec3, a_max: DVec3, b_min: DVec3, b_max: DVec3) -> bool {
    (0..3).all(|axis| {
        a_max[axis].min(b_max[axis]) - a_min[axis].max(b_min[axis]) > LINEAR_TOLERANCE
    })
}

impl GeometryKernel for BlockKernel {
    fn face_normal_at(&self, face: FaceId, point: Point3) -> Result<Vector3, KernelError> {
        let plane = self.face_geometry(face)?;
        if !plane.contains(point.as_vec3()) {
            return Err(KernelError::PointNotOnFace { face, point });
        }
        Ok(Vector3::from(plane.normal))
    }

    fn face_body(&self, face: FaceId) -> Result<BodyId, KernelError> {
        Ok(self.face_data(face)?.body)
    }

    fn face_edges(&self, face: FaceId) -> Result<Vec<EdgeId>, KernelError> {
        Ok(self.face_data(face)?.edges.clone())
    }

    fn point_on_face(&self, face: FaceId) -> Result<Point3, KernelError> {
        Ok(Point3::from(self.face_geometry(face)?.center()))
    }

    fn edge_length(&self, edge: EdgeId) -> Result<f64, KernelError> {
        let data = self.edge_data(edge)?;
        Ok(data.start.distance(data.end))
    }

    fn edge_faces(&self, edge: EdgeId) -> Result<Vec<FaceId>, KernelError> {
        Ok(self.edge_data(edge)?.faces.clone())
    }

    fn edge_endpoints(&self, edge: EdgeId) -> Result<(Point3, Point3), KernelError> {
        let data = self.edge_data(edge)?;
        Ok((Point3::from(data.start), Point3::from(data.end)))
    }

    fn cast_ray(
        &self,
        body: BodyId,
        origin: Point3,
        direction: Vector3,
        max_hits: usize,
    ) -> Result<Vec<FaceId>, KernelError> {
        let body_data = self
            .bodies
            .get(body.get() as usize)
            .ok_or(KernelError::UnknownBody(body))?;
        let direction = direction
            .normalize()
            .ok_or(KernelError::DegenerateDirection)?
            .as_vec3();
        let origin = origin.as_vec3();

        let mut hits: Vec<(f64, FaceId)> = Vec::new();
        for face in &body_data.faces {
            let plane = self.face_geometry(*face)?;
            let denom = direction[plane.axis];
            if denom.abs() < DIRECTION_EPSILON {
                continue;
            }
            let t = (plane.coordinate - origin[plane.axis]) / denom;
            if t < -LINEAR_TOLERANCE {
                continue;
            }
            if plane.contains(origin + direction * t) {
                hits.push((t.max(0.0), *face));
            }
        }
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.truncate(max_hits);
        trace!(body = body.get(), hits = hits.len(), "射线求交完成");
        Ok(hits.into_iter().map(|(_, face)| face).collect())
    }

    fn faces_at(&self, point: Point3) -> Result<Vec<FaceId>, KernelError> {
        let mut found = Vec::new();
        for index in 0..self.faces.len() {
            let face = FaceId::new(index as u64);
            if self.face_geometry(face)?.contains(point.as_vec3()) {
                found.push(face);
            }
        }
        Ok(found)
    }

    fn create_sketch(&mut self, face: FaceId) -> Result<SketchId, KernelError> {
        let plane = self.face_geometry(face)?;
        let id = SketchId::new(self.next_sketch);
        self.next_sketch += 1;
        self.sketches.push(Sketch {
            id,
            face,
            origin: plane.center(),
            normal: plane.normal,
            visible: true,
            curves: Vec::new(),
        });
        debug!(sketch = id.get(), face = %self.describe_face(face), "创建草图");
        Ok(id)
    }

    fn set_sketch_visible(&mut self, sketch: SketchId, visible: bool) -> Result<(), KernelError> {
        self.sketch_data_mut(sketch)?.visible = visible;
        Ok(())
    }

    fn project_point(&self, sketch: SketchId, point: Point3) -> Result<Point3, KernelError> {
        let data = self.sketch_data(sketch)?;
        Ok(Point3::from(data.project(point.as_vec3())))
    }

    fn add_circle(
        &mut self,
        sketch: SketchId,
        center: Point3,
        radius: f64,
    ) -> Result<CurveId, KernelError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(KernelError::InvalidRadius(radius));
        }
        let id = self.next_curve_id();
        let data = self.sketch_data_mut(sketch)?;
        let center = Point3::from(data.project(center.as_vec3()));
        data.curves.push(SketchCurve::Circle { id, center, radius });
        Ok(id)
    }

    fn add_line(
        &mut self,
        sketch: SketchId,
        start: Point3,
        end: Point3,
        construction: bool,
    ) -> Result<CurveId, KernelError> {
        let id = self.next_curve_id();
        let data = self.sketch_data_mut(sketch)?;
        let start = Point3::from(data.project(start.as_vec3()));
        let end = Point3::from(data.project(end.as_vec3()));
        data.curves.push(SketchCurve::Line {
            id,
            start,
            end,
            construction,
        });
        Ok(id)
    }

    fn cut_to_next(
        &mut self,
        sketch: SketchId,
        termination: FaceId,
    ) -> Result<FeatureId, KernelError> {
        let data = self.sketch_data(sketch)?;
        let sketch_plane = self.face_geometry(data.face)?;

        // 圆用包围正方形近似，线段取端点；构造线不参与切除。
        let mut footprint: Vec<DVec3> = Vec::new();
        for curve in &data.curves {
            match curve {
                SketchCurve::Circle { center, radius, .. } => {
                    let center = center.as_vec3();
                    for axis in (0..3).filter(|axis| *axis != sketch_plane.axis) {
                        let mut offset = DVec3::ZERO;
                        offset[axis] = *radius;
                        footprint.push(center + offset);
                        footprint.push(center - offset);
                    }
                }
                SketchCurve::Line {
                    start,
                    end,
                    construction: false,
                    ..
                } => {
                    footprint.push(start.as_vec3());
                    footprint.push(end.as_vec3());
                }
                SketchCurve::Line { .. } => {}
            }
        }
        if footprint.is_empty() {
            return Err(KernelError::EmptyProfile(sketch));
        }

        let direction = -data.normal;
        let target_plane = self.face_geometry(termination)?;
        let denom = direction.dot(target_plane.normal);
        if denom.abs() < DIRECTION_EPSILON {
            return Err(KernelError::NotTerminated {
                sketch,
                termination,
            });
        }
        let depth = (target_plane.center() - data.origin).dot(target_plane.normal) / denom;
        if depth <= LINEAR_TOLERANCE {
            return Err(KernelError::NotTerminated {
                sketch,
                termination,
            });
        }

        let mut swept_min = DVec3::splat(f64::INFINITY);
        let mut swept_max = DVec3::splat(f64::NEG_INFINITY);
        for point in &footprint {
            for candidate in [*point, *point + direction * depth] {
                swept_min = swept_min.min(candidate);
                swept_max = swept_max.max(candidate);
            }
        }

        let targets: Vec<BodyId> = self
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| overlaps(swept_min, swept_max, body.min, body.max))
            .map(|(index, _)| BodyId::new(index as u64))
            .collect();
        if targets.is_empty() {
            return Err(KernelError::NothingToCut { sketch });
        }

        let id = FeatureId::new(self.next_feature);
        self.next_feature += 1;
        debug!(
            feature = id.get(),
            sketch = sketch.get(),
            termination = %self.describe_face(termination),
            depth,
            targets = targets.len(),
            "切除到面"
        );
        self.features.push(CutFeature {
            id,
            sketch,
            termination,
            depth,
            targets,
        });
        Ok(id)
    }
}

impl UndoGroups for BlockKernel {
    fn begin_group(&mut self) -> GroupMarker {
        let marker = GroupMarker::new(self.next_group);
        self.next_group += 1;
        self.open_groups.push(OpenGroup {
            marker,
            sketches: self.sketches.len(),
            features: self.features.len(),
        });
        trace!(group = marker.get(), "开启撤销分组");
        marker
    }

    fn end_group(&mut self, marker: GroupMarker, outcome: GroupOutcome) {
        let Some(position) = self
            .open_groups
            .iter()
            .rposition(|group| group.marker == marker)
        else {
            debug!(group = marker.get(), "撤销分组不存在或已关闭");
            return;
        };
        let group = self.open_groups[position];
        self.open_groups.truncate(position);
        match outcome {
            GroupOutcome::Committed => {
                self.committed_groups += 1;
                trace!(group = marker.get(), "提交撤销分组");
            }
            GroupOutcome::Abandoned => {
                let sketches = self.sketches.len() - group.sketches;
                let features = self.features.len() - group.features;
                self.sketches.truncate(group.sketches);
                self.features.truncate(group.features);
                debug!(group = marker.get(), sketches, features, "回滚撤销分组");
            }
        }
    }
}
