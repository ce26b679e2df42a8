use captive_core::config::HoleConfig;
use captive_core::geometry::Point3;
use captive_core::kernel::GeometryKernel;
use captive_engine::builder::JointHoleBuilder;
use captive_engine::errors::{BatchError, JointError};
use captive_kernel::{BlockKernel, FaceSide, SketchCurve, Workpiece};

const BRACKET: &str = r#"
targets = [[10.0, 10.0, 15.0], [30.0, 10.0, 15.0]]

[[bodies]]
name = "lid"
min = [0.0, 0.0, 10.0]
max = [40.0, 20.0, 15.0]

[[bodies]]
name = "wall"
min = [5.0, 0.0, -20.0]
max = [35.0, 20.0, 10.0]
"#;

fn bracket() -> (BlockKernel, Vec<Point3>) {
    let workpiece = Workpiece::from_toml_str(BRACKET).expect("bracket workpiece");
    let kernel = BlockKernel::from_workpiece(&workpiece).expect("build kernel");
    (kernel, workpiece.target_points())
}

#[test]
fn every_target_gets_a_hole_and_a_slot() {
    let (mut kernel, targets) = bracket();
    let report = JointHoleBuilder::new(&mut kernel, HoleConfig::default())
        .build_all(&targets)
        .expect("both joints succeed");

    assert_eq!(report.joints.len(), 2);
    assert_eq!(kernel.features().len(), 4);
    assert_eq!(kernel.committed_groups(), 2);

    let wall = kernel.body_named("wall").unwrap();
    for joint in &report.joints {
        let slot = kernel
            .features()
            .iter()
            .find(|feature| feature.id == joint.side_feature)
            .expect("side feature recorded");
        assert_eq!(slot.targets, vec![wall]);
    }

    // 每个点三张草图：顶孔、隐藏的转移草图、侧槽。
    let hidden = kernel.sketches().iter().filter(|s| !s.is_visible()).count();
    assert_eq!(hidden, 2);
}

#[test]
fn slot_outline_spans_bolt_and_tail() {
    let (mut kernel, targets) = bracket();
    JointHoleBuilder::new(&mut kernel, HoleConfig::default())
        .build_one(targets[0])
        .expect("joint succeeds");

    let lid = kernel.body_named("lid").unwrap();
    let front = kernel.face(lid, FaceSide::Front).unwrap();
    let slot_sketch = kernel
        .sketches()
        .iter()
        .find(|sketch| sketch.face() == front)
        .expect("slot sketch on the lid front");

    let mut min_z = f64::INFINITY;
    let mut max_z = f64::NEG_INFINITY;
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for curve in slot_sketch.curves() {
        if let SketchCurve::Line { start, end, .. } = curve {
            for point in [start, end] {
                min_z = min_z.min(point.z());
                max_z = max_z.max(point.z());
                min_x = min_x.min(point.x());
                max_x = max_x.max(point.x());
            }
        }
    }
    // 从孔中心 z = 15 向下 bolt_length + extra_tail = 18。
    assert!((max_z - 15.0).abs() < 1e-9);
    assert!((min_z + 3.0).abs() < 1e-9);
    assert!((max_x - min_x - 5.4).abs() < 1e-9);
    assert!(kernel.point_on_face(front).is_ok());
}

#[test]
fn thick_lid_with_short_bolt_is_reported_per_point() {
    let (mut kernel, targets) = bracket();
    let config = HoleConfig {
        bolt_length: 6.0,
        ..HoleConfig::default()
    };
    let err = JointHoleBuilder::new(&mut kernel, config)
        .build_all(&targets)
        .unwrap_err();
    assert!(matches!(
        err,
        BatchError::Point {
            index: 0,
            source: JointError::ShaftTooShort { .. },
            ..
        }
    ));
    assert!(kernel.features().is_empty());
    assert!(kernel.sketches().is_empty());
}
