use std::path::PathBuf;

use anyhow::{Context, bail};
use captive_config::AppConfig;
use captive_engine::command::{CommandBus, CommandContext, CommandRequest, format_point};
use captive_kernel::BlockKernel;
use tracing::info;

use crate::loader::{WorkpieceSource, load_workpiece};

/// 一次命令行调用的输入。
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub workpiece: Option<PathBuf>,
    pub points: Vec<String>,
    pub overrides: Vec<String>,
    pub check_only: bool,
}

/// 加载工件、分发命令并打印加工概览。命令失败时返回错误，由调用方决定退出码。
pub fn run(config: &AppConfig, request: &RunRequest) -> anyhow::Result<()> {
    let loaded = load_workpiece(request.workpiece.as_deref(), config)
        .context("无法加载工件描述")?;
    let mut kernel =
        BlockKernel::from_workpiece(&loaded.workpiece).context("无法根据工件创建几何内核")?;

    match &loaded.source {
        WorkpieceSource::File(path) => println!("工件来源：{}", path.display()),
        WorkpieceSource::Demo => println!("工件来源：内置 T 形接头示例"),
    }
    for body in &loaded.workpiece.bodies {
        println!(
            "  - 实体 {}：({:.2}, {:.2}, {:.2}) → ({:.2}, {:.2}, {:.2})",
            body.name, body.min[0], body.min[1], body.min[2], body.max[0], body.max[1], body.max[2]
        );
    }

    let mut args = request.overrides.clone();
    if !request.check_only {
        if request.points.is_empty() {
            args.extend(loaded.workpiece.target_points().into_iter().map(format_point));
        } else {
            args.extend(request.points.iter().cloned());
        }
    }
    let name = if request.check_only {
        "check_config"
    } else {
        "captive_joint"
    };

    let bus = CommandBus::new();
    let response = {
        let mut context = CommandContext {
            kernel: &mut kernel,
            config: config.joint,
        };
        bus.dispatch(
            &CommandRequest {
                name: name.to_string(),
                args,
            },
            &mut context,
        )
    };

    let message = response.message.unwrap_or_default();
    println!("结果：{message}");
    if !response.success {
        bail!("命令 {name} 执行失败");
    }

    info!(
        features = kernel.features().len(),
        sketches = kernel.sketches().len(),
        "加工完成"
    );
    if !kernel.features().is_empty() {
        println!("切除特征：");
        for feature in kernel.features() {
            println!(
                "  - 特征 #{}, 草图 #{}, 终止面 {}, 深度 {:.2}",
                feature.id.get(),
                feature.sketch.get(),
                kernel.describe_face(feature.termination),
                feature.depth
            );
        }
    }
    Ok(())
}
