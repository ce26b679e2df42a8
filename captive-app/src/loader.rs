use std::path::{Path, PathBuf};

use captive_config::AppConfig;
use captive_kernel::{Workpiece, WorkpieceError};
use tracing::{info, warn};

/// 工件来源，便于输出加载信息。
#[derive(Debug, Clone, PartialEq)]
pub enum WorkpieceSource {
    File(PathBuf),
    Demo,
}

#[derive(Debug)]
pub struct LoadedWorkpiece {
    pub workpiece: Workpiece,
    pub source: WorkpieceSource,
}

/// 按优先级加载工件：命令行路径 > 配置中的路径 > 内置示例。
///
/// 命令行显式给出的文件读取失败直接报错；配置中的路径失败时回退到内置示例。
pub fn load_workpiece(
    explicit: Option<&Path>,
    config: &AppConfig,
) -> Result<LoadedWorkpiece, WorkpieceError> {
    if let Some(path) = explicit {
        let workpiece = Workpiece::from_file(path)?;
        info!(path = %path.display(), bodies = workpiece.bodies.len(), "已加载工件");
        return Ok(LoadedWorkpiece {
            workpiece,
            source: WorkpieceSource::File(path.to_path_buf()),
        });
    }

    if let Some(path) = &config.workpiece.path {
        match Workpiece::from_file(path) {
            Ok(workpiece) => {
                info!(path = %path.display(), bodies = workpiece.bodies.len(), "已加载配置中的工件");
                return Ok(LoadedWorkpiece {
                    workpiece,
                    source: WorkpieceSource::File(path.clone()),
                });
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载工件失败，回退到内置示例");
            }
        }
    }

    Ok(LoadedWorkpiece {
        workpiece: Workpiece::demo(),
        source: WorkpieceSource::Demo,
    })
}
