use std::path::PathBuf;

use captive_config::{AppConfig, ConfigError};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod cli;
mod loader;

/// 在实体上生成卡扣螺母连接孔（顶孔 + 侧面螺母槽）。
#[derive(Debug, Parser)]
#[command(name = "captive-joint", version)]
struct Args {
    /// 配置文件路径，缺省时自动发现。
    #[arg(long)]
    config: Option<PathBuf>,
    /// 工件描述文件（TOML），缺省时使用配置或内置示例。
    #[arg(long)]
    workpiece: Option<PathBuf>,
    /// 目标点，可重复；缺省时使用工件中的 targets。
    #[arg(long = "point", value_name = "X,Y,Z")]
    points: Vec<String>,
    #[arg(long)]
    bolt_radius: Option<f64>,
    #[arg(long)]
    bolt_length: Option<f64>,
    #[arg(long)]
    nut_width: Option<f64>,
    #[arg(long)]
    nut_depth: Option<f64>,
    #[arg(long)]
    extra_tail: Option<f64>,
    /// 只校验参数，不加工。
    #[arg(long)]
    check_config: bool,
}

impl Args {
    /// 以 `name=value` 形式输出命令行覆盖的参数。
    fn overrides(&self) -> Vec<String> {
        [
            ("bolt_radius", self.bolt_radius),
            ("bolt_length", self.bolt_length),
            ("nut_width", self.nut_width),
            ("nut_depth", self.nut_depth),
            ("extra_tail", self.extra_tail),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| format!("{name}={value}")))
        .collect()
    }
}

fn main() {
    let args = Args::parse();
    let config = load_configuration(args.config.clone());
    init_logging(&config);
    info!("启动卡扣连接孔生成器");

    let request = cli::RunRequest {
        workpiece: args.workpiece.clone(),
        points: args.points.clone(),
        overrides: args.overrides(),
        check_only: args.check_config,
    };
    if let Err(err) = cli::run(&config, &request) {
        error!(error = %err, "执行失败");
        std::process::exit(1);
    }
}

/// 显式 `--config` 优先，否则自动发现；任何失败都退回内建默认值，只记警告。
fn load_configuration(explicit: Option<PathBuf>) -> AppConfig {
    let loaded = match &explicit {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    loaded.unwrap_or_else(|err| {
        let path = match &err {
            ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => Some(path.clone()),
            ConfigError::Context { .. } => explicit,
        };
        warn!(path = ?path, error = %err, "配置不可用，使用内建默认值");
        AppConfig::default()
    })
}

/// `RUST_LOG` 存在时覆盖配置中的日志等级。
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
