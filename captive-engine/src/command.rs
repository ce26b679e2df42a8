use std::collections::HashMap;

use captive_core::config::HoleConfig;
use captive_core::geometry::Point3;
use captive_core::kernel::JointKernel;

use crate::builder::JointHoleBuilder;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub kernel: &'a mut dyn JointKernel,
    pub config: HoleConfig,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(CaptiveJointCommand);
        bus.register(CheckConfigCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 命令参数中的目标点写法：`x,y,z`。
pub fn format_point(point: Point3) -> String {
    format!("{},{},{}", point.x(), point.y(), point.z())
}

fn parse_point(arg: &str) -> Option<Point3> {
    let coords: Vec<f64> = arg
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match coords.as_slice() {
        [x, y, z] => Some(Point3::new(*x, *y, *z)),
        _ => None,
    }
}

/// 拆分参数：`name=value` 覆盖连接孔参数，其余按目标点解析。
fn parse_joint_args(
    args: &[String],
    base: HoleConfig,
) -> Result<(HoleConfig, Vec<Point3>), String> {
    let mut config = base;
    let mut points = Vec::new();
    for arg in args {
        if let Some((name, value)) = arg.split_once('=') {
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| format!("参数 `{arg}` 的数值无效"))?;
            config
                .set(name.trim(), value)
                .map_err(|err| err.to_string())?;
        } else {
            let point = parse_point(arg).ok_or_else(|| format!("无法解析目标点 `{arg}`"))?;
            points.push(point);
        }
    }
    Ok((config, points))
}

struct CaptiveJointCommand;

impl CommandHandler for CaptiveJointCommand {
    fn name(&self) -> &'static str {
        "captive_joint"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let (config, points) = match parse_joint_args(&request.args, context.config) {
            Ok(parsed) => parsed,
            Err(message) => return CommandResponse::err(message),
        };
        let mut builder = JointHoleBuilder::new(&mut *context.kernel, config);
        match builder.build_all(&points) {
            Ok(report) => {
                CommandResponse::ok(format!("已生成 {} 个卡扣连接孔", report.joints.len()))
            }
            Err(err) => CommandResponse::err(format!("Invalid selection: \n\n{err}")),
        }
    }
}

struct CheckConfigCommand;

impl CommandHandler for CheckConfigCommand {
    fn name(&self) -> &'static str {
        "check_config"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let config = match parse_joint_args(&request.args, context.config) {
            Ok((config, _)) => config,
            Err(message) => return CommandResponse::err(message),
        };
        match config.validate() {
            Ok(()) => CommandResponse::ok(format!(
                "参数有效：侧槽总长 {:.2}，螺母槽宽 {:.2}",
                config.slot_extent(),
                config.nut_width
            )),
            Err(err) => CommandResponse::err(format!("参数无效：{err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{t_joint, t_joint_target};

    fn request(name: &str, args: &[&str]) -> CommandRequest {
        CommandRequest {
            name: name.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    #[test]
    fn captive_joint_command_cuts_the_demo() {
        let mut kernel = t_joint();
        let bus = CommandBus::new();
        let target = format_point(t_joint_target());
        {
            let mut context = CommandContext {
                kernel: &mut kernel,
                config: HoleConfig::default(),
            };
            let response = bus.dispatch(&request("captive_joint", &[&target]), &mut context);
            assert!(response.success, "{:?}", response.message);
        }
        assert_eq!(kernel.features().len(), 2);
    }

    #[test]
    fn overrides_are_applied_before_building() {
        let mut kernel = t_joint();
        let bus = CommandBus::new();
        let mut context = CommandContext {
            kernel: &mut kernel,
            config: HoleConfig::default(),
        };
        let response = bus.dispatch(
            &request("captive_joint", &["bolt_length=7", "20,10,15"]),
            &mut context,
        );
        assert!(!response.success);
        let message = response.message.unwrap();
        assert!(message.starts_with("Invalid selection"));
        assert!(message.contains("bolt too short"));
    }

    #[test]
    fn bad_arguments_and_unknown_commands_fail() {
        let mut kernel = t_joint();
        let bus = CommandBus::new();
        let mut context = CommandContext {
            kernel: &mut kernel,
            config: HoleConfig::default(),
        };

        assert!(!bus.dispatch(&request("captive_joint", &["1,2"]), &mut context).success);
        assert!(
            !bus.dispatch(&request("captive_joint", &["washer=2"]), &mut context)
                .success
        );
        assert!(!bus.dispatch(&request("captive_joint", &[]), &mut context).success);
        assert!(!bus.dispatch(&request("explode", &[]), &mut context).success);
    }

    #[test]
    fn check_config_reports_slot_size() {
        let mut kernel = t_joint();
        let bus = CommandBus::new();
        let mut context = CommandContext {
            kernel: &mut kernel,
            config: HoleConfig::default(),
        };
        let ok = bus.dispatch(&request("check_config", &[]), &mut context);
        assert!(ok.success);
        assert!(ok.message.unwrap().contains("18.00"));

        let bad = bus.dispatch(&request("check_config", &["nut_width=1"]), &mut context);
        assert!(!bad.success);

        let mut names: Vec<_> = bus.available_commands().copied().collect();
        names.sort();
        assert_eq!(names, vec!["captive_joint", "check_config"]);
    }

    #[test]
    fn parse_point_accepts_whitespace() {
        assert_eq!(
            parse_point(" 1.5, -2 ,3"),
            Some(Point3::new(1.5, -2.0, 3.0))
        );
        assert_eq!(parse_point("1,2,3,4"), None);
        assert_eq!(parse_point("a,b,c"), None);
    }
}
