//! # 示例应用程序
//!
//! 演示如何用派生宏声明组件，并通过应用层完成扫描、构建、查找和销毁

use anyhow::Context;
use clap::Parser;
use component_macros::Component;
use infrastructure_common::{BoxError, EventListener, ListenerControl, RegistryEvent};
use infrastructure_composition::{Application, LoggingConfig};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn IoC 示例应用")]
struct Args {
    /// 配置文件路径（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 环境变量前缀
    #[arg(long, default_value = "IOC")]
    env_prefix: String,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 日志
    #[arg(long)]
    json: bool,

    /// 启动后等待 Ctrl+C 再关闭
    #[arg(long)]
    wait: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = if args.json {
        LoggingConfig::production()
    } else {
        LoggingConfig::default()
    };

    let mut builder = Application::builder("example-app")
        .for_caller(module_path!())
        .with_env_prefix(args.env_prefix.as_str())
        .with_logging(LoggingConfig {
            filter: args.log_level.clone(),
            ..logging
        });
    if let Some(path) = &args.config {
        builder = builder.with_settings_file(path);
    }
    let app = builder.build().context("构建应用失败")?;

    let report = app.start().await.context("启动应用失败")?;
    info!("启动报告: {}", serde_json::to_string(&report)?);

    demonstrate_lookup(&app)?;

    let teardown = if args.wait {
        app.run_until_shutdown().await?
    } else {
        app.stop().await?
    };
    info!(
        "销毁 {} 个组件, 失败 {} 个",
        teardown.destroyed.len(),
        teardown.failures.len()
    );
    info!("应用统计: {}", serde_json::to_string(&app.metrics().await)?);
    Ok(())
}

/// 演示单例、延迟单例和原型的查找
fn demonstrate_lookup(app: &Application) -> anyhow::Result<()> {
    let greeter = app.lookup::<GreetingService>()?;
    info!("{}", greeter.greet("world"));

    // 首次查找时构建
    let report = app.lookup::<DailyReport>()?;
    info!("日报: {}", report.render());

    let first = app.lookup::<RequestContext>()?;
    let second = app.lookup::<RequestContext>()?;
    info!(
        "原型实例是否相同: {}",
        Arc::ptr_eq(&first, &second)
    );

    let audit = app.lookup_named::<AuditTrail>("auditTrail")?;
    info!("已记录事件: {:?}", audit.events.lock());
    Ok(())
}

/// 应用配置
#[derive(Debug, Component)]
#[component(markers(configuration))]
pub struct AppConfig {
    pub greeting: String,
    pub locale: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
            locale: "zh-CN".to_string(),
        }
    }
}

/// 内存消息仓库
#[derive(Debug, Default, Component)]
#[component(name = "messages", markers(repository))]
pub struct MessageRepository {
    sent: Mutex<Vec<String>>,
}

impl MessageRepository {
    pub fn record(&self, message: &str) {
        self.sent.lock().push(message.to_string());
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

/// 问候服务
#[derive(Debug, Component)]
#[component(markers(service), post_construct = "open", pre_destroy = "close")]
pub struct GreetingService {
    #[inject]
    config: Arc<AppConfig>,
    #[inject(name = "messages")]
    repository: Arc<MessageRepository>,
    ready: bool,
}

impl GreetingService {
    pub fn greet(&self, who: &str) -> String {
        let message = format!("{}, {} ({})", self.config.greeting, who, self.config.locale);
        self.repository.record(&message);
        message
    }

    fn open(&mut self) -> Result<(), BoxError> {
        self.ready = true;
        info!("问候服务已就绪");
        Ok(())
    }

    fn close(&self) -> Result<(), BoxError> {
        info!("问候服务关闭, 共发送 {} 条消息", self.repository.count());
        Ok(())
    }
}

/// 日报任务（延迟单例）
#[derive(Debug, Component)]
#[component(lazy)]
pub struct DailyReport {
    #[inject]
    greeter: Arc<GreetingService>,
    #[inject(name = "messages")]
    repository: Arc<MessageRepository>,
}

impl DailyReport {
    pub fn render(&self) -> String {
        format!(
            "服务就绪: {}, 已发送消息: {}",
            self.greeter.ready,
            self.repository.count()
        )
    }
}

/// 请求上下文（原型）
#[derive(Debug, Default, Component)]
#[component(prototype)]
pub struct RequestContext {
    pub attributes: Vec<(String, String)>,
}

/// 审计监听器
#[derive(Debug, Default, Component)]
#[component(listener)]
pub struct AuditTrail {
    events: Mutex<Vec<String>>,
}

impl EventListener for AuditTrail {
    fn on_event(&self, event: &RegistryEvent) -> ListenerControl {
        self.events.lock().push(event.name().to_string());
        ListenerControl::Continue
    }
}
