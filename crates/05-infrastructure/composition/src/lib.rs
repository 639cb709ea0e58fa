//! # 基础设施组合层
//!
//! 把属性加载、日志初始化、工厂装饰和容器构建组合成一次启动流程。
//!
//! ## 主要功能
//!
//! - **运行时构建器**: 使用构建者模式组装属性源、profile、能力和组件描述符
//! - **日志初始化**: 基于 `tracing-subscriber` 的日志配置与预设
//! - **工厂装饰器**: 构建过程的 tracing span 与耗时记录
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_common::ComponentDescriptor;
//! use infrastructure_composition::{LoggingConfig, RuntimeBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = RuntimeBuilder::new()
//!         .with_logging(LoggingConfig::development())
//!         .add_toml("config/app.toml")
//!         .add_env("APP")
//!         .register(ComponentDescriptor::singleton("greeting", |_| Ok("hello".to_string())))
//!         .build()
//!         .await?;
//!
//!     let greeting = container.get_as::<String>("greeting")?;
//!     println!("{}", greeting);
//!
//!     container.close()?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod decorators;
pub mod logging;

pub use builder::RuntimeBuilder;
pub use decorators::{ConstructionTiming, TimingDecorator, TracingDecorator};
pub use logging::LoggingConfig;

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
