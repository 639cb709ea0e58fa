//! # Infrastructure Common
//!
//! 这个 crate 提供了组件生命周期运行时的公共数据模型。
//!
//! ## 核心类型
//!
//! - [`ComponentDescriptor`] - 组件描述符（标识、作用域、依赖、钩子、准入条件）
//! - [`Scope`] - 组件作用域
//! - [`AdmissionPredicate`] - 准入条件
//! - [`Environment`] - 准入条件求值使用的环境快照
//! - [`ContainerError`] - 容器错误分类
//!
//! ## 设计原则
//!
//! - 描述符是纯数据，不包含任何解析逻辑
//! - 描述符表显式构建，不依赖全局注册表

pub mod component;
pub mod conditions;
pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use component::*;
pub use conditions::*;
pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
