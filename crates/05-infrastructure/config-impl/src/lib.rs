//! # Configuration Implementation
//!
//! 属性源的具体实现，以及把多个属性源合并为环境快照的加载器。
//!
//! ## 主要组件
//!
//! - [`MapPropertySource`] - 内存属性源
//! - [`EnvironmentPropertySource`] - 环境变量属性源
//! - [`JsonPropertySource`] - JSON 文件属性源
//! - [`TomlPropertySource`] - TOML 文件属性源
//! - [`EnvironmentLoader`] - 环境快照加载器

pub mod loader;
pub mod providers;

pub use loader::*;
pub use providers::*;
