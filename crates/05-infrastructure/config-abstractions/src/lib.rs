//! # Configuration Abstractions
//!
//! 属性源抽象层，定义环境快照的数据来源和 profile 解析约定。
//!
//! ## 核心接口
//!
//! - [`PropertySource`] - 属性源接口
//! - [`resolve_active_profiles`] - 激活 profile 的解析规则

pub mod profiles;
pub mod source;

pub use profiles::*;
pub use source::*;
