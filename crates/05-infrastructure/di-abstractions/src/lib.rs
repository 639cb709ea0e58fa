//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层：准入过滤、依赖图构建与拓扑排序，以及容器对外的查找接口。
//!
//! ## 核心接口
//!
//! - [`AdmissionFilter`] - 准入过滤器接口
//! - [`DependencyResolver`] - 依赖解析器接口（计算构建顺序）
//! - [`ComponentLookup`] - 组件查找接口
//! - [`ScopeStore`] - 外部作用域存储接口

pub mod admission;
pub mod lookup;
pub mod resolver;
pub mod scope;

pub use admission::*;
pub use lookup::*;
pub use resolver::*;
pub use scope::*;
