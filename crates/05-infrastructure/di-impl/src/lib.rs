//! # 依赖注入具体实现
//!
//! 提供组件容器：按作用域创建实例、单例的单次构建保护、并发查找缓存以及有序销毁。
//!
//! ## 使用示例
//!
//! ```
//! use di_impl::Container;
//! use infrastructure_common::ComponentDescriptor;
//!
//! let container = Container::builder()
//!     .register(ComponentDescriptor::singleton("greeting", |_| Ok("hello".to_string())))
//!     .build()
//!     .unwrap();
//!
//! let greeting = container.get_as::<String>("greeting").unwrap();
//! assert_eq!(greeting.as_str(), "hello");
//! container.close().unwrap();
//! ```

pub mod builder;
pub mod cache;
pub mod container;
pub mod events;
mod flight;
pub mod provider;
pub mod scope;
pub mod stats;
pub mod teardown;

pub use builder::*;
pub use cache::*;
pub use container::*;
pub use events::*;
pub use provider::*;
pub use scope::*;
pub use stats::*;
pub use teardown::*;
