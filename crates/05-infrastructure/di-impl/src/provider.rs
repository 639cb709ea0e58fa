//! 延迟查找句柄

use di_abstractions::{downcast_instance, ComponentLookup};
use infrastructure_common::{ContainerResult, Instance};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 组件提供者
///
/// 每次调用 [`Provider::get`] 都会对容器执行一次查找：单例返回同一实例，原型每次返回新实例。
#[derive(Clone)]
pub struct Provider {
    id: String,
    lookup: Arc<dyn ComponentLookup>,
}

impl Provider {
    /// 创建提供者
    pub fn new(id: impl Into<String>, lookup: Arc<dyn ComponentLookup>) -> Self {
        Self {
            id: id.into(),
            lookup,
        }
    }

    /// 目标组件标识
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 获取实例
    pub fn get(&self) -> ContainerResult<Instance> {
        self.lookup.get(&self.id)
    }

    /// 获取实例并转换为具体类型
    pub fn get_as<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        downcast_instance(&self.id, self.get()?)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("lookup", &"<container>")
            .finish()
    }
}
