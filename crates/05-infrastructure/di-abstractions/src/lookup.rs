//! 组件查找接口

use infrastructure_common::{ContainerError, ContainerResult, Instance};
use std::any::Any;
use std::sync::Arc;

/// 组件查找 trait
///
/// 容器对外暴露的只读查找能力，延迟查找句柄通过它访问容器。
pub trait ComponentLookup: Send + Sync {
    /// 获取组件实例
    fn get(&self, id: &str) -> ContainerResult<Instance>;

    /// 获取组件实例，组件不存在或容器已关闭时返回 `None`
    fn try_get(&self, id: &str) -> ContainerResult<Option<Instance>>;

    /// 获取带有指定标签的所有组件实例（按构建顺序）
    fn get_all(&self, tag: &str) -> ContainerResult<Vec<Instance>>;

    /// 组件是否被准入
    fn contains(&self, id: &str) -> bool;
}

/// 将实例转换为具体类型
pub fn downcast_instance<T: Any + Send + Sync>(id: &str, instance: Instance) -> ContainerResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            id: id.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}
