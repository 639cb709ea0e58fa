//! 外部作用域存储接口

use infrastructure_common::{Instance, Scope};

/// 外部作用域存储 trait
///
/// 请求、会话等作用域的实例不由容器持有，而是存放在调用方管理的存储中；
/// 作用域结束时由调用方清理，容器关闭时不会对这些实例执行销毁钩子。
pub trait ScopeStore: Send + Sync {
    /// 存储服务的作用域
    fn scope(&self) -> Scope;

    /// 作用域当前是否处于激活状态
    fn is_active(&self) -> bool {
        true
    }

    /// 获取已存储的实例
    fn get(&self, id: &str) -> Option<Instance>;

    /// 存储实例；已有实例时保留原实例并返回它
    fn insert(&self, id: &str, instance: Instance) -> Instance;

    /// 移除实例
    fn remove(&self, id: &str) -> Option<Instance>;

    /// 结束作用域，丢弃所有实例
    fn clear(&self);

    /// 已存储的实例数量
    fn len(&self) -> usize;

    /// 是否没有实例
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
