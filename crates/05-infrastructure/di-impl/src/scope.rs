//! 外部作用域存储实现

use dashmap::DashMap;
use di_abstractions::ScopeStore;
use infrastructure_common::{Instance, Scope};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// 基于并发映射的作用域存储
///
/// 一个存储对应一个作用域实例（例如一次请求）；`clear` 结束该作用域。
#[derive(Debug)]
pub struct ContextScopeStore {
    scope: Scope,
    instances: DashMap<String, Instance>,
    active: AtomicBool,
}

impl ContextScopeStore {
    /// 创建作用域存储
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            instances: DashMap::new(),
            active: AtomicBool::new(true),
        }
    }

    /// 请求作用域存储
    pub fn request() -> Self {
        Self::new(Scope::Request)
    }

    /// 会话作用域存储
    pub fn session() -> Self {
        Self::new(Scope::Session)
    }

    /// 激活或停用作用域
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

impl ScopeStore for ContextScopeStore {
    fn scope(&self) -> Scope {
        self.scope
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn get(&self, id: &str) -> Option<Instance> {
        self.instances.get(id).map(|entry| entry.value().clone())
    }

    fn insert(&self, id: &str, instance: Instance) -> Instance {
        self.instances
            .entry(id.to_string())
            .or_insert(instance)
            .value()
            .clone()
    }

    fn remove(&self, id: &str) -> Option<Instance> {
        self.instances.remove(id).map(|(_, instance)| instance)
    }

    fn clear(&self) {
        debug!("结束 {} 作用域，丢弃 {} 个实例", self.scope, self.instances.len());
        self.instances.clear();
    }

    fn len(&self) -> usize {
        self.instances.len()
    }
}
