//! 容器统计信息

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 准入组件数量
    pub admitted_components: usize,
    /// 被排除的组件数量
    pub excluded_components: usize,
    /// 已构建的单例数量
    pub singletons_constructed: u64,
    /// 原型构建次数
    pub prototypes_constructed: u64,
    /// 外部作用域实例构建次数
    pub scoped_constructed: u64,
    /// 构建失败次数
    pub construction_failures: u64,
    /// 查找表命中次数
    pub cache_hits: u64,
    /// 查找表未命中次数
    pub cache_misses: u64,
}

impl ContainerStats {
    /// 查找表命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// 运行期计数器
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) singletons: AtomicU64,
    pub(crate) prototypes: AtomicU64,
    pub(crate) scoped: AtomicU64,
    pub(crate) failures: AtomicU64,
    pub(crate) cache_hits: AtomicU64,
    pub(crate) cache_misses: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, admitted: usize, excluded: usize) -> ContainerStats {
        ContainerStats {
            admitted_components: admitted,
            excluded_components: excluded,
            singletons_constructed: self.singletons.load(Ordering::Relaxed),
            prototypes_constructed: self.prototypes.load(Ordering::Relaxed),
            scoped_constructed: self.scoped.load(Ordering::Relaxed),
            construction_failures: self.failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}
