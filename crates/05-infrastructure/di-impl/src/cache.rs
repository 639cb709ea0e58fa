//! 并发查找缓存
//!
//! 单例存储前的快速读路径：定长开放寻址表加每个工作线程的小型本地缓存。
//! 绑定一旦发布就不再变化，没有失效操作。

use infrastructure_common::Instance;
use once_cell::sync::OnceCell;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 负载因子
const LOAD_FACTOR: f64 = 0.75;

/// 本地缓存槽位数
pub const WORKER_CACHE_SLOTS: usize = 8;

/// 计算表容量：大于 `admitted / 0.75` 的最小二次幂
pub fn table_capacity(admitted: usize) -> usize {
    let minimum = (admitted as f64 / LOAD_FACTOR).floor() as usize + 1;
    minimum.next_power_of_two()
}

type Binding = (Arc<str>, Instance);

/// 开放寻址查找表
///
/// 线性探测，下标为 `hash & (size - 1)`。每个槽位是一次性单元，
/// 写入以 release 语义发布，读取以 acquire 语义观察。
pub struct LookupTable {
    slots: Box<[OnceCell<Binding>]>,
    mask: usize,
    hasher: RandomState,
    len: AtomicUsize,
}

impl LookupTable {
    /// 按准入组件数量创建查找表
    pub fn with_expected(admitted: usize) -> Self {
        let capacity = table_capacity(admitted);
        Self {
            slots: (0..capacity).map(|_| OnceCell::new()).collect(),
            mask: capacity - 1,
            hasher: RandomState::new(),
            len: AtomicUsize::new(0),
        }
    }

    /// 表容量
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 已发布的绑定数量
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start(&self, id: &str) -> usize {
        (self.hasher.hash_one(id) as usize) & self.mask
    }

    /// 查找绑定
    pub fn get(&self, id: &str) -> Option<Instance> {
        let mut index = self.start(id);
        for _ in 0..self.slots.len() {
            match self.slots[index].get() {
                // 槽位从不移除，遇到空槽即可确定不存在
                None => return None,
                Some((key, instance)) if key.as_ref() == id => return Some(instance.clone()),
                Some(_) => index = (index + 1) & self.mask,
            }
        }
        None
    }

    /// 发布绑定
    ///
    /// 返回表中的实例：已有同名绑定时返回原实例。表已满时不发布，返回传入的实例。
    pub fn publish(&self, id: &str, instance: Instance) -> Instance {
        let mut index = self.start(id);
        let mut pending: Binding = (Arc::from(id), instance);
        for _ in 0..self.slots.len() {
            let candidate = pending.1.clone();
            match self.slots[index].set(pending) {
                Ok(()) => {
                    self.len.fetch_add(1, Ordering::AcqRel);
                    return candidate;
                }
                Err(rejected) => {
                    if let Some((key, existing)) = self.slots[index].get() {
                        if key.as_ref() == id {
                            return existing.clone();
                        }
                    }
                    pending = rejected;
                    index = (index + 1) & self.mask;
                }
            }
        }
        tracing::warn!("查找表已满，组件 {} 未发布到缓存", id);
        pending.1
    }
}

impl std::fmt::Debug for LookupTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupTable")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// 工作线程本地缓存
///
/// 固定 8 个槽位，查找时先于共享表检查，按轮转顺序写入。
#[derive(Default)]
pub struct WorkerCache {
    entries: [Option<Binding>; WORKER_CACHE_SLOTS],
    next: usize,
    hits: u64,
    misses: u64,
}

impl WorkerCache {
    /// 创建空的本地缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找
    pub fn get(&mut self, id: &str) -> Option<Instance> {
        let found = self
            .entries
            .iter()
            .flatten()
            .find(|(key, _)| key.as_ref() == id)
            .map(|(_, instance)| instance.clone());
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// 写入，覆盖轮转位置上的旧条目
    pub fn put(&mut self, id: &str, instance: Instance) {
        if self
            .entries
            .iter()
            .flatten()
            .any(|(key, _)| key.as_ref() == id)
        {
            return;
        }
        self.entries[self.next] = Some((Arc::from(id), instance));
        self.next = (self.next + 1) % WORKER_CACHE_SLOTS;
    }

    /// 清空
    pub fn clear(&mut self) {
        self.entries = Default::default();
        self.next = 0;
    }

    /// 已缓存的条目数
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 命中次数
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// 未命中次数
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl std::fmt::Debug for WorkerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerCache")
            .field("len", &self.len())
            .field("next", &self.next)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}
