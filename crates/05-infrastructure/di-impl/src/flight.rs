//! 单例的单次构建保护
//!
//! 每个单例标识一个槽位。同一标识的并发请求者只有一个执行构建，
//! 其余等待同一次构建的结果；不同标识互不阻塞。

use infrastructure_common::{ContainerError, ContainerResult, Instance};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// 一次进行中的构建
pub(crate) struct Flight {
    owner: ThreadId,
    result: Mutex<Option<ContainerResult<Instance>>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            owner: thread::current().id(),
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    /// 等待构建结束
    fn wait(&self) -> ContainerResult<Instance> {
        let mut result = self.result.lock();
        loop {
            if let Some(outcome) = result.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut result);
        }
    }

    fn complete(&self, outcome: ContainerResult<Instance>) {
        *self.result.lock() = Some(outcome);
        self.done.notify_all();
    }
}

enum SlotState {
    Empty,
    InFlight(Arc<Flight>),
    Ready(Instance),
}

/// 获取槽位的结果
pub(crate) enum Acquire {
    /// 已构建完成
    Ready(Instance),
    /// 由当前调用者负责构建
    Build(FlightGuard),
    /// 其他线程的构建已结束（成功或失败）
    Joined(ContainerResult<Instance>),
}

/// 单例槽位
pub(crate) struct SingletonSlot {
    id: String,
    state: Mutex<SlotState>,
}

impl SingletonSlot {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SlotState::Empty),
        }
    }

    /// 已构建的实例
    pub(crate) fn instance(&self) -> Option<Instance> {
        match &*self.state.lock() {
            SlotState::Ready(instance) => Some(instance.clone()),
            _ => None,
        }
    }

    /// 获取实例或构建权
    ///
    /// 同一线程在构建期间再次请求同一标识时返回 [`ContainerError::CycleDetected`]，
    /// 而不是等待自己。
    pub(crate) fn acquire(self: &Arc<Self>) -> Acquire {
        let flight = {
            let mut state = self.state.lock();
            match &*state {
                SlotState::Ready(instance) => return Acquire::Ready(instance.clone()),
                SlotState::InFlight(flight) => {
                    if flight.owner == thread::current().id() {
                        return Acquire::Joined(Err(ContainerError::CycleDetected {
                            path: vec![self.id.clone(), self.id.clone()],
                        }));
                    }
                    Arc::clone(flight)
                }
                SlotState::Empty => {
                    let flight = Arc::new(Flight::new());
                    *state = SlotState::InFlight(Arc::clone(&flight));
                    return Acquire::Build(FlightGuard {
                        slot: Arc::clone(self),
                        flight,
                        finished: false,
                    });
                }
            }
        };
        Acquire::Joined(flight.wait())
    }

    /// 取出实例并将槽位重置为空
    pub(crate) fn take(&self) -> Option<Instance> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SlotState::Empty) {
            SlotState::Ready(instance) => Some(instance),
            other => {
                *state = other;
                None
            }
        }
    }
}

/// 构建权
///
/// 未调用 [`FlightGuard::finish`] 就被丢弃时（例如工厂 panic），
/// 槽位恢复为空并唤醒等待者。
pub(crate) struct FlightGuard {
    slot: Arc<SingletonSlot>,
    flight: Arc<Flight>,
    finished: bool,
}

impl FlightGuard {
    /// 结束构建
    ///
    /// `publish` 在持有槽位锁时调用，返回 `false` 表示不发布（容器已关闭），
    /// 此时槽位恢复为空。失败不会被缓存，之后的请求可以重试。
    pub(crate) fn finish(
        mut self,
        outcome: ContainerResult<Instance>,
        publish: impl FnOnce(&Instance) -> bool,
    ) -> ContainerResult<Instance> {
        {
            let mut state = self.slot.state.lock();
            *state = match &outcome {
                Ok(instance) if publish(instance) => SlotState::Ready(instance.clone()),
                _ => SlotState::Empty,
            };
        }
        self.finished = true;
        self.flight.complete(outcome.clone());
        outcome
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        *self.slot.state.lock() = SlotState::Empty;
        self.flight.complete(Err(ContainerError::construction(
            self.slot.id.clone(),
            infrastructure_common::ConstructionPhase::Factory,
            anyhow::anyhow!("组件构建被中断"),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn build(slot: &Arc<SingletonSlot>, value: u32) -> ContainerResult<Instance> {
        match slot.acquire() {
            Acquire::Ready(instance) => Ok(instance),
            Acquire::Joined(outcome) => outcome,
            Acquire::Build(guard) => guard.finish(Ok(Arc::new(value)), |_| true),
        }
    }

    #[test]
    fn test_first_acquire_builds_then_ready() {
        let slot = Arc::new(SingletonSlot::new("a"));
        let first = build(&slot, 1).unwrap();
        let second = build(&slot, 2).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.downcast_ref::<u32>(), Some(&1));
    }

    #[test]
    fn test_waiters_join_single_flight() {
        let slot = Arc::new(SingletonSlot::new("a"));
        let builds = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let builds = Arc::clone(&builds);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match slot.acquire() {
                        Acquire::Ready(instance) => Ok(instance),
                        Acquire::Joined(outcome) => outcome,
                        Acquire::Build(guard) => {
                            builds.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            guard.finish(Ok(Arc::new(7_u32)), |_| true)
                        }
                    }
                })
            })
            .collect();

        let results: Vec<Instance> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_failure_not_cached() {
        let slot = Arc::new(SingletonSlot::new("a"));
        match slot.acquire() {
            Acquire::Build(guard) => {
                let outcome = guard.finish(
                    Err(ContainerError::NotFound { id: "dep".into() }),
                    |_| true,
                );
                assert!(outcome.is_err());
            }
            _ => panic!("expected build"),
        }
        assert!(slot.instance().is_none());
        assert!(build(&slot, 3).is_ok());
    }

    #[test]
    fn test_reentrant_acquire_fails_fast() {
        let slot = Arc::new(SingletonSlot::new("a"));
        let Acquire::Build(guard) = slot.acquire() else {
            panic!("expected build");
        };
        match slot.acquire() {
            Acquire::Joined(Err(ContainerError::CycleDetected { path })) => {
                assert_eq!(path, vec!["a", "a"]);
            }
            _ => panic!("expected cycle"),
        }
        drop(guard);
        assert!(build(&slot, 1).is_ok());
    }

    #[test]
    fn test_unpublished_outcome_leaves_slot_empty() {
        let slot = Arc::new(SingletonSlot::new("a"));
        let Acquire::Build(guard) = slot.acquire() else {
            panic!("expected build");
        };
        let instance = guard.finish(Ok(Arc::new(1_u32)), |_| false).unwrap();
        assert_eq!(instance.downcast_ref::<u32>(), Some(&1));
        assert!(slot.instance().is_none());
        assert!(slot.take().is_none());
    }
}
