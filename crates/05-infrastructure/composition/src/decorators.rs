//! 工厂装饰器

use infrastructure_common::{FactoryDecorator, FactoryFn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, warn};

/// 为每次构建创建 tracing span 并记录耗时
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDecorator;

impl FactoryDecorator for TracingDecorator {
    fn name(&self) -> &str {
        "tracing"
    }

    fn decorate(&self, component_id: &str, factory: FactoryFn) -> FactoryFn {
        let id = component_id.to_string();
        Arc::new(move |deps| {
            let span = debug_span!("construct", component = %id);
            let _entered = span.enter();
            let started = Instant::now();
            let result = factory(deps);
            let elapsed = started.elapsed();
            match &result {
                Ok(_) => debug!("组件构建完成: {} ({:?})", id, elapsed),
                Err(e) => warn!("组件构建失败: {} ({:?}): {}", id, elapsed, e),
            }
            result
        })
    }
}

/// 单次构建的耗时记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionTiming {
    /// 组件标识
    pub component: String,
    /// 工厂耗时
    pub elapsed: Duration,
    /// 是否成功
    pub succeeded: bool,
}

/// 记录每次构建的耗时
///
/// 克隆共享同一份记录，注册时传入一个克隆即可在之后读取结果。
#[derive(Debug, Clone, Default)]
pub struct TimingDecorator {
    records: Arc<Mutex<Vec<ConstructionTiming>>>,
}

impl TimingDecorator {
    /// 创建装饰器
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有记录（按完成顺序）
    pub fn records(&self) -> Vec<ConstructionTiming> {
        self.records.lock().clone()
    }

    /// 某个组件的构建次数
    pub fn count_for(&self, component: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.component == component)
            .count()
    }

    /// 某个组件的累计构建耗时
    pub fn total_for(&self, component: &str) -> Duration {
        self.records
            .lock()
            .iter()
            .filter(|r| r.component == component)
            .map(|r| r.elapsed)
            .sum()
    }

    /// 清空记录
    pub fn reset(&self) {
        self.records.lock().clear();
    }
}

impl FactoryDecorator for TimingDecorator {
    fn name(&self) -> &str {
        "timing"
    }

    fn decorate(&self, component_id: &str, factory: FactoryFn) -> FactoryFn {
        let id = component_id.to_string();
        let records = Arc::clone(&self.records);
        Arc::new(move |deps| {
            let started = Instant::now();
            let result = factory(deps);
            records.lock().push(ConstructionTiming {
                component: id.clone(),
                elapsed: started.elapsed(),
                succeeded: result.is_ok(),
            });
            result
        })
    }
}
