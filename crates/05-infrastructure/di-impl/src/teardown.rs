//! 销毁协调器

use infrastructure_common::{ComponentDescriptor, Instance, Scope, TeardownFailure};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// 销毁结果
#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    /// 执行过销毁流程的组件（按执行顺序）
    pub destroyed: Vec<String>,
    /// 失败的钩子
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// 是否全部成功
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 销毁协调器
///
/// 按解析顺序的逆序对已构建的单例执行销毁钩子。单个钩子失败只会被记录，
/// 不影响后续钩子的执行。
#[derive(Debug, Default)]
pub struct TeardownCoordinator;

impl TeardownCoordinator {
    /// 执行销毁
    ///
    /// `take` 取出已构建的单例实例；未构建的组件返回 `None` 并被跳过。
    pub fn run<'a, I, F>(
        &self,
        order: I,
        descriptors: &HashMap<String, ComponentDescriptor>,
        mut take: F,
    ) -> TeardownReport
    where
        I: DoubleEndedIterator<Item = &'a str>,
        F: FnMut(&str) -> Option<Instance>,
    {
        let mut report = TeardownReport::default();

        for id in order.rev() {
            let Some(descriptor) = descriptors.get(id) else {
                continue;
            };
            if descriptor.scope != Scope::Singleton {
                continue;
            }
            let Some(instance) = take(id) else {
                continue;
            };

            for hook in &descriptor.teardown_hooks {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook.invoke(&instance)));
                let message = match outcome {
                    Ok(Ok(())) => {
                        debug!("销毁钩子执行完成: {} ({})", id, hook.name);
                        continue;
                    }
                    Ok(Err(e)) => format!("{e:#}"),
                    Err(payload) => format!("销毁钩子 panic: {}", panic_message(payload.as_ref())),
                };
                warn!("销毁钩子执行失败: {} ({}): {}", id, hook.name, message);
                report.failures.push(TeardownFailure {
                    component: id.to_string(),
                    hook: hook.name.clone(),
                    message,
                });
            }
            report.destroyed.push(id.to_string());
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}
