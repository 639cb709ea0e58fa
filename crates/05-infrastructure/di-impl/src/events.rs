//! 容器生命周期事件

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 容器生命周期事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainerEvent {
    /// 启动完成（所有非延迟单例已构建）
    Started {
        /// 容器实例标识
        container_id: Uuid,
        /// 准入组件数量
        component_count: usize,
        /// 启动时构建的单例数量
        eager_singletons: usize,
        /// 事件时间
        timestamp: DateTime<Utc>,
    },
    /// 关闭完成（销毁钩子已执行）
    Closed {
        /// 容器实例标识
        container_id: Uuid,
        /// 运行时长
        uptime: Duration,
        /// 执行过销毁流程的单例数量
        destroyed_count: usize,
        /// 失败的销毁钩子数量
        failed_hooks: usize,
        /// 事件时间
        timestamp: DateTime<Utc>,
    },
}

impl ContainerEvent {
    /// 事件所属的容器
    pub fn container_id(&self) -> Uuid {
        match self {
            Self::Started { container_id, .. } | Self::Closed { container_id, .. } => *container_id,
        }
    }

    /// 事件时间
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Started { timestamp, .. } | Self::Closed { timestamp, .. } => *timestamp,
        }
    }
}

/// 事件监听器 trait
pub trait ContainerEventListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &ContainerEvent);
}

impl<F> ContainerEventListener for F
where
    F: Fn(&ContainerEvent) + Send + Sync,
{
    fn on_event(&self, event: &ContainerEvent) {
        self(event)
    }
}

/// 共享的事件监听器
pub type SharedListener = Arc<dyn ContainerEventListener>;
