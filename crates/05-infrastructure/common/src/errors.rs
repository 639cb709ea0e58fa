//! 错误类型定义

use crate::lifecycle::Scope;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 共享的底层错误
///
/// 同一次失败的构建需要同时交付给所有等待者，因此底层错误以 `Arc` 持有。
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// 将工厂或钩子返回的错误转换为可共享的错误
pub fn share_error(error: anyhow::Error) -> SharedError {
    let boxed: Box<dyn std::error::Error + Send + Sync> = error.into();
    Arc::from(boxed)
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        Self::ParseError {
            source: Box::new(error),
        }
    }
}

/// 组件构建阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionPhase {
    /// 工厂调用
    Factory,
    /// 初始化钩子
    InitHook {
        /// 钩子名称
        name: String,
    },
}

impl fmt::Display for ConstructionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory => f.write_str("factory"),
            Self::InitHook { name } => write!(f, "init-hook {name}"),
        }
    }
}

/// 单个销毁钩子的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// 组件标识
    pub component: String,
    /// 钩子名称
    pub hook: String,
    /// 失败原因
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.component, self.hook, self.message)
    }
}

fn join_failures(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 容器错误类型
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    #[error("组件 {component} 的硬依赖 {dependency} 不在准入集合中 (被条件排除: {excluded})")]
    UnresolvedDependency {
        component: String,
        dependency: String,
        excluded: bool,
    },

    #[error("组件重复注册: {id}")]
    DuplicateRegistration { id: String },

    #[error("检测到循环依赖: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("组件创建失败: {id}, 阶段: {phase}, 原因: {source}")]
    Construction {
        id: String,
        phase: ConstructionPhase,
        source: SharedError,
    },

    #[error("容器已关闭")]
    ContainerClosed,

    #[error("组件未找到: {id}")]
    NotFound { id: String },

    #[error("组件 {id} 的作用域 {scope} 当前未激活")]
    ScopeNotActive { id: String, scope: Scope },

    #[error("组件类型不匹配: {id}, 期望类型: {expected}")]
    TypeMismatch { id: String, expected: String },

    #[error("组件销毁出现 {} 个错误: {}", .failures.len(), join_failures(.failures))]
    Teardown { failures: Vec<TeardownFailure> },
}

impl ContainerError {
    /// 创建构建错误
    pub fn construction(
        id: impl Into<String>,
        phase: ConstructionPhase,
        error: anyhow::Error,
    ) -> Self {
        Self::Construction {
            id: id.into(),
            phase,
            source: share_error(error),
        }
    }

    /// 是否为构建期错误（不会返回部分构建的容器）
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedDependency { .. }
                | Self::DuplicateRegistration { .. }
                | Self::CycleDetected { .. }
        )
    }

    /// 调用方是否可以在本地恢复
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ContainerClosed)
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("容器错误: {source}")]
    ContainerError {
        #[from]
        source: ContainerError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ContainerResult<T> = Result<T, ContainerError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
