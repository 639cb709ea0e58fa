//! 组件生命周期管理

use crate::component::Instance;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 组件作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// 单例模式 - 每个容器只创建一个实例
    Singleton,
    /// 原型模式 - 每次请求都创建新实例
    Prototype,
    /// 请求作用域 - 实例由外部作用域存储管理
    Request,
    /// 会话作用域 - 实例由外部作用域存储管理
    Session,
}

impl Scope {
    /// 实例是否由外部作用域存储管理
    pub fn is_external(self) -> bool {
        matches!(self, Self::Request | Self::Session)
    }

    /// 作用域名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Prototype => "prototype",
            Self::Request => "request",
            Self::Session => "session",
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::Singleton
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(Self::Singleton),
            "prototype" => Ok(Self::Prototype),
            "request" => Ok(Self::Request),
            "session" => Ok(Self::Session),
            other => Err(format!("未知的作用域: {other}")),
        }
    }
}

/// 容器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    /// 运行中
    Running = 0,
    /// 关闭中（销毁钩子执行期间）
    Closing = 1,
    /// 已关闭
    Closed = 2,
}

impl LifecycleState {
    /// 从原子存储的数值还原状态
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// 是否仍可处理查找请求
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// 生命周期钩子回调
pub type HookFn = Arc<dyn Fn(&Instance) -> anyhow::Result<()> + Send + Sync>;

/// 生命周期钩子
///
/// 初始化钩子在工厂返回之后、实例发布之前执行；
/// 销毁钩子在容器关闭时按解析顺序的逆序执行（仅限单例）。
#[derive(Clone)]
pub struct LifecycleHook {
    /// 钩子名称，用于诊断
    pub name: String,
    callback: HookFn,
}

impl LifecycleHook {
    /// 创建新的钩子
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Instance) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    /// 创建针对具体类型的钩子
    pub fn typed<T, F>(name: impl Into<String>, callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let hook_name = name.clone();
        Self::new(name, move |instance: &Instance| {
            let typed = instance.downcast_ref::<T>().ok_or_else(|| {
                anyhow::anyhow!(
                    "钩子 {} 期望类型 {}，实例类型不匹配",
                    hook_name,
                    std::any::type_name::<T>()
                )
            })?;
            callback(typed)
        })
    }

    /// 执行钩子
    pub fn invoke(&self, instance: &Instance) -> anyhow::Result<()> {
        (self.callback)(instance)
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHook")
            .field("name", &self.name)
            .field("callback", &"<function>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse_and_display() {
        assert_eq!("singleton".parse::<Scope>().unwrap(), Scope::Singleton);
        assert_eq!(" Request ".parse::<Scope>().unwrap(), Scope::Request);
        assert!("unknown".parse::<Scope>().is_err());
        assert_eq!(Scope::Session.to_string(), "session");
        assert_eq!(Scope::default(), Scope::Singleton);
    }

    #[test]
    fn test_external_scopes() {
        assert!(Scope::Request.is_external());
        assert!(Scope::Session.is_external());
        assert!(!Scope::Singleton.is_external());
        assert!(!Scope::Prototype.is_external());
    }

    #[test]
    fn test_typed_hook_rejects_wrong_type() {
        let hook = LifecycleHook::typed::<String, _>("check", |_| Ok(()));
        let wrong: Instance = Arc::new(42_u32);
        assert!(hook.invoke(&wrong).is_err());

        let right: Instance = Arc::new("ok".to_string());
        assert!(hook.invoke(&right).is_ok());
    }

    #[test]
    fn test_lifecycle_state_roundtrip() {
        for state in [
            LifecycleState::Running,
            LifecycleState::Closing,
            LifecycleState::Closed,
        ] {
            assert_eq!(LifecycleState::from_u8(state as u8), state);
        }
        assert!(LifecycleState::Running.is_running());
        assert!(!LifecycleState::Closing.is_running());
    }
}
