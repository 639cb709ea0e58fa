//! 准入条件定义
//!
//! 条件是封闭的标签化变体集合，由准入过滤器通过模式匹配求值。

use crate::metadata::TypeInfo;
use std::fmt;

/// 否定 profile 的前缀
pub const NEGATED_PROFILE_PREFIX: char = '!';

/// profile 匹配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileMatch {
    /// 至少一个 profile 处于激活状态
    #[default]
    Any,
    /// 所有 profile 都处于激活状态
    All,
}

/// 组件引用（按标识或按类型）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRef {
    /// 按组件标识
    Id(String),
    /// 按产出类型
    Type(TypeInfo),
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Type(info) => write!(f, "type={}", info.short_name()),
        }
    }
}

/// 准入条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionPredicate {
    /// 属性等于期望值；属性缺失时返回 `match_if_absent`
    PropertyEquals {
        /// 属性键
        key: String,
        /// 期望值
        expected: String,
        /// 属性缺失时的结果
        match_if_absent: bool,
    },
    /// 属性存在
    PropertyPresent {
        /// 属性键
        key: String,
    },
    /// 可选能力可用
    CapabilityPresent {
        /// 能力名称
        name: String,
    },
    /// 没有其他可准入的组件满足该引用
    MissingComponent(ComponentRef),
    /// profile 激活条件，`!name` 表示该 profile 未激活
    ProfileActive {
        /// profile 名称列表
        names: Vec<String>,
        /// 匹配模式
        mode: ProfileMatch,
    },
}

impl AdmissionPredicate {
    /// 属性等于期望值
    pub fn property_equals(
        key: impl Into<String>,
        expected: impl Into<String>,
        match_if_absent: bool,
    ) -> Self {
        Self::PropertyEquals {
            key: key.into(),
            expected: expected.into(),
            match_if_absent,
        }
    }

    /// 属性存在
    pub fn property_present(key: impl Into<String>) -> Self {
        Self::PropertyPresent { key: key.into() }
    }

    /// 能力可用
    pub fn capability(name: impl Into<String>) -> Self {
        Self::CapabilityPresent { name: name.into() }
    }

    /// 指定标识的组件不存在
    pub fn missing_component(id: impl Into<String>) -> Self {
        Self::MissingComponent(ComponentRef::Id(id.into()))
    }

    /// 产出指定类型的组件不存在
    pub fn missing_type<T: 'static>() -> Self {
        Self::MissingComponent(ComponentRef::Type(TypeInfo::of::<T>()))
    }

    /// 任一 profile 激活
    pub fn profile<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ProfileActive {
            names: names.into_iter().map(Into::into).collect(),
            mode: ProfileMatch::Any,
        }
    }

    /// 所有 profile 激活
    pub fn all_profiles<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ProfileActive {
            names: names.into_iter().map(Into::into).collect(),
            mode: ProfileMatch::All,
        }
    }

    /// 是否为缺失组件条件
    pub fn is_missing_component(&self) -> bool {
        matches!(self, Self::MissingComponent(_))
    }
}

impl fmt::Display for AdmissionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PropertyEquals {
                key,
                expected,
                match_if_absent,
            } => write!(
                f,
                "PropertyEquals({key}={expected}, match_if_absent={match_if_absent})"
            ),
            Self::PropertyPresent { key } => write!(f, "PropertyPresent({key})"),
            Self::CapabilityPresent { name } => write!(f, "CapabilityPresent({name})"),
            Self::MissingComponent(reference) => write!(f, "MissingComponent({reference})"),
            Self::ProfileActive { names, mode } => {
                write!(f, "ProfileActive({}, {mode:?})", names.join(","))
            }
        }
    }
}
