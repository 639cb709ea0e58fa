//! 环境快照
//!
//! 准入过滤器求值时使用的只读环境：属性、激活的 profile 以及可选能力。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 环境快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// 属性
    properties: BTreeMap<String, String>,
    /// 激活的 profile
    active_profiles: BTreeSet<String>,
    /// 可用的可选能力
    capabilities: BTreeSet<String>,
}

impl Environment {
    /// 创建空环境
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 批量设置属性
    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// 激活 profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.active_profiles.insert(profile.into());
        self
    }

    /// 批量激活 profile
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles
            .extend(profiles.into_iter().map(Into::into));
        self
    }

    /// 声明可选能力可用
    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        self.capabilities.insert(name.into());
        self
    }

    /// 批量声明可选能力
    pub fn with_capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(names.into_iter().map(Into::into));
        self
    }

    /// 获取属性
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 属性是否存在
    pub fn contains_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// 所有属性
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// profile 是否激活
    pub fn is_profile_active(&self, profile: &str) -> bool {
        self.active_profiles.contains(profile)
    }

    /// 激活的 profile
    pub fn active_profiles(&self) -> &BTreeSet<String> {
        &self.active_profiles
    }

    /// 能力是否可用
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// 可用能力
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }
}
