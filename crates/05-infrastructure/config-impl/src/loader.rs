//! 环境快照加载器

use config_abstractions::{
    resolve_active_profiles, PropertyMap, PropertySource, ACTIVE_PROFILES_PROPERTY,
};
use infrastructure_common::{ConfigResult, Environment};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// 环境快照加载器
///
/// 按优先级合并所有属性源（优先级高的覆盖优先级低的，同优先级后注册的覆盖先注册的），
/// 然后计算激活的 profile 并生成不可变的 [`Environment`]。
#[derive(Default)]
pub struct EnvironmentLoader {
    sources: Vec<Box<dyn PropertySource>>,
    profiles: BTreeSet<String>,
    capabilities: BTreeSet<String>,
}

impl EnvironmentLoader {
    /// 创建新的加载器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性源
    pub fn add_source<S: PropertySource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// 添加已装箱的属性源
    pub fn add_boxed_source(mut self, source: Box<dyn PropertySource>) -> Self {
        self.sources.push(source);
        self
    }

    /// 显式激活 profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.insert(profile.into());
        self
    }

    /// 声明可选能力可用
    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        self.capabilities.insert(name.into());
        self
    }

    /// 属性源数量
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// 加载并合并属性
    pub async fn load_properties(&self) -> ConfigResult<PropertyMap> {
        let mut ordered: Vec<&dyn PropertySource> =
            self.sources.iter().map(|s| s.as_ref()).collect();
        ordered.sort_by_key(|s| s.priority());

        let mut merged = PropertyMap::new();
        for source in ordered {
            let properties = source.load().await?;
            debug!(
                "属性源 {} (优先级 {}) 提供 {} 个属性",
                source.name(),
                source.priority(),
                properties.len()
            );
            merged.extend(properties);
        }
        Ok(merged)
    }

    /// 生成环境快照
    pub async fn load(&self) -> ConfigResult<Environment> {
        let properties = self.load_properties().await?;
        let profiles = resolve_active_profiles(
            &self.profiles,
            properties.get(ACTIVE_PROFILES_PROPERTY).map(String::as_str),
        );

        info!(
            "环境加载完成: {} 个属性, 激活 profile: {:?}",
            properties.len(),
            profiles
        );

        Ok(Environment::new()
            .with_properties(properties)
            .with_profiles(profiles)
            .with_capabilities(self.capabilities.iter().cloned()))
    }
}
