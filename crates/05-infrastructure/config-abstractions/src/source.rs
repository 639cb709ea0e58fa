//! 属性源抽象接口

use async_trait::async_trait;
use infrastructure_common::ConfigResult;
use std::collections::BTreeMap;

/// 属性集合，键为点分隔的扁平路径
pub type PropertyMap = BTreeMap<String, String>;

/// 属性源 trait
///
/// 定义从不同数据源加载属性的统一接口，加载结果在容器构建前合并为环境快照。
#[async_trait]
pub trait PropertySource: Send + Sync {
    /// 获取属性源名称
    fn name(&self) -> &str;

    /// 获取属性源优先级，数值越大越优先
    fn priority(&self) -> i32 {
        0
    }

    /// 加载全部属性
    async fn load(&self) -> ConfigResult<PropertyMap>;
}

#[async_trait]
impl<S: PropertySource + ?Sized> PropertySource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    async fn load(&self) -> ConfigResult<PropertyMap> {
        (**self).load().await
    }
}
