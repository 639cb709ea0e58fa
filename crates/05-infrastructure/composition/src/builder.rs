//! 运行时构建器

use crate::logging::LoggingConfig;
use config_abstractions::PropertySource;
use config_impl::{
    EnvironmentLoader, EnvironmentPropertySource, JsonPropertySource, TomlPropertySource,
};
use di_abstractions::ScopeStore;
use di_impl::{Container, ContainerBuilder, ContainerEventListener};
use infrastructure_common::{ComponentDescriptor, FactoryDecorator, InfrastructureResult};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 运行时构建器
///
/// 启动流程：初始化日志，加载属性源生成环境快照，用已配置的装饰器包装每个描述符，
/// 最后交给 [`ContainerBuilder`] 完成准入、排序和单例预创建。
pub struct RuntimeBuilder {
    logging: Option<LoggingConfig>,
    loader: EnvironmentLoader,
    decorators: Vec<Arc<dyn FactoryDecorator>>,
    descriptors: Vec<ComponentDescriptor>,
    container: ContainerBuilder,
}

impl RuntimeBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            logging: None,
            loader: EnvironmentLoader::new(),
            decorators: Vec::new(),
            descriptors: Vec::new(),
            container: ContainerBuilder::new(),
        }
    }

    /// 设置日志配置
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 添加属性源
    pub fn add_source<S: PropertySource + 'static>(mut self, source: S) -> Self {
        self.loader = self.loader.add_source(source);
        self
    }

    /// 添加 TOML 文件属性源（文件必须存在）
    pub fn add_toml<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(TomlPropertySource::new(path))
    }

    /// 添加 JSON 文件属性源（文件必须存在）
    pub fn add_json<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(JsonPropertySource::new(path))
    }

    /// 添加环境变量属性源
    pub fn add_env(self, prefix: impl Into<String>) -> Self {
        self.add_source(EnvironmentPropertySource::new(prefix))
    }

    /// 显式激活 profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.with_profile(profile);
        self
    }

    /// 显式激活多个 profile
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for profile in profiles {
            self.loader = self.loader.with_profile(profile);
        }
        self
    }

    /// 声明可选能力可用
    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        self.loader = self.loader.with_capability(name);
        self
    }

    /// 添加工厂装饰器，按添加顺序由内向外包装
    pub fn with_decorator<D: FactoryDecorator + 'static>(mut self, decorator: D) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// 注册描述符
    pub fn register(mut self, descriptor: ComponentDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// 批量注册描述符
    pub fn register_all<I>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = ComponentDescriptor>,
    {
        self.descriptors.extend(descriptors);
        self
    }

    /// 注册外部作用域存储
    pub fn with_scope_store(mut self, store: Arc<dyn ScopeStore>) -> Self {
        self.container = self.container.with_scope_store(store);
        self
    }

    /// 注册容器事件监听器
    pub fn on_event<L: ContainerEventListener + 'static>(mut self, listener: L) -> Self {
        self.container = self.container.on_event(listener);
        self
    }

    /// 构建并启动容器
    pub async fn build(self) -> InfrastructureResult<Container> {
        if let Some(logging) = &self.logging {
            if let Err(e) = logging.init() {
                debug!("跳过日志初始化: {}", e);
            }
        }

        info!(
            "开始启动运行时: {} 个属性源, {} 个组件, {} 个装饰器",
            self.loader.source_count(),
            self.descriptors.len(),
            self.decorators.len()
        );

        let environment = self.loader.load().await?;

        let decorators = self.decorators;
        let descriptors = self.descriptors.into_iter().map(|descriptor| {
            decorators
                .iter()
                .fold(descriptor, |d, decorator| d.decorate(decorator.as_ref()))
        });

        let container = self
            .container
            .with_environment(environment)
            .register_all(descriptors)
            .build()?;

        info!("运行时启动完成: 容器 {}", container.id());
        Ok(container)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("logging", &self.logging)
            .field("sources", &self.loader.source_count())
            .field(
                "decorators",
                &self.decorators.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}
