//! 容器构建器

use crate::container::{Container, ContainerParts};
use crate::events::{ContainerEventListener, SharedListener};
use di_abstractions::{
    AdmissionFilter, DefaultAdmissionFilter, DependencyGraph, DependencyResolver, ScopeStore,
    TopologicalResolver,
};
use infrastructure_common::{ComponentDescriptor, ContainerResult, Environment, Scope};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// 容器构建器
///
/// 收集描述符、环境快照、外部作用域存储和事件监听器，
/// `build` 依次执行准入过滤、依赖解析和单例预创建。构建期错误不会返回部分构建的容器。
pub struct ContainerBuilder {
    descriptors: Vec<ComponentDescriptor>,
    environment: Environment,
    scope_stores: HashMap<Scope, Arc<dyn ScopeStore>>,
    listeners: Vec<SharedListener>,
    filter: Box<dyn AdmissionFilter>,
    resolver: Box<dyn DependencyResolver>,
}

impl ContainerBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            environment: Environment::new(),
            scope_stores: HashMap::new(),
            listeners: Vec::new(),
            filter: Box::new(DefaultAdmissionFilter),
            resolver: Box::new(TopologicalResolver),
        }
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

    /// 设置环境快照
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// 注册外部作用域存储（按存储的作用域覆盖已有注册）
    pub fn with_scope_store(mut self, store: Arc<dyn ScopeStore>) -> Self {
        self.scope_stores.insert(store.scope(), store);
        self
    }

    /// 注册事件监听器
    pub fn on_event<L: ContainerEventListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// 替换准入过滤器
    pub fn with_admission_filter<F: AdmissionFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// 替换依赖解析器
    pub fn with_resolver<R: DependencyResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// 已注册的描述符数量
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    /// 构建容器
    pub fn build(self) -> ContainerResult<Container> {
        info!("开始构建容器: {} 个已注册组件", self.descriptors.len());

        let outcome = self.filter.admit(self.descriptors, &self.environment)?;
        let excluded = outcome.excluded_ids();
        let graph = DependencyGraph::build(&outcome.admitted, &excluded)?;
        let order = self.resolver.resolve(&graph)?;

        let container = Container::from_parts(ContainerParts {
            admitted: outcome.admitted,
            exclusions: outcome.excluded,
            graph,
            order,
            environment: self.environment,
            scope_stores: self.scope_stores,
            listeners: self.listeners,
        });
        container.start()?;
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("descriptors", &self.descriptors.len())
            .field("environment", &self.environment)
            .field("scope_stores", &self.scope_stores.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
