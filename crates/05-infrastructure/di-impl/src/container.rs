//! 作用域感知的实例化引擎

use crate::builder::ContainerBuilder;
use crate::cache::{LookupTable, WorkerCache};
use crate::events::{ContainerEvent, SharedListener};
use crate::flight::{Acquire, SingletonSlot};
use crate::provider::Provider;
use crate::stats::{ContainerStats, StatsCounters};
use crate::teardown::TeardownCoordinator;
use chrono::Utc;
use di_abstractions::{
    downcast_instance, ComponentLookup, DependencyGraph, Exclusion, ResolveContext,
    ResolvedOrder, ScopeStore,
};
use infrastructure_common::{
    ComponentDescriptor, ConstructionPhase, ContainerError, ContainerResult, Environment,
    Instance, LifecycleState, ResolvedDependencies, Scope,
};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 构建容器所需的全部数据（由 [`ContainerBuilder`] 组装）
pub(crate) struct ContainerParts {
    pub(crate) admitted: Vec<ComponentDescriptor>,
    pub(crate) exclusions: Vec<Exclusion>,
    pub(crate) graph: DependencyGraph,
    pub(crate) order: ResolvedOrder,
    pub(crate) environment: Environment,
    pub(crate) scope_stores: HashMap<Scope, Arc<dyn ScopeStore>>,
    pub(crate) listeners: Vec<SharedListener>,
}

struct ContainerInner {
    id: Uuid,
    started_at: Instant,
    descriptors: HashMap<String, ComponentDescriptor>,
    order: ResolvedOrder,
    graph: DependencyGraph,
    exclusions: Vec<Exclusion>,
    excluded_ids: BTreeSet<String>,
    environment: Environment,
    state: AtomicU8,
    slots: HashMap<String, Arc<SingletonSlot>>,
    cache: RwLock<Option<LookupTable>>,
    scope_stores: HashMap<Scope, Arc<dyn ScopeStore>>,
    listeners: Vec<SharedListener>,
    stats: StatsCounters,
    teardown: TeardownCoordinator,
}

/// 组件容器
///
/// 持有准入的描述符和解析后的构建顺序，按作用域约定创建实例并提供查找。
/// 克隆开销很小，所有克隆共享同一个容器。
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// 创建容器构建器
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(parts: ContainerParts) -> Self {
        let excluded_ids = parts.exclusions.iter().map(|e| e.id.clone()).collect();
        let slots = parts
            .admitted
            .iter()
            .filter(|d| d.scope == Scope::Singleton)
            .map(|d| (d.id.clone(), Arc::new(SingletonSlot::new(d.id.clone()))))
            .collect();
        let cache = LookupTable::with_expected(parts.admitted.len());
        let descriptors = parts
            .admitted
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();

        Self {
            inner: Arc::new(ContainerInner {
                id: Uuid::new_v4(),
                started_at: Instant::now(),
                descriptors,
                order: parts.order,
                graph: parts.graph,
                exclusions: parts.exclusions,
                excluded_ids,
                environment: parts.environment,
                state: AtomicU8::new(LifecycleState::Running as u8),
                slots,
                cache: RwLock::new(Some(cache)),
                scope_stores: parts.scope_stores,
                listeners: parts.listeners,
                stats: StatsCounters::default(),
                teardown: TeardownCoordinator,
            }),
        }
    }

    /// 按构建顺序创建所有非延迟单例
    ///
    /// 任何一个失败都会关闭容器（已构建的单例执行销毁钩子）并返回该错误，
    /// 此时不会向监听器发送任何事件。
    pub(crate) fn start(&self) -> ContainerResult<usize> {
        let mut eager = 0;
        for id in self.inner.order.iter() {
            let Some(descriptor) = self.inner.descriptors.get(id) else {
                continue;
            };
            if descriptor.scope != Scope::Singleton || descriptor.lazy {
                continue;
            }
            if let Err(e) = self.get(id) {
                error!("容器启动失败，组件 {} 构建失败: {}", id, e);
                if let Err(teardown) = self.shutdown(false) {
                    warn!("启动失败后的清理出现错误: {}", teardown);
                }
                return Err(e);
            }
            eager += 1;
        }

        info!(
            "容器启动完成: {} 个组件, {} 个单例已预先创建",
            self.inner.descriptors.len(),
            eager
        );
        self.emit(ContainerEvent::Started {
            container_id: self.inner.id,
            component_count: self.inner.descriptors.len(),
            eager_singletons: eager,
            timestamp: Utc::now(),
        });
        Ok(eager)
    }

    /// 容器实例标识
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// 当前生命周期状态
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// 是否仍在运行
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// 是否已开始关闭
    pub fn is_closed(&self) -> bool {
        !self.is_running()
    }

    fn ensure_running(&self) -> ContainerResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ContainerError::ContainerClosed)
        }
    }

    /// 获取组件实例
    pub fn get(&self, id: &str) -> ContainerResult<Instance> {
        self.resolve(id, &mut ResolveContext::new())
    }

    /// 获取组件实例，组件不存在或容器已关闭时返回 `None`
    pub fn try_get(&self, id: &str) -> ContainerResult<Option<Instance>> {
        match self.get(id) {
            Ok(instance) => Ok(Some(instance)),
            Err(e) if e.is_recoverable() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 同 [`Container::try_get`]
    pub fn get_optional(&self, id: &str) -> ContainerResult<Option<Instance>> {
        self.try_get(id)
    }

    /// 获取组件实例并转换为具体类型
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> ContainerResult<Arc<T>> {
        downcast_instance(id, self.get(id)?)
    }

    /// 获取组件实例并转换为具体类型，组件不存在或容器已关闭时返回 `None`
    pub fn try_get_as<T: Any + Send + Sync>(&self, id: &str) -> ContainerResult<Option<Arc<T>>> {
        self.try_get(id)?
            .map(|instance| downcast_instance(id, instance))
            .transpose()
    }

    /// 获取带有指定标签的所有组件（按构建顺序）
    pub fn get_all(&self, tag: &str) -> ContainerResult<Vec<Instance>> {
        self.ensure_running()?;
        self.collect(|d| d.has_tag(tag))
    }

    /// 获取产出类型为 `T` 的所有组件（按构建顺序）
    pub fn get_all_of<T: Any + Send + Sync>(&self) -> ContainerResult<Vec<Arc<T>>> {
        self.ensure_running()?;
        let ids: Vec<&str> = self
            .inner
            .order
            .iter()
            .filter(|id| {
                self.inner
                    .descriptors
                    .get(*id)
                    .is_some_and(ComponentDescriptor::produces::<T>)
            })
            .collect();
        ids.into_iter()
            .map(|id| self.get_as::<T>(id))
            .collect()
    }

    /// 获取产出类型为 `T` 的组件
    ///
    /// 多个组件产出同一类型时取构建顺序中的第一个；没有准入组件产出该类型时返回
    /// [`ContainerError::NotFound`]。
    pub fn get_of<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        self.ensure_running()?;
        let id = self
            .first_of::<T>()
            .ok_or_else(|| ContainerError::NotFound {
                id: std::any::type_name::<T>().to_string(),
            })?;
        self.get_as::<T>(id)
    }

    /// 获取产出类型为 `T` 的组件，不存在或容器已关闭时返回 `None`
    pub fn try_get_of<T: Any + Send + Sync>(&self) -> ContainerResult<Option<Arc<T>>> {
        match self.get_of::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(e) if e.is_recoverable() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 是否有准入组件产出类型 `T`（关闭后仍可查询）
    pub fn contains_type<T: Any + Send + Sync>(&self) -> bool {
        self.first_of::<T>().is_some()
    }

    /// 获取产出类型为 `T` 的组件的延迟查找句柄
    pub fn get_provider_of<T: Any + Send + Sync>(&self) -> ContainerResult<Provider> {
        self.ensure_running()?;
        let id = self
            .first_of::<T>()
            .ok_or_else(|| ContainerError::NotFound {
                id: std::any::type_name::<T>().to_string(),
            })?;
        self.get_provider(id)
    }

    fn first_of<T: 'static>(&self) -> Option<&str> {
        self.inner.order.iter().find(|id| {
            self.inner
                .descriptors
                .get(*id)
                .is_some_and(ComponentDescriptor::produces::<T>)
        })
    }

    fn collect(&self, matches: impl Fn(&ComponentDescriptor) -> bool) -> ContainerResult<Vec<Instance>> {
        self.inner
            .order
            .iter()
            .filter(|id| self.inner.descriptors.get(*id).is_some_and(&matches))
            .map(|id| self.get(id))
            .collect()
    }

    /// 获取延迟查找句柄
    pub fn get_provider(&self, id: &str) -> ContainerResult<Provider> {
        self.ensure_running()?;
        if !self.contains(id) {
            return Err(ContainerError::NotFound { id: id.to_string() });
        }
        Ok(Provider::new(id, Arc::new(self.clone())))
    }

    /// 组件是否被准入（关闭后仍可查询）
    pub fn contains(&self, id: &str) -> bool {
        self.inner.descriptors.contains_key(id)
    }

    /// 准入组件的描述符
    pub fn descriptor(&self, id: &str) -> Option<&ComponentDescriptor> {
        self.inner.descriptors.get(id)
    }

    /// 被排除的组件标识
    pub fn excluded_ids(&self) -> &BTreeSet<String> {
        &self.inner.excluded_ids
    }

    /// 组件是否被准入条件排除
    pub fn was_excluded(&self, id: &str) -> bool {
        self.inner.excluded_ids.contains(id)
    }

    /// 排除详情（含原因）
    pub fn exclusions(&self) -> &[Exclusion] {
        &self.inner.exclusions
    }

    /// 激活的 profile
    pub fn active_profiles(&self) -> &BTreeSet<String> {
        self.inner.environment.active_profiles()
    }

    /// profile 是否激活
    pub fn is_profile_active(&self, profile: &str) -> bool {
        self.inner.environment.is_profile_active(profile)
    }

    /// 环境快照
    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    /// 构建顺序
    pub fn resolved_order(&self) -> &[String] {
        self.inner.order.as_slice()
    }

    /// 依赖图
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.inner.graph
    }

    /// 统计信息
    pub fn stats(&self) -> ContainerStats {
        self.inner
            .stats
            .snapshot(self.inner.descriptors.len(), self.inner.exclusions.len())
    }

    /// 创建带本地缓存的工作句柄
    pub fn worker(&self) -> Worker {
        Worker {
            container: self.clone(),
            cache: WorkerCache::new(),
        }
    }

    /// 关闭容器
    ///
    /// 第一次调用按构建顺序的逆序执行已构建单例的销毁钩子，并汇总所有失败；
    /// 之后的调用不做任何事。
    pub fn close(&self) -> ContainerResult<()> {
        self.shutdown(true)
    }

    /// 执行关闭流程，`notify` 为 `false` 时不通知监听器（启动失败时容器从未对外可见）
    fn shutdown(&self, notify: bool) -> ContainerResult<()> {
        let inner = &self.inner;
        if inner
            .state
            .compare_exchange(
                LifecycleState::Running as u8,
                LifecycleState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            debug!("容器已关闭，忽略重复的关闭请求");
            return Ok(());
        }

        info!("开始关闭容器: {}", inner.id);
        let report = inner.teardown.run(inner.order.iter(), &inner.descriptors, |id| {
            inner.slots.get(id).and_then(|slot| slot.take())
        });

        *inner.cache.write() = None;
        inner
            .state
            .store(LifecycleState::Closed as u8, Ordering::Release);

        info!(
            "容器关闭完成: 销毁 {} 个单例, {} 个销毁钩子失败",
            report.destroyed.len(),
            report.failures.len()
        );
        if notify {
            self.emit(ContainerEvent::Closed {
                container_id: inner.id,
                uptime: inner.started_at.elapsed(),
                destroyed_count: report.destroyed.len(),
                failed_hooks: report.failures.len(),
                timestamp: Utc::now(),
            });
        }

        if report.is_clean() {
            Ok(())
        } else {
            Err(ContainerError::Teardown {
                failures: report.failures,
            })
        }
    }

    fn emit(&self, event: ContainerEvent) {
        for listener in &self.inner.listeners {
            listener.on_event(&event);
        }
    }

    fn is_singleton(&self, id: &str) -> bool {
        self.inner.slots.contains_key(id)
    }

    fn resolve(&self, id: &str, context: &mut ResolveContext) -> ContainerResult<Instance> {
        self.ensure_running()?;
        let descriptor = self
            .inner
            .descriptors
            .get(id)
            .ok_or_else(|| ContainerError::NotFound { id: id.to_string() })?;

        context.push(id)?;
        let result = match descriptor.scope {
            Scope::Singleton => self.singleton(descriptor, context),
            Scope::Prototype => self.construct(descriptor, context).map(|instance| {
                StatsCounters::bump(&self.inner.stats.prototypes);
                instance
            }),
            Scope::Request | Scope::Session => self.scoped(descriptor, context),
        };
        context.pop();
        result
    }

    fn cached(&self, id: &str) -> Option<Instance> {
        let cache = self.inner.cache.read();
        let found = cache.as_ref()?.get(id);
        let counter = if found.is_some() {
            &self.inner.stats.cache_hits
        } else {
            &self.inner.stats.cache_misses
        };
        StatsCounters::bump(counter);
        found
    }

    fn singleton(
        &self,
        descriptor: &ComponentDescriptor,
        context: &mut ResolveContext,
    ) -> ContainerResult<Instance> {
        let id = descriptor.id.as_str();
        if let Some(instance) = self.cached(id) {
            return Ok(instance);
        }

        let slot = self
            .inner
            .slots
            .get(id)
            .ok_or_else(|| ContainerError::NotFound { id: id.to_string() })?;

        match slot.acquire() {
            Acquire::Ready(instance) => Ok(instance),
            Acquire::Joined(outcome) => outcome,
            Acquire::Build(guard) => {
                let outcome = self.construct(descriptor, context);
                let mut published = false;
                let result = guard.finish(outcome, |instance| {
                    if !self.is_running() {
                        warn!("组件 {} 在容器关闭后才构建完成，不发布也不销毁", id);
                        return false;
                    }
                    if let Some(table) = self.inner.cache.read().as_ref() {
                        table.publish(id, instance.clone());
                    }
                    published = true;
                    true
                });
                if published {
                    StatsCounters::bump(&self.inner.stats.singletons);
                }
                result
            }
        }
    }

    fn scoped(
        &self,
        descriptor: &ComponentDescriptor,
        context: &mut ResolveContext,
    ) -> ContainerResult<Instance> {
        let id = descriptor.id.as_str();
        let store = self
            .inner
            .scope_stores
            .get(&descriptor.scope)
            .filter(|store| store.is_active())
            .ok_or_else(|| ContainerError::ScopeNotActive {
                id: id.to_string(),
                scope: descriptor.scope,
            })?;

        if let Some(instance) = store.get(id) {
            return Ok(instance);
        }

        let instance = self.construct(descriptor, context)?;
        StatsCounters::bump(&self.inner.stats.scoped);
        Ok(store.insert(id, instance))
    }

    /// 构建实例：依赖、工厂、初始化钩子
    fn construct(
        &self,
        descriptor: &ComponentDescriptor,
        context: &mut ResolveContext,
    ) -> ContainerResult<Instance> {
        let id = descriptor.id.as_str();

        // 显式依赖只要求单例先行构建
        for dependency in &descriptor.explicit_dependencies {
            if self.is_singleton(dependency) {
                self.resolve(dependency, context)?;
            }
        }

        let mut instances = BTreeMap::new();
        for dependency in &descriptor.implicit_dependencies {
            if !self.contains(&dependency.id) {
                continue;
            }
            let instance = self.resolve(&dependency.id, context)?;
            instances.insert(dependency.id.clone(), instance);
        }

        let dependencies = ResolvedDependencies::new(id, instances);
        let instance = (descriptor.factory)(&dependencies).map_err(|e| {
            StatsCounters::bump(&self.inner.stats.failures);
            ContainerError::construction(id, ConstructionPhase::Factory, e)
        })?;

        for hook in &descriptor.init_hooks {
            hook.invoke(&instance).map_err(|e| {
                StatsCounters::bump(&self.inner.stats.failures);
                ContainerError::construction(
                    id,
                    ConstructionPhase::InitHook {
                        name: hook.name.clone(),
                    },
                    e,
                )
            })?;
            debug!("初始化钩子执行完成: {} ({})", id, hook.name);
        }

        debug!("组件构建完成: {} ({})", id, descriptor.scope);
        Ok(instance)
    }
}

impl ComponentLookup for Container {
    fn get(&self, id: &str) -> ContainerResult<Instance> {
        Container::get(self, id)
    }

    fn try_get(&self, id: &str) -> ContainerResult<Option<Instance>> {
        Container::try_get(self, id)
    }

    fn get_all(&self, tag: &str) -> ContainerResult<Vec<Instance>> {
        Container::get_all(self, tag)
    }

    fn contains(&self, id: &str) -> bool {
        Container::contains(self, id)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("components", &self.inner.descriptors.len())
            .field("order", &self.inner.order)
            .field("excluded", &self.inner.excluded_ids)
            .finish()
    }
}

/// 工作句柄
///
/// 每个工作线程持有一个，单例查找先检查本地的 8 槽缓存。
pub struct Worker {
    container: Container,
    cache: WorkerCache,
}

impl Worker {
    /// 获取组件实例
    pub fn get(&mut self, id: &str) -> ContainerResult<Instance> {
        if !self.container.is_running() {
            self.cache.clear();
            return Err(ContainerError::ContainerClosed);
        }
        if let Some(instance) = self.cache.get(id) {
            return Ok(instance);
        }

        let instance = self.container.get(id)?;
        if self.container.is_singleton(id) {
            self.cache.put(id, instance.clone());
        }
        Ok(instance)
    }

    /// 获取组件实例，组件不存在或容器已关闭时返回 `None`
    pub fn try_get(&mut self, id: &str) -> ContainerResult<Option<Instance>> {
        match self.get(id) {
            Ok(instance) => Ok(Some(instance)),
            Err(e) if e.is_recoverable() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 获取组件实例并转换为具体类型
    pub fn get_as<T: Any + Send + Sync>(&mut self, id: &str) -> ContainerResult<Arc<T>> {
        downcast_instance(id, self.get(id)?)
    }

    /// 本地缓存
    pub fn cache(&self) -> &WorkerCache {
        &self.cache
    }

    /// 所属容器
    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("container", &self.container.id())
            .field("cache", &self.cache)
            .finish()
    }
}
