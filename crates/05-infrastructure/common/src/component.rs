//! 组件描述符定义
//!
//! 描述符是容器认识组件的全部信息：标识、作用域、依赖、生命周期钩子和准入条件。

use crate::conditions::AdmissionPredicate;
use crate::lifecycle::{LifecycleHook, Scope};
use crate::metadata::TypeInfo;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 组件实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 组件工厂函数类型
pub type FactoryFn =
    Arc<dyn Fn(&ResolvedDependencies) -> anyhow::Result<Instance> + Send + Sync>;

/// 工厂装饰器
///
/// 在注册之前包装描述符的工厂，容器不感知装饰了多少层。
pub trait FactoryDecorator: Send + Sync {
    /// 装饰器名称
    fn name(&self) -> &str;

    /// 包装工厂
    fn decorate(&self, component_id: &str, factory: FactoryFn) -> FactoryFn;
}

/// 依赖类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// 硬依赖，缺失时构建失败
    Required,
    /// 软依赖，未被准入时直接忽略
    Optional,
}

/// 工厂入参依赖
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// 依赖组件标识
    pub id: String,
    /// 依赖类型
    pub kind: DependencyKind,
}

impl Dependency {
    /// 硬依赖
    pub fn required(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: DependencyKind::Required,
        }
    }

    /// 软依赖
    pub fn optional(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: DependencyKind::Optional,
        }
    }

    /// 是否为硬依赖
    pub fn is_required(&self) -> bool {
        self.kind == DependencyKind::Required
    }
}

/// 已解析的依赖实例
///
/// 工厂通过它按标识取得依赖，未被准入的软依赖不会出现在这里。
#[derive(Clone, Default)]
pub struct ResolvedDependencies {
    component: String,
    instances: BTreeMap<String, Instance>,
}

impl ResolvedDependencies {
    /// 创建依赖集合
    pub fn new(component: impl Into<String>, instances: BTreeMap<String, Instance>) -> Self {
        Self {
            component: component.into(),
            instances,
        }
    }

    /// 正在构建的组件标识
    pub fn component(&self) -> &str {
        &self.component
    }

    /// 获取原始依赖实例
    pub fn get(&self, id: &str) -> Option<&Instance> {
        self.instances.get(id)
    }

    /// 获取必需的依赖并转换为具体类型
    pub fn require<T: Any + Send + Sync>(&self, id: &str) -> anyhow::Result<Arc<T>> {
        self.optional(id)?.ok_or_else(|| {
            anyhow::anyhow!("组件 {} 缺少依赖 {}", self.component, id)
        })
    }

    /// 获取可选依赖并转换为具体类型
    pub fn optional<T: Any + Send + Sync>(&self, id: &str) -> anyhow::Result<Option<Arc<T>>> {
        match self.instances.get(id) {
            Some(instance) => instance.clone().downcast::<T>().map(Some).map_err(|_| {
                anyhow::anyhow!(
                    "组件 {} 的依赖 {} 不是 {} 类型",
                    self.component,
                    id,
                    std::any::type_name::<T>()
                )
            }),
            None => Ok(None),
        }
    }

    /// 依赖标识列表
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    /// 依赖数量
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// 是否没有依赖
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl fmt::Debug for ResolvedDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedDependencies")
            .field("component", &self.component)
            .field("ids", &self.instances.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 组件描述符
#[derive(Clone)]
pub struct ComponentDescriptor {
    /// 组件标识（在注册集合中唯一）
    pub id: String,
    /// 组件作用域
    pub scope: Scope,
    /// 是否延迟创建（仅对单例有意义）
    pub lazy: bool,
    /// 显式依赖：必须先于本组件构建，与工厂签名无关
    pub explicit_dependencies: Vec<String>,
    /// 隐式依赖：工厂入参
    pub implicit_dependencies: Vec<Dependency>,
    /// 组件工厂
    pub factory: FactoryFn,
    /// 初始化钩子
    pub init_hooks: Vec<LifecycleHook>,
    /// 销毁钩子
    pub teardown_hooks: Vec<LifecycleHook>,
    /// 准入条件
    pub predicates: Vec<AdmissionPredicate>,
    /// 产出实例的类型信息
    pub type_info: Option<TypeInfo>,
    /// 组件标签
    pub tags: Vec<String>,
}

impl ComponentDescriptor {
    /// 使用原始工厂创建描述符
    pub fn new<F>(id: impl Into<String>, scope: Scope, factory: F) -> Self
    where
        F: Fn(&ResolvedDependencies) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            scope,
            lazy: false,
            explicit_dependencies: Vec::new(),
            implicit_dependencies: Vec::new(),
            factory: Arc::new(factory),
            init_hooks: Vec::new(),
            teardown_hooks: Vec::new(),
            predicates: Vec::new(),
            type_info: None,
            tags: Vec::new(),
        }
    }

    /// 使用类型化工厂创建描述符，并记录产出类型
    pub fn typed<T, F>(id: impl Into<String>, scope: Scope, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ResolvedDependencies) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let mut descriptor = Self::new(id, scope, move |deps: &ResolvedDependencies| {
            factory(deps).map(|value| Arc::new(value) as Instance)
        });
        descriptor.type_info = Some(TypeInfo::of::<T>());
        descriptor
    }

    /// 单例组件
    pub fn singleton<T, F>(id: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ResolvedDependencies) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::typed(id, Scope::Singleton, factory)
    }

    /// 原型组件
    pub fn prototype<T, F>(id: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ResolvedDependencies) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::typed(id, Scope::Prototype, factory)
    }

    /// 添加显式依赖（保持顺序，重复添加会被忽略）
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.explicit_dependencies.contains(&id) {
            self.explicit_dependencies.push(id);
        }
        self
    }

    /// 添加工厂所需的硬依赖
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.push_implicit(Dependency::required(id));
        self
    }

    /// 添加工厂所需的软依赖
    pub fn with_optional_dependency(mut self, id: impl Into<String>) -> Self {
        self.push_implicit(Dependency::optional(id));
        self
    }

    fn push_implicit(&mut self, dependency: Dependency) {
        if let Some(existing) = self
            .implicit_dependencies
            .iter_mut()
            .find(|d| d.id == dependency.id)
        {
            // 同一依赖同时声明为硬依赖和软依赖时按硬依赖处理
            if dependency.is_required() {
                existing.kind = DependencyKind::Required;
            }
            return;
        }
        self.implicit_dependencies.push(dependency);
    }

    /// 标记为延迟创建
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// 添加初始化钩子
    pub fn with_init_hook(mut self, hook: LifecycleHook) -> Self {
        self.init_hooks.push(hook);
        self
    }

    /// 添加类型化初始化钩子
    pub fn on_init<T, F>(self, callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = format!("{}::init[{}]", self.id, self.init_hooks.len());
        self.with_init_hook(LifecycleHook::typed::<T, _>(name, callback))
    }

    /// 添加销毁钩子
    pub fn with_teardown_hook(mut self, hook: LifecycleHook) -> Self {
        self.teardown_hooks.push(hook);
        self
    }

    /// 添加类型化销毁钩子
    pub fn on_teardown<T, F>(self, callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = format!("{}::teardown[{}]", self.id, self.teardown_hooks.len());
        self.with_teardown_hook(LifecycleHook::typed::<T, _>(name, callback))
    }

    /// 添加准入条件
    pub fn when(mut self, predicate: AdmissionPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// 添加标签
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// 记录产出类型
    pub fn with_type_info(mut self, type_info: TypeInfo) -> Self {
        self.type_info = Some(type_info);
        self
    }

    /// 使用装饰器包装工厂
    pub fn decorate(mut self, decorator: &dyn FactoryDecorator) -> Self {
        self.factory = decorator.decorate(&self.id, self.factory);
        self
    }

    /// 所有依赖标识：先显式依赖，后隐式依赖，去重
    pub fn dependency_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(
            self.explicit_dependencies.len() + self.implicit_dependencies.len(),
        );
        let implicit = self.implicit_dependencies.iter().map(|d| d.id.as_str());
        for id in self
            .explicit_dependencies
            .iter()
            .map(String::as_str)
            .chain(implicit)
        {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// 指定依赖是否为硬依赖
    ///
    /// 显式依赖总是硬依赖；隐式依赖取决于声明。
    pub fn is_hard_dependency(&self, id: &str) -> bool {
        self.explicit_dependencies.iter().any(|d| d == id)
            || self
                .implicit_dependencies
                .iter()
                .any(|d| d.id == id && d.is_required())
    }

    /// 是否带有指定标签
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// 产出类型是否为 `T`
    pub fn produces<T: 'static>(&self) -> bool {
        self.type_info.as_ref().is_some_and(TypeInfo::is::<T>)
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("explicit_dependencies", &self.explicit_dependencies)
            .field("implicit_dependencies", &self.implicit_dependencies)
            .field("init_hooks", &self.init_hooks)
            .field("teardown_hooks", &self.teardown_hooks)
            .field("predicates", &self.predicates)
            .field("type_info", &self.type_info)
            .field("tags", &self.tags)
            .field("factory", &"<function>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Repository;

    #[test]
    fn test_dependency_ids_are_deduplicated_in_declaration_order() {
        let descriptor = ComponentDescriptor::singleton("service", |_| Ok(Repository))
            .depends_on("config")
            .depends_on("config")
            .with_dependency("repository")
            .with_optional_dependency("config")
            .with_optional_dependency("metrics");

        assert_eq!(descriptor.explicit_dependencies, vec!["config"]);
        assert_eq!(
            descriptor.dependency_ids(),
            vec!["config", "repository", "metrics"]
        );
        assert!(descriptor.is_hard_dependency("config"));
        assert!(descriptor.is_hard_dependency("repository"));
        assert!(!descriptor.is_hard_dependency("metrics"));
    }

    #[test]
    fn test_optional_upgraded_to_required() {
        let descriptor = ComponentDescriptor::singleton("service", |_| Ok(Repository))
            .with_optional_dependency("cache")
            .with_dependency("cache");

        assert_eq!(descriptor.implicit_dependencies.len(), 1);
        assert!(descriptor.is_hard_dependency("cache"));
    }

    #[test]
    fn test_typed_descriptor_records_type() {
        let descriptor = ComponentDescriptor::prototype("repo", |_| Ok(Repository));
        assert!(descriptor.produces::<Repository>());
        assert!(!descriptor.produces::<String>());
        assert_eq!(descriptor.scope, Scope::Prototype);
    }

    #[test]
    fn test_resolved_dependencies_downcast() {
        let mut instances = BTreeMap::new();
        instances.insert("name".to_string(), Arc::new("db".to_string()) as Instance);
        let deps = ResolvedDependencies::new("service", instances);

        let name = deps.require::<String>("name").unwrap();
        assert_eq!(name.as_str(), "db");
        assert!(deps.require::<u32>("name").is_err());
        assert!(deps.require::<String>("missing").is_err());
        assert!(deps.optional::<String>("missing").unwrap().is_none());
    }

    struct Counting;

    impl FactoryDecorator for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn decorate(&self, _component_id: &str, factory: FactoryFn) -> FactoryFn {
            Arc::new(move |deps: &ResolvedDependencies| {
                let instance = factory(deps)?;
                let value = instance
                    .downcast_ref::<u32>()
                    .copied()
                    .unwrap_or_default();
                Ok(Arc::new(value + 1) as Instance)
            })
        }
    }

    #[test]
    fn test_decorate_wraps_factory() {
        let descriptor = ComponentDescriptor::singleton("n", |_| Ok(1_u32))
            .decorate(&Counting)
            .decorate(&Counting);
        let instance = (descriptor.factory)(&ResolvedDependencies::default()).unwrap();
        assert_eq!(instance.downcast_ref::<u32>(), Some(&3));
    }
}
