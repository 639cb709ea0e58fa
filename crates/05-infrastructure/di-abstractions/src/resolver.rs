//! 依赖图与拓扑解析
//!
//! 由准入的描述符构建依赖图，并用三色深度优先搜索计算确定性的构建顺序。

use infrastructure_common::{ComponentDescriptor, ContainerError, ContainerResult};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// 依赖图
///
/// 只包含准入组件之间的边；软依赖指向未准入组件时该边被丢弃。
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// 组件 -> 它依赖的组件
    dependencies: BTreeMap<String, BTreeSet<String>>,
    /// 组件 -> 依赖它的组件
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// 构建依赖图
    ///
    /// 硬依赖不在准入集合中时返回 [`ContainerError::UnresolvedDependency`]，
    /// `excluded` 用于区分被条件排除和从未注册。
    pub fn build(
        admitted: &[ComponentDescriptor],
        excluded: &BTreeSet<String>,
    ) -> ContainerResult<Self> {
        let ids: BTreeSet<&str> = admitted.iter().map(|d| d.id.as_str()).collect();
        let mut graph = Self::default();

        let mut ordered: Vec<&ComponentDescriptor> = admitted.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        for descriptor in ordered {
            graph
                .dependents
                .entry(descriptor.id.clone())
                .or_default();
            let edges = graph
                .dependencies
                .entry(descriptor.id.clone())
                .or_default();

            for dependency in descriptor.dependency_ids() {
                if ids.contains(dependency) {
                    edges.insert(dependency.to_string());
                    continue;
                }
                if descriptor.is_hard_dependency(dependency) {
                    return Err(ContainerError::UnresolvedDependency {
                        component: descriptor.id.clone(),
                        dependency: dependency.to_string(),
                        excluded: excluded.contains(dependency),
                    });
                }
                debug!(
                    "丢弃软依赖: {} -> {} (未准入)",
                    descriptor.id, dependency
                );
            }
        }

        for (id, edges) in &graph.dependencies {
            for dependency in edges {
                graph
                    .dependents
                    .entry(dependency.clone())
                    .or_default()
                    .insert(id.clone());
            }
        }

        Ok(graph)
    }

    /// 组件的直接依赖（升序）
    pub fn dependencies_of(&self, id: &str) -> impl Iterator<Item = &str> {
        self.dependencies
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// 直接依赖该组件的组件（升序）
    pub fn dependents_of(&self, id: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// 所有节点（升序）
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// 是否包含节点
    pub fn contains(&self, id: &str) -> bool {
        self.dependencies.contains_key(id)
    }
}

/// 解析后的构建顺序
///
/// 每个依赖都排在依赖它的组件之前；容器生命周期内只计算一次。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOrder {
    ids: Vec<String>,
}

impl ResolvedOrder {
    /// 按顺序的组件标识
    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    /// 正向迭代
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// 组件在顺序中的位置
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|i| i == id)
    }

    /// 组件数量
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<ResolvedOrder> for Vec<String> {
    fn from(order: ResolvedOrder) -> Self {
        order.ids
    }
}

/// 依赖解析器 trait
pub trait DependencyResolver: Send + Sync {
    /// 计算构建顺序，存在循环时返回 [`ContainerError::CycleDetected`]
    fn resolve(&self, graph: &DependencyGraph) -> ContainerResult<ResolvedOrder>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// 拓扑解析器
///
/// 根节点和邻居都按标识升序遍历，因此结果与注册顺序无关。
#[derive(Debug, Default)]
pub struct TopologicalResolver;

impl DependencyResolver for TopologicalResolver {
    fn resolve(&self, graph: &DependencyGraph) -> ContainerResult<ResolvedOrder> {
        let mut marks: BTreeMap<&str, Mark> = graph.nodes().map(|id| (id, Mark::White)).collect();
        let mut path: Vec<&str> = Vec::new();
        let mut order: Vec<String> = Vec::with_capacity(graph.len());

        for root in graph.nodes() {
            if marks.get(root) == Some(&Mark::White) {
                self.visit(root, graph, &mut marks, &mut path, &mut order)?;
            }
        }

        info!("依赖解析完成: {} 个组件", order.len());
        debug!("构建顺序: {:?}", order);
        Ok(ResolvedOrder { ids: order })
    }
}

impl TopologicalResolver {
    fn visit<'g>(
        &self,
        current: &'g str,
        graph: &'g DependencyGraph,
        marks: &mut BTreeMap<&'g str, Mark>,
        path: &mut Vec<&'g str>,
        order: &mut Vec<String>,
    ) -> ContainerResult<()> {
        match marks.get(current).copied().unwrap_or(Mark::White) {
            Mark::Black => return Ok(()),
            Mark::Gray => {
                // 回到灰色节点：从它第一次出现的位置到当前节点即为环
                let start = path.iter().position(|id| *id == current).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(current.to_string());
                return Err(ContainerError::CycleDetected { path: cycle });
            }
            Mark::White => {}
        }

        marks.insert(current, Mark::Gray);
        path.push(current);

        for dependency in graph.dependencies_of(current) {
            self.visit(dependency, graph, marks, path, order)?;
        }

        path.pop();
        marks.insert(current, Mark::Black);
        order.push(current.to_string());
        Ok(())
    }
}

/// 解析上下文
///
/// 记录当前线程正在构建的组件链，用于在运行时检测重入。
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链
    resolution_chain: Vec<String>,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加组件到解析链
    pub fn push(&mut self, id: &str) -> ContainerResult<()> {
        if let Some(start) = self.resolution_chain.iter().position(|i| i == id) {
            let mut path = self.resolution_chain[start..].to_vec();
            path.push(id.to_string());
            return Err(ContainerError::CycleDetected { path });
        }
        self.resolution_chain.push(id.to_string());
        Ok(())
    }

    /// 从解析链中移除组件
    pub fn pop(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    /// 当前解析链
    pub fn chain(&self) -> &[String] {
        &self.resolution_chain
    }
}
