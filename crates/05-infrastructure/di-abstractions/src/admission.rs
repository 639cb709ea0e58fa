//! 准入过滤
//!
//! 根据环境快照对描述符的准入条件求值，得到准入集合和排除报告。

use infrastructure_common::{
    AdmissionPredicate, ComponentDescriptor, ComponentRef, ContainerError, ContainerResult,
    Environment, ProfileMatch, NEGATED_PROFILE_PREFIX,
};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// 被排除的组件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    /// 组件标识
    pub id: String,
    /// 第一个不满足的条件
    pub reason: String,
}

/// 准入结果
#[derive(Debug, Clone, Default)]
pub struct AdmissionOutcome {
    /// 准入的描述符（保持注册顺序）
    pub admitted: Vec<ComponentDescriptor>,
    /// 被排除的组件
    pub excluded: Vec<Exclusion>,
}

impl AdmissionOutcome {
    /// 被排除的组件标识
    pub fn excluded_ids(&self) -> BTreeSet<String> {
        self.excluded.iter().map(|e| e.id.clone()).collect()
    }

    /// 组件是否被排除
    pub fn is_excluded(&self, id: &str) -> bool {
        self.excluded.iter().any(|e| e.id == id)
    }

    /// 组件是否被准入
    pub fn is_admitted(&self, id: &str) -> bool {
        self.admitted.iter().any(|d| d.id == id)
    }
}

/// 准入过滤器 trait
pub trait AdmissionFilter: Send + Sync {
    /// 过滤描述符
    ///
    /// 注册集合中存在重复标识时返回 [`ContainerError::DuplicateRegistration`]。
    fn admit(
        &self,
        descriptors: Vec<ComponentDescriptor>,
        environment: &Environment,
    ) -> ContainerResult<AdmissionOutcome>;
}

/// 默认准入过滤器
///
/// 分两轮求值：第一轮对除 `MissingComponent` 以外的条件求值；
/// 第二轮以第一轮通过的描述符（不含自身）为候选集合求 `MissingComponent`。
#[derive(Debug, Default)]
pub struct DefaultAdmissionFilter;

impl AdmissionFilter for DefaultAdmissionFilter {
    fn admit(
        &self,
        descriptors: Vec<ComponentDescriptor>,
        environment: &Environment,
    ) -> ContainerResult<AdmissionOutcome> {
        check_duplicates(&descriptors)?;

        let first_pass: Vec<Option<String>> = descriptors
            .iter()
            .map(|d| first_failing(d, environment))
            .collect();

        let candidates: Vec<&ComponentDescriptor> = descriptors
            .iter()
            .zip(&first_pass)
            .filter(|(_, failure)| failure.is_none())
            .map(|(d, _)| d)
            .collect();

        let verdicts: Vec<Option<String>> = descriptors
            .iter()
            .zip(&first_pass)
            .map(|(d, failure)| match failure {
                Some(reason) => Some(reason.clone()),
                None => missing_component_failure(d, &candidates),
            })
            .collect();

        let mut outcome = AdmissionOutcome::default();
        for (descriptor, verdict) in descriptors.into_iter().zip(verdicts) {
            match verdict {
                None => {
                    debug!("组件准入: {}", descriptor.id);
                    outcome.admitted.push(descriptor);
                }
                Some(reason) => {
                    debug!("组件被排除: {}, 原因: {}", descriptor.id, reason);
                    outcome.excluded.push(Exclusion {
                        id: descriptor.id,
                        reason,
                    });
                }
            }
        }

        info!(
            "准入过滤完成: 准入 {} 个组件, 排除 {} 个组件",
            outcome.admitted.len(),
            outcome.excluded.len()
        );
        Ok(outcome)
    }
}

fn check_duplicates(descriptors: &[ComponentDescriptor]) -> ContainerResult<()> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if !seen.insert(descriptor.id.as_str()) {
            return Err(ContainerError::DuplicateRegistration {
                id: descriptor.id.clone(),
            });
        }
    }
    Ok(())
}

/// 第一轮：返回第一个不满足的非 `MissingComponent` 条件
fn first_failing(descriptor: &ComponentDescriptor, environment: &Environment) -> Option<String> {
    descriptor
        .predicates
        .iter()
        .filter(|p| !p.is_missing_component())
        .find(|p| !evaluate(p, environment))
        .map(ToString::to_string)
}

/// 第二轮：返回第一个不满足的 `MissingComponent` 条件
fn missing_component_failure(
    descriptor: &ComponentDescriptor,
    candidates: &[&ComponentDescriptor],
) -> Option<String> {
    descriptor
        .predicates
        .iter()
        .find(|p| match p {
            AdmissionPredicate::MissingComponent(reference) => candidates
                .iter()
                .filter(|c| c.id != descriptor.id)
                .any(|c| satisfies(c, reference)),
            _ => false,
        })
        .map(ToString::to_string)
}

fn satisfies(candidate: &ComponentDescriptor, reference: &ComponentRef) -> bool {
    match reference {
        ComponentRef::Id(id) => &candidate.id == id,
        ComponentRef::Type(info) => candidate
            .type_info
            .as_ref()
            .is_some_and(|t| t.id == info.id),
    }
}

/// 对单个与环境相关的条件求值
///
/// `MissingComponent` 依赖候选集合，这里总是返回 `true`。
pub fn evaluate(predicate: &AdmissionPredicate, environment: &Environment) -> bool {
    match predicate {
        AdmissionPredicate::PropertyEquals {
            key,
            expected,
            match_if_absent,
        } => match environment.property(key) {
            Some(value) => value == expected,
            None => *match_if_absent,
        },
        AdmissionPredicate::PropertyPresent { key } => environment.contains_property(key),
        AdmissionPredicate::CapabilityPresent { name } => environment.has_capability(name),
        AdmissionPredicate::MissingComponent(_) => true,
        AdmissionPredicate::ProfileActive { names, mode } => {
            profiles_match(names, *mode, environment)
        }
    }
}

/// profile 条件求值
///
/// 否定项（`!name`）必须全部未激活；肯定项按匹配模式求值；没有肯定项时只看否定项。
pub fn profiles_match(names: &[String], mode: ProfileMatch, environment: &Environment) -> bool {
    let (negated, positive): (Vec<&str>, Vec<&str>) = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .partition(|n| n.starts_with(NEGATED_PROFILE_PREFIX));

    let negated_ok = negated.iter().all(|n| {
        let name = n.trim_start_matches(NEGATED_PROFILE_PREFIX).trim();
        !environment.is_profile_active(name)
    });
    if !negated_ok {
        return false;
    }
    if positive.is_empty() {
        return true;
    }

    match mode {
        ProfileMatch::Any => positive.iter().any(|n| environment.is_profile_active(n)),
        ProfileMatch::All => positive.iter().all(|n| environment.is_profile_active(n)),
    }
}
