//! profile 解析约定

use std::collections::BTreeSet;

/// 指定激活 profile 的属性键（逗号分隔）
pub const ACTIVE_PROFILES_PROPERTY: &str = "profiles.active";

/// 未指定任何 profile 时使用的默认 profile
pub const DEFAULT_PROFILE: &str = "default";

/// 解析逗号分隔的 profile 列表，忽略空白项
pub fn parse_profile_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 计算激活的 profile
///
/// 显式指定的 profile 优先；其次是 `profiles.active` 属性；都没有时激活 `default`。
pub fn resolve_active_profiles(
    explicit: &BTreeSet<String>,
    property: Option<&str>,
) -> BTreeSet<String> {
    if !explicit.is_empty() {
        return explicit.clone();
    }

    let from_property = property.map(parse_profile_list).unwrap_or_default();
    if !from_property.is_empty() {
        return from_property;
    }

    BTreeSet::from([DEFAULT_PROFILE.to_string()])
}
