//! 属性源实现

use async_trait::async_trait;
use config_abstractions::{PropertyMap, PropertySource};
use infrastructure_common::{ConfigError, ConfigResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 读取配置文件；`optional` 为真时文件缺失返回 `None`
async fn read_file(path: &Path, optional: bool) -> ConfigResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if optional {
                debug!("可选配置文件不存在，跳过: {}", path.display());
                Ok(None)
            } else {
                Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            }
        }
        Err(e) => Err(ConfigError::FileReadError { source: e }),
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// 内存属性源
#[derive(Debug, Clone, Default)]
pub struct MapPropertySource {
    name: String,
    properties: PropertyMap,
    priority: i32,
}

impl MapPropertySource {
    /// 创建新的内存属性源
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: PropertyMap::new(),
            priority: 0,
        }
    }

    /// 设置属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn load(&self) -> ConfigResult<PropertyMap> {
        Ok(self.properties.clone())
    }
}

/// 环境变量属性源
///
/// `APP_DB_URL` 在前缀为 `APP`、分隔符为 `_` 时映射为 `db.url`。
#[derive(Debug, Clone)]
pub struct EnvironmentPropertySource {
    prefix: String,
    separator: String,
    priority: i32,
    /// 指定的变量集合，为空时读取进程环境变量
    vars: Option<Vec<(String, String)>>,
}

impl EnvironmentPropertySource {
    /// 创建新的环境变量属性源
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: "_".to_string(),
            priority: 200, // 环境变量最高优先级
            vars: None,
        }
    }

    /// 使用给定的变量集合代替进程环境变量
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut source = Self::new(prefix);
        source.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        source
    }

    /// 设置分隔符
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 将环境变量键转换为属性键，不匹配前缀时返回 `None`
    fn env_key_to_property_key(&self, env_key: &str) -> Option<String> {
        let rest = env_key.strip_prefix(&self.prefix)?;
        let key = rest.strip_prefix(&self.separator)?;
        if key.is_empty() {
            return None;
        }
        Some(key.replace(&self.separator, ".").to_lowercase())
    }
}

#[async_trait]
impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "EnvironmentPropertySource"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn load(&self) -> ConfigResult<PropertyMap> {
        debug!("加载环境变量，前缀: {}", self.prefix);

        let vars: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };

        let properties: PropertyMap = vars
            .into_iter()
            .filter_map(|(key, value)| {
                self.env_key_to_property_key(&key)
                    .map(|property| (property, value))
            })
            .collect();

        debug!("加载了 {} 个环境变量", properties.len());
        Ok(properties)
    }
}

/// JSON 文件属性源
#[derive(Debug, Clone)]
pub struct JsonPropertySource {
    file_path: PathBuf,
    priority: i32,
    optional: bool,
}

impl JsonPropertySource {
    /// 创建新的 JSON 属性源
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
            priority: 90, // JSON 文件中等优先级
            optional: false,
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 文件缺失时视为空属性源
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn flatten(prefix: &str, value: &Value, out: &mut PropertyMap) {
        match value {
            Value::Object(obj) => {
                for (key, nested) in obj {
                    Self::flatten(&join_key(prefix, key), nested, out);
                }
            }
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().filter_map(Self::scalar).collect();
                out.insert(prefix.to_string(), rendered.join(","));
            }
            Value::Null => {}
            scalar => {
                if let Some(rendered) = Self::scalar(scalar) {
                    out.insert(prefix.to_string(), rendered);
                }
            }
        }
    }

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
impl PropertySource for JsonPropertySource {
    fn name(&self) -> &str {
        "JsonPropertySource"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn load(&self) -> ConfigResult<PropertyMap> {
        debug!("加载 JSON 配置文件: {}", self.file_path.display());

        let Some(content) = read_file(&self.file_path, self.optional).await? else {
            return Ok(PropertyMap::new());
        };

        let value: Value = serde_json::from_str(&content)?;
        if !value.is_object() {
            return Err(ConfigError::TypeConversionError {
                message: format!("JSON 配置文件 {} 的根节点不是对象", self.file_path.display()),
            });
        }

        let mut properties = PropertyMap::new();
        Self::flatten("", &value, &mut properties);

        debug!("JSON 配置文件加载完成，共 {} 个属性", properties.len());
        Ok(properties)
    }
}

/// TOML 文件属性源
#[derive(Debug, Clone)]
pub struct TomlPropertySource {
    file_path: PathBuf,
    priority: i32,
    optional: bool,
}

impl TomlPropertySource {
    /// 创建新的 TOML 属性源
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
            priority: 100, // TOML 文件默认高优先级
            optional: false,
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 文件缺失时视为空属性源
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// 递归展开表为点分隔的键
    fn flatten(prefix: &str, value: &toml::Value, out: &mut PropertyMap) {
        match value {
            toml::Value::Table(table) => {
                for (key, nested) in table {
                    Self::flatten(&join_key(prefix, key), nested, out);
                }
            }
            toml::Value::Array(items) => {
                let rendered: Vec<String> = items.iter().filter_map(Self::scalar).collect();
                out.insert(prefix.to_string(), rendered.join(","));
            }
            scalar => {
                if let Some(rendered) = Self::scalar(scalar) {
                    out.insert(prefix.to_string(), rendered);
                }
            }
        }
    }

    fn scalar(value: &toml::Value) -> Option<String> {
        match value {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            toml::Value::Datetime(dt) => Some(dt.to_string()),
            toml::Value::Array(_) | toml::Value::Table(_) => None,
        }
    }
}

#[async_trait]
impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        "TomlPropertySource"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn load(&self) -> ConfigResult<PropertyMap> {
        debug!("加载 TOML 配置文件: {}", self.file_path.display());

        let Some(content) = read_file(&self.file_path, self.optional).await? else {
            return Ok(PropertyMap::new());
        };

        let table: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })?;

        let mut properties = PropertyMap::new();
        Self::flatten("", &toml::Value::Table(table), &mut properties);

        debug!("TOML 配置文件加载完成，共 {} 个属性", properties.len());
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_map_source() {
        let source = MapPropertySource::new("defaults")
            .with_property("cache.enabled", "true")
            .with_priority(5);
        let properties = source.load().await.unwrap();
        assert_eq!(source.name(), "defaults");
        assert_eq!(source.priority(), 5);
        assert_eq!(properties.get("cache.enabled").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_environment_source_maps_keys() {
        let source = EnvironmentPropertySource::from_vars(
            "APP",
            [
                ("APP_DB_URL", "postgres://localhost"),
                ("APP_PROFILES_ACTIVE", "dev"),
                ("APPLICATION", "ignored"),
                ("OTHER_KEY", "ignored"),
            ],
        );
        let properties = source.load().await.unwrap();

        assert_eq!(properties.len(), 2);
        assert_eq!(
            properties.get("db.url").map(String::as_str),
            Some("postgres://localhost")
        );
        assert_eq!(properties.get("profiles.active").map(String::as_str), Some("dev"));
    }

    #[tokio::test]
    async fn test_toml_source_flattens_tables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[db]
url = "postgres://localhost"
pool = 8

[profiles]
active = ["dev", "local"]

[feature.cache]
enabled = true
"#
        )
        .unwrap();

        let properties = TomlPropertySource::new(file.path()).load().await.unwrap();
        assert_eq!(properties.get("db.url").map(String::as_str), Some("postgres://localhost"));
        assert_eq!(properties.get("db.pool").map(String::as_str), Some("8"));
        assert_eq!(properties.get("profiles.active").map(String::as_str), Some("dev,local"));
        assert_eq!(properties.get("feature.cache.enabled").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_json_source_flattens_objects() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 8080, "tls": false}}, "name": "ads", "unset": null}}"#
        )
        .unwrap();

        let properties = JsonPropertySource::new(file.path()).load().await.unwrap();
        assert_eq!(properties.get("server.port").map(String::as_str), Some("8080"));
        assert_eq!(properties.get("server.tls").map(String::as_str), Some("false"));
        assert_eq!(properties.get("name").map(String::as_str), Some("ads"));
        assert!(!properties.contains_key("unset"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let error = TomlPropertySource::new(&path).load().await.unwrap_err();
        assert!(matches!(error, ConfigError::FileNotFound { .. }));

        let properties = TomlPropertySource::new(&path).optional().load().await.unwrap();
        assert!(properties.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let error = JsonPropertySource::new(file.path()).load().await.unwrap_err();
        assert!(matches!(error, ConfigError::ParseError { .. }));
    }
}
