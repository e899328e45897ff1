//! 宽松字段解码
//!
//! 远程文档可能被其他客户端写入非法值。单个字段出错时读为 `None`，
//! 实体本身保留，之后的合并写入 (例如清空全部) 可以修复该字段。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 非法值读为 `None` 并记录警告
pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value.clone()) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "Ignoring invalid document field");
            Ok(None)
        }
    }
}
