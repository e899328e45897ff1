//! 设备标识
//!
//! 首次运行时生成并持久化，附加到每次远程写入 (`updatedByDeviceId`)。
//! 仅作审计用途，读写失败时退化为 `"unknown"`。

use std::path::Path;

use rand::Rng;

/// 标识不可用时使用的值
pub const UNKNOWN_DEVICE_ID: &str = "unknown";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// 生成新的设备标识: `device-{8 位随机 base36}-{毫秒时间戳 base36}`
pub fn generate_device_id() -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..8)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    format!("device-{}-{}", random, to_base36(millis))
}

/// 读取已有标识，不存在时生成并写入
pub fn load_or_create(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => return content.trim().to_string(),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read device id");
            return UNKNOWN_DEVICE_ID.to_string();
        }
    }

    let id = generate_device_id();
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        tracing::warn!(path = %path.display(), error = %e, "Failed to create device id directory");
        return UNKNOWN_DEVICE_ID.to_string();
    }
    if let Err(e) = std::fs::write(path, &id) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to persist device id");
        return UNKNOWN_DEVICE_ID.to_string();
    }
    tracing::info!(device_id = %id, "Generated new device id");
    id
}
