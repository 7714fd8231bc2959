// ==========================================
// 高校排课系统 - 配置层
// ==========================================
// 职责: 排课配置管理，显式注入，不依赖环境查找
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod settings;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use settings::{FixedYear, SystemClock, TimetableConfig, YearProvider};
