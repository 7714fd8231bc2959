// ==========================================
// 高校排课系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value, scope_id='global')
// ==========================================

use crate::config::settings::TimetableConfig;
use crate::db::configure_sqlite_connection;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 配置键定义
pub mod config_keys {
    pub const MAX_GROUP_TREE_HEIGHT: &str = "timetable/max_group_tree_height";
    pub const WORK_DAYS: &str = "timetable/work_days";
    pub const MAX_LESSONS_PER_DAY: &str = "timetable/max_lessons_per_day";
    pub const START_YEAR: &str = "timetable/start_year";
    pub const SLOT_AWARE_RECORDING_CHECK: &str = "timetable/slot_aware_recording_check";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&guard)?;
            guard.execute_batch(
                "CREATE TABLE IF NOT EXISTS config_kv (
                   scope_id TEXT NOT NULL DEFAULT 'global',
                   key      TEXT NOT NULL,
                   value    TEXT NOT NULL,
                   PRIMARY KEY (scope_id, key)
                 );",
            )?;
        }
        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    fn get_config_value(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 的配置值（Upsert）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// 解析单个配置值；解析失败时告警并回退默认值
    fn parse_or_default<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get_config_value(key)? {
            Some(raw) => match raw.parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key = key, raw = %raw, "配置值解析失败，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 加载完整排课配置
    ///
    /// # 返回
    /// - 以默认值为基础，叠加 config_kv 中的覆写项
    pub fn load_timetable_config(&self) -> Result<TimetableConfig> {
        let defaults = TimetableConfig::default();

        let work_days = match self.get_config_value(config_keys::WORK_DAYS)? {
            // 工作日集合以 JSON 数组存储，例如 [0,1,2,3,4,5]
            Some(raw) => serde_json::from_str::<Vec<u8>>(&raw)
                .with_context(|| format!("工作日配置格式错误: {}", raw))?,
            None => defaults.work_days.clone(),
        };

        Ok(TimetableConfig {
            max_group_tree_height: self.parse_or_default(
                config_keys::MAX_GROUP_TREE_HEIGHT,
                defaults.max_group_tree_height,
            )?,
            work_days,
            max_lessons_per_day: self.parse_or_default(
                config_keys::MAX_LESSONS_PER_DAY,
                defaults.max_lessons_per_day,
            )?,
            start_year: self.parse_or_default(config_keys::START_YEAR, defaults.start_year)?,
            slot_aware_recording_check: self.parse_or_default(
                config_keys::SLOT_AWARE_RECORDING_CHECK,
                defaults.slot_aware_recording_check,
            )?,
        })
    }
}
