// ==========================================
// 高校排课系统 - 排课配置
// ==========================================
// 职责: 定义显式配置结构，注入到所有需要配置的校验/生成逻辑
// 红线: 不使用全局可变状态，当前年份通过 YearProvider 注入
// ==========================================

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// 班级树最大高度默认值
pub const DEFAULT_MAX_GROUP_TREE_HEIGHT: u32 = 3;

/// 每天最大节次默认值
pub const DEFAULT_MAX_LESSONS_PER_DAY: u8 = 5;

/// 可接受的最早入学年份默认值
pub const DEFAULT_START_YEAR: i32 = 1900;

/// 排课核心配置
///
/// 所有校验器/生成器显式接收本结构，禁止环境查找。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableConfig {
    /// 班级树最大高度（含根）
    pub max_group_tree_height: u32,
    /// 工作日集合（0=周一 .. 6=周日）
    pub work_days: Vec<u8>,
    /// 每天最大节次
    pub max_lessons_per_day: u8,
    /// 可接受的最早入学年份
    pub start_year: i32,
    /// 课表记录唯一性校验是否限定到同一节次
    ///
    /// false = 保守的字面语义：冲突课程下已存在任意课表记录即拒绝
    /// true  = 仅拒绝同一打包节次上的记录（待确认的候选策略）
    pub slot_aware_recording_check: bool,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            max_group_tree_height: DEFAULT_MAX_GROUP_TREE_HEIGHT,
            // 周一至周六
            work_days: vec![0, 1, 2, 3, 4, 5],
            max_lessons_per_day: DEFAULT_MAX_LESSONS_PER_DAY,
            start_year: DEFAULT_START_YEAR,
            slot_aware_recording_check: false,
        }
    }
}

impl TimetableConfig {
    /// 判断星期索引是否为工作日
    pub fn is_work_day(&self, weekday: u8) -> bool {
        self.work_days.contains(&weekday)
    }
}

/// 当前年份提供者
///
/// 入学年份上界依赖"今年"，测试中需要可注入的固定值。
pub trait YearProvider: Send + Sync {
    fn current_year(&self) -> i32;
}

/// 系统时钟实现
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl YearProvider for SystemClock {
    fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

/// 固定年份实现（测试用）
#[derive(Debug, Clone, Copy)]
pub struct FixedYear(pub i32);

impl YearProvider for FixedYear {
    fn current_year(&self) -> i32 {
        self.0
    }
}
