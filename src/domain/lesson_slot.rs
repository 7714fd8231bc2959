// ==========================================
// 高校排课系统 - 课表节次编码
// ==========================================
// 职责: (单双周, 星期, 节次) 三元组与 smallint 的互转
// 编码: value = week*256 + weekday*32 + period（存储兼容，禁止改动位布局）
// 红线: 编解码本身不做域校验，工作日/节次上限由引擎层负责
// ==========================================

use crate::domain::types::WeekParity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 星期英文缩写（Display 用，0=周一）
const DAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// 单双周名称（Display 用）
const WEEK_NAMES: [&str; 3] = ["numerator", "denominator", "both"];

/// 打包三元组为存储值
///
/// 纯位打包，不检查取值范围；weekday<8 且 period<32 时与 decode 精确互逆。
pub fn encode(week: u16, weekday: u16, period: u16) -> u16 {
    week * 256 + weekday * 32 + period
}

/// 解包存储值为 (week, weekday, period)
pub fn decode(value: u16) -> (u16, u16, u16) {
    (value / 256, value % 256 / 32, value % 32)
}

// ==========================================
// LessonSlot - 打包的课表节次
// ==========================================
// 排序即打包值的自然整数序: 单周 < 双周 < 每周，周内按星期、节次
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LessonSlot(u16);

impl LessonSlot {
    /// 由三元组构造（不校验）
    pub fn from_parts(week: WeekParity, weekday: u8, period: u8) -> Self {
        Self(encode(week.as_u16(), weekday as u16, period as u16))
    }

    /// 由存储值构造（不校验）
    pub fn from_value(value: u16) -> Self {
        Self(value)
    }

    /// 打包存储值
    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn week_raw(&self) -> u16 {
        decode(self.0).0
    }

    pub fn weekday(&self) -> u16 {
        decode(self.0).1
    }

    pub fn period(&self) -> u16 {
        decode(self.0).2
    }

    /// 单双周标记（编码值超界时为 None）
    pub fn week(&self) -> Option<WeekParity> {
        WeekParity::from_u16(self.week_raw())
    }
}

impl fmt::Display for LessonSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (week, weekday, period) = decode(self.0);
        let week_name = WEEK_NAMES.get(week as usize).copied().unwrap_or("?");
        let day_name = DAY_NAMES.get(weekday as usize).copied().unwrap_or("?");
        write!(f, "{} - {} - {} lesson", week_name, day_name, period)
    }
}
