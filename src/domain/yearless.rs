// ==========================================
// 高校排课系统 - 无年份日期
// ==========================================
// 职责: 表示"每年重复"的月/日值与区间，用于学期日期模板
// 约束: 以固定平年校验（2 月封顶 28 日），构造后不可变
// 存储: 打包为 smallint，value = month*32 + day
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 固定平年的各月天数
const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// 月份英文名（Display 用）
const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// 打包值的环周长，需大于最大打包值 12*32+31
const YEAR_CIRCLE_SPAN: i32 = 13 * 32;

// ==========================================
// YearlessDate - 无年份日期
// ==========================================
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct YearlessDate {
    // 字段顺序即派生排序顺序: (month, day) 字典序
    month: u8,
    day: u8,
}

impl YearlessDate {
    /// 构造并校验无年份日期
    ///
    /// # 参数
    /// - month: 1..=12
    /// - day: 1..=当月天数（固定平年，2 月 29 日永远无效）
    pub fn new(month: u8, day: u8) -> ValidationResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidDate { month, day });
        }
        let month_days = DAYS_IN_MONTH[(month - 1) as usize];
        if day < 1 || day > month_days {
            return Err(ValidationError::InvalidDate { month, day });
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// 打包为存储值: month*32 + day
    pub fn value(&self) -> u16 {
        self.month as u16 * 32 + self.day as u16
    }

    /// 从存储值解包并重新校验
    pub fn from_value(value: u16) -> ValidationResult<Self> {
        Self::new((value / 32) as u8, (value % 32) as u8)
    }
}

impl fmt::Display for YearlessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, MONTH_NAMES[(self.month - 1) as usize])
    }
}

// ==========================================
// YearlessDateRange - 无年份日期区间
// ==========================================
// 区间允许跨年（start=11 月, end=2 月），重叠判定按年环处理
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct YearlessDateRange {
    pub start: YearlessDate,
    pub end: YearlessDate,
}

impl YearlessDateRange {
    pub fn new(start: YearlessDate, end: YearlessDate) -> Self {
        Self { start, end }
    }

    /// 判断两个区间是否重叠（对跨年区间亦正确，且满足对称性）
    ///
    /// 实现: 把四个边界点投到以 self.start 为原点的年环上，
    /// 顺时针依次严格经过 self.end、other.start、other.end 时两段弧不相交；
    /// 任何相等（边界相切）都按重叠处理。
    pub fn overlaps(&self, other: &YearlessDateRange) -> bool {
        let anchor = self.start.value() as i32;
        let offset =
            |d: &YearlessDate| (d.value() as i32 - anchor).rem_euclid(YEAR_CIRCLE_SPAN);

        let self_end = offset(&self.end);
        let other_start = offset(&other.start);
        let other_end = offset(&other.end);

        let disjoint = 0 < self_end && self_end < other_start && other_start < other_end;
        !disjoint
    }
}

impl fmt::Display for YearlessDateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u8, day: u8) -> YearlessDate {
        YearlessDate::new(month, day).unwrap()
    }

    fn range(sm: u8, sd: u8, em: u8, ed: u8) -> YearlessDateRange {
        YearlessDateRange::new(date(sm, sd), date(em, ed))
    }

    #[test]
    fn test_new_rejects_invalid_month() {
        assert_eq!(
            YearlessDate::new(13, 1),
            Err(ValidationError::InvalidDate { month: 13, day: 1 })
        );
        assert_eq!(
            YearlessDate::new(0, 1),
            Err(ValidationError::InvalidDate { month: 0, day: 1 })
        );
    }

    #[test]
    fn test_new_rejects_invalid_day() {
        // 固定平年: 2 月 29 日永远无效
        assert!(YearlessDate::new(2, 29).is_err());
        assert!(YearlessDate::new(4, 31).is_err());
        assert!(YearlessDate::new(1, 0).is_err());
        assert!(YearlessDate::new(2, 28).is_ok());
    }

    #[test]
    fn test_ordering_is_month_then_day() {
        assert!(date(1, 31) < date(2, 1));
        assert!(date(9, 1) < date(9, 2));
        assert_eq!(date(6, 15), date(6, 15));
    }

    #[test]
    fn test_value_round_trip() {
        for month in 1..=12u8 {
            for day in 1..=DAYS_IN_MONTH[(month - 1) as usize] {
                let d = date(month, day);
                assert_eq!(YearlessDate::from_value(d.value()).unwrap(), d);
            }
        }
    }

    #[test]
    fn test_overlap_boundary_cases() {
        // 9/1-1/31 与 12/1-2/28 重叠（跨年）
        assert!(range(9, 1, 1, 31).overlaps(&range(12, 1, 2, 28)));
        // 9/1-10/31 与 11/1-12/31 不重叠
        assert!(!range(9, 1, 10, 31).overlaps(&range(11, 1, 12, 31)));
    }

    #[test]
    fn test_overlap_containment() {
        // 包含关系双向均为重叠
        assert!(range(1, 1, 12, 31).overlaps(&range(5, 1, 6, 1)));
        assert!(range(5, 1, 6, 1).overlaps(&range(1, 1, 12, 31)));
        // other 跨年且完全覆盖 self
        assert!(range(5, 1, 6, 1).overlaps(&range(4, 1, 7, 1)));
    }

    #[test]
    fn test_overlap_touching_boundary_counts() {
        // 边界相切按重叠处理
        assert!(range(9, 1, 11, 1).overlaps(&range(11, 1, 12, 31)));
    }

    #[test]
    fn test_overlap_wrapping_disjoint() {
        // self 跨年，other 落在空档
        assert!(!range(11, 1, 2, 1).overlaps(&range(3, 1, 4, 1)));
        assert!(!range(3, 1, 4, 1).overlaps(&range(11, 1, 2, 1)));
    }

    #[test]
    fn test_overlap_symmetry() {
        let cases = [
            (range(9, 1, 1, 31), range(12, 1, 2, 28)),
            (range(9, 1, 10, 31), range(11, 1, 12, 31)),
            (range(11, 1, 2, 1), range(3, 1, 4, 1)),
            (range(1, 1, 12, 31), range(5, 1, 6, 1)),
            (range(2, 1, 6, 30), range(9, 1, 1, 31)),
        ];
        for (a, b) in cases {
            assert_eq!(a.overlaps(&b), b.overlaps(&a), "{} vs {}", a, b);
        }
    }
}
