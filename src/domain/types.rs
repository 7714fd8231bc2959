// ==========================================
// 高校排课系统 - 领域类型定义
// ==========================================
// 职责: 实体主键新类型、课程种类、单双周标记
// 红线: 主键一律为整型新类型，不使用裸 i64 跨层传递
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 定义整型主键新类型
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(/// 学院主键
    FacultyId);
define_id!(/// 系/教研室主键
    DepartmentId);
define_id!(/// 课程科目主键
    SubjectId);
define_id!(/// 人员主键
    PersonId);
define_id!(/// 教师主键
    TeacherId);
define_id!(/// 专业主键
    SpecialtyId);
define_id!(/// 教学楼主键
    BuildingId);
define_id!(/// 教室主键
    ClassroomId);
define_id!(/// 学制主键
    FormOfStudyId);
define_id!(/// 学期日期模板主键
    SemesterTemplateId);
define_id!(/// 年级组主键
    GroupStreamId);
define_id!(/// 班级主键
    GroupId);
define_id!(/// 小组主键
    SubGroupId);
define_id!(/// 学期教学计划主键
    CurriculumId);
define_id!(/// 教学计划记录主键
    CurriculumRecordId);
define_id!(/// 课程主键
    LessonId);
define_id!(/// 课表记录主键
    RecordingId);

// ==========================================
// 课程种类 (Lesson Kind)
// ==========================================
// 存储为 smallint，取值与历史数据兼容
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LessonKind {
    Lecture = 0,
    Practice = 1,
    Laboratory = 2,
}

impl LessonKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(LessonKind::Lecture),
            1 => Some(LessonKind::Practice),
            2 => Some(LessonKind::Laboratory),
            _ => None,
        }
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonKind::Lecture => write!(f, "lectures"),
            LessonKind::Practice => write!(f, "practices"),
            LessonKind::Laboratory => write!(f, "laboratory"),
        }
    }
}

// ==========================================
// 单双周标记 (Week Parity)
// ==========================================
// 0=单周(分子) 1=双周(分母) 2=每周(后期变体的哨兵值)
// 打包编码中占最高位段，排序上单周 < 双周 < 每周
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeekParity {
    Numerator = 0,
    Denominator = 1,
    Both = 2,
}

impl WeekParity {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(WeekParity::Numerator),
            1 => Some(WeekParity::Denominator),
            2 => Some(WeekParity::Both),
            _ => None,
        }
    }
}

impl fmt::Display for WeekParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekParity::Numerator => write!(f, "numerator"),
            WeekParity::Denominator => write!(f, "denominator"),
            WeekParity::Both => write!(f, "both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_kind_round_trip() {
        for raw in 0..=2u8 {
            let kind = LessonKind::from_u8(raw).unwrap();
            assert_eq!(kind.as_u8(), raw);
        }
        assert_eq!(LessonKind::from_u8(3), None);
    }

    #[test]
    fn test_week_parity_ordering() {
        assert!(WeekParity::Numerator < WeekParity::Denominator);
        assert!(WeekParity::Denominator < WeekParity::Both);
    }
}
