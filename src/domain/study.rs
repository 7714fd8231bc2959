// ==========================================
// 高校排课系统 - 学制与年级组
// ==========================================
// 职责: 学制(含学期日期模板)、年级组、学期教学计划实体
// 约束: 年级组唯一键 (specialty, year, form)；教学计划唯一键 (stream, semester)
// ==========================================

use crate::domain::types::{
    CurriculumId, FormOfStudyId, GroupStreamId, SemesterTemplateId, SpecialtyId,
};
use crate::domain::yearless::YearlessDateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 学制（全日制/函授等）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormOfStudy {
    pub id: FormOfStudyId,
    pub name: String,
    /// 年级组名称后缀（如函授 "z"）
    pub suffix: String,
    /// 总学期数；模板数少于学期数时自动从头循环
    pub semesters: u16,
    /// 排序优先级 1..=9
    pub priority: u8,
}

/// 学期日期模板
///
/// 同一学制内按 seq 排序、循环套用；模板之间禁止重叠
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemesterTemplate {
    pub id: SemesterTemplateId,
    pub form: FormOfStudyId,
    /// 模板序号（1 起），生成第 i 学期时取 templates[(i-1) % M]
    pub seq: u16,
    pub date_range: YearlessDateRange,
}

/// 年级组：同一专业、同一入学年份、同一学制的学生整体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupStream {
    pub id: GroupStreamId,
    pub specialty: SpecialtyId,
    /// 入学年份
    pub year: i32,
    pub form: FormOfStudyId,
}

/// 学期教学计划（带具体日期的学期记录）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: CurriculumId,
    pub group_stream: GroupStreamId,
    pub semester: u16,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
