// ==========================================
// 高校排课系统 - 教学计划与课表记录
// ==========================================
// 职责: 教学计划记录、课程、课表记录实体
// 约束: 课程唯一键 (subgroup, semester, subject, kind)；
//       课表记录唯一键 (lesson, slot)
// ==========================================

use crate::domain::lesson_slot::LessonSlot;
use crate::domain::types::{
    ClassroomId, CurriculumRecordId, GroupId, LessonId, LessonKind, RecordingId, SubGroupId,
    SubjectId, TeacherId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 教学计划记录：某班级某学期某科目的学时计划
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumRecord {
    pub id: CurriculumRecordId,
    pub group: GroupId,
    pub semester: u16,
    pub subject: SubjectId,
    pub lectures: u16,
    pub practices: u16,
    pub laboratory: u16,
    pub independent_work: u16,
    pub teacher: Option<TeacherId>,
}

/// 课程：某小组某学期某科目某种类的授课单元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub subgroup: SubGroupId,
    pub semester: u16,
    pub subject: SubjectId,
    pub kind: LessonKind,
    pub teacher: Option<TeacherId>,
}

/// 课表记录：课程在具体节次上的落位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeTableRecording {
    pub id: RecordingId,
    pub lesson: LessonId,
    pub slot: LessonSlot,
    pub classroom: Option<ClassroomId>,
    pub teacher: Option<TeacherId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
