// ==========================================
// 高校排课系统 - 领域校验错误类型
// ==========================================
// 职责: 覆盖全部校验失败种类，供外层（管理端）直接渲染为表单错误
// 约束: 校验失败一律返回类型化错误，不重试、不吞错
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 领域校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // ===== 日期错误 =====
    #[error("无效日期: month={month} day={day}")]
    InvalidDate { month: u8, day: u8 },

    #[error("结束日期早于开始日期: start={start} end={end}")]
    DateRangeInverted { start: String, end: String },

    #[error("同一学制的学期日期模板存在重叠: 模板 {first} 与 {second}")]
    DateRangesOverlapping { first: usize, second: usize },

    // ===== 节次错误 =====
    #[error("无效课表节次: week={week} weekday={weekday} period={period}")]
    InvalidLessonSlot { week: u16, weekday: u16, period: u16 },

    // ===== 组织层级错误 =====
    #[error("班级树超高: 高度 {computed} 超过上限 {max}")]
    TreeTooDeep { computed: u32, max: u32 },

    #[error("同级班级编号重复: parent={parent:?} number={number}")]
    DuplicateGroup {
        parent: Option<i64>,
        number: u16,
    },

    #[error("父班级无效: group={group:?} parent={parent}")]
    InvalidParent { group: Option<i64>, parent: i64 },

    #[error("同班小组重复: group={group} {numerator}/{denominator}")]
    DuplicateSubGroup {
        group: i64,
        numerator: u16,
        denominator: u16,
    },

    #[error("小组划分无效: {reason}")]
    InvalidSubgroupPartition { reason: String },

    #[error("入学年份超出范围: year={year}, 允许 {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    // ===== 教学计划错误 =====
    #[error("同一年级组同一学期的教学计划重复: stream={stream} semester={semester}")]
    DuplicateCurriculum { stream: i64, semester: u16 },

    // ===== 冲突引擎错误 =====
    #[error("教师时段冲突: 教师 {teacher} 已在冲突课程 {lesson} 任课")]
    DuplicateTeacher { teacher: i64, lesson: i64 },

    #[error("课表记录冲突: 冲突课程 {lesson} 已存在课表记录 {recording}")]
    DuplicateRecording { lesson: i64, recording: i64 },

    #[error("教学计划教师冲突: 教师 {teacher} 已在关联班级 {group} 承担同一职责")]
    DuplicateTeacherForRecord { teacher: i64, group: i64 },

    // ===== 引用保护错误 =====
    #[error("存在受保护引用，无法删除: {entity}")]
    ForeignReferenceInUse { entity: String },

    // ===== 受保护字段错误 =====
    #[error("{entity} 存在关联 {dependent}，字段 {fields} 不可修改")]
    ReadOnlyFieldChanged {
        entity: &'static str,
        dependent: &'static str,
        fields: String,
    },
}

/// 领域校验结果别名
pub type ValidationResult<T> = Result<T, ValidationError>;
