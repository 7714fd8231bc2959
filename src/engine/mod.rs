// ==========================================
// 高校排课系统 - 引擎层
// ==========================================
// 职责: 业务规则——冲突解析、校验链、学期生成、受保护字段检查
// 红线: Engine 不拼 SQL，所有校验失败必须携带可解释的类型化错误
// ==========================================

pub mod conflict;
pub mod guarded;
pub mod semester_generator;
pub mod validation;

// 重导出核心引擎接口
pub use conflict::{
    check_record_teacher, check_unique_recording, check_unique_teacher, conflict_groups,
    conflict_subgroups,
};
pub use guarded::{check_guarded, GuardedChange, GuardedMutation};
pub use semester_generator::{generate_semesters, GeneratedSemester};
pub use validation::{
    check_curriculum_dates, check_lesson_slot, check_stream_year, check_template_overlap,
    validate_group_placement, validate_subgroup,
};
