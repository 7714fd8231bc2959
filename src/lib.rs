// ==========================================
// 高校排课系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 排课数据核心（层级建模 + 冲突解析 + 学期生成）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ClassroomId, CurriculumId, CurriculumRecordId, FacultyId, FormOfStudyId, GroupId,
    GroupStreamId, LessonId, LessonKind, RecordingId, SpecialtyId, SubGroupId, SubjectId,
    TeacherId, WeekParity,
};

// 领域实体
pub use domain::{
    Curriculum, CurriculumRecord, FormOfStudy, GroupArena, GroupNode, GroupStream, Lesson,
    LessonSlot, SubGroup, TimeTableRecording, ValidationError, YearlessDate, YearlessDateRange,
};

// 引擎
pub use engine::{
    check_unique_recording, check_unique_teacher, conflict_groups, conflict_subgroups,
    generate_semesters, validate_group_placement, validate_subgroup,
};

// 配置
pub use config::{ConfigManager, FixedYear, SystemClock, TimetableConfig, YearProvider};

// API
pub use api::{ApiError, ApiResult, TimetableApi};
