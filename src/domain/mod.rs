// ==========================================
// 高校排课系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值类型、树遍历原语与校验错误
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod error;
pub mod group;
pub mod lesson;
pub mod lesson_slot;
pub mod reference;
pub mod study;
pub mod types;
pub mod yearless;

// 重导出核心类型
pub use error::{ValidationError, ValidationResult};
pub use group::{GroupArena, GroupNode, SubGroup};
pub use lesson::{CurriculumRecord, Lesson, TimeTableRecording};
pub use lesson_slot::LessonSlot;
pub use reference::{
    Building, Classroom, Department, Faculty, Person, Specialty, Subject, Teacher,
};
pub use study::{Curriculum, FormOfStudy, GroupStream, SemesterTemplate};
pub use yearless::{YearlessDate, YearlessDateRange};
pub use types::{
    BuildingId, ClassroomId, CurriculumId, CurriculumRecordId, DepartmentId, FacultyId,
    FormOfStudyId, GroupId, GroupStreamId, LessonId, LessonKind, PersonId, RecordingId,
    SemesterTemplateId, SpecialtyId, SubGroupId, SubjectId, TeacherId, WeekParity,
};
