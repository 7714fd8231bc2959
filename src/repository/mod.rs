// ==========================================
// 高校排课系统 - 仓储层
// ==========================================
// 职责: SQLite 数据访问，模式创建，提交前校验的装载与重跑
// 约定: 所有仓储共享一条 Arc<Mutex<Connection>>，写路径单事务完成
// ==========================================

pub mod error;
pub mod group_repo;
pub mod lesson_repo;
pub mod reference_repo;
pub mod study_plan_repo;

// 重导出核心仓储接口
pub use error::{RepositoryError, RepositoryResult};
pub use group_repo::GroupRepository;
pub use lesson_repo::LessonRepository;
pub use reference_repo::ReferenceRepository;
pub use study_plan_repo::StudyPlanRepository;
