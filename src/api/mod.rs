// ==========================================
// 高校排课系统 - API 层
// ==========================================
// 职责: 提供业务门面接口，供上层集成调用
// ==========================================

pub mod error;
pub mod timetable_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use timetable_api::TimetableApi;
