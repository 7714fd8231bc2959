// ==========================================
// 高校排课系统 - 排课业务门面
// ==========================================
// 职责: 组合仓储与配置，向上层提供一体化的排课业务接口
// 约定:
// - 配置与"今年"在此注入，仓储与引擎不做环境查找
// - 所有仓储共享一条连接，保证跨表校验在同一数据库视图上进行
// ==========================================

use crate::api::error::ApiResult;
use crate::config::config_manager::ConfigManager;
use crate::config::settings::{SystemClock, TimetableConfig, YearProvider};
use crate::db::{open_sqlite_connection, write_schema_version};
use crate::domain::lesson_slot::LessonSlot;
use crate::domain::study::{Curriculum, GroupStream};
use crate::domain::types::{
    ClassroomId, CurriculumRecordId, FormOfStudyId, GroupId, GroupStreamId, LessonId, LessonKind,
    RecordingId, SpecialtyId, SubGroupId, SubjectId, TeacherId,
};
use crate::repository::{
    GroupRepository, LessonRepository, ReferenceRepository, StudyPlanRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct TimetableApi {
    config: TimetableConfig,
    year_provider: Box<dyn YearProvider>,
    config_manager: ConfigManager,
    references: ReferenceRepository,
    study_plans: StudyPlanRepository,
    groups: GroupRepository,
    lessons: LessonRepository,
}

impl TimetableApi {
    /// 打开数据库并初始化全部仓储
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(crate::repository::RepositoryError::from)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接初始化（测试中配合内存库使用）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config_manager = ConfigManager::from_connection(Arc::clone(&conn))?;
        let references = ReferenceRepository::from_connection(Arc::clone(&conn))?;
        let study_plans = StudyPlanRepository::from_connection(Arc::clone(&conn))?;
        let groups = GroupRepository::from_connection(Arc::clone(&conn))?;
        let lessons = LessonRepository::from_connection(Arc::clone(&conn))?;

        {
            let guard = conn
                .lock()
                .map_err(|e| crate::repository::RepositoryError::LockError(e.to_string()))?;
            write_schema_version(&guard).map_err(crate::repository::RepositoryError::from)?;
        }

        let config = config_manager.load_timetable_config()?;
        info!(
            max_tree_height = config.max_group_tree_height,
            max_lessons_per_day = config.max_lessons_per_day,
            "排课门面初始化完成"
        );

        Ok(Self {
            config,
            year_provider: Box::new(SystemClock),
            config_manager,
            references,
            study_plans,
            groups,
            lessons,
        })
    }

    /// 替换年份提供者（测试中注入固定年份）
    pub fn with_year_provider(mut self, provider: Box<dyn YearProvider>) -> Self {
        self.year_provider = provider;
        self
    }

    /// 重新从 config_kv 加载配置覆写
    pub fn reload_config(&mut self) -> ApiResult<()> {
        self.config = self.config_manager.load_timetable_config()?;
        Ok(())
    }

    pub fn config(&self) -> &TimetableConfig {
        &self.config
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    pub fn references(&self) -> &ReferenceRepository {
        &self.references
    }

    pub fn study_plans(&self) -> &StudyPlanRepository {
        &self.study_plans
    }

    pub fn groups(&self) -> &GroupRepository {
        &self.groups
    }

    pub fn lessons(&self) -> &LessonRepository {
        &self.lessons
    }

    // ==========================================
    // 年级组与班级树（需要配置/年份注入的操作）
    // ==========================================

    /// 创建年级组（学期生成与默认合班随事务完成）
    pub fn create_group_stream(
        &self,
        specialty: SpecialtyId,
        year: i32,
        form: FormOfStudyId,
    ) -> ApiResult<GroupStreamId> {
        Ok(self.groups.create_group_stream(
            specialty,
            year,
            form,
            &self.config,
            self.year_provider.current_year(),
        )?)
    }

    pub fn update_group_stream(&self, after: &GroupStream) -> ApiResult<()> {
        Ok(self.groups.update_group_stream(
            after,
            &self.config,
            self.year_provider.current_year(),
        )?)
    }

    pub fn create_group(
        &self,
        stream: GroupStreamId,
        parent: Option<GroupId>,
        number: u16,
    ) -> ApiResult<GroupId> {
        Ok(self.groups.create_group(stream, parent, number, &self.config)?)
    }

    pub fn move_group(&self, id: GroupId, new_parent: Option<GroupId>) -> ApiResult<()> {
        Ok(self.groups.move_group(id, new_parent, &self.config)?)
    }

    pub fn create_subgroup(
        &self,
        group: GroupId,
        numerator: u16,
        denominator: u16,
    ) -> ApiResult<SubGroupId> {
        Ok(self.groups.create_subgroup(group, numerator, denominator)?)
    }

    pub fn get_union_group(&self, stream: GroupStreamId) -> ApiResult<GroupId> {
        Ok(self.groups.get_union_group(stream)?)
    }

    pub fn get_union_subgroup(&self, group: GroupId) -> ApiResult<SubGroupId> {
        Ok(self.groups.get_union_subgroup(group)?)
    }

    pub fn list_curricula(&self, stream: GroupStreamId) -> ApiResult<Vec<Curriculum>> {
        Ok(self.groups.list_curricula(stream)?)
    }

    // ==========================================
    // 课程与课表
    // ==========================================

    #[allow(clippy::too_many_arguments)]
    pub fn create_curriculum_record(
        &self,
        group: GroupId,
        semester: u16,
        subject: SubjectId,
        lectures: u16,
        practices: u16,
        laboratory: u16,
        independent_work: u16,
        teacher: Option<TeacherId>,
    ) -> ApiResult<CurriculumRecordId> {
        Ok(self.lessons.create_curriculum_record(
            group,
            semester,
            subject,
            lectures,
            practices,
            laboratory,
            independent_work,
            teacher,
        )?)
    }

    pub fn create_lesson(
        &self,
        subgroup: SubGroupId,
        semester: u16,
        subject: SubjectId,
        kind: LessonKind,
        teacher: Option<TeacherId>,
    ) -> ApiResult<LessonId> {
        Ok(self.lessons.create_lesson(subgroup, semester, subject, kind, teacher)?)
    }

    /// 课程重存校验（排除自身主键，必须幂等）
    pub fn revalidate_lesson(&self, id: LessonId) -> ApiResult<()> {
        Ok(self.lessons.revalidate_lesson(id)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_recording(
        &self,
        lesson: LessonId,
        slot: LessonSlot,
        classroom: Option<ClassroomId>,
        teacher: Option<TeacherId>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ApiResult<RecordingId> {
        Ok(self.lessons.create_recording(
            lesson,
            slot,
            classroom,
            teacher,
            start_date,
            end_date,
            &self.config,
        )?)
    }

    pub fn revalidate_recording(&self, id: RecordingId) -> ApiResult<()> {
        Ok(self.lessons.revalidate_recording(id, &self.config)?)
    }
}
