// ==========================================
// 高校排课系统 - 课程与课表仓储
// ==========================================
// 职责: 教学计划记录、课程、课表记录的数据访问与提交前冲突校验
// 约束:
// - 冲突校验在提交事务内重跑，唯一索引为并发竞争的最后防线
// - 校验排除自身主键，保证重存幂等
// ==========================================

use crate::config::settings::TimetableConfig;
use crate::db::open_sqlite_connection;
use crate::domain::group::{GroupArena, GroupNode, SubGroup};
use crate::domain::lesson::{CurriculumRecord, Lesson, TimeTableRecording};
use crate::domain::lesson_slot::LessonSlot;
use crate::domain::types::{
    ClassroomId, CurriculumRecordId, GroupId, GroupStreamId, LessonId, LessonKind, RecordingId,
    SubGroupId, SubjectId, TeacherId,
};
use crate::engine::conflict::{
    check_record_teacher, check_unique_recording, check_unique_teacher, conflict_subgroups,
};
use crate::engine::guarded::check_guarded;
use crate::engine::validation::{check_curriculum_dates, check_lesson_slot};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub struct LessonRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LessonRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_table()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保表存在（如果不存在则创建）
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS curriculum_record (
              id INTEGER PRIMARY KEY,
              group_id INTEGER NOT NULL REFERENCES study_group(id) ON DELETE CASCADE,
              semester INTEGER NOT NULL,
              subject_id INTEGER NOT NULL REFERENCES subject(id) ON DELETE RESTRICT,
              lectures INTEGER NOT NULL DEFAULT 0,
              practices INTEGER NOT NULL DEFAULT 0,
              laboratory INTEGER NOT NULL DEFAULT 0,
              independent_work INTEGER NOT NULL DEFAULT 0,
              teacher_id INTEGER REFERENCES teacher(id) ON DELETE RESTRICT,
              UNIQUE(group_id, semester, subject_id)
            );

            CREATE TABLE IF NOT EXISTS lesson (
              id INTEGER PRIMARY KEY,
              subgroup_id INTEGER NOT NULL REFERENCES sub_group(id) ON DELETE RESTRICT,
              semester INTEGER NOT NULL,
              subject_id INTEGER NOT NULL REFERENCES subject(id) ON DELETE RESTRICT,
              kind INTEGER NOT NULL,
              teacher_id INTEGER REFERENCES teacher(id) ON DELETE RESTRICT,
              UNIQUE(subgroup_id, semester, subject_id, kind)
            );

            -- slot 以打包 smallint 存储: week*256 + weekday*32 + period
            CREATE TABLE IF NOT EXISTS timetable_recording (
              id INTEGER PRIMARY KEY,
              lesson_id INTEGER NOT NULL REFERENCES lesson(id) ON DELETE CASCADE,
              slot INTEGER NOT NULL,
              classroom_id INTEGER REFERENCES classroom(id) ON DELETE RESTRICT,
              teacher_id INTEGER REFERENCES teacher(id) ON DELETE RESTRICT,
              start_date TEXT,
              end_date TEXT,
              UNIQUE(lesson_id, slot)
            );
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // 教学计划记录
    // ==========================================

    /// 创建教学计划记录
    ///
    /// 校验: 同一职责（学期+科目）下，祖先-后代闭包内的班级
    /// 不得重复指派同一教师
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
    ) -> RepositoryResult<CurriculumRecordId> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let probe = CurriculumRecord {
            id: CurriculumRecordId(0),
            group,
            semester,
            subject,
            lectures,
            practices,
            laboratory,
            independent_work,
            teacher,
        };
        Self::validate_record_tx(&tx, &probe)?;

        tx.execute(
            "INSERT INTO curriculum_record
               (group_id, semester, subject_id, lectures, practices,
                laboratory, independent_work, teacher_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                group.0,
                semester,
                subject.0,
                lectures,
                practices,
                laboratory,
                independent_work,
                teacher.map(|t| t.0)
            ],
        )?;
        let id = CurriculumRecordId(tx.last_insert_rowid());
        tx.commit()?;
        info!(record = id.0, group = group.0, semester = semester, "教学计划记录已创建");
        Ok(id)
    }

    fn validate_record_tx(conn: &Connection, probe: &CurriculumRecord) -> RepositoryResult<()> {
        let node = Self::load_group_tx(conn, probe.group)?;
        let arena = Self::load_arena_tx(conn, node.group_stream)?;

        // 祖先-后代闭包（不含自身，自身重复由唯一索引兜底）
        let mut closure = arena.ancestors(probe.group);
        closure.extend(arena.descendants(probe.group));
        if closure.is_empty() {
            return Ok(());
        }

        let mut sql = String::from(
            "SELECT id, group_id, semester, subject_id, lectures, practices,
                    laboratory, independent_work, teacher_id
             FROM curriculum_record
             WHERE semester = ? AND subject_id = ? AND id != ? AND group_id IN (",
        );
        sql.push_str(&sql_placeholders(closure.len()));
        sql.push(')');

        let mut bind: Vec<i64> = vec![probe.semester as i64, probe.subject.0, probe.id.0];
        bind.extend(closure.iter().map(|g| g.0));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), Self::map_record_row)?;
        let mut related = Vec::new();
        for row in rows {
            related.push(row?);
        }

        check_record_teacher(probe, &related)?;
        Ok(())
    }

    pub fn get_curriculum_record(&self, id: CurriculumRecordId) -> RepositoryResult<CurriculumRecord> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, group_id, semester, subject_id, lectures, practices,
                    laboratory, independent_work, teacher_id
             FROM curriculum_record WHERE id = ?1",
            params![id.0],
            Self::map_record_row,
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "CurriculumRecord", id: id.0 })
    }

    fn map_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CurriculumRecord> {
        Ok(CurriculumRecord {
            id: CurriculumRecordId(row.get(0)?),
            group: GroupId(row.get(1)?),
            semester: row.get(2)?,
            subject: SubjectId(row.get(3)?),
            lectures: row.get(4)?,
            practices: row.get(5)?,
            laboratory: row.get(6)?,
            independent_work: row.get(7)?,
            teacher: row.get::<_, Option<i64>>(8)?.map(TeacherId),
        })
    }

    // ==========================================
    // 课程
    // ==========================================

    /// 创建课程
    ///
    /// 校验: 互斥小组上同学期/同科目/同种类的既有课程中
    /// 不得出现同一教师（DuplicateTeacher）
    pub fn create_lesson(
        &self,
        subgroup: SubGroupId,
        semester: u16,
        subject: SubjectId,
        kind: LessonKind,
        teacher: Option<TeacherId>,
    ) -> RepositoryResult<LessonId> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let probe = Lesson {
            id: LessonId(0),
            subgroup,
            semester,
            subject,
            kind,
            teacher,
        };
        Self::validate_lesson_tx(&tx, &probe)?;

        tx.execute(
            "INSERT INTO lesson (subgroup_id, semester, subject_id, kind, teacher_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                subgroup.0,
                semester,
                subject.0,
                kind.as_u8(),
                teacher.map(|t| t.0)
            ],
        )?;
        let id = LessonId(tx.last_insert_rowid());
        tx.commit()?;
        info!(lesson = id.0, subgroup = subgroup.0, "课程已创建");
        Ok(id)
    }

    /// 重跑既有课程的冲突校验（校验排除自身，重存必须通过）
    pub fn revalidate_lesson(&self, id: LessonId) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let lesson = Self::get_lesson_tx(&conn, id)?;
        Self::validate_lesson_tx(&conn, &lesson)
    }

    /// 更新课程教师（换小组见 update_lesson_subgroup）
    pub fn update_lesson_teacher(
        &self,
        id: LessonId,
        teacher: Option<TeacherId>,
    ) -> RepositoryResult<()> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let mut after = Self::get_lesson_tx(&tx, id)?;
        after.teacher = teacher;
        Self::validate_lesson_tx(&tx, &after)?;

        tx.execute(
            "UPDATE lesson SET teacher_id = ?2 WHERE id = ?1",
            params![id.0, teacher.map(|t| t.0)],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// 课程换小组
    ///
    /// 课表记录存在后 subgroup 为只读字段
    pub fn update_lesson_subgroup(
        &self,
        id: LessonId,
        subgroup: SubGroupId,
    ) -> RepositoryResult<()> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let before = Self::get_lesson_tx(&tx, id)?;
        let mut after = before.clone();
        after.subgroup = subgroup;

        let has_recordings: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM timetable_recording WHERE lesson_id = ?1 LIMIT 1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        check_guarded(&after, &before, |_dependent| has_recordings.is_some())?;
        Self::validate_lesson_tx(&tx, &after)?;

        tx.execute(
            "UPDATE lesson SET subgroup_id = ?2 WHERE id = ?1",
            params![id.0, subgroup.0],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_lesson(&self, id: LessonId) -> RepositoryResult<Lesson> {
        let conn = self.get_conn()?;
        Self::get_lesson_tx(&conn, id)
    }

    fn get_lesson_tx(conn: &Connection, id: LessonId) -> RepositoryResult<Lesson> {
        conn.query_row(
            "SELECT id, subgroup_id, semester, subject_id, kind, teacher_id
             FROM lesson WHERE id = ?1",
            params![id.0],
            Self::map_lesson_row,
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Lesson", id: id.0 })
    }

    fn map_lesson_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lesson> {
        let kind_raw: u8 = row.get(4)?;
        let kind = LessonKind::from_u8(kind_raw).ok_or_else(|| {
            rusqlite::Error::IntegralValueOutOfRange(4, kind_raw as i64)
        })?;
        Ok(Lesson {
            id: LessonId(row.get(0)?),
            subgroup: SubGroupId(row.get(1)?),
            semester: row.get(2)?,
            subject: SubjectId(row.get(3)?),
            kind,
            teacher: row.get::<_, Option<i64>>(5)?.map(TeacherId),
        })
    }

    /// 课程冲突校验: 装载年级组小组集合，算出互斥小组，
    /// 对其上同学期/同科目/同种类的既有课程做教师唯一性检查
    fn validate_lesson_tx(conn: &Connection, probe: &Lesson) -> RepositoryResult<()> {
        let probe_subgroup = Self::load_subgroup_tx(conn, probe.subgroup)?;
        let owner = Self::load_group_tx(conn, probe_subgroup.group)?;
        let arena = Self::load_arena_tx(conn, owner.group_stream)?;
        let subgroups = Self::load_stream_subgroups_tx(conn, owner.group_stream)?;

        let conflicting = conflict_subgroups(&arena, &subgroups, &probe_subgroup);
        let lessons = Self::load_conflicting_lessons_tx(conn, probe, &conflicting)?;
        check_unique_teacher(probe, &lessons)?;
        Ok(())
    }

    fn load_conflicting_lessons_tx(
        conn: &Connection,
        probe: &Lesson,
        conflicting: &[SubGroupId],
    ) -> RepositoryResult<Vec<Lesson>> {
        if conflicting.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = String::from(
            "SELECT id, subgroup_id, semester, subject_id, kind, teacher_id
             FROM lesson
             WHERE semester = ? AND subject_id = ? AND kind = ? AND id != ?
               AND subgroup_id IN (",
        );
        sql.push_str(&sql_placeholders(conflicting.len()));
        sql.push(')');

        let mut bind: Vec<i64> = vec![
            probe.semester as i64,
            probe.subject.0,
            probe.kind.as_u8() as i64,
            probe.id.0,
        ];
        bind.extend(conflicting.iter().map(|s| s.0));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), Self::map_lesson_row)?;
        let mut lessons = Vec::new();
        for row in rows {
            lessons.push(row?);
        }
        debug!(
            probe_subgroup = probe.subgroup.0,
            conflict_lessons = lessons.len(),
            "冲突课程装载完成"
        );
        Ok(lessons)
    }

    // ==========================================
    // 课表记录
    // ==========================================

    /// 创建课表记录
    ///
    /// 校验链: 节次域检查 → 起止日期检查 → 冲突课程的既有记录检查
    /// （字面契约默认不限节次，见 TimetableConfig.slot_aware_recording_check）
    #[allow(clippy::too_many_arguments)]
    pub fn create_recording(
        &self,
        lesson: LessonId,
        slot: LessonSlot,
        classroom: Option<ClassroomId>,
        teacher: Option<TeacherId>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        config: &TimetableConfig,
    ) -> RepositoryResult<RecordingId> {
        check_lesson_slot(slot, config)?;
        check_curriculum_dates(start_date, end_date)?;

        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let probe = TimeTableRecording {
            id: RecordingId(0),
            lesson,
            slot,
            classroom,
            teacher,
            start_date,
            end_date,
        };
        Self::validate_recording_tx(&tx, &probe, config)?;

        tx.execute(
            "INSERT INTO timetable_recording
               (lesson_id, slot, classroom_id, teacher_id, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                lesson.0,
                slot.value(),
                classroom.map(|c| c.0),
                teacher.map(|t| t.0),
                start_date,
                end_date
            ],
        )?;
        let id = RecordingId(tx.last_insert_rowid());
        tx.commit()?;
        info!(recording = id.0, lesson = lesson.0, slot = slot.value(), "课表记录已创建");
        Ok(id)
    }

    /// 重跑既有课表记录的冲突校验（校验排除自身，重存必须通过）
    pub fn revalidate_recording(
        &self,
        id: RecordingId,
        config: &TimetableConfig,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let recording = Self::get_recording_tx(&conn, id)?;
        check_lesson_slot(recording.slot, config)?;
        Self::validate_recording_tx(&conn, &recording, config)
    }

    pub fn get_recording(&self, id: RecordingId) -> RepositoryResult<TimeTableRecording> {
        let conn = self.get_conn()?;
        Self::get_recording_tx(&conn, id)
    }

    fn get_recording_tx(conn: &Connection, id: RecordingId) -> RepositoryResult<TimeTableRecording> {
        conn.query_row(
            "SELECT id, lesson_id, slot, classroom_id, teacher_id, start_date, end_date
             FROM timetable_recording WHERE id = ?1",
            params![id.0],
            Self::map_recording_row,
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "TimeTableRecording", id: id.0 })
    }

    fn map_recording_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimeTableRecording> {
        Ok(TimeTableRecording {
            id: RecordingId(row.get(0)?),
            lesson: LessonId(row.get(1)?),
            slot: LessonSlot::from_value(row.get(2)?),
            classroom: row.get::<_, Option<i64>>(3)?.map(ClassroomId),
            teacher: row.get::<_, Option<i64>>(4)?.map(TeacherId),
            start_date: row.get(5)?,
            end_date: row.get(6)?,
        })
    }

    /// 课程在课表上的全部落位，按节次升序
    pub fn list_recordings_for_lesson(
        &self,
        lesson: LessonId,
    ) -> RepositoryResult<Vec<TimeTableRecording>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, lesson_id, slot, classroom_id, teacher_id, start_date, end_date
             FROM timetable_recording WHERE lesson_id = ?1 ORDER BY slot",
        )?;
        let rows = stmt.query_map(params![lesson.0], Self::map_recording_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 课表记录冲突校验: 探测课程的互斥课程（不含自身）下
    /// 已有记录即拒绝；自身同节次重复由唯一索引兜底
    fn validate_recording_tx(
        conn: &Connection,
        probe: &TimeTableRecording,
        config: &TimetableConfig,
    ) -> RepositoryResult<()> {
        let probe_lesson = Self::get_lesson_tx(conn, probe.lesson)?;
        let probe_subgroup = Self::load_subgroup_tx(conn, probe_lesson.subgroup)?;
        let owner = Self::load_group_tx(conn, probe_subgroup.group)?;
        let arena = Self::load_arena_tx(conn, owner.group_stream)?;
        let subgroups = Self::load_stream_subgroups_tx(conn, owner.group_stream)?;

        let conflicting = conflict_subgroups(&arena, &subgroups, &probe_subgroup);
        let lessons = Self::load_conflicting_lessons_tx(conn, &probe_lesson, &conflicting)?;
        if lessons.is_empty() {
            return Ok(());
        }

        let mut sql = String::from(
            "SELECT id, lesson_id, slot, classroom_id, teacher_id, start_date, end_date
             FROM timetable_recording WHERE id != ? AND lesson_id IN (",
        );
        sql.push_str(&sql_placeholders(lessons.len()));
        sql.push(')');

        let mut bind: Vec<i64> = vec![probe.id.0];
        bind.extend(lessons.iter().map(|l| l.id.0));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), Self::map_recording_row)?;
        let mut existing = Vec::new();
        for row in rows {
            existing.push(row?);
        }

        check_unique_recording(probe, &existing, config.slot_aware_recording_check)?;
        Ok(())
    }

    // ==========================================
    // 共享表的事务内装载（表由 GroupRepository 负责建）
    // ==========================================

    fn load_group_tx(conn: &Connection, id: GroupId) -> RepositoryResult<GroupNode> {
        conn.query_row(
            "SELECT id, group_stream_id, parent_id, number FROM study_group WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(GroupNode {
                    id: GroupId(row.get(0)?),
                    group_stream: GroupStreamId(row.get(1)?),
                    parent: row.get::<_, Option<i64>>(2)?.map(GroupId),
                    number: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Group", id: id.0 })
    }

    fn load_subgroup_tx(conn: &Connection, id: SubGroupId) -> RepositoryResult<SubGroup> {
        conn.query_row(
            "SELECT id, group_id, numerator, denominator FROM sub_group WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(SubGroup {
                    id: SubGroupId(row.get(0)?),
                    group: GroupId(row.get(1)?),
                    numerator: row.get(2)?,
                    denominator: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "SubGroup", id: id.0 })
    }

    fn load_arena_tx(conn: &Connection, stream: GroupStreamId) -> RepositoryResult<GroupArena> {
        let mut stmt = conn.prepare(
            "SELECT id, group_stream_id, parent_id, number FROM study_group
             WHERE group_stream_id = ?1",
        )?;
        let rows = stmt.query_map(params![stream.0], |row| {
            Ok(GroupNode {
                id: GroupId(row.get(0)?),
                group_stream: GroupStreamId(row.get(1)?),
                parent: row.get::<_, Option<i64>>(2)?.map(GroupId),
                number: row.get(3)?,
            })
        })?;
        let mut arena = GroupArena::new();
        for row in rows {
            arena.insert(row?);
        }
        Ok(arena)
    }

    fn load_stream_subgroups_tx(
        conn: &Connection,
        stream: GroupStreamId,
    ) -> RepositoryResult<Vec<SubGroup>> {
        let mut stmt = conn.prepare(
            "SELECT s.id, s.group_id, s.numerator, s.denominator
             FROM sub_group s JOIN study_group g ON s.group_id = g.id
             WHERE g.group_stream_id = ?1",
        )?;
        let rows = stmt.query_map(params![stream.0], |row| {
            Ok(SubGroup {
                id: SubGroupId(row.get(0)?),
                group: GroupId(row.get(1)?),
                numerator: row.get(2)?,
                denominator: row.get(3)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

/// "?,?,...,?" 占位符序列（IN 子句用）
fn sql_placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}
