// ==========================================
// 高校排课系统 - 班级树仓储
// ==========================================
// 职责: 年级组、班级树、小组、学期教学计划的数据访问
// 约束:
// - 年级组创建 = 插入 + 学期生成 + 默认合班，单事务完成
// - 班级移动后 group_stream 缓存向全部后代传播，与父更新同事务
// - 应用层校验为主，唯一索引为并发竞争的最后防线
// ==========================================

use crate::config::settings::TimetableConfig;
use crate::db::open_sqlite_connection;
use crate::domain::error::ValidationError;
use crate::domain::group::{GroupArena, GroupNode, SubGroup};
use crate::domain::study::{Curriculum, GroupStream};
use crate::domain::types::{
    CurriculumId, FormOfStudyId, GroupId, GroupStreamId, SpecialtyId, SubGroupId,
};
use crate::domain::yearless::{YearlessDate, YearlessDateRange};
use crate::engine::guarded::check_guarded;
use crate::engine::semester_generator::generate_semesters;
use crate::engine::validation::{
    check_curriculum_dates, check_stream_year, validate_group_placement, validate_subgroup,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub struct GroupRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GroupRepository {
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
            CREATE TABLE IF NOT EXISTS group_stream (
              id INTEGER PRIMARY KEY,
              specialty_id INTEGER NOT NULL REFERENCES specialty(id) ON DELETE RESTRICT,
              year INTEGER NOT NULL,
              form_id INTEGER NOT NULL REFERENCES form_of_study(id) ON DELETE RESTRICT,
              UNIQUE(specialty_id, year, form_id)
            );

            CREATE TABLE IF NOT EXISTS study_group (
              id INTEGER PRIMARY KEY,
              group_stream_id INTEGER NOT NULL REFERENCES group_stream(id) ON DELETE CASCADE,
              parent_id INTEGER REFERENCES study_group(id) ON DELETE CASCADE,
              number INTEGER NOT NULL DEFAULT 0
            );

            -- 同级唯一: 根节点 parent_id 为 NULL，用 COALESCE 归一后建唯一索引
            CREATE UNIQUE INDEX IF NOT EXISTS idx_study_group_sibling
              ON study_group(group_stream_id, COALESCE(parent_id, 0), number);

            CREATE TABLE IF NOT EXISTS sub_group (
              id INTEGER PRIMARY KEY,
              group_id INTEGER NOT NULL REFERENCES study_group(id) ON DELETE CASCADE,
              numerator INTEGER NOT NULL DEFAULT 0,
              denominator INTEGER NOT NULL DEFAULT 0,
              UNIQUE(group_id, numerator, denominator)
            );

            CREATE TABLE IF NOT EXISTS curriculum (
              id INTEGER PRIMARY KEY,
              group_stream_id INTEGER NOT NULL REFERENCES group_stream(id) ON DELETE CASCADE,
              semester INTEGER NOT NULL,
              start_date TEXT,
              end_date TEXT,
              UNIQUE(group_stream_id, semester)
            );
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // 年级组
    // ==========================================

    /// 创建年级组
    ///
    /// 副作用（与插入同事务）:
    /// 1. 学制存在日期模板时，生成全部学期教学计划
    /// 2. 确保默认合班班级及其整班小组存在
    pub fn create_group_stream(
        &self,
        specialty: SpecialtyId,
        year: i32,
        form: FormOfStudyId,
        config: &TimetableConfig,
        current_year: i32,
    ) -> RepositoryResult<GroupStreamId> {
        check_stream_year(year, config, current_year)?;

        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        // 学制的学期数与模板（模板缺失时不生成学期）
        let semesters: u16 = tx
            .query_row(
                "SELECT semesters FROM form_of_study WHERE id = ?1",
                params![form.0],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepositoryError::NotFound { entity: "FormOfStudy", id: form.0 })?;

        let mut templates = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT start_value, end_value FROM form_of_study_semester
                 WHERE form_id = ?1 ORDER BY seq",
            )?;
            let rows = stmt.query_map(params![form.0], |row| {
                Ok((row.get::<_, u16>(0)?, row.get::<_, u16>(1)?))
            })?;
            for row in rows {
                let (start_value, end_value) = row?;
                let start = YearlessDate::from_value(start_value).map_err(|_| {
                    RepositoryError::DataCorruption(format!("模板起始日期损坏: {}", start_value))
                })?;
                let end = YearlessDate::from_value(end_value).map_err(|_| {
                    RepositoryError::DataCorruption(format!("模板结束日期损坏: {}", end_value))
                })?;
                templates.push(YearlessDateRange::new(start, end));
            }
        }

        tx.execute(
            "INSERT INTO group_stream (specialty_id, year, form_id) VALUES (?1, ?2, ?3)",
            params![specialty.0, year, form.0],
        )?;
        let stream = GroupStreamId(tx.last_insert_rowid());

        // 学期生成仅在首次落库时执行，更新不重跑
        if !templates.is_empty() {
            for sem in generate_semesters(year, semesters, &templates)? {
                tx.execute(
                    "INSERT INTO curriculum (group_stream_id, semester, start_date, end_date)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![stream.0, sem.semester, sem.start, sem.end],
                )?;
            }
        }

        // 默认合班班级 + 整班小组
        tx.execute(
            "INSERT INTO study_group (group_stream_id, parent_id, number) VALUES (?1, NULL, 0)",
            params![stream.0],
        )?;
        let union_group = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO sub_group (group_id, numerator, denominator) VALUES (?1, 0, 0)",
            params![union_group],
        )?;

        tx.commit()?;
        info!(stream = stream.0, year = year, "年级组已创建");
        Ok(stream)
    }

    pub fn get_group_stream(&self, id: GroupStreamId) -> RepositoryResult<GroupStream> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, specialty_id, year, form_id FROM group_stream WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(GroupStream {
                    id: GroupStreamId(row.get(0)?),
                    specialty: SpecialtyId(row.get(1)?),
                    year: row.get(2)?,
                    form: FormOfStudyId(row.get(3)?),
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "GroupStream", id: id.0 })
    }

    /// 更新年级组
    ///
    /// 学期教学计划已生成时，year 与 form 为只读字段
    pub fn update_group_stream(
        &self,
        after: &GroupStream,
        config: &TimetableConfig,
        current_year: i32,
    ) -> RepositoryResult<()> {
        check_stream_year(after.year, config, current_year)?;
        let before = self.get_group_stream(after.id)?;

        let conn = self.get_conn()?;
        let has_curricula: bool = conn
            .query_row(
                "SELECT 1 FROM curriculum WHERE group_stream_id = ?1 LIMIT 1",
                params![after.id.0],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        check_guarded(after, &before, |_dependent| has_curricula)?;

        conn.execute(
            "UPDATE group_stream SET specialty_id = ?2, year = ?3, form_id = ?4 WHERE id = ?1",
            params![after.id.0, after.specialty.0, after.year, after.form.0],
        )?;
        Ok(())
    }

    // ==========================================
    // 班级树
    // ==========================================

    /// 装载一个年级组的班级树
    pub fn load_arena(&self, stream: GroupStreamId) -> RepositoryResult<GroupArena> {
        let conn = self.get_conn()?;
        Self::load_arena_tx(&conn, stream)
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

    pub fn get_group(&self, id: GroupId) -> RepositoryResult<GroupNode> {
        let conn = self.get_conn()?;
        Self::get_group_tx(&conn, id)
    }

    fn get_group_tx(conn: &Connection, id: GroupId) -> RepositoryResult<GroupNode> {
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

    /// 创建班级
    ///
    /// parent 为空时挂在年级组根层；非空时 group_stream 从父班级继承。
    /// 校验: 父节点有效性、同级编号唯一、树高上限。
    /// 副作用: 自动创建整班小组（与插入同事务）。
    pub fn create_group(
        &self,
        stream: GroupStreamId,
        parent: Option<GroupId>,
        number: u16,
        config: &TimetableConfig,
    ) -> RepositoryResult<GroupId> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let effective_stream = match parent {
            Some(parent_id) => Self::get_group_tx(&tx, parent_id)?.group_stream,
            None => stream,
        };

        let arena = Self::load_arena_tx(&tx, effective_stream)?;
        // 候选节点用 0 号占位主键（rowid 从 1 起，不会冲突）
        let candidate = GroupNode {
            id: GroupId(0),
            group_stream: effective_stream,
            parent,
            number,
        };
        validate_group_placement(&arena, &candidate, config)?;

        tx.execute(
            "INSERT INTO study_group (group_stream_id, parent_id, number) VALUES (?1, ?2, ?3)",
            params![effective_stream.0, parent.map(|p| p.0), number],
        )?;
        let group = GroupId(tx.last_insert_rowid());
        tx.execute(
            "INSERT INTO sub_group (group_id, numerator, denominator) VALUES (?1, 0, 0)",
            params![group.0],
        )?;

        tx.commit()?;
        debug!(group = group.0, stream = effective_stream.0, number = number, "班级已创建");
        Ok(group)
    }

    /// 移动班级到新的父节点
    ///
    /// group_stream 从新父节点重新推导，并在同一事务内向全部后代传播；
    /// 小组或教学计划记录存在时，group_stream 与 number 为只读字段。
    pub fn move_group(
        &self,
        id: GroupId,
        new_parent: Option<GroupId>,
        config: &TimetableConfig,
    ) -> RepositoryResult<()> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let before = Self::get_group_tx(&tx, id)?;
        let new_stream = match new_parent {
            Some(parent_id) => Self::get_group_tx(&tx, parent_id)?.group_stream,
            None => before.group_stream,
        };
        let after = GroupNode {
            id,
            group_stream: new_stream,
            parent: new_parent,
            number: before.number,
        };

        // 受保护字段检查（依赖行存在性在事务内查询）
        let has_subgroups = Self::exists_tx(
            &tx,
            "SELECT 1 FROM sub_group WHERE group_id = ?1 LIMIT 1",
            id.0,
        )?;
        let has_records = Self::table_exists_tx(&tx, "curriculum_record")?
            && Self::exists_tx(
                &tx,
                "SELECT 1 FROM curriculum_record WHERE group_id = ?1 LIMIT 1",
                id.0,
            )?;
        check_guarded(&after, &before, |dependent| match dependent {
            "SubGroup" => has_subgroups,
            "CurriculumRecord" => has_records,
            _ => false,
        })?;

        // 跨年级组移动时需要两棵树合并校验
        let mut arena = Self::load_arena_tx(&tx, before.group_stream)?;
        if new_stream != before.group_stream {
            for node in Self::load_arena_tx(&tx, new_stream)?.iter() {
                arena.insert(*node);
            }
        }
        arena.insert(after);
        validate_group_placement(&arena, &after, config)?;

        tx.execute(
            "UPDATE study_group SET group_stream_id = ?2, parent_id = ?3 WHERE id = ?1",
            params![id.0, new_stream.0, new_parent.map(|p| p.0)],
        )?;

        // group_stream 缓存传播: 递归 CTE 找出全部后代并整体刷新。
        // 传播失败随事务回滚，不允许半程状态落库。
        let updated = tx.execute(
            "UPDATE study_group SET group_stream_id = ?1 WHERE id IN (
               WITH RECURSIVE subtree(gid) AS (
                 SELECT id FROM study_group WHERE parent_id = ?2
                 UNION ALL
                 SELECT g.id FROM study_group g JOIN subtree s ON g.parent_id = s.gid
               )
               SELECT gid FROM subtree
             )",
            params![new_stream.0, id.0],
        )?;

        tx.commit()?;
        info!(
            group = id.0,
            new_parent = ?new_parent.map(|p| p.0),
            propagated = updated,
            "班级已移动"
        );
        Ok(())
    }

    /// 年级组的合班班级（number=0 的根节点），不存在则创建
    pub fn get_union_group(&self, stream: GroupStreamId) -> RepositoryResult<GroupId> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM study_group
                 WHERE group_stream_id = ?1 AND parent_id IS NULL AND number = 0 LIMIT 1",
                params![stream.0],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => GroupId(id),
            None => {
                tx.execute(
                    "INSERT INTO study_group (group_stream_id, parent_id, number)
                     VALUES (?1, NULL, 0)",
                    params![stream.0],
                )?;
                let group = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO sub_group (group_id, numerator, denominator) VALUES (?1, 0, 0)",
                    params![group],
                )?;
                GroupId(group)
            }
        };
        tx.commit()?;
        Ok(id)
    }

    // ==========================================
    // 小组
    // ==========================================

    pub fn get_subgroup(&self, id: SubGroupId) -> RepositoryResult<SubGroup> {
        let conn = self.get_conn()?;
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

    /// 创建小组（划分校验 + 同班唯一）
    pub fn create_subgroup(
        &self,
        group: GroupId,
        numerator: u16,
        denominator: u16,
    ) -> RepositoryResult<SubGroupId> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let owner = Self::get_group_tx(&tx, group)?;
        let siblings = Self::subgroups_of_group_tx(&tx, group)?;
        let candidate = SubGroup {
            id: SubGroupId(0),
            group,
            numerator,
            denominator,
        };
        validate_subgroup(&candidate, &owner, &siblings)?;

        tx.execute(
            "INSERT INTO sub_group (group_id, numerator, denominator) VALUES (?1, ?2, ?3)",
            params![group.0, numerator, denominator],
        )?;
        let id = SubGroupId(tx.last_insert_rowid());
        tx.commit()?;
        Ok(id)
    }

    /// 班级的整班小组，不存在则创建
    pub fn get_union_subgroup(&self, group: GroupId) -> RepositoryResult<SubGroupId> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM sub_group
                 WHERE group_id = ?1 AND numerator = 0 AND denominator = 0 LIMIT 1",
                params![group.0],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => SubGroupId(id),
            None => {
                tx.execute(
                    "INSERT INTO sub_group (group_id, numerator, denominator) VALUES (?1, 0, 0)",
                    params![group.0],
                )?;
                SubGroupId(tx.last_insert_rowid())
            }
        };
        tx.commit()?;
        Ok(id)
    }

    /// 更新小组划分
    ///
    /// 课程存在后，归属班级与划分为只读字段
    pub fn update_subgroup(&self, after: &SubGroup) -> RepositoryResult<()> {
        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let before: SubGroup = tx
            .query_row(
                "SELECT id, group_id, numerator, denominator FROM sub_group WHERE id = ?1",
                params![after.id.0],
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
            .ok_or(RepositoryError::NotFound { entity: "SubGroup", id: after.id.0 })?;

        let has_lessons = Self::table_exists_tx(&tx, "lesson")?
            && Self::exists_tx(
                &tx,
                "SELECT 1 FROM lesson WHERE subgroup_id = ?1 LIMIT 1",
                after.id.0,
            )?;
        check_guarded(after, &before, |_dependent| has_lessons)?;

        let owner = Self::get_group_tx(&tx, after.group)?;
        let siblings = Self::subgroups_of_group_tx(&tx, after.group)?;
        validate_subgroup(after, &owner, &siblings)?;

        tx.execute(
            "UPDATE sub_group SET group_id = ?2, numerator = ?3, denominator = ?4 WHERE id = ?1",
            params![after.id.0, after.group.0, after.numerator, after.denominator],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn subgroups_of_group(&self, group: GroupId) -> RepositoryResult<Vec<SubGroup>> {
        let conn = self.get_conn()?;
        Self::subgroups_of_group_tx(&conn, group)
    }

    fn subgroups_of_group_tx(conn: &Connection, group: GroupId) -> RepositoryResult<Vec<SubGroup>> {
        let mut stmt = conn.prepare(
            "SELECT id, group_id, numerator, denominator FROM sub_group WHERE group_id = ?1",
        )?;
        let rows = stmt.query_map(params![group.0], |row| {
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

    /// 年级组下的全部小组（冲突集计算的输入）
    pub fn load_stream_subgroups(&self, stream: GroupStreamId) -> RepositoryResult<Vec<SubGroup>> {
        let conn = self.get_conn()?;
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

    // ==========================================
    // 学期教学计划
    // ==========================================

    /// 手工补建学期教学计划（生成器之外的入口）
    pub fn create_curriculum(
        &self,
        stream: GroupStreamId,
        semester: u16,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> RepositoryResult<CurriculumId> {
        check_curriculum_dates(start_date, end_date)?;

        let mut guard = self.get_conn()?;
        let tx = guard.transaction()?;

        let duplicate: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM curriculum WHERE group_stream_id = ?1 AND semester = ?2 LIMIT 1",
                params![stream.0, semester],
                |row| row.get(0),
            )
            .optional()?;
        if duplicate.is_some() {
            return Err(RepositoryError::Validation(
                ValidationError::DuplicateCurriculum { stream: stream.0, semester },
            ));
        }

        tx.execute(
            "INSERT INTO curriculum (group_stream_id, semester, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![stream.0, semester, start_date, end_date],
        )?;
        let id = CurriculumId(tx.last_insert_rowid());
        tx.commit()?;
        Ok(id)
    }

    /// 年级组的全部学期教学计划，按学期升序
    pub fn list_curricula(&self, stream: GroupStreamId) -> RepositoryResult<Vec<Curriculum>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, group_stream_id, semester, start_date, end_date
             FROM curriculum WHERE group_stream_id = ?1 ORDER BY semester",
        )?;
        let rows = stmt.query_map(params![stream.0], |row| {
            Ok(Curriculum {
                id: CurriculumId(row.get(0)?),
                group_stream: GroupStreamId(row.get(1)?),
                semester: row.get(2)?,
                start_date: row.get(3)?,
                end_date: row.get(4)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn exists_tx(conn: &Connection, sql: &str, param: i64) -> RepositoryResult<bool> {
        let hit: Option<i64> = conn.query_row(sql, params![param], |row| row.get(0)).optional()?;
        Ok(hit.is_some())
    }

    fn table_exists_tx(conn: &Connection, table: &str) -> RepositoryResult<bool> {
        let hit: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }
}
