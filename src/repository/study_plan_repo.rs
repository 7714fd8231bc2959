// ==========================================
// 高校排课系统 - 学制仓储
// ==========================================
// 职责: 学制与学期日期模板的增删查
// 约束: 同一学制的模板禁止日期重叠（应用层校验为主）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::study::{FormOfStudy, SemesterTemplate};
use crate::domain::types::{FormOfStudyId, SemesterTemplateId};
use crate::domain::yearless::{YearlessDate, YearlessDateRange};
use crate::engine::validation::check_template_overlap;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct StudyPlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudyPlanRepository {
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
            CREATE TABLE IF NOT EXISTS form_of_study (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL UNIQUE,
              suffix TEXT NOT NULL UNIQUE,
              semesters INTEGER NOT NULL DEFAULT 8,
              priority INTEGER NOT NULL DEFAULT 5
            );

            -- 学期日期区间以打包 smallint 存储: month*32 + day
            CREATE TABLE IF NOT EXISTS form_of_study_semester (
              id INTEGER PRIMARY KEY,
              form_id INTEGER NOT NULL REFERENCES form_of_study(id) ON DELETE RESTRICT,
              seq INTEGER NOT NULL,
              start_value INTEGER NOT NULL,
              end_value INTEGER NOT NULL,
              UNIQUE(form_id, seq)
            );
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // 学制
    // ==========================================

    pub fn create_form(
        &self,
        name: &str,
        suffix: &str,
        semesters: u16,
        priority: u8,
    ) -> RepositoryResult<FormOfStudyId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO form_of_study (name, suffix, semesters, priority)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, suffix, semesters, priority],
        )?;
        let id = FormOfStudyId(conn.last_insert_rowid());
        info!(form = id.0, name = name, "学制已创建");
        Ok(id)
    }

    pub fn get_form(&self, id: FormOfStudyId) -> RepositoryResult<FormOfStudy> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, name, suffix, semesters, priority FROM form_of_study WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(FormOfStudy {
                    id: FormOfStudyId(row.get(0)?),
                    name: row.get(1)?,
                    suffix: row.get(2)?,
                    semesters: row.get(3)?,
                    priority: row.get(4)?,
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "FormOfStudy", id: id.0 })
    }

    // ==========================================
    // 学期日期模板
    // ==========================================

    /// 新增学期日期模板
    ///
    /// 同一学制下与既有模板重叠时拒绝（DateRangesOverlapping）
    pub fn add_semester_template(
        &self,
        form: FormOfStudyId,
        seq: u16,
        range: YearlessDateRange,
    ) -> RepositoryResult<SemesterTemplateId> {
        let existing: Vec<(u16, YearlessDateRange)> = self
            .list_templates(form)?
            .into_iter()
            .map(|t| (t.seq, t.date_range))
            .collect();
        check_template_overlap(&existing, seq, &range)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO form_of_study_semester (form_id, seq, start_value, end_value)
             VALUES (?1, ?2, ?3, ?4)",
            params![form.0, seq, range.start.value(), range.end.value()],
        )?;
        Ok(SemesterTemplateId(conn.last_insert_rowid()))
    }

    /// 指定学制的全部模板，按 seq 升序
    pub fn list_templates(&self, form: FormOfStudyId) -> RepositoryResult<Vec<SemesterTemplate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, form_id, seq, start_value, end_value
             FROM form_of_study_semester WHERE form_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![form.0], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, u16>(2)?,
                row.get::<_, u16>(3)?,
                row.get::<_, u16>(4)?,
            ))
        })?;

        let mut templates = Vec::new();
        for row in rows {
            let (id, form_id, seq, start_value, end_value) = row?;
            // 打包值损坏时显式报错，不静默跳过
            let start = YearlessDate::from_value(start_value).map_err(|_| {
                RepositoryError::DataCorruption(format!("模板 {} 起始日期损坏: {}", id, start_value))
            })?;
            let end = YearlessDate::from_value(end_value).map_err(|_| {
                RepositoryError::DataCorruption(format!("模板 {} 结束日期损坏: {}", id, end_value))
            })?;
            templates.push(SemesterTemplate {
                id: SemesterTemplateId(id),
                form: FormOfStudyId(form_id),
                seq,
                date_range: YearlessDateRange::new(start, end),
            });
        }
        Ok(templates)
    }
}
