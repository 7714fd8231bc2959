// ==========================================
// 高校排课系统 - 基础参照数据仓储
// ==========================================
// 职责: 学院/系/科目/人员/教师/专业/教学楼/教室的增删查
// 约定: 共享引用一律 ON DELETE RESTRICT（引用保护），
//       归属关系 ON DELETE CASCADE（独占所有权）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::error::ValidationError;
use crate::domain::reference::{
    Building, Classroom, Department, Faculty, Person, Specialty, Subject, Teacher,
};
use crate::domain::types::{
    BuildingId, ClassroomId, DepartmentId, FacultyId, PersonId, SpecialtyId, SubjectId,
    TeacherId,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct ReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepository {
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
            CREATE TABLE IF NOT EXISTS faculty (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL UNIQUE,
              abbreviation TEXT UNIQUE
            );

            CREATE TABLE IF NOT EXISTS department (
              id INTEGER PRIMARY KEY,
              faculty_id INTEGER NOT NULL REFERENCES faculty(id) ON DELETE RESTRICT,
              name TEXT NOT NULL UNIQUE,
              abbreviation TEXT UNIQUE
            );

            CREATE TABLE IF NOT EXISTS subject (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              department_id INTEGER REFERENCES department(id) ON DELETE RESTRICT,
              UNIQUE(name, department_id)
            );

            CREATE TABLE IF NOT EXISTS person (
              id INTEGER PRIMARY KEY,
              first_name TEXT NOT NULL,
              middle_name TEXT NOT NULL,
              last_name TEXT NOT NULL,
              UNIQUE(first_name, middle_name, last_name)
            );

            CREATE TABLE IF NOT EXISTS teacher (
              id INTEGER PRIMARY KEY,
              person_id INTEGER NOT NULL UNIQUE REFERENCES person(id) ON DELETE RESTRICT,
              department_id INTEGER NOT NULL REFERENCES department(id) ON DELETE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS specialty (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              number INTEGER NOT NULL UNIQUE,
              abbreviation TEXT NOT NULL UNIQUE,
              faculty_id INTEGER REFERENCES faculty(id) ON DELETE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS building (
              id INTEGER PRIMARY KEY,
              number INTEGER NOT NULL UNIQUE,
              address TEXT UNIQUE
            );

            CREATE TABLE IF NOT EXISTS classroom (
              id INTEGER PRIMARY KEY,
              building_id INTEGER NOT NULL REFERENCES building(id) ON DELETE CASCADE,
              number INTEGER NOT NULL,
              UNIQUE(building_id, number)
            );
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // 学院 / 系
    // ==========================================

    pub fn create_faculty(
        &self,
        name: &str,
        abbreviation: Option<&str>,
    ) -> RepositoryResult<FacultyId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO faculty (name, abbreviation) VALUES (?1, ?2)",
            params![name, abbreviation],
        )?;
        Ok(FacultyId(conn.last_insert_rowid()))
    }

    pub fn get_faculty(&self, id: FacultyId) -> RepositoryResult<Faculty> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, name, abbreviation FROM faculty WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(Faculty {
                    id: FacultyId(row.get(0)?),
                    name: row.get(1)?,
                    abbreviation: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Faculty", id: id.0 })
    }

    pub fn create_department(
        &self,
        faculty: FacultyId,
        name: &str,
        abbreviation: Option<&str>,
    ) -> RepositoryResult<DepartmentId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO department (faculty_id, name, abbreviation) VALUES (?1, ?2, ?3)",
            params![faculty.0, name, abbreviation],
        )?;
        Ok(DepartmentId(conn.last_insert_rowid()))
    }

    pub fn get_department(&self, id: DepartmentId) -> RepositoryResult<Department> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, faculty_id, name, abbreviation FROM department WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(Department {
                    id: DepartmentId(row.get(0)?),
                    faculty: FacultyId(row.get(1)?),
                    name: row.get(2)?,
                    abbreviation: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Department", id: id.0 })
    }

    // ==========================================
    // 科目
    // ==========================================

    pub fn create_subject(
        &self,
        name: &str,
        department: Option<DepartmentId>,
    ) -> RepositoryResult<SubjectId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO subject (name, department_id) VALUES (?1, ?2)",
            params![name, department.map(|d| d.0)],
        )?;
        Ok(SubjectId(conn.last_insert_rowid()))
    }

    pub fn get_subject(&self, id: SubjectId) -> RepositoryResult<Subject> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, name, department_id FROM subject WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(Subject {
                    id: SubjectId(row.get(0)?),
                    name: row.get(1)?,
                    department: row.get::<_, Option<i64>>(2)?.map(DepartmentId),
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Subject", id: id.0 })
    }

    // ==========================================
    // 人员 / 教师
    // ==========================================

    pub fn create_person(
        &self,
        first_name: &str,
        middle_name: &str,
        last_name: &str,
    ) -> RepositoryResult<PersonId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO person (first_name, middle_name, last_name) VALUES (?1, ?2, ?3)",
            params![first_name, middle_name, last_name],
        )?;
        Ok(PersonId(conn.last_insert_rowid()))
    }

    pub fn get_person(&self, id: PersonId) -> RepositoryResult<Person> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, first_name, middle_name, last_name FROM person WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(Person {
                    id: PersonId(row.get(0)?),
                    first_name: row.get(1)?,
                    middle_name: row.get(2)?,
                    last_name: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Person", id: id.0 })
    }

    pub fn create_teacher(
        &self,
        person: PersonId,
        department: DepartmentId,
    ) -> RepositoryResult<TeacherId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO teacher (person_id, department_id) VALUES (?1, ?2)",
            params![person.0, department.0],
        )?;
        Ok(TeacherId(conn.last_insert_rowid()))
    }

    pub fn get_teacher(&self, id: TeacherId) -> RepositoryResult<Teacher> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, person_id, department_id FROM teacher WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(Teacher {
                    id: TeacherId(row.get(0)?),
                    person: PersonId(row.get(1)?),
                    department: DepartmentId(row.get(2)?),
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Teacher", id: id.0 })
    }

    // ==========================================
    // 专业
    // ==========================================

    pub fn create_specialty(
        &self,
        name: &str,
        number: u16,
        abbreviation: &str,
        faculty: Option<FacultyId>,
    ) -> RepositoryResult<SpecialtyId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO specialty (name, number, abbreviation, faculty_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, number, abbreviation, faculty.map(|f| f.0)],
        )?;
        Ok(SpecialtyId(conn.last_insert_rowid()))
    }

    pub fn get_specialty(&self, id: SpecialtyId) -> RepositoryResult<Specialty> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, name, number, abbreviation, faculty_id FROM specialty WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(Specialty {
                    id: SpecialtyId(row.get(0)?),
                    name: row.get(1)?,
                    number: row.get(2)?,
                    abbreviation: row.get(3)?,
                    faculty: row.get::<_, Option<i64>>(4)?.map(FacultyId),
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Specialty", id: id.0 })
    }

    // ==========================================
    // 教学楼 / 教室
    // ==========================================

    pub fn create_building(
        &self,
        number: u16,
        address: Option<&str>,
    ) -> RepositoryResult<BuildingId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO building (number, address) VALUES (?1, ?2)",
            params![number, address],
        )?;
        Ok(BuildingId(conn.last_insert_rowid()))
    }

    pub fn create_classroom(
        &self,
        building: BuildingId,
        number: u16,
    ) -> RepositoryResult<ClassroomId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO classroom (building_id, number) VALUES (?1, ?2)",
            params![building.0, number],
        )?;
        Ok(ClassroomId(conn.last_insert_rowid()))
    }

    pub fn get_classroom(&self, id: ClassroomId) -> RepositoryResult<Classroom> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, building_id, number FROM classroom WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(Classroom {
                    id: ClassroomId(row.get(0)?),
                    building: BuildingId(row.get(1)?),
                    number: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Classroom", id: id.0 })
    }

    // ==========================================
    // 删除（引用保护）
    // ==========================================

    /// 删除单行；存在受保护引用时返回 ForeignReferenceInUse
    fn delete_protected(
        &self,
        table: &'static str,
        entity: &'static str,
        id: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let result = conn.execute(&sql, params![id]);
        match result.map_err(RepositoryError::from) {
            Ok(0) => Err(RepositoryError::NotFound { entity, id }),
            Ok(_) => Ok(()),
            Err(RepositoryError::ForeignKeyViolation(_)) => Err(RepositoryError::Validation(
                ValidationError::ForeignReferenceInUse {
                    entity: format!("{} {}", entity, id),
                },
            )),
            Err(e) => Err(e),
        }
    }

    pub fn delete_subject(&self, id: SubjectId) -> RepositoryResult<()> {
        self.delete_protected("subject", "Subject", id.0)
    }

    pub fn delete_teacher(&self, id: TeacherId) -> RepositoryResult<()> {
        self.delete_protected("teacher", "Teacher", id.0)
    }

    pub fn delete_classroom(&self, id: ClassroomId) -> RepositoryResult<()> {
        self.delete_protected("classroom", "Classroom", id.0)
    }

    pub fn delete_faculty(&self, id: FacultyId) -> RepositoryResult<()> {
        self.delete_protected("faculty", "Faculty", id.0)
    }
}
