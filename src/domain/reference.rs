// ==========================================
// 高校排课系统 - 基础参照数据
// ==========================================
// 职责: 学院/系/专业/科目/人员/教师/教学楼/教室等扁平参照实体
// 约束: 参照实体为共享引用，删除时受保护（仓储层 RESTRICT）
// ==========================================

use crate::domain::types::{
    BuildingId, ClassroomId, DepartmentId, FacultyId, PersonId, SpecialtyId, SubjectId,
    TeacherId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 学院
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub name: String,
    pub abbreviation: Option<String>,
}

impl fmt::Display for Faculty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.abbreviation {
            Some(abbr) => write!(f, "{}", abbr),
            None => write!(f, "{}", self.name),
        }
    }
}

/// 系/教研室
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub faculty: FacultyId,
    pub name: String,
    pub abbreviation: Option<String>,
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.abbreviation {
            Some(abbr) => write!(f, "{}", abbr),
            None => write!(f, "{}", self.name),
        }
    }
}

/// 课程科目
///
/// 同名科目在不同系允许并存，唯一键为 (name, department)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub department: Option<DepartmentId>,
}

/// 人员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.first_name, self.middle_name, self.last_name)
    }
}

/// 教师
///
/// person 一对一，归属某个系
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub person: PersonId,
    pub department: DepartmentId,
}

/// 专业
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialty {
    pub id: SpecialtyId,
    pub name: String,
    pub number: u16,
    pub abbreviation: String,
    pub faculty: Option<FacultyId>,
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.number, self.name)
    }
}

/// 教学楼
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub number: u16,
    pub address: Option<String>,
}

/// 教室
///
/// 唯一键为 (building, number)，随教学楼级联删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub building: BuildingId,
    pub number: u16,
}
