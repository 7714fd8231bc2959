// ==========================================
// 高校排课系统 - 受保护字段检查
// ==========================================
// 职责: "存在依赖行后字段只读"规则的类型化实现
// 红线: 受保护字段清单在编译期写死，不做字符串反射式的字段查找
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use crate::domain::group::{GroupNode, SubGroup};
use crate::domain::lesson::Lesson;
use crate::domain::study::GroupStream;

/// 单个受保护字段的变更情况
#[derive(Debug, Clone, Copy)]
pub struct GuardedChange {
    /// 字段名（错误信息用）
    pub field: &'static str,
    /// 依赖实体名，存在该实体的行时字段只读
    pub dependent: &'static str,
    /// 与修改前快照相比是否变化
    pub changed: bool,
}

/// 存在依赖行后部分字段只读的实体
pub trait GuardedMutation {
    /// 实体名（错误信息用）
    const ENTITY: &'static str;

    /// 对照修改前快照，枚举受保护字段的变更情况
    fn guarded_changes(&self, before: &Self) -> Vec<GuardedChange>;
}

/// 执行受保护字段检查
///
/// # 参数
/// - dependent_exists: 依赖实体是否已有行（由仓储层查询后以闭包传入）
///
/// # 返回
/// - 有受保护字段变化且对应依赖行存在时返回 ReadOnlyFieldChanged
pub fn check_guarded<T, F>(after: &T, before: &T, dependent_exists: F) -> ValidationResult<()>
where
    T: GuardedMutation,
    F: Fn(&'static str) -> bool,
{
    let changes = after.guarded_changes(before);
    for change in &changes {
        if change.changed && dependent_exists(change.dependent) {
            let fields: Vec<&str> = changes
                .iter()
                .filter(|c| c.changed && c.dependent == change.dependent)
                .map(|c| c.field)
                .collect();
            return Err(ValidationError::ReadOnlyFieldChanged {
                entity: T::ENTITY,
                dependent: change.dependent,
                fields: fields.join(", "),
            });
        }
    }
    Ok(())
}

// ==========================================
// 各实体的受保护字段清单
// ==========================================

impl GuardedMutation for GroupStream {
    const ENTITY: &'static str = "GroupStream";

    /// 学期教学计划生成后，年份与学制不可再改
    fn guarded_changes(&self, before: &Self) -> Vec<GuardedChange> {
        vec![
            GuardedChange {
                field: "year",
                dependent: "Curriculum",
                changed: self.year != before.year,
            },
            GuardedChange {
                field: "form",
                dependent: "Curriculum",
                changed: self.form != before.form,
            },
        ]
    }
}

impl GuardedMutation for GroupNode {
    const ENTITY: &'static str = "Group";

    /// 小组或教学计划记录存在后，年级组与编号不可再改。
    /// parent 不在清单内: 同年级组内的挂靠调整始终允许。
    fn guarded_changes(&self, before: &Self) -> Vec<GuardedChange> {
        let mut changes = Vec::with_capacity(4);
        for dependent in ["SubGroup", "CurriculumRecord"] {
            changes.push(GuardedChange {
                field: "group_stream",
                dependent,
                changed: self.group_stream != before.group_stream,
            });
            changes.push(GuardedChange {
                field: "number",
                dependent,
                changed: self.number != before.number,
            });
        }
        changes
    }
}

impl GuardedMutation for SubGroup {
    const ENTITY: &'static str = "SubGroup";

    /// 课程存在后，归属班级与划分不可再改
    fn guarded_changes(&self, before: &Self) -> Vec<GuardedChange> {
        vec![
            GuardedChange {
                field: "group",
                dependent: "Lesson",
                changed: self.group != before.group,
            },
            GuardedChange {
                field: "numerator",
                dependent: "Lesson",
                changed: self.numerator != before.numerator,
            },
            GuardedChange {
                field: "denominator",
                dependent: "Lesson",
                changed: self.denominator != before.denominator,
            },
        ]
    }
}

impl GuardedMutation for Lesson {
    const ENTITY: &'static str = "Lesson";

    /// 课表记录存在后，课程不可再换小组
    fn guarded_changes(&self, before: &Self) -> Vec<GuardedChange> {
        vec![GuardedChange {
            field: "subgroup",
            dependent: "TimeTableRecording",
            changed: self.subgroup != before.subgroup,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FormOfStudyId, GroupStreamId, SpecialtyId};

    fn stream(year: i32, form: i64) -> GroupStream {
        GroupStream {
            id: GroupStreamId(1),
            specialty: SpecialtyId(1),
            year,
            form: FormOfStudyId(form),
        }
    }

    #[test]
    fn test_guarded_rejects_change_with_dependents() {
        let before = stream(2019, 1);
        let after = stream(2020, 1);
        let err = check_guarded(&after, &before, |_| true).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ReadOnlyFieldChanged { entity: "GroupStream", .. }
        ));
    }

    #[test]
    fn test_guarded_allows_change_without_dependents() {
        let before = stream(2019, 1);
        let after = stream(2020, 2);
        assert!(check_guarded(&after, &before, |_| false).is_ok());
    }

    #[test]
    fn test_guarded_allows_unchanged() {
        let before = stream(2019, 1);
        let after = stream(2019, 1);
        assert!(check_guarded(&after, &before, |_| true).is_ok());
    }
}
