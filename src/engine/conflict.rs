// ==========================================
// 高校排课系统 - 冲突解析引擎
// ==========================================
// 职责: 冲突集计算与提交前唯一性校验（纯函数，数据由仓储层装载）
// 原则: 两个小组冲突，当且仅当其学生集合可能相交——
//       同一年级组下至少一方为整班/合班，或同班同一划分；冲突关系对称
// 红线: 校验必须在提交事务内重跑，存储层唯一索引作最后防线
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use crate::domain::group::{GroupArena, GroupNode, SubGroup};
use crate::domain::lesson::{CurriculumRecord, Lesson, TimeTableRecording};
use crate::domain::types::{GroupId, SubGroupId};
use std::collections::HashSet;
use tracing::debug;

// ==========================================
// 冲突集计算
// ==========================================

/// 与指定班级可能共享学生的其他班级
///
/// 规则:
/// - 同一年级组下的其他班级，若探测班级为合班则全部冲突，
///   否则仅合班班级冲突（两个不同的显式划分不共享学生）
/// - 树上的祖先与后代必然共享学生，无条件冲突
pub fn conflict_groups(arena: &GroupArena, probe: &GroupNode) -> Vec<GroupId> {
    arena
        .stream_groups(probe.group_stream)
        .into_iter()
        .filter(|n| n.id != probe.id)
        .filter(|n| {
            probe.is_union()
                || n.is_union()
                || arena.is_ancestor_of(n.id, probe.id)
                || arena.is_ancestor_of(probe.id, n.id)
        })
        .map(|n| n.id)
        .collect()
}

/// 与指定小组互斥的小组集合（含探测小组自身，调用方按主键排除）
///
/// 规则:
/// - 冲突班级（合班/祖先/后代）下的全部小组
/// - 其余同年级组班级: 整班小组必然互斥（整班覆盖该班全部学生，
///   与任何可能同源的学生集合相交）
/// - 本班级内: 探测小组为整班时与本班全部小组互斥；
///   为划分小组时与本班整班小组及同一划分互斥
///
/// 判定对任意两个小组对称，与校验顺序无关。
///
/// # 参数
/// - subgroups: 探测小组所在年级组下的全部小组（由仓储层装载）
pub fn conflict_subgroups(
    arena: &GroupArena,
    subgroups: &[SubGroup],
    probe: &SubGroup,
) -> Vec<SubGroupId> {
    let Some(group) = arena.get(probe.group) else {
        return Vec::new();
    };
    let conflicting: HashSet<GroupId> = conflict_groups(arena, group).into_iter().collect();

    let result: Vec<SubGroupId> = subgroups
        .iter()
        .filter(|sg| {
            if sg.group == probe.group {
                return if probe.is_union() {
                    true
                } else {
                    sg.is_union() || sg.same_split(probe)
                };
            }
            let same_stream = arena
                .get(sg.group)
                .map(|owner| owner.group_stream == group.group_stream)
                .unwrap_or(false);
            if !same_stream {
                return false;
            }
            conflicting.contains(&sg.group) || sg.is_union() || probe.is_union()
        })
        .map(|sg| sg.id)
        .collect();

    debug!(
        probe = probe.id.0,
        group = probe.group.0,
        conflict_count = result.len(),
        "冲突小组集合计算完成"
    );
    result
}

// ==========================================
// 提交前唯一性校验
// ==========================================

/// 教师唯一性: 冲突课程中不得出现同一教师
///
/// # 参数
/// - conflicting: 与探测课程同学期/同科目/同种类且小组互斥的既有课程，
///   已按主键排除探测课程自身（幂等性要求）
pub fn check_unique_teacher(probe: &Lesson, conflicting: &[Lesson]) -> ValidationResult<()> {
    let Some(teacher) = probe.teacher else {
        return Ok(());
    };
    if let Some(dup) = conflicting.iter().find(|l| l.teacher == Some(teacher)) {
        return Err(ValidationError::DuplicateTeacher {
            teacher: teacher.0,
            lesson: dup.id.0,
        });
    }
    Ok(())
}

/// 课表记录唯一性
///
/// 字面契约（保守）: 冲突课程下只要已存在任何课表记录即拒绝，
/// 不限定节次。slot_aware=true 时仅拒绝同一打包节次的记录
/// （候选的更精确策略，默认关闭，见设计文档的待决问题）。
///
/// # 参数
/// - existing: 冲突课程下的既有课表记录，已按主键排除探测记录自身
pub fn check_unique_recording(
    probe: &TimeTableRecording,
    existing: &[TimeTableRecording],
    slot_aware: bool,
) -> ValidationResult<()> {
    let hit = existing
        .iter()
        .find(|r| !slot_aware || r.slot == probe.slot);
    if let Some(dup) = hit {
        return Err(ValidationError::DuplicateRecording {
            lesson: dup.lesson.0,
            recording: dup.id.0,
        });
    }
    Ok(())
}

/// 教学计划教师唯一性: 同一职责（学期+科目）下，
/// 祖先-后代闭包内的班级不得重复指派同一教师
///
/// # 参数
/// - related: 探测记录所在班级的祖先或后代班级上、同学期同科目的既有记录，
///   已按主键排除探测记录自身
pub fn check_record_teacher(
    probe: &CurriculumRecord,
    related: &[CurriculumRecord],
) -> ValidationResult<()> {
    let Some(teacher) = probe.teacher else {
        return Ok(());
    };
    if let Some(dup) = related.iter().find(|r| r.teacher == Some(teacher)) {
        return Err(ValidationError::DuplicateTeacherForRecord {
            teacher: teacher.0,
            group: dup.group.0,
        });
    }
    Ok(())
}
