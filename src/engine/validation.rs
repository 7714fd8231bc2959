// ==========================================
// 高校排课系统 - 校验链
// ==========================================
// 职责: 每类实体一条显式有序的命名检查链，首个失败即返回
// 红线: 不依赖继承式 super().clean() 链，检查顺序写死在数组里
// ==========================================

use crate::config::settings::TimetableConfig;
use crate::domain::error::{ValidationError, ValidationResult};
use crate::domain::group::{GroupArena, GroupNode, SubGroup};
use crate::domain::lesson_slot::LessonSlot;
use crate::domain::yearless::YearlessDateRange;
use chrono::NaiveDate;
use tracing::warn;

// ==========================================
// 课表节次校验
// ==========================================

/// 节次域校验（编解码本身不设边界，边界在这里）
///
/// 检查: 单双周标记可识别、星期属于工作日集合、节次在 1..=每日上限
pub fn check_lesson_slot(slot: LessonSlot, config: &TimetableConfig) -> ValidationResult<()> {
    let (week, weekday, period) = (slot.week_raw(), slot.weekday(), slot.period());
    let invalid = || ValidationError::InvalidLessonSlot { week, weekday, period };

    if slot.week().is_none() {
        return Err(invalid());
    }
    if weekday > u8::MAX as u16 || !config.is_work_day(weekday as u8) {
        return Err(invalid());
    }
    if period < 1 || period > config.max_lessons_per_day as u16 {
        return Err(invalid());
    }
    Ok(())
}

// ==========================================
// 小组校验链
// ==========================================

/// 合班班级下的小组必须也是整班
fn check_union_consistency(subgroup: &SubGroup, owner: &GroupNode) -> ValidationResult<()> {
    if owner.is_union() && !subgroup.is_union() {
        return Err(ValidationError::InvalidSubgroupPartition {
            reason: "班级为合班，小组的 numerator 与 denominator 必须为零".to_string(),
        });
    }
    Ok(())
}

/// 非合班班级下，denominator 非零时 numerator 不可为零
fn check_partition_numerator(subgroup: &SubGroup, owner: &GroupNode) -> ValidationResult<()> {
    if !owner.is_union() && subgroup.numerator == 0 && subgroup.denominator != 0 {
        return Err(ValidationError::InvalidSubgroupPartition {
            reason: "班级不是合班，numerator 不可为零".to_string(),
        });
    }
    Ok(())
}

/// numerator 不得超过 denominator
fn check_partition_bounds(subgroup: &SubGroup, _owner: &GroupNode) -> ValidationResult<()> {
    if subgroup.numerator > subgroup.denominator {
        return Err(ValidationError::InvalidSubgroupPartition {
            reason: format!(
                "numerator {} 不得大于 denominator {}",
                subgroup.numerator, subgroup.denominator
            ),
        });
    }
    Ok(())
}

/// 小组完整校验链
///
/// # 参数
/// - siblings: 同班级下的既有小组（不含探测小组自身）
pub fn validate_subgroup(
    subgroup: &SubGroup,
    owner: &GroupNode,
    siblings: &[SubGroup],
) -> ValidationResult<()> {
    type Check = fn(&SubGroup, &GroupNode) -> ValidationResult<()>;
    const CHECKS: [Check; 3] = [
        check_union_consistency,
        check_partition_numerator,
        check_partition_bounds,
    ];
    for check in CHECKS {
        check(subgroup, owner)?;
    }

    if siblings
        .iter()
        .any(|s| s.id != subgroup.id && s.same_split(subgroup))
    {
        return Err(ValidationError::DuplicateSubGroup {
            group: subgroup.group.0,
            numerator: subgroup.numerator,
            denominator: subgroup.denominator,
        });
    }
    Ok(())
}

// ==========================================
// 班级树插入/移动校验链
// ==========================================

/// 父节点必须存在、同属一个年级组，且不得为自身或自身后代（防环）
fn check_parent(arena: &GroupArena, candidate: &GroupNode) -> ValidationResult<()> {
    let Some(parent_id) = candidate.parent else {
        return Ok(());
    };
    let invalid = || ValidationError::InvalidParent {
        group: Some(candidate.id.0),
        parent: parent_id.0,
    };

    let Some(parent) = arena.get(parent_id) else {
        return Err(invalid());
    };
    if parent.group_stream != candidate.group_stream {
        return Err(invalid());
    }
    if parent_id == candidate.id || arena.is_ancestor_of(candidate.id, parent_id) {
        return Err(invalid());
    }
    Ok(())
}

/// 树高校验: 祖先数 + 1 + 子树最大深度 ≤ 上限
fn check_tree_height(
    arena: &GroupArena,
    candidate: &GroupNode,
    config: &TimetableConfig,
) -> ValidationResult<()> {
    // 在副本上落位候选节点后量高度（树受高度上限约束，副本开销可忽略）
    let mut occupied = arena.clone();
    occupied.insert(*candidate);
    let computed = occupied.occupied_height(candidate.id);
    if computed > config.max_group_tree_height {
        warn!(
            group = candidate.id.0,
            computed = computed,
            max = config.max_group_tree_height,
            "班级树超高，拒绝插入/移动"
        );
        return Err(ValidationError::TreeTooDeep {
            computed,
            max: config.max_group_tree_height,
        });
    }
    Ok(())
}

/// 同级唯一性: (年级组, 父节点, 编号) 不得重复
fn check_sibling_unique(arena: &GroupArena, candidate: &GroupNode) -> ValidationResult<()> {
    let duplicate = arena.iter().any(|n| {
        n.id != candidate.id
            && n.group_stream == candidate.group_stream
            && n.parent == candidate.parent
            && n.number == candidate.number
    });
    if duplicate {
        return Err(ValidationError::DuplicateGroup {
            parent: candidate.parent.map(|p| p.0),
            number: candidate.number,
        });
    }
    Ok(())
}

/// 班级插入/移动完整校验链
///
/// # 参数
/// - arena: 相关年级组的当前树（移动时包含候选节点的旧状态）
/// - candidate: 待落位的节点（新值）
pub fn validate_group_placement(
    arena: &GroupArena,
    candidate: &GroupNode,
    config: &TimetableConfig,
) -> ValidationResult<()> {
    type Check = fn(&GroupArena, &GroupNode) -> ValidationResult<()>;
    const CHECKS: [Check; 2] = [check_parent, check_sibling_unique];
    for check in CHECKS {
        check(arena, candidate)?;
    }
    check_tree_height(arena, candidate, config)
}

// ==========================================
// 日期与模板校验
// ==========================================

/// 学期起止日期不可倒置
pub fn check_curriculum_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ValidationResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::DateRangeInverted {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
    }
    Ok(())
}

/// 同一学制的学期日期模板不得互相重叠
///
/// # 参数
/// - existing: (模板序号, 区间) 列表
/// - candidate_seq: 新模板序号
pub fn check_template_overlap(
    existing: &[(u16, YearlessDateRange)],
    candidate_seq: u16,
    candidate: &YearlessDateRange,
) -> ValidationResult<()> {
    for (seq, range) in existing {
        if *seq != candidate_seq && range.overlaps(candidate) {
            return Err(ValidationError::DateRangesOverlapping {
                first: *seq as usize,
                second: candidate_seq as usize,
            });
        }
    }
    Ok(())
}

/// 入学年份须落在 [start_year, 今年]
pub fn check_stream_year(
    year: i32,
    config: &TimetableConfig,
    current_year: i32,
) -> ValidationResult<()> {
    if year < config.start_year || year > current_year {
        return Err(ValidationError::YearOutOfRange {
            year,
            min: config.start_year,
            max: current_year,
        });
    }
    Ok(())
}
