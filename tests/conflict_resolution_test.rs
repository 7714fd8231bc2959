// ==========================================
// 高校排课系统 - 冲突解析集成测试
// ==========================================
// 覆盖: 教师唯一性、课表记录唯一性（字面契约与节次感知）、
//       教学计划记录的祖先-后代教师唯一性、重存幂等
// ==========================================


use test_helpers::{open_test_api, seed_reference_data, SeedData};
use timetable_core::config::config_keys;
use timetable_core::domain::error::ValidationError;
use timetable_core::domain::types::{
    GroupId, GroupStreamId, LessonKind, SubGroupId, WeekParity,
};
use timetable_core::{ApiError, LessonSlot, TimetableApi};

struct Fixture {
    api: TimetableApi,
    seed: SeedData,
    stream: GroupStreamId,
    union_sg: SubGroupId,
    g1: GroupId,
    g2: GroupId,
    sg1: SubGroupId,
    sg2: SubGroupId,
}

/// 年级组: 合班 + 两个实班（各带整班小组）
fn build_fixture() -> Fixture {
    let api = open_test_api();
    let seed = seed_reference_data(&api);
    let stream = api.create_group_stream(seed.specialty, 2019, seed.form).unwrap();
    let union_group = api.get_union_group(stream).unwrap();
    let union_sg = api.get_union_subgroup(union_group).unwrap();
    let g1 = api.create_group(stream, None, 1).unwrap();
    let g2 = api.create_group(stream, None, 2).unwrap();
    let sg1 = api.get_union_subgroup(g1).unwrap();
    let sg2 = api.get_union_subgroup(g2).unwrap();
    Fixture {
        api,
        seed,
        stream,
        union_sg,
        g1,
        g2,
        sg1,
        sg2,
    }
}

fn slot(weekday: u8, period: u8) -> LessonSlot {
    LessonSlot::from_parts(WeekParity::Numerator, weekday, period)
}

// ==========================================
// 教师唯一性 (DuplicateTeacher)
// ==========================================

#[test]
fn test_same_teacher_on_union_and_partition_rejected() {
    let f = build_fixture();
    // 合班上的课程占住教师 A
    f.api
        .create_lesson(f.union_sg, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();

    // 实班 1 与合班共享学生，教师 A 重复
    let err = f
        .api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::DuplicateTeacher { .. })
    ));

    // 换教师 B 通过
    f.api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_b))
        .unwrap();
}

#[test]
fn test_sibling_union_subgroups_reject_same_teacher() {
    let f = build_fixture();
    // 实班 1 整班小组占住教师 A
    f.api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();

    // 兄弟实班的整班小组互为冲突，教师 A 重复
    let err = f
        .api
        .create_lesson(f.sg2, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::DuplicateTeacher { .. })
    ));

    // 换教师 B 通过
    f.api
        .create_lesson(f.sg2, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_b))
        .unwrap();
}

#[test]
fn test_teacher_conflict_scoped_by_semester_subject_kind() {
    let f = build_fixture();
    f.api
        .create_lesson(f.union_sg, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();

    // 不同学期 / 不同科目 / 不同种类均不冲突
    f.api
        .create_lesson(f.sg1, 2, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();
    f.api
        .create_lesson(f.sg1, 1, f.seed.subject_physics, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();
    f.api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Practice, Some(f.seed.teacher_a))
        .unwrap();
}

#[test]
fn test_split_subgroups_same_scheme_conflict() {
    let f = build_fixture();
    let half1 = f.api.create_subgroup(f.g1, 1, 2).unwrap();
    let half2 = f.api.create_subgroup(f.g1, 2, 2).unwrap();

    f.api
        .create_lesson(half1, 1, f.seed.subject_math, LessonKind::Laboratory, Some(f.seed.teacher_a))
        .unwrap();
    // 1/2 与 2/2 学生互斥，同一教师允许
    f.api
        .create_lesson(half2, 1, f.seed.subject_math, LessonKind::Laboratory, Some(f.seed.teacher_a))
        .unwrap();

    // 本班整班小组与任意划分冲突
    let err = f
        .api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Laboratory, Some(f.seed.teacher_a))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::DuplicateTeacher { .. })
    ));
}

#[test]
fn test_revalidate_lesson_idempotent() {
    let f = build_fixture();
    let lesson = f
        .api
        .create_lesson(f.union_sg, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();
    f.api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_b))
        .unwrap();

    // 校验排除自身主键，重存必须通过
    f.api.revalidate_lesson(lesson).unwrap();
}

// ==========================================
// 课表记录唯一性 (DuplicateRecording)
// ==========================================

#[test]
fn test_recording_literal_contract_ignores_slot() {
    let f = build_fixture();
    let l_union = f
        .api
        .create_lesson(f.union_sg, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();
    let l_g1 = f
        .api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_b))
        .unwrap();

    f.api
        .create_recording(l_union, slot(0, 1), Some(f.seed.classroom), None, None, None)
        .unwrap();

    // 字面契约: 冲突课程已有记录，不同节次同样拒绝
    let err = f
        .api
        .create_recording(l_g1, slot(1, 2), Some(f.seed.classroom), None, None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::DuplicateRecording { .. })
    ));
}

#[test]
fn test_recording_slot_aware_mode() {
    let mut f = build_fixture();
    f.api
        .config_manager()
        .set_config_value(config_keys::SLOT_AWARE_RECORDING_CHECK, "true")
        .unwrap();
    f.api.reload_config().unwrap();
    assert!(f.api.config().slot_aware_recording_check);

    let l_union = f
        .api
        .create_lesson(f.union_sg, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_a))
        .unwrap();
    let l_g1 = f
        .api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, Some(f.seed.teacher_b))
        .unwrap();

    f.api
        .create_recording(l_union, slot(0, 1), None, None, None, None)
        .unwrap();

    // 节次感知: 不同节次放行
    let rec = f
        .api
        .create_recording(l_g1, slot(1, 2), None, None, None, None)
        .unwrap();
    f.api.revalidate_recording(rec).unwrap();

    // 同节次拒绝
    let err = f
        .api
        .create_recording(l_g1, slot(0, 1), None, None, None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::DuplicateRecording { .. })
    ));
}

#[test]
fn test_recording_slot_domain_checks() {
    let f = build_fixture();
    let lesson = f
        .api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, None)
        .unwrap();

    // 周日不是默认工作日
    let err = f
        .api
        .create_recording(lesson, slot(6, 1), None, None, None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::InvalidLessonSlot { .. })
    ));
    // 第 0 节 / 超出每日上限
    for bad in [slot(0, 0), slot(0, 6)] {
        let err = f
            .api
            .create_recording(lesson, bad, None, None, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::InvalidLessonSlot { .. })
        ));
    }
}

#[test]
fn test_recordings_on_disjoint_split_lessons_coexist() {
    let f = build_fixture();
    let half1 = f.api.create_subgroup(f.g1, 1, 2).unwrap();
    let half2 = f.api.create_subgroup(f.g1, 2, 2).unwrap();
    let l_h1 = f
        .api
        .create_lesson(half1, 1, f.seed.subject_math, LessonKind::Laboratory, Some(f.seed.teacher_a))
        .unwrap();
    let l_h2 = f
        .api
        .create_lesson(half2, 1, f.seed.subject_math, LessonKind::Laboratory, Some(f.seed.teacher_b))
        .unwrap();

    f.api
        .create_recording(l_h1, slot(0, 1), None, None, None, None)
        .unwrap();
    // 同班不同半组学生互斥，记录互不影响，同节次也允许
    f.api
        .create_recording(l_h2, slot(0, 1), None, None, None, None)
        .unwrap();

    assert_eq!(f.api.lessons().list_recordings_for_lesson(l_h1).unwrap().len(), 1);
}

// ==========================================
// 教学计划记录教师唯一性 (DuplicateTeacherForRecord)
// ==========================================

#[test]
fn test_record_teacher_unique_in_lineage() {
    let f = build_fixture();
    let child = f.api.create_group(f.stream, Some(f.g1), 1).unwrap();

    f.api
        .create_curriculum_record(f.g1, 1, f.seed.subject_math, 32, 16, 0, 16, Some(f.seed.teacher_a))
        .unwrap();

    // 后代班级同学期同科目，教师 A 重复
    let err = f
        .api
        .create_curriculum_record(child, 1, f.seed.subject_math, 32, 16, 0, 16, Some(f.seed.teacher_a))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::DuplicateTeacherForRecord { .. })
    ));

    // 换教师 / 换科目通过
    f.api
        .create_curriculum_record(child, 1, f.seed.subject_math, 32, 16, 0, 16, Some(f.seed.teacher_b))
        .unwrap();
    f.api
        .create_curriculum_record(child, 1, f.seed.subject_physics, 32, 0, 16, 16, Some(f.seed.teacher_a))
        .unwrap();

    // 旁系班级不在闭包内
    f.api
        .create_curriculum_record(f.g2, 1, f.seed.subject_math, 32, 16, 0, 16, Some(f.seed.teacher_a))
        .unwrap();
}

#[test]
fn test_subgroup_guarded_by_lessons() {
    let f = build_fixture();
    let half = f.api.create_subgroup(f.g1, 1, 2).unwrap();

    // 无课程时可改划分
    let mut after = f.api.groups().get_subgroup(half).unwrap();
    after.numerator = 1;
    after.denominator = 3;
    f.api.groups().update_subgroup(&after).unwrap();

    f.api
        .create_lesson(half, 1, f.seed.subject_math, LessonKind::Laboratory, None)
        .unwrap();

    // 课程存在后划分只读
    let mut frozen = f.api.groups().get_subgroup(half).unwrap();
    frozen.denominator = 4;
    frozen.numerator = 2;
    let err = f.api.groups().update_subgroup(&frozen).unwrap_err();
    assert!(matches!(
        err,
        timetable_core::repository::RepositoryError::Validation(
            ValidationError::ReadOnlyFieldChanged { entity: "SubGroup", .. }
        )
    ));

    // 不变更的重存通过
    let unchanged = f.api.groups().get_subgroup(half).unwrap();
    f.api.groups().update_subgroup(&unchanged).unwrap();
}

#[test]
fn test_lesson_subgroup_guarded_by_recordings() {
    let f = build_fixture();
    let lesson = f
        .api
        .create_lesson(f.sg1, 1, f.seed.subject_math, LessonKind::Lecture, None)
        .unwrap();

    // 无课表记录时换小组允许
    f.api.lessons().update_lesson_subgroup(lesson, f.sg2).unwrap();
    f.api.lessons().update_lesson_subgroup(lesson, f.sg1).unwrap();

    f.api
        .create_recording(lesson, slot(0, 1), None, None, None, None)
        .unwrap();
    let err = f.api.lessons().update_lesson_subgroup(lesson, f.sg2).unwrap_err();
    assert!(matches!(
        err,
        timetable_core::repository::RepositoryError::Validation(
            ValidationError::ReadOnlyFieldChanged { entity: "Lesson", .. }
        )
    ));
}
