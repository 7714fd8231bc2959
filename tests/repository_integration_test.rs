// ==========================================
// 高校排课系统 - 仓储层集成测试
// ==========================================
// 覆盖: 引用保护删除、配置覆写加载、模板重叠、文件库持久化
// ==========================================


use test_helpers::{open_test_api, seed_reference_data, yearless_range, TEST_YEAR};
use timetable_core::config::{config_keys, FixedYear};
use timetable_core::domain::error::ValidationError;
use timetable_core::domain::types::LessonKind;
use timetable_core::repository::RepositoryError;
use timetable_core::TimetableApi;

// ==========================================
// 引用保护删除
// ==========================================

#[test]
fn test_delete_subject_in_use_rejected() {
    let api = open_test_api();
    let seed = seed_reference_data(&api);
    let stream = api.create_group_stream(seed.specialty, 2019, seed.form).unwrap();
    let union_group = api.get_union_group(stream).unwrap();
    let union_sg = api.get_union_subgroup(union_group).unwrap();

    api.create_lesson(union_sg, 1, seed.subject_math, LessonKind::Lecture, None)
        .unwrap();

    // 课程仍引用科目，删除被引用保护拦截
    let err = api.references().delete_subject(seed.subject_math).unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Validation(ValidationError::ForeignReferenceInUse { .. })
    ));

    // 未被引用的科目可删
    api.references().delete_subject(seed.subject_physics).unwrap();
    let err = api.references().delete_subject(seed.subject_physics).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_delete_teacher_in_use_rejected() {
    let api = open_test_api();
    let seed = seed_reference_data(&api);
    let stream = api.create_group_stream(seed.specialty, 2019, seed.form).unwrap();
    let union_group = api.get_union_group(stream).unwrap();
    let union_sg = api.get_union_subgroup(union_group).unwrap();

    api.create_lesson(union_sg, 1, seed.subject_math, LessonKind::Lecture, Some(seed.teacher_a))
        .unwrap();

    let err = api.references().delete_teacher(seed.teacher_a).unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Validation(ValidationError::ForeignReferenceInUse { .. })
    ));
    api.references().delete_teacher(seed.teacher_b).unwrap();
}

// ==========================================
// 配置覆写
// ==========================================

#[test]
fn test_config_overrides_loaded_from_kv() {
    let mut api = open_test_api();
    let manager = api.config_manager();
    manager
        .set_config_value(config_keys::MAX_LESSONS_PER_DAY, "7")
        .unwrap();
    manager
        .set_config_value(config_keys::MAX_GROUP_TREE_HEIGHT, "2")
        .unwrap();
    manager.set_config_value(config_keys::WORK_DAYS, "[0,1,2,3,4]").unwrap();
    api.reload_config().unwrap();

    let config = api.config();
    assert_eq!(config.max_lessons_per_day, 7);
    assert_eq!(config.max_group_tree_height, 2);
    assert_eq!(config.work_days, vec![0, 1, 2, 3, 4]);
    // 周六不再是工作日
    assert!(!config.is_work_day(5));
}

#[test]
fn test_config_bad_value_falls_back_to_default() {
    let mut api = open_test_api();
    api.config_manager()
        .set_config_value(config_keys::MAX_LESSONS_PER_DAY, "不是数字")
        .unwrap();
    api.reload_config().unwrap();
    assert_eq!(api.config().max_lessons_per_day, 5);
}

#[test]
fn test_tree_height_override_applies() {
    let mut api = open_test_api();
    let seed = seed_reference_data(&api);
    api.config_manager()
        .set_config_value(config_keys::MAX_GROUP_TREE_HEIGHT, "2")
        .unwrap();
    api.reload_config().unwrap();

    let stream = api.create_group_stream(seed.specialty, 2019, seed.form).unwrap();
    let level1 = api.create_group(stream, None, 1).unwrap();
    let level2 = api.create_group(stream, Some(level1), 1).unwrap();
    let err = api.create_group(stream, Some(level2), 1).unwrap_err();
    assert!(matches!(
        err,
        timetable_core::ApiError::Validation(ValidationError::TreeTooDeep { computed: 3, max: 2 })
    ));
}

// ==========================================
// 学期日期模板
// ==========================================

#[test]
fn test_template_overlap_rejected() {
    let api = open_test_api();
    let seed = seed_reference_data(&api);
    api.study_plans()
        .add_semester_template(seed.form, 1, yearless_range(9, 1, 1, 31))
        .unwrap();

    // 12/1 - 2/28 跨年区间与秋季模板重叠
    let err = api
        .study_plans()
        .add_semester_template(seed.form, 2, yearless_range(12, 1, 2, 28))
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Validation(ValidationError::DateRangesOverlapping { first: 1, second: 2 })
    ));

    // 相邻不重叠区间可加
    api.study_plans()
        .add_semester_template(seed.form, 2, yearless_range(2, 1, 6, 30))
        .unwrap();
    assert_eq!(api.study_plans().list_templates(seed.form).unwrap().len(), 2);
}

// ==========================================
// 文件库持久化
// ==========================================

#[test]
fn test_file_backed_database_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("timetable.db");
    let db_path = db_path.to_str().unwrap();

    let stream;
    let specialty;
    {
        let api = TimetableApi::new(db_path)
            .unwrap()
            .with_year_provider(Box::new(FixedYear(TEST_YEAR)));
        let seed = seed_reference_data(&api);
        test_helpers::add_fall_spring_templates(&api, seed.form);
        specialty = seed.specialty;
        stream = api.create_group_stream(seed.specialty, 2019, seed.form).unwrap();
    }

    // 重新打开，数据仍在
    let api = TimetableApi::new(db_path)
        .unwrap()
        .with_year_provider(Box::new(FixedYear(TEST_YEAR)));
    let loaded = api.groups().get_group_stream(stream).unwrap();
    assert_eq!(loaded.specialty, specialty);
    assert_eq!(loaded.year, 2019);
    assert_eq!(api.list_curricula(stream).unwrap().len(), 8);
    assert!(api.get_union_group(stream).is_ok());
}
