// ==========================================
// 高校排课系统 - 学期生成器
// ==========================================
// 职责: 依据学制的循环日期模板，为新建年级组派生带具体日期的学期序列
// 算法: 维护 last_date，模板月日落年后若早于 last_date 则逐年前滚，
//       保证学期起止日期严格递增（模板跨年亦正确）
// 触发: 仅在年级组首次落库且学制存在至少一个模板时执行，更新不重跑
// ==========================================

use crate::domain::error::{ValidationError, ValidationResult};
use crate::domain::yearless::{YearlessDate, YearlessDateRange};
use chrono::NaiveDate;
use tracing::info;

/// 生成的单个学期
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSemester {
    /// 学期序号，1 起
    pub semester: u16,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// 月日 + 年份落成具体日期
fn concrete(year: i32, date: &YearlessDate) -> ValidationResult<NaiveDate> {
    // 模板日期以平年校验（2 月封顶 28 日），任何年份都能落成
    NaiveDate::from_ymd_opt(year, date.month() as u32, date.day() as u32).ok_or(
        ValidationError::InvalidDate {
            month: date.month(),
            day: date.day(),
        },
    )
}

/// 派生学期序列
///
/// # 参数
/// - admission_year: 年级组入学年份，第 1 学期的起始年
/// - semesters: 学期总数
/// - templates: 学制的日期模板，第 i 学期取 templates[(i-1) % M]
///
/// # 返回
/// - 严格递增的学期日期序列；模板为空时返回空序列（不生成）
pub fn generate_semesters(
    admission_year: i32,
    semesters: u16,
    templates: &[YearlessDateRange],
) -> ValidationResult<Vec<GeneratedSemester>> {
    if templates.is_empty() {
        return Ok(Vec::new());
    }

    let mut year = admission_year;
    let mut last_date = NaiveDate::from_ymd_opt(admission_year - 1, 1, 1).ok_or(
        ValidationError::InvalidDate { month: 1, day: 1 },
    )?;
    let mut result = Vec::with_capacity(semesters as usize);

    for i in 1..=semesters {
        let range = &templates[(i as usize - 1) % templates.len()];

        let mut start = concrete(year, &range.start)?;
        while start < last_date {
            year += 1;
            start = concrete(year, &range.start)?;
        }
        last_date = start;

        let mut end = concrete(year, &range.end)?;
        while end < last_date {
            year += 1;
            end = concrete(year, &range.end)?;
        }
        last_date = end;

        result.push(GeneratedSemester { semester: i, start, end });
    }

    info!(
        admission_year = admission_year,
        semesters = semesters,
        templates = templates.len(),
        "学期序列生成完成"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sm: u8, sd: u8, em: u8, ed: u8) -> YearlessDateRange {
        YearlessDateRange::new(
            YearlessDate::new(sm, sd).unwrap(),
            YearlessDate::new(em, ed).unwrap(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_eight_semesters_two_templates_monotonic() {
        // 秋季学期跨年（9/1 - 1/31），春季学期不跨年（2/1 - 6/30）
        let templates = vec![range(9, 1, 1, 31), range(2, 1, 6, 30)];
        let result = generate_semesters(2019, 8, &templates).unwrap();

        assert_eq!(result.len(), 8);
        // 第 1 学期起始年即入学年
        assert_eq!(result[0].start, date(2019, 9, 1));
        assert_eq!(result[0].end, date(2020, 1, 31));
        assert_eq!(result[1].start, date(2020, 2, 1));
        assert_eq!(result[1].end, date(2020, 6, 30));
        assert_eq!(result[7].end, date(2023, 6, 30));

        // 全序列严格递增
        let mut prev = date(2018, 1, 1);
        for sem in &result {
            assert!(sem.start > prev, "学期 {} 起始未递增", sem.semester);
            assert!(sem.end > sem.start);
            prev = sem.end;
        }
    }

    #[test]
    fn test_single_template_cycles_yearly() {
        let templates = vec![range(9, 1, 12, 31)];
        let result = generate_semesters(2020, 3, &templates).unwrap();
        assert_eq!(result[0].start, date(2020, 9, 1));
        assert_eq!(result[1].start, date(2021, 9, 1));
        assert_eq!(result[2].start, date(2022, 9, 1));
    }

    #[test]
    fn test_no_templates_generates_nothing() {
        let result = generate_semesters(2020, 8, &[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_semester_numbers_sequential() {
        let templates = vec![range(9, 1, 1, 31), range(2, 1, 6, 30)];
        let result = generate_semesters(2019, 4, &templates).unwrap();
        let numbers: Vec<u16> = result.iter().map(|s| s.semester).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
}
