//! Grade aggregation rules shared by every student endpoint.
//!
//! Averages are rounded exactly once, here, so a student shows the same
//! value in list, search, top and reports.

use serde::{Deserialize, Serialize};

use super::repo_types::StudentView;

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 10.0;

const PASS_THRESHOLD: f64 = 7.0;
const RECOVERY_THRESHOLD: f64 = 5.0;

/// Rounds to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn is_valid_grade(value: f64) -> bool {
    value.is_finite() && (MIN_GRADE..=MAX_GRADE).contains(&value)
}

/// Arithmetic mean rounded to 2 decimals; 0 for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().sum();
    round2(sum / values.len() as f64)
}

/// Mean of the individual (already rounded) student averages.
pub fn class_average(students: &[StudentView]) -> f64 {
    let averages: Vec<f64> = students.iter().map(|s| s.average).collect();
    average(&averages)
}

/// Highest average wins; on a tie the first one in iteration order is kept.
pub fn top_student(students: &[StudentView]) -> Option<&StudentView> {
    students.iter().fold(None, |best, s| match best {
        Some(b) if s.average > b.average => Some(s),
        Some(b) => Some(b),
        None => Some(s),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Aprovados,
    Recuperacao,
    Reprovados,
}

impl Bucket {
    pub fn for_average(average: f64) -> Self {
        if average >= PASS_THRESHOLD {
            Self::Aprovados
        } else if average >= RECOVERY_THRESHOLD {
            Self::Recuperacao
        } else {
            Self::Reprovados
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "aprovados" => Some(Self::Aprovados),
            "recuperacao" => Some(Self::Recuperacao),
            "reprovados" => Some(Self::Reprovados),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Buckets {
    pub aprovados: Vec<StudentView>,
    pub recuperacao: Vec<StudentView>,
    pub reprovados: Vec<StudentView>,
}

impl Buckets {
    pub fn partition(students: Vec<StudentView>) -> Self {
        let mut out = Self::default();
        for s in students {
            match Bucket::for_average(s.average) {
                Bucket::Aprovados => out.aprovados.push(s),
                Bucket::Recuperacao => out.recuperacao.push(s),
                Bucket::Reprovados => out.reprovados.push(s),
            }
        }
        out
    }

    pub fn take(self, bucket: Bucket) -> Vec<StudentView> {
        match bucket {
            Bucket::Aprovados => self.aprovados,
            Bucket::Recuperacao => self.recuperacao,
            Bucket::Reprovados => self.reprovados,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: i64, grades: &[f64]) -> StudentView {
        StudentView {
            id,
            name: format!("s{id}"),
            age: 20.0,
            grades: grades.to_vec(),
            average: average(grades),
        }
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        assert_eq!(average(&[8.0, 7.5, 9.0]), 8.17);
        assert_eq!(average(&[5.0, 6.0, 5.5]), 5.5);
        assert_eq!(average(&[4.0, 3.5, 4.8]), 4.1);
        assert_eq!(average(&[10.0]), 10.0);
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn average_stays_within_grade_range() {
        let samples: [&[f64]; 5] = [
            &[0.0, 0.0],
            &[10.0, 10.0, 10.0],
            &[0.0, 10.0],
            &[9.99, 9.995, 10.0],
            &[0.001, 0.004],
        ];
        for grades in samples {
            let avg = average(grades);
            assert!((0.0..=10.0).contains(&avg), "{grades:?} -> {avg}");
        }
    }

    #[test]
    fn grade_bounds_are_inclusive() {
        assert!(is_valid_grade(0.0));
        assert!(is_valid_grade(10.0));
        assert!(!is_valid_grade(-0.01));
        assert!(!is_valid_grade(10.01));
        assert!(!is_valid_grade(f64::NAN));
    }

    #[test]
    fn class_average_of_rounded_averages() {
        let students = vec![
            view(1, &[8.0, 7.5, 9.0]),
            view(2, &[5.0, 6.0, 5.5]),
            view(3, &[4.0, 3.5, 4.8]),
        ];
        // (8.17 + 5.5 + 4.1) / 3 = 5.9233..
        assert_eq!(class_average(&students), 5.92);
        assert_eq!(class_average(&[]), 0.0);
    }

    #[test]
    fn top_student_prefers_first_on_tie() {
        let students = vec![
            view(1, &[8.0, 7.5, 9.0]),
            view(2, &[5.0, 6.0, 5.5]),
            view(3, &[4.0, 3.5, 4.8]),
        ];
        assert_eq!(top_student(&students).map(|s| s.id), Some(1));

        let tied = vec![view(1, &[7.0]), view(2, &[7.0])];
        assert_eq!(top_student(&tied).map(|s| s.id), Some(1));

        let later_best = vec![view(1, &[6.0]), view(2, &[9.0]), view(3, &[9.0])];
        assert_eq!(top_student(&later_best).map(|s| s.id), Some(2));

        assert!(top_student(&[]).is_none());
    }

    #[test]
    fn bucket_thresholds() {
        assert_eq!(Bucket::for_average(8.17), Bucket::Aprovados);
        assert_eq!(Bucket::for_average(7.0), Bucket::Aprovados);
        assert_eq!(Bucket::for_average(6.99), Bucket::Recuperacao);
        assert_eq!(Bucket::for_average(5.0), Bucket::Recuperacao);
        assert_eq!(Bucket::for_average(4.99), Bucket::Reprovados);
        assert_eq!(Bucket::for_average(0.0), Bucket::Reprovados);
        assert_eq!(Bucket::parse("x"), None);
        assert_eq!(Bucket::parse("recuperacao"), Some(Bucket::Recuperacao));
    }

    #[test]
    fn partition_keeps_order_within_buckets() {
        let buckets = Buckets::partition(vec![
            view(1, &[8.0, 7.5, 9.0]),
            view(2, &[5.0, 6.0, 5.5]),
            view(3, &[4.0, 3.5, 4.8]),
            view(4, &[10.0]),
        ]);
        let ids = |v: &[StudentView]| v.iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids(&buckets.aprovados), vec![1, 4]);
        assert_eq!(ids(&buckets.recuperacao), vec![2]);
        assert_eq!(ids(&buckets.reprovados), vec![3]);
    }
}
