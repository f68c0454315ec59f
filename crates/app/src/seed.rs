//! Demo data for trying the board without real students.

use rand::Rng;
use rand::seq::SliceRandom;
use services::{AppServices, StudentServiceError};
use tactile_core::model::{CORRECT_ASSESSMENT, Shape, StudentId, StudentProfile};
use tracing::{debug, info};

const ROSTER: [(&str, &str, &str); 4] = [
    ("STU001", "Ana", "Lee"),
    ("STU002", "Ben", "Okafor"),
    ("STU003", "Chloe", "Martin"),
    ("STU004", "Dev", "Patel"),
];

const LESSONS: [(&str, &str); 4] = [
    ("circle", "Trace the edge all the way round; there are no corners."),
    ("square", "Count four corners and four sides of the same length."),
    ("triangle", "Find the three corners, then follow each straight side."),
    ("rectangle", "Four corners; two long sides and two short ones."),
];

const ANSWERS_PER_LESSON: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub students: u32,
    pub sessions: u32,
    pub answers: u32,
}

#[derive(Debug)]
struct Lesson {
    shape: Shape,
    explanation: &'static str,
    outcomes: Vec<bool>,
}

#[derive(Debug)]
struct SeedStudent {
    id: StudentId,
    profile: StudentProfile,
    lessons: Vec<Lesson>,
}

fn plan(rng: &mut impl Rng) -> Result<Vec<SeedStudent>, tactile_core::Error> {
    let mut lessons = Vec::with_capacity(LESSONS.len());
    for (shape, explanation) in LESSONS {
        lessons.push((shape.parse::<Shape>()?, explanation));
    }

    let mut students = Vec::with_capacity(ROSTER.len());
    for (id, first, last) in ROSTER {
        let mut picked = lessons.clone();
        picked.shuffle(rng);
        picked.truncate(rng.random_range(1..=lessons.len()));
        students.push(SeedStudent {
            id: StudentId::parse(id)?,
            profile: StudentProfile::new(first, last),
            lessons: picked
                .into_iter()
                .map(|(shape, explanation)| Lesson {
                    shape,
                    explanation,
                    outcomes: (0..ANSWERS_PER_LESSON)
                        .map(|_| rng.random_bool(0.7))
                        .collect(),
                })
                .collect(),
        });
    }
    Ok(students)
}

/// Register the demo roster and record randomised activity for today.
/// Students that already exist are kept and only receive new activity.
pub async fn run(services: &AppServices) -> anyhow::Result<SeedReport> {
    let plan = plan(&mut rand::rng())?;
    let mut report = SeedReport::default();

    for student in plan {
        let id = student.id.as_str();
        match services.students().register(id, student.profile).await {
            Ok(_) => report.students += 1,
            Err(StudentServiceError::AlreadyExists(_)) => {
                debug!(student_id = id, "demo student already present");
            }
            Err(err) => return Err(err.into()),
        }

        for lesson in student.lessons {
            let shape = lesson.shape.as_str();
            services
                .learning()
                .record(id, shape, lesson.explanation)
                .await?;
            report.sessions += 1;

            for correct in lesson.outcomes {
                let outcome = if correct { CORRECT_ASSESSMENT } else { "Incorrect" };
                services
                    .assessments()
                    .record_question(id, "Which shape is this?", shape, outcome)
                    .await?;
                report.answers += 1;
            }
        }
    }

    info!(
        students = report.students,
        sessions = report.sessions,
        answers = report.answers,
        "demo data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use services::Clock;
    use tactile_core::time::fixed_now;

    use super::*;

    #[test]
    fn plan_covers_roster_with_distinct_shapes() {
        let plan = plan(&mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(plan.len(), ROSTER.len());
        for student in &plan {
            assert!(!student.lessons.is_empty());
            let mut shapes: Vec<Shape> = student.lessons.iter().map(|l| l.shape).collect();
            shapes.sort();
            shapes.dedup();
            assert_eq!(shapes.len(), student.lessons.len());
            assert!(student
                .lessons
                .iter()
                .all(|l| l.outcomes.len() == ANSWERS_PER_LESSON));
        }
    }

    #[tokio::test]
    async fn reseeding_keeps_one_row_per_student() {
        let services = AppServices::in_memory(Clock::fixed(fixed_now()));
        let first = run(&services).await.unwrap();
        assert_eq!(first.students, 4);
        assert_eq!(first.answers, first.sessions * 3);

        let second = run(&services).await.unwrap();
        assert_eq!(second.students, 0);
        assert!(second.sessions >= 4);

        let listed = services.progress().list_students("name").await.unwrap();
        assert_eq!(listed.len(), 4);
        assert_eq!(listed[0].first_name, "Ana");
    }
}
