use hs_domain::rubric::{
	CriterionJudgment, RubricCriterion, Sense, criterion_score, grade, overall_score,
	validate_rubric,
};

fn criterion(weight: f64, sense: Sense) -> RubricCriterion {
	RubricCriterion { criterion: "Documents the allergy.".to_string(), weight, sense }
}

fn judgment(id: usize, satisfaction: f64) -> CriterionJudgment {
	CriterionJudgment { id, rationale: "Because.".to_string(), satisfaction }
}

#[test]
fn scores_follow_the_criterion_sense() {
	assert_eq!(criterion_score(&criterion(20.0, Sense::Positive), 80.0), 16.0);
	assert_eq!(criterion_score(&criterion(30.0, Sense::Negative), 25.0), -22.5);
	assert_eq!(criterion_score(&criterion(30.0, Sense::Negative), 100.0), 0.0);
}

#[test]
fn grading_orders_by_rubric_and_sums() {
	let rubric = vec![criterion(20.0, Sense::Positive), criterion(30.0, Sense::Negative)];
	let graded =
		grade(&rubric, &[judgment(1, 25.0), judgment(0, 80.0)]).expect("Failed to grade.");

	assert_eq!(graded[0].id, 0);
	assert_eq!(graded[0].score, 16.0);
	assert_eq!(graded[1].score, -22.5);
	assert_eq!(overall_score(&graded), -6.5);
}

#[test]
fn grading_requires_every_criterion_once() {
	let rubric = vec![criterion(20.0, Sense::Positive), criterion(30.0, Sense::Negative)];

	assert!(grade(&rubric, &[judgment(0, 80.0)]).is_err());
	assert!(grade(&rubric, &[judgment(0, 80.0), judgment(0, 70.0)]).is_err());
	assert!(grade(&rubric, &[judgment(0, 80.0), judgment(5, 70.0)]).is_err());
	assert!(grade(&rubric, &[judgment(0, 180.0), judgment(1, 70.0)]).is_err());
}

#[test]
fn rubric_weights_are_bounded() {
	assert!(validate_rubric(&[criterion(100.0, Sense::Positive)]).is_ok());
	assert!(validate_rubric(&[criterion(101.0, Sense::Positive)]).is_err());
	assert!(validate_rubric(&[]).is_err());
}
