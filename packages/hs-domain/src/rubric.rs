use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
	Positive,
	Negative,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RubricCriterion {
	pub criterion: String,
	pub weight: f64,
	pub sense: Sense,
}

/// What the judge model returns for one criterion.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CriterionJudgment {
	pub id: usize,
	pub rationale: String,
	pub satisfaction: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GradedCriterion {
	pub id: usize,
	pub rationale: String,
	pub satisfaction: f64,
	pub score: f64,
}

pub fn criterion_score(criterion: &RubricCriterion, satisfaction: f64) -> f64 {
	match criterion.sense {
		Sense::Positive => criterion.weight * satisfaction / 100.0,
		Sense::Negative => -criterion.weight * (100.0 - satisfaction) / 100.0,
	}
}

pub fn validate_rubric(rubric: &[RubricCriterion]) -> Result<()> {
	if rubric.is_empty() {
		return Err(Error::InvalidRubric { message: "Rubric must have criteria.".to_string() });
	}

	for (index, criterion) in rubric.iter().enumerate() {
		if criterion.criterion.trim().is_empty() {
			return Err(Error::InvalidRubric {
				message: format!("Criterion {index} text must be non-empty."),
			});
		}
		if !criterion.weight.is_finite() || !(0.0..=100.0).contains(&criterion.weight) {
			return Err(Error::InvalidRubric {
				message: format!("Criterion {index} weight must be in the range 0-100."),
			});
		}
	}

	Ok(())
}

/// Every criterion must be judged exactly once; the result follows rubric order.
pub fn grade(
	rubric: &[RubricCriterion],
	judgments: &[CriterionJudgment],
) -> Result<Vec<GradedCriterion>> {
	let mut graded: Vec<Option<GradedCriterion>> = vec![None; rubric.len()];

	for judgment in judgments {
		let Some(criterion) = rubric.get(judgment.id) else {
			return Err(Error::InvalidGrading {
				message: format!("Judgment refers to unknown criterion {}.", judgment.id),
			});
		};

		if !judgment.satisfaction.is_finite() || !(0.0..=100.0).contains(&judgment.satisfaction) {
			return Err(Error::InvalidGrading {
				message: format!(
					"Criterion {} satisfaction must be in the range 0-100.",
					judgment.id
				),
			});
		}
		if graded[judgment.id].is_some() {
			return Err(Error::InvalidGrading {
				message: format!("Criterion {} was judged more than once.", judgment.id),
			});
		}

		graded[judgment.id] = Some(GradedCriterion {
			id: judgment.id,
			rationale: judgment.rationale.clone(),
			satisfaction: judgment.satisfaction,
			score: criterion_score(criterion, judgment.satisfaction),
		});
	}

	graded
		.into_iter()
		.enumerate()
		.map(|(id, entry)| {
			entry.ok_or_else(|| Error::InvalidGrading {
				message: format!("Criterion {id} was not judged."),
			})
		})
		.collect()
}

pub fn overall_score(graded: &[GradedCriterion]) -> f64 {
	graded.iter().map(|criterion| criterion.score).sum()
}
