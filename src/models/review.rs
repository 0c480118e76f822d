//! Review model.

use serde::{Deserialize, Serialize};

use super::UserSummary;
use crate::errors::{codes, AppError};

/// Longest accepted review comment, in characters.
pub const MAX_COMMENT_LEN: usize = 1000;

/// A rating left by one user on one recipe. At most one per (author, recipe).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub recipe_id: String,
    pub author_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}

/// Review as shown in a profile's recent activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub id: String,
    pub rating: i64,
    pub comment: String,
    pub recipe_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_title: Option<String>,
    pub created_at: String,
}

/// Request body for reviewing a recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct AddReviewRequest {
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

impl AddReviewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::validation_code(
                codes::INVALID_RATING,
                "Rating must be between 1 and 5",
            ));
        }
        let comment = self.comment.trim();
        if comment.is_empty() {
            return Err(AppError::validation_code(
                codes::MISSING_FIELDS,
                "Missing required fields: comment",
            ));
        }
        if comment.chars().count() > MAX_COMMENT_LEN {
            return Err(AppError::validation(format!(
                "Comment cannot exceed {} characters",
                MAX_COMMENT_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        for rating in [0, 6, -1] {
            let req = AddReviewRequest {
                rating,
                comment: "ok".into(),
            };
            assert_eq!(req.validate().unwrap_err().error_code(), "INVALID_RATING");
        }
        let req = AddReviewRequest {
            rating: 5,
            comment: "great".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_comment_required() {
        let req = AddReviewRequest {
            rating: 3,
            comment: "   ".into(),
        };
        assert_eq!(req.validate().unwrap_err().error_code(), "MISSING_FIELDS");
    }
}
