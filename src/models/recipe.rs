//! Recipe model, its enums and the typed create/update schemas.

use serde::{Deserialize, Serialize};

use super::UserSummary;
use crate::errors::{codes, AppError};

/// Preparation difficulty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Recipe category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Desserts,
    Vegetarian,
    Vegan,
    #[serde(rename = "Gluten-Free")]
    GlutenFree,
    #[serde(alias = "Ketos")]
    Keto,
    #[serde(rename = "Non-Vegetarian")]
    NonVegetarian,
    Snacks,
    Salads,
    Soups,
    Juices,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Dinner => "Dinner",
            Category::Desserts => "Desserts",
            Category::Vegetarian => "Vegetarian",
            Category::Vegan => "Vegan",
            Category::GlutenFree => "Gluten-Free",
            Category::Keto => "Keto",
            Category::NonVegetarian => "Non-Vegetarian",
            Category::Snacks => "Snacks",
            Category::Salads => "Salads",
            Category::Soups => "Soups",
            Category::Juices => "Juices",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Breakfast" => Some(Category::Breakfast),
            "Lunch" => Some(Category::Lunch),
            "Dinner" => Some(Category::Dinner),
            "Desserts" => Some(Category::Desserts),
            "Vegetarian" => Some(Category::Vegetarian),
            "Vegan" => Some(Category::Vegan),
            "Gluten-Free" => Some(Category::GlutenFree),
            "Keto" | "Ketos" => Some(Category::Keto),
            "Non-Vegetarian" => Some(Category::NonVegetarian),
            "Snacks" => Some(Category::Snacks),
            "Salads" => Some(Category::Salads),
            "Soups" => Some(Category::Soups),
            "Juices" => Some(Category::Juices),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
}

/// A recipe owned by exactly one author.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Instruction>,
    pub prep_time: i64,
    pub cook_time: i64,
    pub servings: i64,
    pub difficulty: Difficulty,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub author_id: String,
    /// Average review rating rounded to one decimal, 0 when unreviewed.
    pub rating: f64,
    pub review_count: i64,
    /// Users who favorited this recipe. Favorites are the only kind of like.
    pub likes_count: i64,
    pub views: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}

/// Compact recipe reference for lists embedded in profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub rating: f64,
    pub views: i64,
    pub likes_count: i64,
    pub created_at: String,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.clone(),
            title: recipe.title.clone(),
            image_url: recipe.image_url.clone(),
            rating: recipe.rating,
            views: recipe.views,
            likes_count: recipe.likes_count,
            created_at: recipe.created_at.clone(),
        }
    }
}

/// Request body for creating a recipe. Validated once by [`RecipeInput::validate`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipeInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    pub prep_time: i64,
    pub cook_time: i64,
    pub servings: i64,
    pub difficulty: Difficulty,
    pub category: Category,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub nutrition: Option<Nutrition>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecipeInput {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.image_url.trim().is_empty() {
            missing.push("imageUrl");
        }
        if !missing.is_empty() {
            return Err(AppError::validation_code(
                codes::MISSING_FIELDS,
                format!("Missing required fields: {}", missing.join(", ")),
            ));
        }

        validate_times(self.prep_time, self.cook_time, self.servings)?;
        validate_steps(&self.ingredients, &self.instructions)
    }
}

/// Partial update of a recipe. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRecipeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Vec<Ingredient>>,
    #[serde(default)]
    pub instructions: Option<Vec<Instruction>>,
    #[serde(default)]
    pub prep_time: Option<i64>,
    #[serde(default)]
    pub cook_time: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub category: Option<Category>,
    /// An empty string removes the image.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub nutrition: Option<Nutrition>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateRecipeRequest {
    /// Apply the update on top of `existing`, validating the merged result.
    pub fn apply(&self, existing: &Recipe) -> Result<Recipe, AppError> {
        let mut merged = existing.clone();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(AppError::validation("Title cannot be empty"));
            }
            merged.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(AppError::validation("Description cannot be empty"));
            }
            merged.description = description.trim().to_string();
        }
        if let Some(ingredients) = &self.ingredients {
            merged.ingredients = ingredients.clone();
        }
        if let Some(instructions) = &self.instructions {
            merged.instructions = instructions.clone();
        }
        merged.prep_time = self.prep_time.unwrap_or(existing.prep_time);
        merged.cook_time = self.cook_time.unwrap_or(existing.cook_time);
        merged.servings = self.servings.unwrap_or(existing.servings);
        merged.difficulty = self.difficulty.unwrap_or(existing.difficulty);
        merged.category = self.category.unwrap_or(existing.category);
        if let Some(image_url) = &self.image_url {
            merged.image_url = if image_url.trim().is_empty() {
                None
            } else {
                Some(image_url.clone())
            };
        }
        if self.nutrition.is_some() {
            merged.nutrition = self.nutrition.clone();
        }
        if self.notes.is_some() {
            merged.notes = self.notes.clone();
        }

        validate_times(merged.prep_time, merged.cook_time, merged.servings)?;
        validate_steps(&merged.ingredients, &merged.instructions)?;
        Ok(merged)
    }
}

fn validate_times(prep_time: i64, cook_time: i64, servings: i64) -> Result<(), AppError> {
    if prep_time < 0 || cook_time < 0 {
        return Err(AppError::validation(
            "Preparation and cooking times cannot be negative",
        ));
    }
    if servings < 1 {
        return Err(AppError::validation("Servings must be at least 1"));
    }
    Ok(())
}

fn validate_steps(ingredients: &[Ingredient], instructions: &[Instruction]) -> Result<(), AppError> {
    if ingredients.is_empty() || instructions.is_empty() {
        return Err(AppError::validation(
            "At least one ingredient and one instruction are required",
        ));
    }
    if ingredients
        .iter()
        .any(|i| i.name.trim().is_empty() || i.amount.trim().is_empty())
    {
        return Err(AppError::validation("Every ingredient needs a name and an amount"));
    }
    if instructions.iter().any(|i| i.text.trim().is_empty()) {
        return Err(AppError::validation("Instruction steps cannot be empty"));
    }
    Ok(())
}

/// Request body for sharing a recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareRequest {
    pub platform: String,
}

/// Longest accepted report reason, in characters.
pub const MAX_REPORT_REASON_LEN: usize = 500;

/// Request body for reporting a recipe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub reason: String,
}

impl ReportRequest {
    /// The trimmed reason, which must be present and bounded.
    pub fn reason(&self) -> Result<&str, AppError> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation_code(
                codes::MISSING_REASON,
                "Reason is required",
            ));
        }
        if reason.chars().count() > MAX_REPORT_REASON_LEN {
            return Err(AppError::validation(format!(
                "Reason must be at most {} characters",
                MAX_REPORT_REASON_LEN
            )));
        }
        Ok(reason)
    }
}

/// A user's report about a recipe, kept for moderation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeReport {
    pub id: String,
    pub recipe_id: String,
    pub reporter_id: String,
    pub reason: String,
    pub created_at: String,
}

/// Listing filters for recipes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}
