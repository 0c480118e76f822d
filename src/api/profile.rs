//! Profile API endpoints.
//!
//! Every profile view reads through the stats engine, so the counters shown
//! are recomputed from the relationship tables rather than trusted.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap},
};
use chrono::Utc;
use serde::Serialize;

use super::{created, success, ApiResult, ValidJson, ValidQuery};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::db::format_timestamp;
use crate::errors::{codes, AppError};
use crate::models::{
    clean_list, AddBadgeRequest, Badge, ChefEntry, PageQuery, Pagination, Recipe,
    UpdateProfileRequest, UserSummary, DEFAULT_PAGE_SIZE,
};
use crate::notify::NotificationEvent;
use crate::services::ImageKind;
use crate::social::FollowOutcome;
use crate::stats::{EnrichedProfile, LeveledStats};
use crate::AppState;

/// Latest recipes shown on an author page.
const AUTHOR_RECIPE_LIMIT: i64 = 10;
const DEFAULT_BADGE_ICON: &str = "🏆";

/// An enriched profile as seen by a particular viewer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: EnrichedProfile,
    pub is_following: bool,
    pub is_own_profile: bool,
}

/// Author page: public profile plus their latest recipes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorProfile {
    #[serde(flatten)]
    pub view: ProfileView,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Serialize)]
pub struct FollowPage {
    pub users: Vec<UserSummary>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct PictureUpdate {
    pub url: String,
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn profile_view(
    state: &AppState,
    viewer_id: Option<&str>,
    user_id: &str,
) -> Result<ProfileView, AppError> {
    let profile = state.stats.enrich(user_id).await?;
    let is_following = match viewer_id {
        Some(viewer) if viewer != user_id => state.repo.is_following(viewer, user_id).await?,
        _ => false,
    };
    Ok(ProfileView {
        profile,
        is_following,
        is_own_profile: viewer_id == Some(user_id),
    })
}

/// GET /api/profile - The caller's own enriched profile.
pub async fn get_profile(State(state): State<AppState>, actor: AuthUser) -> ApiResult<ProfileView> {
    success(profile_view(&state, Some(&actor.id), &actor.id).await?)
}

/// GET /api/profile/{user_id} - Another user's enriched profile.
pub async fn get_user_profile(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<ProfileView> {
    success(profile_view(&state, Some(&actor.id), &user_id).await?)
}

/// GET /api/profile/author/{user_id} - Public author page. Never exposes the email.
pub async fn get_author_profile(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<AuthorProfile> {
    let mut view = profile_view(&state, viewer.id(), &user_id).await?;
    view.profile.profile.email = None;
    let recipes = state
        .repo
        .recent_recipes(&user_id, AUTHOR_RECIPE_LIMIT)
        .await?;
    success(AuthorProfile { view, recipes })
}

/// GET /api/profile/stats - The caller's recomputed stats.
pub async fn my_stats(State(state): State<AppState>, actor: AuthUser) -> ApiResult<LeveledStats> {
    success(state.stats.leveled(&actor.id).await)
}

/// GET /api/profile/stats/{user_id}
pub async fn user_stats(
    State(state): State<AppState>,
    _actor: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<LeveledStats> {
    if !state.repo.user_exists(&user_id).await? {
        return Err(AppError::user_not_found(&user_id));
    }
    success(state.stats.leveled(&user_id).await)
}

/// PUT /api/profile - Update the caller's editable profile fields.
pub async fn update_profile(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> ApiResult<ProfileView> {
    let user = state
        .repo
        .get_user(&actor.id)
        .await?
        .ok_or_else(|| AppError::user_not_found(&actor.id))?;
    let mut profile = user.profile;

    if let Some(username) = request.username.as_deref().map(str::trim) {
        if username != profile.username {
            if !(3..=30).contains(&username.chars().count()) {
                return Err(AppError::validation(
                    "Username must be between 3 and 30 characters",
                ));
            }
            if state.repo.username_taken(username, Some(&actor.id)).await? {
                return Err(AppError::invalid_state(
                    codes::USERNAME_EXISTS,
                    "Username already taken",
                ));
            }
            profile.username = username.to_string();
        }
    }

    if let Some(email) = request.email.as_deref().map(|e| e.trim().to_lowercase()) {
        if profile.email.as_deref() != Some(email.as_str()) {
            if !email.contains('@') {
                return Err(AppError::validation("Please provide a valid email"));
            }
            if state.repo.email_taken(&email, Some(&actor.id)).await? {
                return Err(AppError::invalid_state(
                    codes::EMAIL_EXISTS,
                    "Email already registered",
                ));
            }
            profile.email = Some(email);
        }
    }

    if let Some(name) = request.name.as_deref().map(str::trim) {
        if name.is_empty() {
            return Err(AppError::validation("Name cannot be empty"));
        }
        profile.name = name.to_string();
    }
    if request.tagline.is_some() {
        profile.tagline = request.tagline;
    }
    if request.bio.is_some() {
        profile.bio = request.bio;
    }
    if request.location.is_some() {
        profile.location = request.location;
    }
    if request.website.is_some() {
        profile.website = request.website;
    }
    if request.cooking_style.is_some() {
        profile.cooking_style = request.cooking_style;
    }
    if let Some(interests) = &request.interests {
        profile.interests = clean_list(interests);
    }
    if let Some(specialties) = &request.specialties {
        profile.specialties = clean_list(specialties);
    }
    if let Some(social_media) = request.social_media {
        profile.social_media = social_media;
    }
    if let Some(is_pro_chef) = request.is_pro_chef {
        profile.is_pro_chef = is_pro_chef;
    }

    state.repo.save_profile(&profile).await?;
    tracing::info!(user_id = %actor.id, "Profile updated");

    success(profile_view(&state, Some(&actor.id), &actor.id).await?)
}

/// POST /api/profile/picture - Upload a new profile picture.
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    actor: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<PictureUpdate> {
    let url = state
        .images
        .store(ImageKind::Profile, content_type(&headers), &body)
        .await?;
    state.repo.set_profile_picture(&actor.id, &url).await?;
    tracing::info!(user_id = %actor.id, %url, "Profile picture updated");
    success(PictureUpdate { url })
}

/// POST /api/profile/cover - Upload a new cover picture.
pub async fn upload_cover_picture(
    State(state): State<AppState>,
    actor: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<PictureUpdate> {
    let url = state
        .images
        .store(ImageKind::Cover, content_type(&headers), &body)
        .await?;
    state.repo.set_cover_picture(&actor.id, &url).await?;
    tracing::info!(user_id = %actor.id, %url, "Cover picture updated");
    success(PictureUpdate { url })
}

/// POST /api/profile/follow/{user_id} - Follow or unfollow a user.
pub async fn toggle_follow(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<FollowOutcome> {
    success(state.social.toggle_follow(&actor, &user_id).await?)
}

async fn follow_page(
    state: &AppState,
    user_id: &str,
    page: PageQuery,
    followers: bool,
) -> Result<FollowPage, AppError> {
    if !state.repo.user_exists(user_id).await? {
        return Err(AppError::user_not_found(user_id));
    }
    let (page, limit) = page.resolve(DEFAULT_PAGE_SIZE)?;
    let offset = PageQuery::offset(page, limit);
    let (users, total) = if followers {
        state.repo.list_followers(user_id, offset, limit).await?
    } else {
        state.repo.list_following(user_id, offset, limit).await?
    };
    Ok(FollowPage {
        users,
        pagination: Pagination::new(page, limit, total),
    })
}

/// GET /api/profile/followers
pub async fn my_followers(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<FollowPage> {
    success(follow_page(&state, &actor.id, page, true).await?)
}

/// GET /api/profile/followers/{user_id}
pub async fn user_followers(
    State(state): State<AppState>,
    _actor: AuthUser,
    Path(user_id): Path<String>,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<FollowPage> {
    success(follow_page(&state, &user_id, page, true).await?)
}

/// GET /api/profile/following
pub async fn my_following(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<FollowPage> {
    success(follow_page(&state, &actor.id, page, false).await?)
}

/// GET /api/profile/following/{user_id}
pub async fn user_following(
    State(state): State<AppState>,
    _actor: AuthUser,
    Path(user_id): Path<String>,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<FollowPage> {
    success(follow_page(&state, &user_id, page, false).await?)
}

/// GET /api/profile/chefs - Top chefs by persisted counters.
pub async fn list_chefs(State(state): State<AppState>) -> ApiResult<Vec<ChefEntry>> {
    success(state.repo.list_chefs().await?)
}

async fn badges_of(state: &AppState, user_id: &str) -> Result<Vec<Badge>, AppError> {
    let user = state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::user_not_found(user_id))?;
    Ok(user.profile.badges)
}

/// GET /api/profile/badges
pub async fn my_badges(State(state): State<AppState>, actor: AuthUser) -> ApiResult<Vec<Badge>> {
    success(badges_of(&state, &actor.id).await?)
}

/// GET /api/profile/badges/{user_id}
pub async fn user_badges(
    State(state): State<AppState>,
    _actor: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Badge>> {
    success(badges_of(&state, &user_id).await?)
}

/// POST /api/profile/badges - Award the caller a badge.
pub async fn add_badge(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidJson(request): ValidJson<AddBadgeRequest>,
) -> ApiResult<Badge> {
    let name = request.badge_name.trim();
    if name.is_empty() {
        return Err(AppError::validation_code(
            codes::MISSING_FIELDS,
            "Missing required fields: badgeName",
        ));
    }

    let mut badges = badges_of(&state, &actor.id).await?;
    if badges.iter().any(|b| b.name == name) {
        return Err(AppError::invalid_state(
            codes::BADGE_EXISTS,
            "Badge already earned",
        ));
    }

    let badge = Badge {
        name: name.to_string(),
        icon: request
            .icon
            .filter(|i| !i.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BADGE_ICON.to_string()),
        description: request.description.unwrap_or_default(),
        earned_at: format_timestamp(Utc::now()),
    };
    badges.push(badge.clone());
    state.repo.save_badges(&actor.id, &badges).await?;
    tracing::info!(user_id = %actor.id, badge = %badge.name, "Badge earned");

    state
        .notifier
        .dispatch(NotificationEvent::achievement(&actor.id, &badge.name))
        .await;

    created(badge)
}
