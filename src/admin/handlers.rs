use axum::{
    extract::{FromRef, Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    admin::{
        session::{clear_session_cookie, safe_next, session_cookie, StaffUser, HOME_PATH, LOGIN_PATH},
        views,
    },
    auth::{jwt::JwtKeys, password::password_problems},
    error::{AppError, FieldErrors},
    state::AppState,
    users::{
        dto::{is_valid_email, MAX_NAME_LENGTH},
        manager::{normalize_email, ExtraFields, ProfileUpdate},
        repo_types::User,
    },
};

const BAD_LOGIN: &str = "Please enter the correct email and password for a staff account. \
                         Note that both fields may be case-sensitive.";

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(|| async { Redirect::to(HOME_PATH) }))
        .route("/admin/login", get(login_form).post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/users", get(list_users))
        .route("/admin/users/add", get(add_user_form).post(add_user))
        .route("/admin/users/:id/change", get(change_user_form).post(change_user))
        .route("/admin/users/:id/password", get(password_form).post(change_password))
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddUserForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Unchecked boxes are simply absent from the submitted form.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeUserForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: Option<String>,
    #[serde(default)]
    pub is_staff: Option<String>,
    #[serde(default)]
    pub is_superuser: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

fn check_new_password(errors: &mut FieldErrors, password1: &str, password2: &str) {
    for problem in password_problems(password1) {
        errors.add("password1", problem);
    }
    if password2.is_empty() {
        errors.add("password2", "This field is required.");
    } else if password1 != password2 {
        errors.add("password2", "The two password fields didn't match.");
    }
}

fn check_email_and_name(errors: &mut FieldErrors, email: &str, name: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            "name",
            format!("Ensure this value has at most {MAX_NAME_LENGTH} characters."),
        );
    }
}

async fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state.users().get(id).await?.ok_or(AppError::NotFound)
}

/// Superuser accounts are hidden from staff who are not superusers themselves,
/// except for their own account.
async fn load_editable_user(state: &AppState, staff: &User, id: Uuid) -> Result<User, AppError> {
    let user = load_user(state, id).await?;
    if user.is_superuser && !staff.is_superuser && user.id != staff.id {
        warn!(user_id = %id, by = %staff.id, "staff user may not edit a superuser");
        return Err(AppError::NotFound);
    }
    Ok(user)
}

#[instrument(skip_all)]
pub async fn login_form(Query(q): Query<NextQuery>) -> Html<String> {
    Html(views::login_page("", safe_next(q.next.as_deref()), None))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = safe_next(form.next.as_deref()).to_string();
    let users = state.users();

    let staff = match users.authenticate(&form.email, &form.password).await? {
        Some(u) if u.is_staff => u,
        _ => {
            warn!(email = %form.email, "admin login refused");
            let page = views::login_page(&form.email, &next, Some(BAD_LOGIN));
            return Ok(Html(page).into_response());
        }
    };

    users.record_login(staff.id).await?;
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(staff.id)?;
    let cookie = session_cookie(
        &token,
        keys.session_ttl.as_secs(),
        state.config.session_cookie_secure,
    );

    info!(user_id = %staff.id, "admin login");
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(&next)).into_response())
}

#[instrument(skip_all)]
pub async fn logout() -> Response {
    ([(header::SET_COOKIE, clear_session_cookie())], Redirect::to(LOGIN_PATH)).into_response()
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
) -> Result<Html<String>, AppError> {
    let users = state.users().list().await?;
    Ok(Html(views::user_list(&users, &staff)))
}

#[instrument(skip_all)]
pub async fn add_user_form(StaffUser(staff): StaffUser) -> Html<String> {
    Html(views::user_add(&staff, "", "", &FieldErrors::new()))
}

#[instrument(skip_all)]
pub async fn add_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Form(form): Form<AddUserForm>,
) -> Result<Response, AppError> {
    let mut errors = FieldErrors::new();
    check_email_and_name(&mut errors, &form.email, &form.name);
    check_new_password(&mut errors, &form.password1, &form.password2);

    let users = state.users();
    if errors.get("email").is_none() && users.get_by_email(&form.email).await?.is_some() {
        errors.add("email", "User with this email already exists.");
    }
    if !errors.is_empty() {
        let page = views::user_add(&staff, &form.email, &form.name, &errors);
        return Ok(Html(page).into_response());
    }

    let user = users
        .create_user(
            Some(&form.email),
            Some(&form.password1),
            ExtraFields::named(form.name.trim()),
        )
        .await?;
    info!(user_id = %user.id, by = %staff.id, "admin added user");
    Ok(Redirect::to(&format!("/admin/users/{}/change", user.id)).into_response())
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn change_user_form(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let user = load_editable_user(&state, &staff, id).await?;
    Ok(Html(views::user_change(&staff, &user, &FieldErrors::new())))
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn change_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<Uuid>,
    Form(form): Form<ChangeUserForm>,
) -> Result<Response, AppError> {
    let user = load_editable_user(&state, &staff, id).await?;
    let users = state.users();

    let mut errors = FieldErrors::new();
    check_email_and_name(&mut errors, &form.email, &form.name);
    let email = normalize_email(&form.email).unwrap_or_default();
    if errors.get("email").is_none()
        && email != user.email
        && users.get_by_email(&email).await?.is_some()
    {
        errors.add("email", "User with this email already exists.");
    }

    // Permission flags are only editable by superusers.
    let (is_active, is_staff, is_superuser) = if staff.is_superuser {
        (
            form.is_active.is_some(),
            form.is_staff.is_some(),
            form.is_superuser.is_some(),
        )
    } else {
        (user.is_active, user.is_staff, user.is_superuser)
    };

    if !errors.is_empty() {
        let shown = User {
            email: form.email.clone(),
            name: form.name.clone(),
            is_active,
            is_staff,
            is_superuser,
            ..user
        };
        return Ok(Html(views::user_change(&staff, &shown, &errors)).into_response());
    }

    let update = ProfileUpdate {
        email: Some(email),
        name: Some(form.name.trim().to_string()),
        password: None,
        is_active: Some(is_active),
        is_staff: Some(is_staff),
        is_superuser: Some(is_superuser),
    };
    users.update(id, update).await?.ok_or(AppError::NotFound)?;
    info!(user_id = %id, by = %staff.id, "admin changed user");
    Ok(Redirect::to(HOME_PATH).into_response())
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn password_form(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let user = load_editable_user(&state, &staff, id).await?;
    Ok(Html(views::password_change(&staff, &user, &FieldErrors::new())))
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn change_password(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<Uuid>,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AppError> {
    let user = load_editable_user(&state, &staff, id).await?;

    let mut errors = FieldErrors::new();
    check_new_password(&mut errors, &form.password1, &form.password2);
    if !errors.is_empty() {
        return Ok(Html(views::password_change(&staff, &user, &errors)).into_response());
    }

    let update = ProfileUpdate {
        password: Some(form.password1),
        ..ProfileUpdate::default()
    };
    state
        .users()
        .update(id, update)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(user_id = %id, by = %staff.id, "admin changed password");
    Ok(Redirect::to(&format!("/admin/users/{id}/change")).into_response())
}
