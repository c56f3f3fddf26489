use axum::{
    Extension, Router,
    extract::Request,
    response::Response,
    routing::post,
};
use chrono::Utc;

use userserver_core::{ErrorCode, UserId};

use crate::app::services::ProfileUpdate;
use crate::app::{AppState, dto, errors};
use crate::lifecycle::RequestLifecycle;

use super::common::handle;

pub fn router() -> Router {
    Router::new()
        .route("/registry", post(registry))
        .route("/login", post(login))
        .route("/infos", post(infos))
        .route("/update", post(update))
}

pub async fn registry(Extension(state): Extension<AppState>, req: Request) -> Response {
    handle(state, req, register_user).await
}

pub async fn login(Extension(state): Extension<AppState>, req: Request) -> Response {
    handle(state, req, login_user).await
}

pub async fn infos(Extension(state): Extension<AppState>, req: Request) -> Response {
    handle(state, req, get_user_infos).await
}

pub async fn update(Extension(state): Extension<AppState>, req: Request) -> Response {
    handle(state, req, update_user_infos).await
}

fn register_user(state: &AppState, lc: &mut RequestLifecycle, body: dto::RegisterRequest) {
    match state
        .users
        .register(&body.user_name, &body.password, body.nick_name.as_deref())
    {
        Ok(profile) => lc.set_data(&dto::RegisterResponse { user_id: profile.user_id }),
        Err(e) => errors::reject(lc, ErrorCode::UserRegister, e),
    }
}

fn login_user(state: &AppState, lc: &mut RequestLifecycle, body: dto::LoginRequest) {
    let profile = match state.users.authenticate(&body.user_name, &body.password) {
        Ok(profile) => profile,
        Err(e) => return errors::reject(lc, ErrorCode::UserLogin, e),
    };

    match state.issuer.issue_user_token(&profile.user_id, Utc::now()) {
        Ok(token) => lc.set_data(&dto::LoginResponse {
            user_id: profile.user_id,
            token,
        }),
        Err(e) => errors::reject(lc, ErrorCode::UserLogin, e),
    }
}

fn get_user_infos(state: &AppState, lc: &mut RequestLifecycle, body: dto::AuthenticatedRequest) {
    lc.set_server_token(body.server_token);
    if lc.check_token(&body.user_id, &body.token).is_err() {
        return;
    }

    match state.users.profile(&UserId::new(body.user_id)) {
        Ok(profile) => lc.set_data(&profile),
        Err(e) => errors::reject(lc, ErrorCode::UserGetInfos, e),
    }
}

fn update_user_infos(state: &AppState, lc: &mut RequestLifecycle, body: dto::UpdateInfosRequest) {
    lc.set_server_token(body.auth.server_token);
    if lc.check_token(&body.auth.user_id, &body.auth.token).is_err() {
        return;
    }

    let update = ProfileUpdate {
        nick_name: body.nick_name,
        avatar: body.avatar,
    };
    match state.users.update_profile(&UserId::new(body.auth.user_id), update) {
        Ok(profile) => lc.set_data(&profile),
        Err(e) => errors::reject(lc, ErrorCode::UserUpdateInfos, e),
    }
}
