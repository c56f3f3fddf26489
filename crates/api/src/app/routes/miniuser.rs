use axum::{
    Extension, Router,
    extract::Request,
    response::Response,
    routing::post,
};
use chrono::Utc;

use userserver_core::{ErrorCode, UserId};

use crate::app::{AppState, dto, errors};
use crate::lifecycle::RequestLifecycle;

use super::common::handle;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/infos", post(infos))
}

pub async fn login(Extension(state): Extension<AppState>, req: Request) -> Response {
    handle(state, req, login_mini_user).await
}

pub async fn infos(Extension(state): Extension<AppState>, req: Request) -> Response {
    handle(state, req, get_mini_user_infos).await
}

fn login_mini_user(state: &AppState, lc: &mut RequestLifecycle, body: dto::MiniLoginRequest) {
    let profile = match state.users.mini_login(&body.open_id, body.nick_name.as_deref()) {
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

fn get_mini_user_infos(state: &AppState, lc: &mut RequestLifecycle, body: dto::AuthenticatedRequest) {
    lc.set_server_token(body.server_token);
    if lc.check_token(&body.user_id, &body.token).is_err() {
        return;
    }

    match state.users.mini_profile(&UserId::new(body.user_id)) {
        Ok(profile) => lc.set_data(&profile),
        Err(e) => errors::reject(lc, ErrorCode::UserGetInfos, e),
    }
}
