use axum::{extract::Request, response::Response};
use serde::de::DeserializeOwned;

use crate::app::AppState;
use crate::lifecycle::RequestLifecycle;
use crate::transport::AxumTransport;

/// Run one envelope endpoint: prepare, parse `P`, hand over to `work`, finish.
///
/// `work` is skipped when the body does not parse; the envelope then carries
/// the params-parse code.
pub async fn handle<P, F>(state: AppState, req: Request, work: F) -> Response
where
    P: DeserializeOwned,
    F: FnOnce(&AppState, &mut RequestLifecycle, P) + Send,
{
    let mut transport = AxumTransport::new(req);
    let mut lc = state.begin(&mut transport).await;

    if let Some(params) = lc.parse_params::<P>() {
        work(&state, &mut lc, params);
    }

    lc.finish(&mut transport);
    transport.into_response()
}
