use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{error::ServiceError, http::AppState, identity::require_user, types::User};

/// The authenticated caller. Extraction fails with `UNAUTHORIZED` before the
/// handler runs.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let user = require_user(state.identity.as_ref(), header_value).await?;
        Ok(CurrentUser(user))
    }
}
