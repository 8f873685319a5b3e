use async_graphql::Context;

use crate::{
    auth::{claims::Role, Claims},
    errors::{AppError, AppResult},
};

pub fn require_admin(claims: &Claims) -> AppResult<()> {
    if claims.role != Role::Admin {
        return Err(AppError::Forbidden("unauthorized".to_string()));
    }
    Ok(())
}

/// Admins may act on any session; students only on their own.
pub fn require_session_owner(claims: &Claims, session_owner: &str) -> AppResult<()> {
    if claims.role != Role::Admin && claims.sub != session_owner {
        return Err(AppError::Forbidden("unauthorized".to_string()));
    }
    Ok(())
}

pub fn extract_claims_from_context(ctx: &Context<'_>) -> AppResult<Claims> {
    ctx.data::<Claims>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}
