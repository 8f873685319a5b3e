use async_graphql::{Context, ErrorExtensions};
use chrono::NaiveDate;

use crate::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Converts a service result into a GraphQL result, keeping the error code
/// and retry hint in the error extensions.
pub fn resolve<T>(result: AppResult<T>) -> async_graphql::Result<T> {
    result.map_err(|err| {
        if matches!(err, AppError::DatabaseError(_) | AppError::InternalError(_)) {
            log::error!("Resolver failed: {}", err);
        }
        err.extend()
    })
}

pub fn app_state<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a AppState> {
    ctx.data::<AppState>()
}

/// Leaderboard dates arrive as `YYYY-MM-DD`.
pub fn parse_date(date: Option<&str>) -> AppResult<Option<NaiveDate>> {
    date.map(|raw| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::ValidationError(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
        })
    })
    .transpose()
}
