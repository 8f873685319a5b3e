use actix_web::{get, post, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::{app_state::AppState, errors::AppError, graphql::Schema};

/// Anonymous requests go through with no claims; resolvers that need a
/// student reject them. A token that is present but invalid fails the request.
#[post("/graphql")]
pub async fn graphql(
    schema: web::Data<Schema>,
    state: web::Data<AppState>,
    auth: Option<BearerAuth>,
    request: GraphQLRequest,
) -> Result<GraphQLResponse, AppError> {
    let mut request = request.into_inner();

    if let Some(auth) = auth {
        let claims = state.jwt_service.validate_token(auth.token())?;
        log::debug!("GraphQL request from student {}", claims.sub);
        request = request.data(claims);
    }

    Ok(schema.execute(request).await.into())
}

#[get("/graphiql")]
pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}
