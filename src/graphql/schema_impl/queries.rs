use async_graphql::{Context, Object, ID};
use validator::Validate;

use crate::{
    auth::{extract_claims_from_context, require_admin, require_session_owner},
    graphql::helpers::{app_state, parse_date, resolve},
    models::{
        domain::{LeaderboardEntry, Question},
        dto::{
            request::PaginationParams,
            response::{ExamSessionDto, PaginatedExamSessions, SubjectQuestionsDto},
        },
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn exam_session(
        &self,
        ctx: &Context<'_>,
        session_id: ID,
    ) -> async_graphql::Result<ExamSessionDto> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;

        resolve(
            state
                .exam_session_service
                .session(claims.student_id(), &session_id)
                .await,
        )
    }

    /// Questions for every subject of a session, grouped by subject.
    async fn exam_questions(
        &self,
        ctx: &Context<'_>,
        session_id: ID,
    ) -> async_graphql::Result<Vec<SubjectQuestionsDto>> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;

        resolve(
            state
                .exam_session_service
                .session_questions(claims.student_id(), &session_id)
                .await,
        )
    }

    async fn exam_sessions(
        &self,
        ctx: &Context<'_>,
        student_id: Option<ID>,
        pagination: Option<PaginationParams>,
    ) -> async_graphql::Result<PaginatedExamSessions> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;

        let student_id = student_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| claims.sub.clone());
        resolve(require_session_owner(&claims, &student_id))?;

        let pagination = pagination.unwrap_or_default();
        resolve(pagination.validate().map_err(Into::into))?;

        resolve(
            state
                .exam_session_service
                .list_sessions(&student_id, pagination.offset(), pagination.limit())
                .await,
        )
    }

    /// Ranked competition results for a day (`YYYY-MM-DD`, today when omitted).
    async fn leaderboard(
        &self,
        ctx: &Context<'_>,
        date: Option<String>,
    ) -> async_graphql::Result<Vec<LeaderboardEntry>> {
        let state = app_state(ctx)?;
        let date = resolve(parse_date(date.as_deref()))?;

        resolve(state.leaderboard_service.leaderboard(date).await)
    }

    async fn questions(
        &self,
        ctx: &Context<'_>,
        exam_type: String,
        subject: String,
        exam_year: String,
    ) -> async_graphql::Result<Vec<Question>> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;
        resolve(require_admin(&claims))?;

        resolve(
            state
                .acquisition_service
                .stored_questions(&exam_type, &subject, &exam_year)
                .await,
        )
    }
}
