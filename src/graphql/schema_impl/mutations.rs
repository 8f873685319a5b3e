use async_graphql::{Context, Object};
use validator::Validate;

use crate::{
    auth::{extract_claims_from_context, require_admin},
    graphql::helpers::{app_state, resolve},
    models::{
        domain::Question,
        dto::{
            request::{EnsureQuestionsInput, FinishExamInput, StartExamInput, SubmitAnswersInput},
            response::{ExamResult, ExamSessionDto},
        },
    },
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Tops up the stored pool for one subject and year from the structured API.
    async fn ensure_questions(
        &self,
        ctx: &Context<'_>,
        input: EnsureQuestionsInput,
    ) -> async_graphql::Result<Vec<Question>> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;
        resolve(require_admin(&claims))?;
        resolve(input.validate().map_err(Into::into))?;

        let pool = input
            .pool_size
            .map(|size| size as usize)
            .unwrap_or_else(|| state.acquisition_service.default_pool());

        resolve(
            state
                .acquisition_service
                .ensure_questions(&input.exam_type, &input.subject, &input.exam_year, pool)
                .await,
        )
    }

    async fn start_exam(
        &self,
        ctx: &Context<'_>,
        input: StartExamInput,
    ) -> async_graphql::Result<ExamSessionDto> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;
        resolve(input.validate().map_err(Into::into))?;

        let service = &state.exam_session_service;
        let session = resolve(
            service
                .start_exam(
                    claims.student_id(),
                    &input.subjects,
                    &input.exam_year,
                    input.is_competition.unwrap_or(false),
                )
                .await,
        )?;
        Ok(ExamSessionDto::from_session(
            session,
            service.rules(),
            chrono::Utc::now(),
        ))
    }

    async fn submit_answers(
        &self,
        ctx: &Context<'_>,
        input: SubmitAnswersInput,
    ) -> async_graphql::Result<bool> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;
        resolve(input.validate().map_err(Into::into))?;

        resolve(
            state
                .exam_session_service
                .submit_answers(claims.student_id(), &input.session_id, &input.answers)
                .await,
        )
    }

    async fn finish_exam(
        &self,
        ctx: &Context<'_>,
        input: FinishExamInput,
    ) -> async_graphql::Result<ExamResult> {
        let state = app_state(ctx)?;
        let claims = resolve(extract_claims_from_context(ctx))?;
        resolve(input.validate().map_err(Into::into))?;

        resolve(
            state
                .exam_session_service
                .finish_exam(
                    claims.student_id(),
                    &input.session_id,
                    input.answers.as_deref(),
                )
                .await,
        )
    }
}
