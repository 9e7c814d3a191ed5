use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};

use crate::dao::{
    api::{ApiError, ApiResult},
    ranked_api::{RankedApi, TournamentCall},
    session::SessionStore,
};
use crate::dto::{
    CourtId, LobbyId, MatchId, TournamentId, UserSummary,
    bulk::{BulkReviewRequest, BulkReviewResponse, ReviewTarget},
    common::{ErrorBody, MessageResponse},
    lobby::{
        CourtChallengeRequest, CourtLobbiesResponse, CreateLobbyRequest, CreateLobbyResponse,
        LobbyResponse, RespondAction, RespondLobbyResponse, RespondRequest,
        ScheduledChallengeRequest, StartLobbyResponse,
    },
    matches::{
        ConfirmMatchResponse, MatchDto, MatchResponse, MatchesResponse, SubmitScoreRequest,
        SubmitScoreResponse,
    },
    notifications::NotificationsResponse,
    queue::{JoinQueueRequest, JoinQueueResponse, LeaveQueueRequest, QueueEntryDto, QueueResponse},
    tournament::{
        CreateTournamentRequest, TournamentDto, TournamentResponse, TournamentStatusDto,
        TournamentsResponse,
    },
};

use super::{config::ApiConfig, error::HttpApiError, error::HttpResult};

const RANKED: &str = "/api/ranked";

#[derive(Deserialize)]
struct TournamentEnvelope {
    tournament: TournamentDto,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    user: UserSummary,
}

/// Ranked backend client over reqwest, authenticating with the session's bearer token.
#[derive(Clone)]
pub struct HttpRankedApi {
    client: Client,
    base_url: Arc<str>,
    session: Arc<dyn SessionStore>,
}

impl HttpRankedApi {
    /// Build the client. No request is sent until the first call.
    pub fn new(config: ApiConfig, session: Arc<dyn SessionStore>) -> HttpResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| HttpApiError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T>(&self, path: &str, builder: RequestBuilder) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .map_err(|source| HttpApiError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                warn!(path, "backend rejected credentials; clearing session");
                self.session.clear();
                Err(ApiError::Unauthorized)
            }
            status if status.is_success() => response.json::<T>().await.map_err(|source| {
                HttpApiError::DecodeResponse {
                    path: path.to_string(),
                    source,
                }
                .into()
            }),
            status => {
                let body = response.json::<ErrorBody>().await.unwrap_or_default();
                let (message, details) = body.into_message();
                let message = message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));
                debug!(path, status = status.as_u16(), %message, "backend rejected request");
                Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message,
                    details,
                })
            }
        }
    }

    async fn get<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        self.send(path, self.request(Method::GET, path)).await
    }

    async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(path, self.request(Method::GET, path).query(query))
            .await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(path, self.request(Method::POST, path).json(body))
            .await
    }

    async fn post_empty<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        self.post(path, &json!({})).await
    }
}

impl RankedApi for HttpRankedApi {
    fn queue(&self, court_id: CourtId) -> BoxFuture<'static, ApiResult<Vec<QueueEntryDto>>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/queue/{court_id}");
            let response = api.get::<QueueResponse>(&path).await?;
            Ok(response.queue)
        })
    }

    fn active_matches(&self, court_id: CourtId) -> BoxFuture<'static, ApiResult<Vec<MatchDto>>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/active/{court_id}");
            let response = api.get::<MatchesResponse>(&path).await?;
            Ok(response.matches)
        })
    }

    fn pending_matches(&self) -> BoxFuture<'static, ApiResult<Vec<MatchDto>>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/pending");
            let response = api.get::<MatchesResponse>(&path).await?;
            Ok(response.matches)
        })
    }

    fn court_lobbies(
        &self,
        court_id: CourtId,
    ) -> BoxFuture<'static, ApiResult<CourtLobbiesResponse>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/court/{court_id}/lobbies");
            api.get(&path).await
        })
    }

    fn tournaments(
        &self,
        court_id: CourtId,
        status: TournamentStatusDto,
    ) -> BoxFuture<'static, ApiResult<Vec<TournamentDto>>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/tournaments");
            let query = [
                ("court_id", court_id.to_string()),
                ("status", status.as_query().to_string()),
            ];
            let response = api
                .get_with_query::<TournamentsResponse, _>(&path, &query)
                .await?;
            Ok(response.tournaments)
        })
    }

    fn tournament(&self, id: TournamentId) -> BoxFuture<'static, ApiResult<TournamentDto>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/tournaments/{id}");
            let envelope = api.get::<TournamentEnvelope>(&path).await?;
            Ok(envelope.tournament)
        })
    }

    fn create_tournament(
        &self,
        request: CreateTournamentRequest,
    ) -> BoxFuture<'static, ApiResult<TournamentDto>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/tournaments");
            let envelope = api.post::<TournamentEnvelope, _>(&path, &request).await?;
            Ok(envelope.tournament)
        })
    }

    fn tournament_call(
        &self,
        id: TournamentId,
        call: TournamentCall,
    ) -> BoxFuture<'static, ApiResult<TournamentResponse>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/tournaments/{id}/{}", call.suffix());
            match call {
                TournamentCall::Respond(action) => {
                    api.post(&path, &RespondRequest { action }).await
                }
                TournamentCall::Invite(request) => api.post(&path, &request).await,
                _ => api.post_empty(&path).await,
            }
        })
    }

    fn join_queue(
        &self,
        request: JoinQueueRequest,
    ) -> BoxFuture<'static, ApiResult<JoinQueueResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post(&format!("{RANKED}/queue/join"), &request).await })
    }

    fn leave_queue(
        &self,
        request: LeaveQueueRequest,
    ) -> BoxFuture<'static, ApiResult<MessageResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post(&format!("{RANKED}/queue/leave"), &request).await })
    }

    fn create_lobby(
        &self,
        request: CreateLobbyRequest,
    ) -> BoxFuture<'static, ApiResult<CreateLobbyResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post(&format!("{RANKED}/lobby/queue"), &request).await })
    }

    fn respond_lobby(
        &self,
        id: LobbyId,
        action: RespondAction,
    ) -> BoxFuture<'static, ApiResult<RespondLobbyResponse>> {
        let api = self.clone();
        Box::pin(async move {
            let path = format!("{RANKED}/lobby/{id}/respond");
            api.post(&path, &RespondRequest { action }).await
        })
    }

    fn start_lobby(&self, id: LobbyId) -> BoxFuture<'static, ApiResult<StartLobbyResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post_empty(&format!("{RANKED}/lobby/{id}/start")).await })
    }

    fn submit_score(
        &self,
        id: MatchId,
        request: SubmitScoreRequest,
    ) -> BoxFuture<'static, ApiResult<SubmitScoreResponse>> {
        let api = self.clone();
        Box::pin(async move {
            api.post(&format!("{RANKED}/match/{id}/score"), &request)
                .await
        })
    }

    fn confirm_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<ConfirmMatchResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post_empty(&format!("{RANKED}/match/{id}/confirm")).await })
    }

    fn reject_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<MatchResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post_empty(&format!("{RANKED}/match/{id}/reject")).await })
    }

    fn cancel_match(&self, id: MatchId) -> BoxFuture<'static, ApiResult<MatchResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post_empty(&format!("{RANKED}/match/{id}/cancel")).await })
    }

    fn court_challenge(
        &self,
        request: CourtChallengeRequest,
    ) -> BoxFuture<'static, ApiResult<LobbyResponse>> {
        let api = self.clone();
        Box::pin(async move {
            api.post(&format!("{RANKED}/challenge/court"), &request)
                .await
        })
    }

    fn scheduled_challenge(
        &self,
        request: ScheduledChallengeRequest,
    ) -> BoxFuture<'static, ApiResult<LobbyResponse>> {
        let api = self.clone();
        Box::pin(async move {
            api.post(&format!("{RANKED}/challenge/scheduled"), &request)
                .await
        })
    }

    fn notifications(&self) -> BoxFuture<'static, ApiResult<NotificationsResponse>> {
        let api = self.clone();
        Box::pin(async move { api.get("/api/auth/notifications").await })
    }

    fn profile(&self) -> BoxFuture<'static, ApiResult<UserSummary>> {
        let api = self.clone();
        Box::pin(async move {
            let envelope = api.get::<ProfileEnvelope>("/api/auth/profile").await?;
            Ok(envelope.user)
        })
    }

    fn bulk_review(
        &self,
        target: ReviewTarget,
        request: BulkReviewRequest,
    ) -> BoxFuture<'static, ApiResult<BulkReviewResponse>> {
        let api = self.clone();
        Box::pin(async move { api.post(target.path(), &request).await })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::{HeaderMap, StatusCode as AxumStatus, header::AUTHORIZATION},
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::dao::session::{MemorySessionStore, Session};
    use crate::dto::{MatchType, UserId};

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn signed_in() -> Arc<MemorySessionStore> {
        Arc::new(MemorySessionStore::new(Some(Session {
            token: "tok-123".into(),
            user: None,
        })))
    }

    fn api(base_url: String, session: Arc<MemorySessionStore>) -> HttpRankedApi {
        HttpRankedApi::new(ApiConfig::new(base_url), session).unwrap()
    }

    #[tokio::test]
    async fn sends_bearer_token_and_decodes_queue() {
        async fn queue(headers: HeaderMap, Path(court): Path<i64>) -> (AxumStatus, Json<Value>) {
            let auth = headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok());
            if auth != Some("Bearer tok-123") {
                return (AxumStatus::FORBIDDEN, Json(json!({"error": "no token"})));
            }
            (
                AxumStatus::OK,
                Json(json!({"queue": [{
                    "id": 1, "user_id": 5, "court_id": court, "match_type": "doubles",
                    "joined_at": "2025-04-02T10:00:00"
                }]})),
            )
        }
        let base = serve(Router::new().route("/api/ranked/queue/{court}", get(queue))).await;

        let entries = api(base, signed_in()).queue(CourtId(12)).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].court_id, CourtId(12));
        assert_eq!(entries[0].user_id, UserId(5));
        assert_eq!(entries[0].match_type, MatchType::Doubles);
    }

    #[tokio::test]
    async fn unauthorized_clears_session() {
        async fn pending() -> (AxumStatus, Json<Value>) {
            (
                AxumStatus::UNAUTHORIZED,
                Json(json!({"error": "Authentication required"})),
            )
        }
        let base = serve(Router::new().route("/api/ranked/pending", get(pending))).await;
        let session = signed_in();

        let err = api(base, session.clone())
            .pending_matches()
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn business_rejection_is_surfaced_verbatim() {
        async fn join() -> (AxumStatus, Json<Value>) {
            (
                AxumStatus::CONFLICT,
                Json(json!({"error": "Already in queue at this court"})),
            )
        }
        let base = serve(Router::new().route("/api/ranked/queue/join", post(join))).await;

        let err = api(base, signed_in())
            .join_queue(JoinQueueRequest {
                court_id: CourtId(3),
                match_type: MatchType::Singles,
            })
            .await
            .unwrap_err();

        match err {
            ApiError::Rejected {
                status, message, ..
            } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Already in queue at this court");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tournament_listing_passes_court_and_status_filters() {
        async fn list(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            assert_eq!(params.get("court_id").map(String::as_str), Some("4"));
            assert_eq!(params.get("status").map(String::as_str), Some("live"));
            Json(json!({"tournaments": [{
                "id": 8, "court_id": 4, "host_user_id": 1, "name": "Dink Cup",
                "status": "live", "match_type": "singles",
                "max_players": 8, "min_participants": 4
            }]}))
        }
        let base = serve(Router::new().route("/api/ranked/tournaments", get(list))).await;

        let tournaments = api(base, signed_in())
            .tournaments(CourtId(4), TournamentStatusDto::Live)
            .await
            .unwrap();

        assert_eq!(tournaments.len(), 1);
        assert_eq!(tournaments[0].name, "Dink Cup");
    }

    #[tokio::test]
    async fn no_show_call_targets_participant_path() {
        async fn no_show(Path((id, user)): Path<(i64, i64)>) -> Json<Value> {
            Json(json!({"message": format!("{user} marked no-show in {id}")}))
        }
        let base = serve(Router::new().route(
            "/api/ranked/tournaments/{id}/participants/{user}/no-show",
            post(no_show),
        ))
        .await;

        let response = api(base, signed_in())
            .tournament_call(TournamentId(2), TournamentCall::MarkNoShow(UserId(6)))
            .await
            .unwrap();

        assert!(response.tournament.is_none());
        assert_eq!(response.message.as_deref(), Some("6 marked no-show in 2"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = api(format!("http://{addr}"), signed_in())
            .notifications()
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport { .. }));
        assert!(err.to_string().starts_with("unable to load"));
    }
}
