use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AgentCardQuery {
    pub agent_id: Option<String>,
}

/// Serve the agent card at `/.well-known/agent.json`.
///
/// Without `agent_id` the default agent is described.
pub async fn serve_agent_card(
    State(state): State<AppState>,
    Query(query): Query<AgentCardQuery>,
) -> Response {
    let agent = match query.agent_id.as_deref() {
        Some(id) => state.agents.get(id),
        None => state.agents.default_agent(),
    };

    match agent {
        Some(agent) => Json(agent.describe()).into_response(),
        None => {
            let detail = match query.agent_id {
                Some(id) => format!("Agent {id} not found"),
                None => "No agent registered".to_string(),
            };
            (StatusCode::NOT_FOUND, Json(serde_json::json!({ "detail": detail }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::{AgentProfile, AgentRegistry, ModelAgent};
    use crate::dispatcher::TaskDispatcher;
    use crate::generation::StaticGenerator;
    use crate::router::create_router;
    use atp_types::AgentCard;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn make_router(registry: AgentRegistry) -> axum::Router {
        let agents = Arc::new(registry);
        let handler = TaskDispatcher::builder().agents(agents.clone()).build();
        create_router(Arc::new(handler), agents)
    }

    fn agent(id: &str, name: &str, profile: AgentProfile) -> Arc<ModelAgent> {
        Arc::new(ModelAgent::new(id, name, profile, Arc::new(StaticGenerator::new("ok"))))
    }

    fn two_agents() -> AgentRegistry {
        AgentRegistry::new()
            .with(agent("reasoner", "Reasoner", AgentProfile::reasoning()))
            .with(agent("quick", "Quick", AgentProfile::concise()))
    }

    fn get(uri: &str) -> Request<axum::body::Body> {
        Request::builder()
            .uri(uri)
            .method("GET")
            .header("origin", "http://example.com")
            .body(axum::body::Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_agent_card_endpoint_returns_default_agent() {
        let resp = make_router(two_agents())
            .oneshot(get("/.well-known/agent.json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert_eq!(content_type, "application/json");

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let card: AgentCard = serde_json::from_slice(&body).unwrap();
        assert_eq!(card.name, "Reasoner");
        assert!(card.capabilities.streaming);
    }

    #[tokio::test]
    async fn test_agent_card_by_id() {
        let resp = make_router(two_agents())
            .oneshot(get("/.well-known/agent.json?agent_id=quick"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let card: AgentCard = serde_json::from_slice(&body).unwrap();
        assert_eq!(card.name, "Quick");
        assert!(card.skills.iter().any(|s| s.id == "summarize_text"));
    }

    #[tokio::test]
    async fn test_agent_card_unknown_id_is_404() {
        let resp = make_router(two_agents())
            .oneshot(get("/.well-known/agent.json?agent_id=nobody"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_agent_card_without_agents_is_404() {
        let resp = make_router(AgentRegistry::new())
            .oneshot(get("/.well-known/agent.json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["detail"], "No agent registered");
    }

    #[tokio::test]
    async fn test_agent_card_cors_headers() {
        let resp = make_router(two_agents())
            .oneshot(get("/.well-known/agent.json"))
            .await
            .unwrap();

        let allow_origin = resp
            .headers()
            .get("access-control-allow-origin")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(allow_origin, "*");
    }
}
