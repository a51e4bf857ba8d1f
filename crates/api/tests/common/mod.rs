#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use assetflow_api::auth::jwt::{generate_access_token, JwtConfig};
use assetflow_api::config::ServerConfig;
use assetflow_api::router::build_app_router;
use assetflow_api::state::AppState;
use assetflow_core::assets::{Area, AssetType, Collaborator};
use assetflow_core::location::{Block, Campus, NewBlock, Room, Site};
use assetflow_core::roles::Role;
use assetflow_core::scope::{Actor, ActorProfile};
use assetflow_core::store::{InventoryStore, LocationStore, MemoryStore};
use assetflow_core::types::DbId;
use assetflow_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Seeded reference data shared by the API tests.
///
/// One campus with site `77` and block `A` (floors -1..=3), one room in it,
/// a second campus with its own room, two areas, and one actor per role.
pub struct World {
    pub lima: Campus,
    pub arequipa: Campus,
    pub site: Site,
    pub block: Block,
    pub room: Room,
    pub other_room: Room,
    pub sistemas: Area,
    pub laboratorio: Area,
    pub laptop: AssetType,
    pub phone: AssetType,
    pub custodian: Collaborator,
    pub admin: Actor,
    pub sis_supervisor: Actor,
    pub lab_supervisor: Actor,
    pub aux_arequipa: Actor,
    pub external: Actor,
}

fn profile(role: Role, areas: &[DbId], campuses: &[DbId]) -> Option<ActorProfile> {
    Some(ActorProfile {
        role,
        area_ids: areas.iter().copied().collect::<BTreeSet<_>>(),
        campus_ids: campuses.iter().copied().collect::<BTreeSet<_>>(),
        collaborator_id: None,
        is_active: true,
    })
}

async fn seed(store: &MemoryStore) -> World {
    let lima = store.add_campus("LIM", "Lima").await;
    let arequipa = store.add_campus("ARE", "Arequipa").await;
    let site = store.add_site(lima.id, 77, "Sede Central").await;
    let block = store
        .insert_block(&NewBlock {
            site_id: site.id,
            letter: 'A',
            floors: 3,
            basements: 1,
            name: None,
        })
        .await
        .unwrap();
    let room = store.force_room(block.id, 1, 1, "77A101").await;

    let other_site = store.add_site(arequipa.id, 12, "Sede Sur").await;
    let other_block = store
        .insert_block(&NewBlock {
            site_id: other_site.id,
            letter: 'B',
            floors: 2,
            basements: 0,
            name: None,
        })
        .await
        .unwrap();
    let other_room = store.force_room(other_block.id, 1, 1, "12B101").await;

    let sistemas = store.add_area("sistemas", "Sistemas").await;
    let laboratorio = store.add_area("laboratorio", "Laboratorio").await;
    let laptop = store.add_asset_type(sistemas.id, "Laptop", false).await;
    let phone = store.add_asset_type(sistemas.id, "Celular", true).await;

    let custodian = store.add_collaborator("Rosa Quispe", true).await;

    let admin = store.add_actor("Admin", profile(Role::Admin, &[], &[])).await;
    let sis_supervisor = store
        .add_actor("Sis Supervisor", profile(Role::Supervisor, &[sistemas.id], &[]))
        .await;
    let lab_supervisor = store
        .add_actor("Lab Supervisor", profile(Role::Supervisor, &[laboratorio.id], &[]))
        .await;
    let aux_arequipa = store
        .add_actor("Aux Arequipa", profile(Role::Auxiliary, &[], &[arequipa.id]))
        .await;
    let mut external_profile = profile(Role::External, &[], &[]);
    if let Some(p) = external_profile.as_mut() {
        p.collaborator_id = Some(custodian.id);
    }
    let external = store.add_actor("Rosa", external_profile).await;

    World {
        lima,
        arequipa,
        site,
        block,
        room,
        other_room,
        sistemas,
        laboratorio,
        laptop,
        phone,
        custodian,
        admin,
        sis_supervisor,
        lab_supervisor,
        aux_arequipa,
        external,
    }
}

/// The application under test plus handles on its in-memory backing.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub event_bus: Arc<EventBus>,
    pub config: ServerConfig,
    pub world: World,
}

impl TestApp {
    /// Bearer token for `actor`.
    pub fn token(&self, actor: &Actor) -> String {
        generate_access_token(actor.id, &self.config.jwt).unwrap()
    }

    pub async fn get(&self, uri: &str, actor: &Actor) -> Response<Body> {
        let token = self.token(actor);
        send(self.router.clone(), Method::GET, uri, Some(&token), None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        actor: &Actor,
        body: serde_json::Value,
    ) -> Response<Body> {
        let token = self.token(actor);
        send(self.router.clone(), Method::POST, uri, Some(&token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, actor: &Actor, body: serde_json::Value) -> Response<Body> {
        let token = self.token(actor);
        send(self.router.clone(), Method::PUT, uri, Some(&token), Some(body)).await
    }

    /// Register a laptop in `room_id` as `actor` and return its internal code.
    pub async fn register_laptop(&self, actor: &Actor, room_id: DbId) -> String {
        let response = self
            .post(
                "/api/v1/assets",
                actor,
                serde_json::json!({
                    "name": "Laptop Dell",
                    "area_id": self.world.sistemas.id,
                    "asset_type_id": self.world.laptop.id,
                    "room_id": room_id,
                    "condition": "active",
                }),
            )
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        let json = body_json(response).await;
        json["data"]["internal_code"].as_str().unwrap().to_string()
    }
}

/// Build the full application router over a seeded in-memory store.
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// (CORS, request ID, timeout, tracing, panic recovery) as production.
pub async fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let world = seed(&store).await;
    let event_bus = Arc::new(EventBus::default());

    let dyn_store: Arc<dyn InventoryStore> = store.clone();
    let state = AppState::new(dyn_store, Arc::clone(&event_bus), config.clone());
    let router = build_app_router(state, &config);

    TestApp {
        router,
        store,
        event_bus,
        config,
        world,
    }
}

/// Send one request through the router.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Send an unauthenticated GET.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
