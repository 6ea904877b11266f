use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, Method},
    routing::{delete, get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use waymark_core::{
    AttendanceState, BlobPayload, ContentService, CoreError, DiscoveryService, EventService,
    FriendGraph, LikeState, MediaItem, MediaService, MediaUpload, MessagingService, NearbyPin,
    NewEvent, NewPin, SharedDatabase, UserProfile,
};
use waymark_shared::Viewer;
use waymark_store::{Comment, Event, Media, Message, Pin, User};

use crate::auth::{self, TokenSigner};
use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDatabase,
    pub content: Arc<ContentService>,
    pub discovery: Arc<DiscoveryService>,
    pub friends: Arc<FriendGraph>,
    pub media: Arc<MediaService>,
    pub messaging: Arc<MessagingService>,
    pub events: Arc<EventService>,
    pub signer: Arc<TokenSigner>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let max_body = state.config.max_blob_size;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/guest", post(guest_login))
        .route("/api/auth/me", get(me))
        .route("/api/pins", post(create_pin).get(list_feed))
        .route("/api/pins/search", get(search_pins))
        .route("/api/pins/:id", get(get_pin).delete(delete_pin))
        .route("/api/pins/:id/like", post(toggle_like))
        .route("/api/pins/:id/comments", post(add_comment))
        .route("/api/pins/:id/comments/:comment_id", delete(delete_comment))
        .route("/api/pins/:id/media", post(upload_media).get(get_media))
        .route("/api/media/:id", delete(delete_media))
        .route("/api/friends/request/:user_id", post(request_friend))
        .route("/api/friends/accept/:user_id", post(accept_friend))
        .route("/api/friends", get(list_friends))
        .route("/api/friends/requests", get(list_friend_requests))
        .route("/api/users/search", get(search_users))
        .route("/api/users/:id/pins", get(list_user_pins))
        .route("/api/users/profile-picture", post(upload_profile_picture))
        .route("/api/users/:id/profile-picture", get(get_profile_picture))
        .route("/api/messages", post(send_message).get(list_conversations))
        .route("/api/messages/:friend_id", get(get_thread))
        .route("/api/events", post(create_event).get(list_events))
        .route("/api/events/search", get(search_events))
        .route("/api/events/:id/attend", post(toggle_attendance))
        .route("/api/discover/trending", get(get_trending))
        .route("/api/discover/nearby", get(get_nearby))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn viewer(state: &AppState, headers: &HeaderMap) -> Result<Viewer, ServerError> {
    auth::resolve_viewer(&state.db, &state.signer, headers).await
}

// ─── Health ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Auth ───

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct AuthUser {
    id: Uuid,
    username: String,
    email: String,
    is_guest: bool,
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: AuthUser,
}

impl AuthResponse {
    fn for_user(user: &User, token: String) -> Self {
        Self {
            token,
            user: AuthUser {
                id: user.id,
                username: user.username.clone(),
                email: user.email.clone(),
                is_guest: user.is_guest,
            },
        }
    }
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ServerError::BadRequest(
            "username and password are required".to_string(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ServerError::BadRequest("invalid email address".to_string()));
    }

    let exists = {
        let db = state.db.lock().await;
        db.user_exists(&req.username, &req.email)
            .map_err(CoreError::from)?
    };
    if exists {
        return Err(CoreError::Conflict("user already exists".to_string()).into());
    }

    let user = User {
        id: Uuid::new_v4(),
        username: req.username,
        email: req.email,
        password_hash: Some(auth::hash_password(&req.password)?),
        profile_photo: None,
        is_guest: false,
        friends: Default::default(),
        friend_requests: Default::default(),
        created_at: Utc::now(),
    };
    {
        let db = state.db.lock().await;
        db.insert_user(&user).map_err(CoreError::from)?;
    }

    let token = state.signer.issue(user.id, state.config.token_ttl_hours)?;
    info!(user = %user.id, email = %user.email, "new user registered");
    Ok(Json(AuthResponse::for_user(&user, token)))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let user = {
        let db = state.db.lock().await;
        db.get_user_by_email(&req.email)
            .map_err(|_| ServerError::Unauthenticated("invalid credentials".to_string()))?
    };

    let valid = user
        .password_hash
        .as_deref()
        .map(|hash| auth::verify_password(&req.password, hash))
        .unwrap_or(false);
    if !valid {
        return Err(ServerError::Unauthenticated(
            "invalid credentials".to_string(),
        ));
    }

    let token = state.signer.issue(user.id, state.config.token_ttl_hours)?;
    info!(user = %user.id, "user login");
    Ok(Json(AuthResponse::for_user(&user, token)))
}

/// Create a sandboxed temporary account. Guest tokens have a shorter TTL.
async fn guest_login(State(state): State<AppState>) -> Result<Json<AuthResponse>, ServerError> {
    let id = Uuid::new_v4();
    let short = id.to_string()[..8].to_string();
    let user = User {
        id,
        username: format!("Guest_{short}"),
        email: format!("guest_{short}@temp.invalid"),
        password_hash: None,
        profile_photo: None,
        is_guest: true,
        friends: Default::default(),
        friend_requests: Default::default(),
        created_at: Utc::now(),
    };
    {
        let db = state.db.lock().await;
        db.insert_user(&user).map_err(CoreError::from)?;
    }

    let token = state
        .signer
        .issue(user.id, state.config.guest_token_ttl_hours)?;
    info!(user = %user.id, "guest login");
    Ok(Json(AuthResponse::for_user(&user, token)))
}

async fn me(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    let user = {
        let db = state.db.lock().await;
        db.get_user(viewer.id).map_err(CoreError::from)?
    };
    Ok(Json(UserProfile::from(user)))
}

// ─── Pins ───

#[derive(Serialize)]
struct MediaResponse {
    #[serde(flatten)]
    media: Media,
    /// Self-describing `data:` URI built from the blob payload.
    file_data: String,
}

impl From<MediaItem> for MediaResponse {
    fn from(item: MediaItem) -> Self {
        Self {
            file_data: data_uri(&item.payload),
            media: item.media,
        }
    }
}

#[derive(Serialize)]
struct FeedPinResponse {
    #[serde(flatten)]
    pin: Pin,
    media: Vec<MediaResponse>,
}

fn data_uri(payload: &BlobPayload) -> String {
    format!(
        "data:{};base64,{}",
        payload.content_type,
        BASE64.encode(&payload.data)
    )
}

async fn create_pin(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<NewPin>,
) -> Result<Json<Pin>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    let pin = state.content.create_pin(&viewer, req).await?;
    Ok(Json(pin))
}

async fn list_feed(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedPinResponse>>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    let feed = state.content.list_feed(&viewer).await?;
    Ok(Json(
        feed.into_iter()
            .map(|entry| FeedPinResponse {
                pin: entry.pin,
                media: entry.media.into_iter().map(MediaResponse::from).collect(),
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

async fn search_pins(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Pin>>, ServerError> {
    viewer(&state, &headers).await?;
    Ok(Json(state.discovery.search_pins(&query.q).await?))
}

async fn get_pin(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Pin>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.content.get_pin(&viewer, id).await?))
}

async fn delete_pin(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    state.content.delete_pin(&viewer, id).await?;
    Ok(Json(serde_json::json!({ "message": "Pin deleted" })))
}

async fn toggle_like(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeState>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.content.toggle_like(&viewer, id).await?))
}

#[derive(Deserialize)]
struct CommentRequest {
    text: String,
}

async fn add_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<Comment>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.content.add_comment(&viewer, id, req.text).await?))
}

async fn delete_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((pin_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    state
        .content
        .delete_comment(&viewer, pin_id, comment_id)
        .await?;
    Ok(Json(serde_json::json!({ "message": "Comment deleted" })))
}

// ─── Media ───

async fn upload_media(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(pin_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Media>, ServerError> {
    let viewer = viewer(&state, &headers).await?;

    let mut upload: Option<MediaUpload> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("uploaded_file").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {e}")))?;
                upload = Some(MediaUpload {
                    data: data.to_vec(),
                    file_name,
                    content_type,
                    caption: None,
                });
            }
            "caption" => {
                caption = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let mut upload = upload.ok_or_else(|| {
        ServerError::BadRequest("Missing 'file' field in multipart form".to_string())
    })?;
    upload.caption = caption;

    let media = state.media.upload_media(&viewer, pin_id, upload).await?;
    info!(media = %media.id, pin = %pin_id, "media uploaded");
    Ok(Json(media))
}

async fn get_media(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(pin_id): Path<Uuid>,
) -> Result<Json<Vec<MediaResponse>>, ServerError> {
    viewer(&state, &headers).await?;
    let items = state.media.list_media(pin_id).await?;
    Ok(Json(items.into_iter().map(MediaResponse::from).collect()))
}

async fn delete_media(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    state.media.delete_media(&viewer, id).await?;
    Ok(Json(serde_json::json!({ "message": "Media deleted" })))
}

// ─── Friends ───

async fn request_friend(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    state.friends.request_friend(&viewer, user_id).await?;
    Ok(Json(serde_json::json!({ "message": "Friend request sent" })))
}

async fn accept_friend(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    state.friends.accept_friend(&viewer, user_id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Friend request accepted" }),
    ))
}

async fn list_friends(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.friends.list_friends(&viewer).await?))
}

async fn list_friend_requests(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.friends.list_friend_requests(&viewer).await?))
}

// ─── Users ───

async fn search_users(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserProfile>>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.discovery.search_users(&viewer, &query.q).await?))
}

async fn list_user_pins(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Pin>>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.content.list_user_pins(&viewer, user_id).await?))
}

async fn upload_profile_picture(
    headers: HeaderMap,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ServerError> {
    let viewer = viewer(&state, &headers).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("profile_picture").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {e}")))?;

            let blob_id = state
                .media
                .upload_profile_photo(&viewer, data.to_vec(), &file_name, &content_type)
                .await?;

            return Ok(Json(serde_json::json!({
                "message": "Profile picture updated",
                "blob_id": blob_id,
            })));
        }
    }

    Err(ServerError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

async fn get_profile_picture(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let payload = state.media.get_profile_photo(user_id).await?;
    Ok(Json(serde_json::json!({ "file_data": data_uri(&payload) })))
}

// ─── Messages ───

#[derive(Deserialize)]
struct MessageRequest {
    recipient_id: Uuid,
    content: String,
}

async fn send_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Message>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    let message = state
        .messaging
        .send_message(&viewer, req.recipient_id, req.content)
        .await?;
    Ok(Json(message))
}

async fn list_conversations(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.messaging.list_conversations(&viewer).await?))
}

async fn get_thread(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(friend_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.messaging.get_thread(&viewer, friend_id).await?))
}

// ─── Events ───

async fn create_event(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<NewEvent>,
) -> Result<Json<Event>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.events.create_event(&viewer, req).await?))
}

async fn list_events(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Event>>, ServerError> {
    viewer(&state, &headers).await?;
    Ok(Json(state.events.list_events().await?))
}

async fn search_events(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Event>>, ServerError> {
    viewer(&state, &headers).await?;
    Ok(Json(state.discovery.search_events(&query.q).await?))
}

async fn toggle_attendance(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttendanceState>, ServerError> {
    let viewer = viewer(&state, &headers).await?;
    Ok(Json(state.events.toggle_attendance(&viewer, id).await?))
}

// ─── Discovery ───

async fn get_trending(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Pin>>, ServerError> {
    viewer(&state, &headers).await?;
    Ok(Json(state.discovery.trending().await?))
}

#[derive(Deserialize)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    radius_km: Option<f64>,
}

async fn get_nearby(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyPin>>, ServerError> {
    viewer(&state, &headers).await?;
    Ok(Json(
        state
            .discovery
            .nearby(query.lat, query.lng, query.radius_km)
            .await?,
    ))
}

// ─── Serve ───

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
