use actix_web::web::{self, Json};
use actix_web::{delete, get, post, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::controller::AppState;
use crate::error::StoreError;
use crate::model::{Credentials, NewAccount, Place, PlaceCandidate};
use crate::osm::Coordinates;
use crate::sync::{LikeChange, ReportOutcome};
use crate::view::{categories, CategoryFilter, ViewMode, ViewState};

#[derive(Deserialize)]
pub struct GetPlacesArgs {
    q: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    mode: Option<ViewMode>,
}

impl GetPlacesArgs {
    fn view_state(&self) -> ViewState {
        let filter: CategoryFilter = self.kind.as_deref().unwrap_or_default().parse().unwrap_or_default();

        ViewState {
            query: self.q.clone().unwrap_or_default(),
            filter,
            mode: self.mode.unwrap_or_default(),
        }
    }
}

#[get("/places")]
pub async fn get_places(state: web::Data<AppState>, args: web::Query<GetPlacesArgs>) -> Json<Vec<Place>> {
    let places = state.store.places().await;
    Json(args.view_state().visible(&places).into_iter().cloned().collect())
}

#[derive(Serialize)]
pub struct Listing {
    mode: ViewMode,
    filtered: bool,
    categories: Vec<String>,
    places: Vec<Place>,
}

/// Everything the main page renders for one set of inputs.
#[get("/places/view")]
pub async fn get_listing(state: web::Data<AppState>, args: web::Query<GetPlacesArgs>) -> Json<Listing> {
    let places = state.store.places().await;
    let view = args.view_state();

    Json(Listing {
        mode: view.mode,
        filtered: view.is_filtered(),
        categories: categories(&places),
        places: view.visible(&places).into_iter().cloned().collect(),
    })
}

#[get("/places/categories")]
pub async fn get_categories(state: web::Data<AppState>) -> Json<Vec<String>> {
    Json(categories(&state.store.places().await))
}

#[post("/places")]
pub async fn add_place(
    state: web::Data<AppState>,
    candidate: Json<PlaceCandidate>,
) -> Result<HttpResponse, StoreError> {
    state.store.submit(candidate.into_inner()).await?;
    Ok(HttpResponse::Created().json(state.store.places().await))
}

#[post("/places/refresh")]
pub async fn refresh_places(state: web::Data<AppState>) -> Result<Json<Vec<Place>>, StoreError> {
    state.store.fetch_all().await?;
    Ok(Json(state.store.places().await))
}

#[derive(Serialize)]
pub struct LikeResponse {
    change: LikeChange,
    place: Option<Place>,
}

#[post("/places/{id}/like")]
pub async fn toggle_like(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<Json<LikeResponse>, StoreError> {
    let id = path.into_inner();
    let change = state.store.toggle_like(&id).await?;
    let place = state
        .store
        .places()
        .await
        .into_iter()
        .find(|place| place.id == id);

    Ok(Json(LikeResponse { change, place }))
}

#[derive(Deserialize, Default)]
pub struct ReportArgs {
    reason: Option<String>,
}

#[post("/places/{id}/report")]
pub async fn report_place(
    state: web::Data<AppState>,
    path: web::Path<String>,
    args: Option<Json<ReportArgs>>,
) -> Result<HttpResponse, StoreError> {
    let reason = args.map(|args| args.into_inner()).unwrap_or_default().reason;
    let outcome = state.store.report(&path.into_inner(), reason).await?;

    let response = match outcome {
        ReportOutcome::Sent => HttpResponse::Created(),
        ReportOutcome::AlreadyReported => HttpResponse::Conflict(),
    }
    .json(json!({ "outcome": outcome }));

    Ok(response)
}

#[post("/accounts")]
pub async fn sign_up(
    state: web::Data<AppState>,
    account: Json<NewAccount>,
) -> Result<HttpResponse, StoreError> {
    let id = state.store.sign_up(&account).await?;
    Ok(HttpResponse::Created().json(json!({ "user_id": id })))
}

#[get("/session")]
pub async fn get_session(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "user_id": state.store.viewer().await }))
}

#[post("/session")]
pub async fn sign_in(
    state: web::Data<AppState>,
    credentials: Json<Credentials>,
) -> Result<HttpResponse, StoreError> {
    let id = state.store.sign_in(&credentials).await?;
    Ok(HttpResponse::Ok().json(json!({ "user_id": id })))
}

#[delete("/session")]
pub async fn sign_out(state: web::Data<AppState>) -> Result<HttpResponse, StoreError> {
    state.store.sign_out().await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize)]
pub struct UploadArgs {
    file_name: String,
}

#[post("/photos")]
pub async fn upload_photo(
    state: web::Data<AppState>,
    args: web::Query<UploadArgs>,
    body: web::Bytes,
) -> Result<HttpResponse, StoreError> {
    let url = state.store.upload_photo(&args.file_name, body.to_vec()).await?;
    Ok(HttpResponse::Created().json(json!({ "url": url })))
}

#[get("/geocode")]
pub async fn reverse_geocode(state: web::Data<AppState>, args: web::Query<Coordinates>) -> HttpResponse {
    let address = match args.into_inner().validate() {
        Ok(at) => state.geocoder.reverse(at).await,
        Err(_) => None,
    };

    HttpResponse::Ok().json(json!({ "address": address }))
}

#[derive(Deserialize)]
pub struct LocationArgs {
    selection: Option<Coordinates>,
    #[serde(default)]
    current: String,
}

#[post("/geocode/location")]
pub async fn resolve_location(
    state: web::Data<AppState>,
    args: Json<LocationArgs>,
) -> Result<HttpResponse, StoreError> {
    let location = state
        .geocoder
        .resolve_location(args.selection, &args.current)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "location": location })))
}
