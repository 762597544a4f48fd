use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use placeshare::controller::{self, AppState};
use placeshare::model::Place;
use placeshare::osm::Geocoder;
use placeshare::repository::PlaceRepository;
use placeshare::sync::PlaceStore;

fn state(repo: Arc<PlaceRepository>) -> web::Data<AppState> {
    web::Data::new(AppState {
        store: Arc::new(PlaceStore::new(repo)),
        geocoder: Geocoder::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
    })
}

fn new_place(name: &str, kind: &str) -> Value {
    json!({
        "name": name,
        "type": kind,
        "location": "Paris",
        "description": "Worth a visit",
        "rating": 4,
        "tags": "food, friends",
        "image": ""
    })
}

#[actix_web::test]
async fn browsing_adding_liking_and_reporting() {
    let repo = Arc::new(PlaceRepository::open_in_memory().unwrap());
    let app = test::init_service(
        App::new()
            .app_data(state(repo.clone()))
            .app_data(web::Data::from(repo.clone()))
            .configure(controller::configure)
            .configure(controller::configure_local),
    )
    .await;

    // anonymous viewers cannot add places
    let req = test::TestRequest::post()
        .uri("/places")
        .set_json(new_place("Le Central", "Café"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/accounts")
        .set_json(json!({ "email": "alice@example.com", "password": "secret", "display_name": "Alice" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(json!({ "email": "nobody@example.com", "password": "secret" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/session")
        .set_json(json!({ "email": "alice@example.com", "password": "secret" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    for (name, kind) in [("Le Central", "Café"), ("Sky Bar", "Bar")] {
        let req = test::TestRequest::post()
            .uri("/places")
            .set_json(new_place(name, kind))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let mut bad = new_place("Nowhere", "Parc");
    bad["rating"] = json!(6);
    let req = test::TestRequest::post().uri("/places").set_json(bad).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/places").to_request();
    let places: Vec<Place> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = places.iter().map(|place| place.name.as_str()).collect();
    assert_eq!(names, vec!["Sky Bar", "Le Central"]);
    assert_eq!(places[0].author, "Alice");

    let req = test::TestRequest::get().uri("/places?q=central").to_request();
    let places: Vec<Place> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].name, "Le Central");

    let req = test::TestRequest::get().uri("/places?type=Bar").to_request();
    let places: Vec<Place> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].name, "Sky Bar");
    let sky_bar = places[0].id.clone();

    let req = test::TestRequest::get().uri("/places/categories").to_request();
    let categories: Vec<String> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(categories, vec!["all", "Bar", "Café"]);

    let req = test::TestRequest::get().uri("/places/view?type=Bar&mode=map").to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["mode"], "map");
    assert_eq!(listing["filtered"], true);
    assert_eq!(listing["categories"], json!(["all", "Bar", "Café"]));
    assert_eq!(listing["places"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/places/view").to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["mode"], "grid");
    assert_eq!(listing["filtered"], false);
    assert_eq!(listing["places"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::post()
        .uri(&format!("/places/{sky_bar}/like"))
        .to_request();
    let liked: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(liked["change"], "liked");
    assert_eq!(liked["place"]["likes"], 1);
    assert_eq!(liked["place"]["isLiked"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/places/{sky_bar}/report"))
        .set_json(json!({ "reason": "closed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri(&format!("/places/{sky_bar}/report"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["outcome"], "already_reported");
    assert_eq!(repo.report_count(&sky_bar).await.unwrap(), 1);

    let req = test::TestRequest::post().uri("/places/missing/like").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete().uri("/session").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri("/places?type=Bar").to_request();
    let places: Vec<Place> = test::call_and_read_body_json(&app, req).await;
    assert!(!places[0].is_liked);
    assert_eq!(places[0].likes, 1);
}

#[actix_web::test]
async fn photos_are_uploaded_and_served() {
    let repo = Arc::new(PlaceRepository::open_in_memory().unwrap());
    let app = test::init_service(
        App::new()
            .app_data(state(repo.clone()))
            .app_data(web::Data::from(repo.clone()))
            .configure(controller::configure)
            .configure(controller::configure_local),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/photos?file_name=terrace.png")
        .set_payload(vec![137u8, 80, 78, 71])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/images/") && url.ends_with(".png"));

    let req = test::TestRequest::get().uri(&url).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await.as_ref(), &[137u8, 80, 78, 71]);

    let req = test::TestRequest::get().uri("/images/missing.png").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn location_resolution_validates_the_selection() {
    let repo = Arc::new(PlaceRepository::open_in_memory().unwrap());
    let app = test::init_service(
        App::new()
            .app_data(state(repo))
            .configure(controller::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/geocode/location")
        .set_json(json!({ "current": "Paris" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/geocode/location")
        .set_json(json!({ "selection": { "lat": 48.8566, "lon": 2.3522 }, "current": "" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["location"], "48.8566, 2.3522");

    let req = test::TestRequest::get().uri("/geocode?lat=48.8566&lon=2.3522").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["address"], Value::Null);
}
