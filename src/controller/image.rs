use actix_web::{get, web, HttpResponse};

use crate::error::StoreError;
use crate::repository::PlaceRepository;

/// Serves photos uploaded to the local repository. The hosted backend serves its own.
#[get("/images/{name}")]
pub async fn get_image(
    repo: web::Data<PlaceRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let response = match repo.image(&path.into_inner()).await? {
        Some((content_type, bytes)) => HttpResponse::Ok().content_type(content_type).body(bytes),
        None => HttpResponse::NotFound().finish(),
    };

    Ok(response)
}
