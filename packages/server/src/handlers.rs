//! HTTP handler functions for the SpotOn API.

use actix_web::{HttpResponse, web};
use spot_on_carpark_models::VehicleType;
use spot_on_ranking::RankingError;
use spot_on_server_models::{
    ApiError, ApiHealth, CarparkSearchRequest, CarparkSearchResponse, OneMapSearchResult,
    TokenResponse,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/carparks`
///
/// Ranks carparks near the selected destination for the requested vehicle
/// type. Responds 404 when nothing survives filtering.
pub async fn carparks(
    state: web::Data<AppState>,
    body: web::Json<CarparkSearchRequest>,
) -> HttpResponse {
    let request = body.into_inner();

    let vehicle = match VehicleType::from_label(&request.vehicle_search) {
        Ok(vehicle) => vehicle,
        Err(e) => return error_response(&RankingError::from(e)),
    };

    let destination = match OneMapSearchResult::from_json(&request.destination_value)
        .and_then(OneMapSearchResult::into_destination)
    {
        Ok(destination) => destination,
        Err(e) => {
            return error_response(&RankingError::InvalidDestination {
                message: e.to_string(),
            });
        }
    };

    match state.ranker.rank_carparks(&destination, vehicle).await {
        Ok(result) if result.is_empty() => {
            HttpResponse::NotFound().json(ApiError::new("No carparks found."))
        }
        Ok(result) => HttpResponse::Ok().json(CarparkSearchResponse { result }),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/token`
///
/// Hands the browser a OneMap token for map tiles and address search.
pub async fn token(state: web::Data<AppState>) -> HttpResponse {
    match state.ranker.routing().access_token().await {
        Ok(token) => HttpResponse::Ok().json(TokenResponse {
            access_token: token.as_str().to_string(),
        }),
        Err(e) => {
            log::error!("Failed to acquire OneMap token: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to acquire token"))
        }
    }
}

fn error_response(e: &RankingError) -> HttpResponse {
    if e.is_input_error() {
        log::info!("Rejected carpark search: {e}");
        HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
    } else if e.is_upstream_unavailable() {
        log::error!("Carpark search failed: {e}");
        HttpResponse::BadGateway().json(ApiError::new(e.to_string()))
    } else {
        log::error!("Carpark search failed: {e}");
        HttpResponse::InternalServerError().json(ApiError::new("Carpark registry unavailable"))
    }
}
