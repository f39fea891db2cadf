pub mod auth;
pub mod health;
pub mod providers;
pub mod swagger;

use actix_web::{guard, web};

use crate::middleware::AuthMiddleware;
use crate::utils::error::{json_error_handler, query_error_handler};

/// Route table. Repositories and the identity verifier are injected by the caller
/// as `web::Data<dyn ...>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/", web::get().to(health::root))
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/auth").service(
                web::resource("/sync")
                    .wrap(AuthMiddleware)
                    .route(web::post().to(auth::sync_user)),
            ),
        )
        .service(
            web::scope("/api/providers")
                // Public reads
                .route("", web::get().to(providers::list_providers))
                .route("/search", web::get().to(providers::search_providers))
                // Authenticated; static segments before the {id} catch-all
                .service(
                    web::resource("")
                        .guard(guard::Post())
                        .wrap(AuthMiddleware)
                        .route(web::post().to(providers::create_provider)),
                )
                .service(
                    web::resource("/register")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(providers::register_provider)),
                )
                .service(
                    web::resource("/my-workspace")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(providers::my_workspace)),
                )
                .service(
                    web::resource("/saved")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(providers::list_saved)),
                )
                .service(
                    web::resource("/saved/{id}")
                        .wrap(AuthMiddleware)
                        .route(web::delete().to(providers::unsave_provider)),
                )
                .service(
                    web::resource("/save/{id}")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(providers::save_provider)),
                )
                .service(
                    web::resource("/{id}/reviews")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(providers::add_review)),
                )
                .route("/{id}", web::get().to(providers::get_provider)),
        );
}
