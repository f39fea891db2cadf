use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Binnect API",
        version = "1.0.0",
        description = "Business directory API. \n\n**Authentication:** protected endpoints take a Firebase ID token as a Bearer credential.\n\n**Features:**\n- Niche listings (create, register, browse, search)\n- Owner workspace\n- Reviews\n- Saved listings\n- Profile sync"
    ),
    paths(
        // Health
        crate::api::health::health_check,

        // Auth
        crate::api::auth::sync_user,

        // Providers
        crate::api::providers::list_providers,
        crate::api::providers::create_provider,
        crate::api::providers::register_provider,
        crate::api::providers::search_providers,
        crate::api::providers::my_workspace,
        crate::api::providers::get_provider,

        // Reviews
        crate::api::providers::add_review,

        // Saved
        crate::api::providers::save_provider,
        crate::api::providers::list_saved,
        crate::api::providers::unsave_provider,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::models::UserResponse,
            crate::models::CreateProviderRequest,
            crate::models::RegisterProviderRequest,
            crate::models::AddReviewRequest,
            crate::models::ProviderResponse,
            crate::models::ReviewResponse,
            crate::models::SaveResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service and database status."),
        (name = "Auth", description = "Profile sync from Firebase token claims."),
        (name = "Providers", description = "Business niche listings: create, browse, search and the owner workspace."),
        (name = "Reviews", description = "Append-only listing reviews."),
        (name = "Saved", description = "Per-user saved listings."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Firebase ID token"))
                        .build()
                ),
            );
        }
    }
}
