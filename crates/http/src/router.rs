//! Router builder for the HTTP server

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use bookstore_kernel::ModuleRegistry;

use crate::MakeRequestUuid;

/// Builder for constructing the main HTTP router
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `base_path`; `/` merges it at the root.
    pub fn mount_module(mut self, base_path: &str, module_router: Router) -> Self {
        let base_path = base_path.trim_end_matches('/');
        self.router = if base_path.is_empty() {
            self.router.merge(module_router)
        } else {
            self.router.nest(base_path, module_router)
        };
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Add request ID middleware; the id is echoed on the response.
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merge_openapi(registry);

        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "merged OpenAPI document is invalid; serving a stub");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Book Catalog API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Raw merged document for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge every module's OpenAPI fragment into one document.
///
/// Module paths are prefixed with the module's base path.
pub fn merge_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Book Catalog API",
            "version": "1.0.0",
            "description": "JSON CRUD over the book catalog"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["MessageResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "message": {
                "type": "string"
            }
        },
        "required": ["message"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": {
                            "schema": {
                                "type": "string"
                            }
                        }
                    }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };
        let base_path = module.base_path();
        let prefix = base_path.trim_end_matches('/');

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                let prefixed_path = format!("{}{}", prefix, path);
                openapi_spec["paths"][prefixed_path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use crate::error::{AppError, MessageBody, INTERNAL_ERROR_MESSAGE};
    use bookstore_kernel::Module;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct DocModule {
        base: &'static str,
    }

    #[async_trait::async_trait]
    impl Module for DocModule {
        fn name(&self) -> &'static str {
            "docs"
        }

        fn base_path(&self) -> String {
            self.base.to_string()
        }

        fn openapi(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({
                "paths": { "/{id}": { "get": { "responses": {} } } },
                "components": { "schemas": { "Thing": { "type": "object" } } }
            }))
        }
    }

    fn registry_with(base: &'static str) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(DocModule { base })).unwrap();
        registry
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_mount_merges_routes() {
        let module_router = Router::new().route("/{id}", get_route());
        let router = RouterBuilder::new()
            .route("/healthz", axum::routing::get(|| async { "ok" }))
            .mount_module("/", module_router)
            .build();

        assert_eq!(get(router.clone(), "/7").await, (StatusCode::OK, "7".to_string()));
        assert_eq!(get(router, "/healthz").await, (StatusCode::OK, "ok".to_string()));
    }

    #[tokio::test]
    async fn test_prefixed_mount_nests_routes() {
        let module_router = Router::new().route("/{id}", get_route());
        let router = RouterBuilder::new()
            .mount_module("/api/docs", module_router)
            .build();

        assert_eq!(get(router.clone(), "/api/docs/3").await.0, StatusCode::OK);
        assert_eq!(get(router, "/3").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_middleware_chain_sets_request_id() {
        let router = RouterBuilder::new()
            .route("/health", axum::routing::get(|| async { "ok" }))
            .with_tracing()
            .with_cors()
            .with_request_id()
            .build();

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_slow_failure_is_a_json_500() {
        let router = RouterBuilder::new()
            .route(
                "/slow",
                axum::routing::get(|| async {
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    Err::<(), _>(AppError::Internal(anyhow::anyhow!("database is busy")))
                }),
            )
            .with_tracing()
            .with_cors()
            .with_request_id()
            .build();

        let response = router
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["content-type"], "application/json");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: MessageBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, MessageBody::new(INTERNAL_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_slow_success_is_not_cut_short() {
        let router = RouterBuilder::new()
            .route(
                "/slow",
                axum::routing::get(|| async {
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    "done"
                }),
            )
            .with_tracing()
            .with_cors()
            .with_request_id()
            .build();

        assert_eq!(get(router, "/slow").await, (StatusCode::OK, "done".to_string()));
    }

    #[test]
    fn test_openapi_paths_follow_base_path() {
        let root = merge_openapi(&registry_with("/"));
        assert!(root["paths"].get("/{id}").is_some());
        assert!(root["paths"].get("/healthz").is_some());
        assert!(root["components"]["schemas"].get("Thing").is_some());

        let nested = merge_openapi(&registry_with("/api/docs"));
        assert!(nested["paths"].get("/api/docs/{id}").is_some());
    }

    fn get_route() -> axum::routing::MethodRouter {
        axum::routing::get(|axum::extract::Path(id): axum::extract::Path<String>| async move { id })
    }
}
