pub mod attendance;
pub mod auth;
pub mod customer;
pub mod delivery;
pub mod staff;
pub mod worker;

use std::sync::Arc;

use axum::{Router, routing::get};
use chrono::{NaiveDate, Utc};
use tiffin_service::{AsyncPgConnection, ServiceError, establish_connection};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::ApiError;
use crate::session::SessionKeys;

#[derive(Clone)]
pub struct AppState {
    database_url: Arc<str>,
    pub keys: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            database_url: Arc::from(config.database_url.as_str()),
            keys: Arc::new(SessionKeys::new(&config.secret_key)),
        }
    }

    /// Opens a dedicated connection for the current request.
    pub async fn connect(&self) -> Result<AsyncPgConnection, ApiError> {
        Ok(establish_connection(&self.database_url)
            .await
            .map_err(ServiceError::from)?)
    }
}

/// Calendar day used for "today" queries.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn hello() -> &'static str {
    "Hello World"
}

/// All API routes plus the OpenAPI document and Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/hello", get(hello))
        .merge(auth::router())
        .merge(delivery::router())
        .merge(customer::router())
        .merge(staff::router())
        .merge(attendance::router())
        .merge(worker::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::admin_login,
        auth::admin_logout,
        auth::worker_login,
        delivery::create_deliveries,
        delivery::assign_delivery_person,
        delivery::update_delivery,
        delivery::list_deliveries,
        delivery::today_deliveries,
        delivery::dashboard_details,
        customer::add_customer,
        customer::list_customers,
        customer::filter_customers,
        customer::update_customer,
        customer::remove_customer,
        staff::add_staff,
        staff::list_users,
        staff::list_staff_users,
        staff::filter_users,
        staff::update_user,
        staff::remove_user,
        attendance::add_attendance,
        attendance::today_attendance,
        attendance::all_user_attendance_today,
        attendance::users_without_attendance_today,
        worker::list_deliveries,
        worker::search_deliveries,
        worker::complete_delivery,
        worker::user_orders,
        worker::update_delivery,
    ),
    components(
        schemas(
            crate::models::CreateDeliveriesRequest,
            crate::models::AssignDeliveryRequest,
            crate::models::UpdateDeliveryRequest,
            crate::models::LoginRequest,
            crate::models::LoginResponse,
            crate::models::AddStaffRequest,
            crate::models::UpdateUserRequest,
            crate::models::AddCustomerRequest,
            crate::models::UpdateCustomerRequest,
            crate::models::AddAttendanceRequest,
            crate::models::MessageResponse,
            crate::models::ApiErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and logout"),
        (name = "deliveries", description = "Delivery scheduling and status"),
        (name = "customers", description = "Subscriber management"),
        (name = "staff", description = "Staff and admin accounts"),
        (name = "attendance", description = "Daily staff attendance"),
        (name = "worker", description = "Endpoints used by delivery workers")
    ),
    info(
        title = "Tiffin API",
        description = "Meal subscription delivery administration",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use bigdecimal::BigDecimal;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tiffin_service::models::{Role, User};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    // 데이터베이스에 닿기 전에 끝나는 요청만 검사하므로 연결할 수 없는 주소를 쓴다
    fn app() -> (Router, Arc<SessionKeys>) {
        let config = Config {
            database_url: "postgres://tiffin@127.0.0.1:1/unreachable".to_string(),
            secret_key: "test-secret".to_string(),
            port: 0,
            cors_origin: None,
            static_dir: None,
        };
        let state = AppState::new(&config);
        let keys = state.keys.clone();
        (router(state), keys)
    }

    fn token(keys: &SessionKeys, role: Role) -> String {
        let user = User {
            id: Uuid::new_v4(),
            name: "Kiran".to_string(),
            email: "kiran@tiffin.test".to_string(),
            passphrase_hash: String::new(),
            contact: "9833333333".to_string(),
            total_salary: BigDecimal::from(0),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        keys.issue(&user).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_hello() {
        let (app, _) = app();

        let response = app
            .oneshot(Request::get("/api/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Hello World");
    }

    #[tokio::test]
    async fn test_admin_route_requires_token() {
        let (app, _) = app();

        let response = app
            .oneshot(post_json(
                "/api/admin/createDelivery",
                None,
                serde_json::json!({ "meal_type": "lunch", "delivery_date": "2031-03-01" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_admin_route_rejects_forged_token() {
        let (app, _) = app();
        let forged = token(&SessionKeys::new("other-secret"), Role::Admin);

        let response = app
            .oneshot(post_json(
                "/api/admin/createDelivery",
                Some(&forged),
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_route_forbids_staff() {
        let (app, keys) = app();
        let staff = token(&keys, Role::Staff);

        let response = app
            .oneshot(post_json(
                "/api/admin/assignDeliveryPerson",
                Some(&staff),
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_delivery_validates_before_database() {
        let (app, keys) = app();
        let admin = token(&keys, Role::Admin);

        let response = app
            .oneshot(post_json(
                "/api/admin/createDelivery",
                Some(&admin),
                serde_json::json!({ "meal_type": "lunch" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["message"],
            "Meal type and delivery date are required"
        );
    }

    #[tokio::test]
    async fn test_update_delivery_accepts_form_body() {
        let (app, keys) = app();
        let admin = token(&keys, Role::Admin);
        let body = format!("delivery_id={}&customer_id={}&status=teleported", Uuid::new_v4(), Uuid::new_v4());

        let response = app
            .oneshot(
                Request::post("/api/admin/updateDelivery")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header(header::COOKIE, format!("token={admin}"))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = body_json(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("teleported"));
    }

    #[tokio::test]
    async fn test_worker_update_requires_all_query_fields() {
        let (app, keys) = app();
        let staff = token(&keys, Role::Staff);

        let response = app
            .oneshot(
                Request::post(format!("/api/deliveries/updateDelivery?delivery_id={}", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, format!("Bearer {staff}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["message"],
            "delivery_id, customer_id, and status are required"
        );
    }

    #[tokio::test]
    async fn test_user_order_requires_email() {
        let (app, keys) = app();
        let staff = token(&keys, Role::Staff);

        let response = app
            .oneshot(
                Request::get("/api/deliveries/getUserOrder")
                    .header(header::AUTHORIZATION, format!("Bearer {staff}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Email is required");
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let (app, _) = app();

        let response = app
            .oneshot(post_json(
                "/api/admin/login",
                None,
                serde_json::json!({ "email": "admin@tiffin.test" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "All fields are required");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let (app, _) = app();

        let response = app
            .oneshot(Request::post("/api/admin/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_openapi_document_lists_core_routes() {
        let (app, _) = app();

        let response = app
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/api/admin/updateDelivery"]["post"].is_object());
        assert!(doc["paths"]["/api/admin/assignDeliveryPerson"]["post"].is_object());
    }
}
