pub mod auth;
mod customers;
mod drivers;
pub mod error;
pub mod guard;
pub mod manager;
mod orders;
mod reviews;

use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::error::ApiError;
use crate::AppState;

pub use manager::seed_default_manager;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register/customer", post(auth::register_customer))
        .route("/driver-applications", post(auth::submit_driver_application))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let manager_routes = Router::new()
        .route("/login", post(manager::login))
        .route("/logout", post(manager::logout))
        .route("/me", get(manager::me))
        .route("/driver-applications", get(manager::list_applications))
        .route(
            "/driver-applications/:id",
            get(manager::get_application).patch(manager::review_application),
        );

    let customer_routes = Router::new()
        .route("/orders/current", get(customers::current_order))
        .route("/orders/history", get(customers::order_history))
        .route("/orders/:id/cancel", post(customers::cancel_order))
        .route("/drivers/:id/public", get(customers::driver_public_profile));

    let driver_routes = Router::new()
        .route("/me/online", post(drivers::go_online))
        .route("/me/offline", post(drivers::go_offline))
        .route("/me/location", post(drivers::update_location))
        .route("/me/profile", get(drivers::my_profile))
        .route("/me/reviews", get(drivers::my_reviews))
        .route("/customers/:id/public", get(drivers::customer_public_profile))
        .route("/orders/available", get(drivers::available_orders))
        .route("/orders/current", get(drivers::current_order))
        .route("/orders/history", get(drivers::order_history))
        .route("/orders/:id/accept", post(drivers::accept_order))
        .route("/orders/:id/status", post(drivers::set_order_status));

    // The browser SPA authenticates with cookies, so CORS mirrors the
    // request origin and allows credentials.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/manager", manager_routes)
        .nest("/customers", customer_routes)
        .nest("/drivers", driver_routes)
        .route("/orders", post(orders::create_order))
        .route("/reviews", post(reviews::create_review))
        // Raw user records carry password hashes and are never exposed.
        .route("/users", any(users_blocked))
        .route("/users/*rest", any(users_blocked))
        .layer(middleware::from_fn_with_state(state.clone(), guard::access_guard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn users_blocked() -> ApiError {
    ApiError::forbidden("Access denied")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::Store;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        _dir: tempfile::TempDir,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.auth.manager_login = "manager".to_string();
        config.auth.manager_password = "manager-pass".to_string();
        config.store.path = dir.path().join("db.json");

        let store = Store::open(&config.store.path).unwrap();
        let state = Arc::new(AppState::new(config, store));
        seed_default_manager(&state).unwrap();
        TestApp {
            router: create_router(state),
            _dir: dir,
        }
    }

    async fn send(
        app: &TestApp,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, Option<String>) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).to_string(),
            ))
        };
        (status, value, set_cookie)
    }

    async fn register_customer(app: &TestApp, email: &str) -> String {
        let (status, _, cookie) = send(
            app,
            Method::POST,
            "/auth/register/customer",
            None,
            Some(json!({
                "email": email,
                "password": "pass1234",
                "name": "Customer",
                "phone": "+375290000001"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        cookie.unwrap()
    }

    /// Submit an application, approve it as the manager and log the new
    /// driver in. Returns the driver's cookie.
    async fn provision_driver(app: &TestApp, email: &str, comfort: &str) -> String {
        let (status, _, _) = send(
            app,
            Method::POST,
            "/auth/driver-applications",
            None,
            Some(json!({
                "email": email,
                "password": "drive1234",
                "name": "Driver",
                "phone": "+375290000002"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let manager_cookie = manager_login(app).await;
        let (status, apps, _) = send(
            app,
            Method::GET,
            "/manager/driver-applications?status=pending",
            Some(&manager_cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let app_id = apps
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["email"] == email)
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, outcome, _) = send(
            app,
            Method::PATCH,
            &format!("/manager/driver-applications/{app_id}"),
            Some(&manager_cookie),
            Some(json!({
                "action": "approve",
                "driverLicenseNumber": "3AB123456",
                "carMake": "Skoda",
                "carModel": "Octavia",
                "carColor": "white",
                "carPlate": "1234 AB-7",
                "comfortLevel": comfort
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["ok"], json!(true));

        let (status, _, cookie) = send(
            app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": email, "password": "drive1234", "role": "driver"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        cookie.unwrap()
    }

    async fn manager_login(app: &TestApp) -> String {
        let (status, _, cookie) = send(
            app,
            Method::POST,
            "/manager/login",
            None,
            Some(json!({"login": "manager", "password": "manager-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        cookie.unwrap()
    }

    fn order_body() -> Value {
        json!({
            "fromAddress": "Niamiha 5",
            "toAddress": "Kastryčnickaja 16",
            "fromCoords": [53.906, 27.554],
            "toCoords": [53.893, 27.571],
            "comfortType": "economy",
            "distanceMeters": 4200.0,
            "durationSeconds": 780.0,
            "priceByN": 6.49
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = test_app();
        let (status, body, _) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("OK".to_string()));
    }

    #[tokio::test]
    async fn users_collection_is_never_exposed() {
        let app = test_app();
        let cookie = register_customer(&app, "c@example.com").await;
        let (status, body, _) =
            send(&app, Method::GET, "/users", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "forbidden");

        let (status, _, _) = send(&app, Method::GET, "/users/42", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn me_requires_authentication() {
        let app = test_app();
        let (status, body, _) = send(&app, Method::GET, "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthenticated");

        let cookie = register_customer(&app, "c@example.com").await;
        let (status, body, _) = send(&app, Method::GET, "/auth/me", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "c@example.com");
        assert_eq!(body["role"], "customer");
        assert!(body.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_wrong_role() {
        let app = test_app();
        register_customer(&app, "c@example.com").await;

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "c@example.com", "password": "wrong", "role": "customer"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Same email, driver role: separate identity space.
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "c@example.com", "password": "pass1234", "role": "driver"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_customer_email_conflicts() {
        let app = test_app();
        register_customer(&app, "c@example.com").await;
        let (status, body, _) = send(
            &app,
            Method::POST,
            "/auth/register/customer",
            None,
            Some(json!({
                "email": "c@example.com",
                "password": "other",
                "name": "Other",
                "phone": "+2"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn customer_cannot_reach_driver_endpoints() {
        let app = test_app();
        let cookie = register_customer(&app, "c@example.com").await;
        let (status, body, _) = send(
            &app,
            Method::GET,
            "/drivers/orders/available",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "forbidden");
    }

    #[tokio::test]
    async fn manager_endpoints_require_manager_token() {
        let app = test_app();
        let (status, _, _) = send(&app, Method::GET, "/manager/driver-applications", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // A user cookie does not open manager doors either.
        let cookie = register_customer(&app, "c@example.com").await;
        let (status, _, _) = send(
            &app,
            Method::GET,
            "/manager/driver-applications",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn full_ride_lifecycle() {
        let app = test_app();
        let customer = register_customer(&app, "c@example.com").await;
        let driver = provision_driver(&app, "d@example.com", "economy").await;

        let (status, order, _) =
            send(&app, Method::POST, "/orders", Some(&customer), Some(order_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "searching_driver");
        let order_id = order["id"].as_str().unwrap().to_string();

        // Matching comfort level: the order is visible.
        let (status, available, _) = send(
            &app,
            Method::GET,
            "/drivers/orders/available",
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(available.as_array().unwrap().len(), 1);

        let (status, accepted, _) = send(
            &app,
            Method::POST,
            &format!("/drivers/orders/{order_id}/accept"),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["status"], "accepted");

        // Accepting twice conflicts.
        let (status, body, _) = send(
            &app,
            Method::POST,
            &format!("/drivers/orders/{order_id}/accept"),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "conflict");

        // Skipping `arrived` conflicts.
        let (status, _, _) = send(
            &app,
            Method::POST,
            &format!("/drivers/orders/{order_id}/status"),
            Some(&driver),
            Some(json!({"status": "in_progress"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        for next in ["arrived", "in_progress", "finished"] {
            let (status, body, _) = send(
                &app,
                Method::POST,
                &format!("/drivers/orders/{order_id}/status"),
                Some(&driver),
                Some(json!({"status": next})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], next);
        }

        // Finished and unreviewed: still the customer's "current" order.
        let (status, current, _) = send(
            &app,
            Method::GET,
            "/customers/orders/current",
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(current["id"], order_id.as_str());

        let (status, review, _) = send(
            &app,
            Method::POST,
            "/reviews",
            Some(&customer),
            Some(json!({"orderId": order_id, "rating": 5, "text": "smooth ride"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["rating"], 5);

        let (_, current, _) = send(
            &app,
            Method::GET,
            "/customers/orders/current",
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(current, Value::Null);

        // Driver sees the review with the customer's name joined in.
        let (status, reviews, _) =
            send(&app, Method::GET, "/drivers/me/reviews", Some(&driver), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviews["totalReviews"], 1);
        assert_eq!(reviews["reviews"][0]["customerName"], "Customer");
    }

    #[tokio::test]
    async fn comfort_mismatch_hides_orders() {
        let app = test_app();
        let customer = register_customer(&app, "c@example.com").await;
        let driver = provision_driver(&app, "d@example.com", "comfort").await;

        let (status, _, _) =
            send(&app, Method::POST, "/orders", Some(&customer), Some(order_body())).await;
        assert_eq!(status, StatusCode::OK);

        let (_, available, _) = send(
            &app,
            Method::GET,
            "/drivers/orders/available",
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(available.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn cancel_flow_and_visibility() {
        let app = test_app();
        let customer = register_customer(&app, "c@example.com").await;
        let driver = provision_driver(&app, "d@example.com", "economy").await;

        let (_, order, _) =
            send(&app, Method::POST, "/orders", Some(&customer), Some(order_body())).await;
        let order_id = order["id"].as_str().unwrap().to_string();

        let (status, canceled, _) = send(
            &app,
            Method::POST,
            &format!("/customers/orders/{order_id}/cancel"),
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(canceled["status"], "canceled_by_customer");
        assert!(canceled.get("canceledAt").is_some());

        // Canceled orders cannot be accepted.
        let (status, _, _) = send(
            &app,
            Method::POST,
            &format!("/drivers/orders/{order_id}/accept"),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // A canceled link grants no profile visibility.
        let driver_id = {
            let (_, me, _) = send(&app, Method::GET, "/auth/me", Some(&driver), None).await;
            me["id"].as_str().unwrap().to_string()
        };
        let (status, _, _) = send(
            &app,
            Method::GET,
            &format!("/customers/drivers/{driver_id}/public"),
            Some(&customer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn driver_sees_customer_profile_during_active_order_only() {
        let app = test_app();
        let customer = register_customer(&app, "c@example.com").await;
        let driver = provision_driver(&app, "d@example.com", "economy").await;

        let customer_id = {
            let (_, me, _) = send(&app, Method::GET, "/auth/me", Some(&customer), None).await;
            me["id"].as_str().unwrap().to_string()
        };

        let (_, order, _) =
            send(&app, Method::POST, "/orders", Some(&customer), Some(order_body())).await;
        let order_id = order["id"].as_str().unwrap().to_string();

        // No accepted order yet: no link, no profile.
        let (status, _, _) = send(
            &app,
            Method::GET,
            &format!("/drivers/customers/{customer_id}/public"),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = send(
            &app,
            Method::POST,
            &format!("/drivers/orders/{order_id}/accept"),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, profile, _) = send(
            &app,
            Method::GET,
            &format!("/drivers/customers/{customer_id}/public"),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["name"], "Customer");
        assert_eq!(profile["phone"], "+375290000001");
        assert!(profile.get("passwordHash").is_none());

        for next in ["arrived", "in_progress", "finished"] {
            let (status, _, _) = send(
                &app,
                Method::POST,
                &format!("/drivers/orders/{order_id}/status"),
                Some(&driver),
                Some(json!({"status": next})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        // Ride finished: the driver loses access to the customer's contacts.
        let (status, body, _) = send(
            &app,
            Method::GET,
            &format!("/drivers/customers/{customer_id}/public"),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "forbidden");
    }

    #[tokio::test]
    async fn driver_presence_and_location() {
        let app = test_app();
        let driver = provision_driver(&app, "d@example.com", "economy").await;

        let (status, profile, _) =
            send(&app, Method::POST, "/drivers/me/online", Some(&driver), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["isOnline"], json!(true));

        let (status, profile, _) = send(
            &app,
            Method::POST,
            "/drivers/me/location",
            Some(&driver),
            Some(json!({"lat": 53.9, "lon": 27.56})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["coords"], json!([53.9, 27.56]));

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/drivers/me/location",
            Some(&driver),
            Some(json!({"lat": 120.0, "lon": 27.56})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Going offline clears coordinates.
        let (_, profile, _) =
            send(&app, Method::POST, "/drivers/me/offline", Some(&driver), None).await;
        assert_eq!(profile["isOnline"], json!(false));
        assert_eq!(profile["coords"], Value::Null);
    }

    #[tokio::test]
    async fn second_pending_application_conflicts() {
        let app = test_app();
        let body = json!({
            "email": "d@example.com",
            "password": "drive1234",
            "name": "Driver",
            "phone": "+375290000002"
        });
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/auth/driver-applications",
            None,
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, resp, _) = send(
            &app,
            Method::POST,
            "/auth/driver-applications",
            None,
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(resp["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn application_responses_never_leak_password_hash() {
        let app = test_app();
        provision_driver(&app, "d@example.com", "economy").await;
        let manager = manager_login(&app).await;

        let (status, apps, _) = send(
            &app,
            Method::GET,
            "/manager/driver-applications",
            Some(&manager),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let first = &apps.as_array().unwrap()[0];
        assert!(first.get("passwordHash").is_none());
        assert_eq!(first["status"], "approved");
    }

    #[tokio::test]
    async fn approve_twice_conflicts_over_http() {
        let app = test_app();
        provision_driver(&app, "d@example.com", "business").await;
        let manager = manager_login(&app).await;

        let (_, apps, _) = send(
            &app,
            Method::GET,
            "/manager/driver-applications",
            Some(&manager),
            None,
        )
        .await;
        let app_id = apps.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

        let (status, body, _) = send(
            &app,
            Method::PATCH,
            &format!("/manager/driver-applications/{app_id}"),
            Some(&manager),
            Some(json!({
                "action": "approve",
                "driverLicenseNumber": "3AB123456",
                "carMake": "Skoda",
                "carModel": "Octavia",
                "carColor": "white",
                "carPlate": "1234 AB-7",
                "comfortLevel": "business"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["message"], "application already reviewed");
    }

    #[tokio::test]
    async fn reject_requires_meaningful_comment() {
        let app = test_app();
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/auth/driver-applications",
            None,
            Some(json!({
                "email": "d@example.com",
                "password": "drive1234",
                "name": "Driver",
                "phone": "+375290000002"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let manager = manager_login(&app).await;
        let (_, apps, _) = send(
            &app,
            Method::GET,
            "/manager/driver-applications",
            Some(&manager),
            None,
        )
        .await;
        let app_id = apps.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

        let (status, _, _) = send(
            &app,
            Method::PATCH,
            &format!("/manager/driver-applications/{app_id}"),
            Some(&manager),
            Some(json!({"action": "reject", "comment": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(
            &app,
            Method::PATCH,
            &format!("/manager/driver-applications/{app_id}"),
            Some(&manager),
            Some(json!({"action": "reject", "comment": "blurry license photo"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
