mod access;
mod admin;
mod auth;
mod courses;
mod extract;
mod handlers;

use std::net::SocketAddr;

use axum::{
  Router,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub struct Plugin;

/// All HTTP routes, without middleware.
pub fn routes(app: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/auth/register", post(handlers::register))
    .route("/api/auth/login", post(handlers::login))
    .route("/api/auth/logout", post(handlers::logout))
    .route("/api/courses", get(courses::list))
    .route("/api/courses/{id}", get(courses::detail))
    .route("/api/promocodes/activate", post(access::activate))
    .route("/api/me/courses", get(access::library))
    .route("/api/me/courses/{id}", get(access::open))
    .route("/api/me/courses/{id}/progress", post(access::progress))
    .route(
      "/api/admin/courses",
      get(admin::list_courses).post(admin::create_course),
    )
    .route("/api/admin/courses/{id}/promocodes", get(admin::course_promos))
    .route("/api/admin/promocodes", post(admin::create_promo))
    .route("/api/admin/promocodes/{code}", post(admin::set_promo_active))
    .with_state(app)
}

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(app.config.rate_per_second)
        .burst_size(app.config.rate_burst)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();
    let port = app.config.port;

    let router = routes(app)
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
  };
  use tower::ServiceExt;

  use super::*;
  use crate::{
    entity::Role,
    state::{Config, CurrentUser},
    sv::{self, course::MAX_PAGE, test_support::*, user::Registration},
  };

  const ACTIVATE: &str = "/api/promocodes/activate";

  struct Harness {
    app: Arc<AppState>,
    token: Uuid,
    course_id: Uuid,
  }

  async fn harness() -> Harness {
    harness_with(Config::default()).await
  }

  async fn harness_with(config: Config) -> Harness {
    let db = sv::test_db().await;
    let user = seed_user(&db, "learner@example.com").await;
    let course = seed_course(&db, "Rust 101").await;
    seed_promo(&db, "COURSE123", course.id, 1, TimeDelta::days(365)).await;

    let app = Arc::new(AppState::with_db(db, config));
    let token = app.login(CurrentUser {
      id: user.id,
      email: user.email,
      role: Role::User,
    });

    Harness { app, token, course_id: course.id }
  }

  async fn admin_token(app: &Arc<AppState>) -> Uuid {
    let admin = seed_user(&app.db, "admin@example.com").await;
    app.login(CurrentUser { id: admin.id, email: admin.email, role: Role::Admin })
  }

  async fn send(
    app: &Arc<AppState>,
    req: Request<Body>,
  ) -> (StatusCode, json::Value) {
    let res = routes(app.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = json::from_slice(&bytes).unwrap_or(json::Value::Null);
    (status, body)
  }

  async fn call(
    app: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: Option<Uuid>,
    body: json::Value,
  ) -> (StatusCode, json::Value) {
    let mut req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
      req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, req.body(Body::from(body.to_string())).unwrap()).await
  }

  async fn get(
    app: &Arc<AppState>,
    uri: &str,
    token: Option<Uuid>,
  ) -> (StatusCode, json::Value) {
    call(app, "GET", uri, token, json::Value::Null).await
  }

  #[tokio::test]
  async fn activate_requires_session() {
    let h = harness().await;
    let body = json::json!({ "code": "COURSE123", "courseId": h.course_id });

    let (status, res) = call(&h.app, "POST", ACTIVATE, None, body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(res["success"], false);
  }

  #[tokio::test]
  async fn activate_validates_input() {
    let h = harness().await;

    let (status, _) = call(
      &h.app,
      "POST",
      ACTIVATE,
      Some(h.token),
      json::json!({ "code": "COURSE123" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
      &h.app,
      "POST",
      ACTIVATE,
      Some(h.token),
      json::json!({ "code": "COURSE123", "courseId": "not-an-id" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
      &h.app,
      "POST",
      ACTIVATE,
      Some(h.token),
      json::json!({ "code": "UNKNOWN", "courseId": h.course_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn malformed_bodies_get_json_errors() {
    let h = harness().await;

    let (status, res) = call(
      &h.app,
      "POST",
      ACTIVATE,
      Some(h.token),
      json::json!({ "code": "COURSE123", "courseId": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["success"], false);
    assert!(res["error"].is_string());

    let req = Request::builder()
      .method("POST")
      .uri(ACTIVATE)
      .header(header::AUTHORIZATION, format!("Bearer {}", h.token))
      .body(Body::from("code=COURSE123"))
      .unwrap();
    let (status, res) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["success"], false);

    let (status, res) = get(&h.app, "/api/me/courses/42", Some(h.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["success"], false);
  }

  #[tokio::test]
  async fn activate_is_idempotent_per_user() {
    let h = harness().await;
    seed_promo(&h.app.db, "OPEN", h.course_id, -1, TimeDelta::days(1)).await;
    let body = json::json!({ "code": "open", "courseId": h.course_id });

    let (status, res) =
      call(&h.app, "POST", ACTIVATE, Some(h.token), body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["message"], "granted");
    assert_eq!(res["title"], "Rust 101");
    assert_eq!(res["courseId"], h.course_id.to_string());

    let (status, res) =
      call(&h.app, "POST", ACTIVATE, Some(h.token), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["message"], "already granted");

    let (status, res) = get(&h.app, "/api/me/courses", Some(h.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res.as_array().map(Vec::len), Some(1));
  }

  #[tokio::test]
  async fn single_use_code_retried_by_holder_is_exhausted() {
    let h = harness().await;
    let body = json::json!({ "code": "course123", "courseId": h.course_id });

    let (status, res) =
      call(&h.app, "POST", ACTIVATE, Some(h.token), body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["message"], "granted");

    // the usage cap is checked before the existing grant
    let (status, res) =
      call(&h.app, "POST", ACTIVATE, Some(h.token), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(res["error"], "Promo code usage limit reached");

    let (_, res) = get(&h.app, "/api/me/courses", Some(h.token)).await;
    assert_eq!(res.as_array().map(Vec::len), Some(1));
  }

  #[tokio::test]
  async fn progress_is_reported_in_camel_case() {
    let h = harness().await;
    let uri = format!("/api/me/courses/{}", h.course_id);
    call(
      &h.app,
      "POST",
      ACTIVATE,
      Some(h.token),
      json::json!({ "code": "COURSE123", "courseId": h.course_id }),
    )
    .await;

    let (status, opened) = get(&h.app, &uri, Some(h.token)).await;
    assert_eq!(status, StatusCode::OK);
    let lesson_id = opened["lessons"][0]["id"].clone();
    assert!(opened["lessons"][0]["videoUrl"].is_string());

    let (status, res) = call(
      &h.app,
      "POST",
      &format!("{uri}/progress"),
      Some(h.token),
      json::json!({ "lessonId": lesson_id, "watchTimeSeconds": i64::MAX }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["watchTimeSeconds"], i64::MAX);

    let (status, res) = call(
      &h.app,
      "POST",
      &format!("{uri}/progress"),
      Some(h.token),
      json::json!({ "lessonId": lesson_id, "watchTimeSeconds": 30, "completed": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["watchTimeSeconds"], i64::MAX);
    assert_eq!(res["completed"], true);
  }

  #[tokio::test]
  async fn admin_routes_reject_learners() {
    let h = harness().await;

    let (status, _) = get(&h.app, "/api/admin/courses", Some(h.token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn catalog_is_public() {
    let h = harness().await;

    let (status, res) = get(&h.app, "/api/courses?page=1&limit=5", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["pagination"]["total"], 1);
    assert_eq!(res["pagination"]["pages"], 1);
    assert_eq!(res["courses"][0]["title"], "Rust 101");
    assert_eq!(res["courses"][0]["isPublished"], true);
  }

  #[tokio::test]
  async fn catalog_clamps_huge_page_numbers() {
    let h = harness().await;

    let (status, res) =
      get(&h.app, "/api/courses?page=18446744073709551615&limit=10", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["courses"], json::json!([]));
    assert_eq!(res["pagination"]["page"], MAX_PAGE);
    assert_eq!(res["pagination"]["total"], 1);
  }

  #[tokio::test]
  async fn course_detail_hides_drafts_and_videos() {
    let h = harness().await;
    let draft = sv::Course::new(&h.app.db)
      .create(sv::course::NewCourse {
        is_published: Some(false),
        ..sv::course::sample("Draft")
      })
      .await
      .unwrap();

    let (status, res) =
      get(&h.app, &format!("/api/courses/{}", draft.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(res["error"], "Course not found");

    let (status, res) =
      get(&h.app, &format!("/api/courses/{}", h.course_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["course"]["title"], "Rust 101");

    let lesson = &res["lessons"][0];
    assert_eq!(lesson["title"], "Intro");
    assert_eq!(lesson["durationSeconds"], 120);
    assert!(lesson.get("videoUrl").is_none());
    assert!(lesson.get("materials").is_none());
  }

  #[tokio::test]
  async fn register_login_logout() {
    let h = harness_with(Config {
      admins: ["boss@example.com".to_string()].into(),
      ..Config::default()
    })
    .await;
    let new_user = |email: &str| {
      json::json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "password": "hunter22",
      })
    };

    let (status, res) = call(
      &h.app,
      "POST",
      "/api/auth/register",
      None,
      new_user("Ada@Example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(res["user"]["email"], "ada@example.com");
    assert_eq!(res["user"]["role"], "user");
    assert!(res["user"].get("passwordHash").is_none());

    let (status, _) = call(
      &h.app,
      "POST",
      "/api/auth/register",
      None,
      new_user("ada@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, res) = call(
      &h.app,
      "POST",
      "/api/auth/register",
      None,
      new_user("boss@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(res["user"]["role"], "admin");

    let (status, _) = call(
      &h.app,
      "POST",
      "/api/auth/login",
      None,
      json::json!({ "email": "ada@example.com", "password": "wrong-one" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, res) = call(
      &h.app,
      "POST",
      "/api/auth/login",
      None,
      json::json!({ "email": "ada@example.com", "password": "hunter22" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token: Uuid = res["token"].as_str().unwrap().parse().unwrap();

    let (status, _) = get(&h.app, "/api/me/courses", Some(token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
      call(&h.app, "POST", "/api/auth/logout", Some(token), json::Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&h.app, "/api/me/courses", Some(token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn login_promotes_configured_admins() {
    let db = sv::test_db().await;
    sv::User::new(&db)
      .register(Registration {
        email: "late@example.com".into(),
        password: "hunter22".into(),
        first_name: "Late".into(),
        last_name: "Admin".into(),
        role: Role::User,
      })
      .await
      .unwrap();

    let app = Arc::new(AppState::with_db(
      db,
      Config {
        admins: ["late@example.com".to_string()].into(),
        ..Config::default()
      },
    ));

    let (status, res) = call(
      &app,
      "POST",
      "/api/auth/login",
      None,
      json::json!({ "email": "late@example.com", "password": "hunter22" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["user"]["role"], "admin");

    let token: Uuid = res["token"].as_str().unwrap().parse().unwrap();
    let (status, _) = get(&app, "/api/admin/courses", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
  }

  #[tokio::test]
  async fn admin_manages_promo_codes() {
    let h = harness().await;
    let admin = admin_token(&h.app).await;
    let promos = format!("/api/admin/courses/{}/promocodes", h.course_id);

    let spring = json::json!({
      "code": " spring ",
      "courseId": h.course_id,
      "expiresAt": "2099-01-01T00:00:00",
      "maxUses": 5,
    });
    let (status, res) =
      call(&h.app, "POST", "/api/admin/promocodes", Some(admin), spring.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(res["code"], "SPRING");
    assert_eq!(res["maxUses"], 5);
    assert_eq!(res["usedCount"], 0);

    let (status, _) =
      call(&h.app, "POST", "/api/admin/promocodes", Some(admin), spring).await;
    assert_eq!(status, StatusCode::CONFLICT);

    call(
      &h.app,
      "POST",
      ACTIVATE,
      Some(h.token),
      json::json!({ "code": "COURSE123", "courseId": h.course_id }),
    )
    .await;

    let (status, res) = get(&h.app, &promos, Some(admin)).await;
    assert_eq!(status, StatusCode::OK);
    let codes = res.as_array().unwrap();
    assert_eq!(codes.len(), 2);

    let by_code = |code: &str| {
      codes.iter().find(|c| c["code"] == code).cloned().unwrap()
    };
    let used = by_code("COURSE123");
    assert_eq!(used["usedCount"], 1);
    assert_eq!(used["exhausted"], true);
    assert_eq!(used["expired"], false);
    assert_eq!(used["valid"], false);

    let fresh = by_code("SPRING");
    assert_eq!(fresh["exhausted"], false);
    assert_eq!(fresh["valid"], true);

    let (status, res) = call(
      &h.app,
      "POST",
      "/api/admin/promocodes/spring",
      Some(admin),
      json::json!({ "active": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["success"], true);

    let (status, _) = call(
      &h.app,
      "POST",
      ACTIVATE,
      Some(h.token),
      json::json!({ "code": "SPRING", "courseId": h.course_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
      &h.app,
      "POST",
      "/api/admin/promocodes/NOPE",
      Some(admin),
      json::json!({ "active": true }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
