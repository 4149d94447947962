//! End-to-end tenant isolation tests: scoped listing, cross-establishment
//! denial, audit trail, anomaly detection and the bootstrap assignment
//! flow. Requires a local MongoDB (MONGODB_URI overrides the default).

mod common;

use backoffice_service::authz::Role;
use backoffice_service::models::Establishment;
use common::TestApp;

async fn seed_establishment(app: &TestApp, name: &str) -> Establishment {
    let establishment = Establishment::new(name.to_string(), None);
    app.state
        .db
        .establishments()
        .insert_one(&establishment, None)
        .await
        .expect("Failed to seed establishment");
    establishment
}

async fn create_booking(app: &TestApp, token: &str, guest: &str) -> serde_json::Value {
    let resp = app
        .post_json(
            "/bookings",
            token,
            serde_json::json!({
                "guest_name": guest,
                "accommodation_id": "room-101",
                "check_in": "2026-09-01",
                "check_out": "2026-09-05",
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn staff_only_see_bookings_of_their_own_establishment() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    let e2 = seed_establishment(&app, "Pension Alpenblick").await;
    app.seed_user("staff1@e1.example", Role::Staff, Some(e1.id.clone()))
        .await;
    app.seed_user("staff2@e2.example", Role::Staff, Some(e2.id.clone()))
        .await;

    let (staff1, _) = app.login("staff1@e1.example").await;
    let (staff2, _) = app.login("staff2@e2.example").await;

    create_booking(&app, &staff1, "Guest One").await;
    create_booking(&app, &staff2, "Guest Two").await;

    let body: serde_json::Value = app.get("/bookings", &staff1).await.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["bookings"][0]["guest_name"], "Guest One");
    assert_eq!(body["bookings"][0]["establishment_id"], e1.id.as_str());

    app.cleanup().await;
}

#[tokio::test]
async fn unrestricted_admin_sees_all_establishments_data() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    let e2 = seed_establishment(&app, "Pension Alpenblick").await;
    app.seed_user("staff1@e1.example", Role::Staff, Some(e1.id.clone()))
        .await;
    app.seed_user("staff2@e2.example", Role::Staff, Some(e2.id.clone()))
        .await;
    app.seed_user("admin@hq.example", Role::Admin, None).await;

    let (staff1, _) = app.login("staff1@e1.example").await;
    let (staff2, _) = app.login("staff2@e2.example").await;
    let (admin, _) = app.login("admin@hq.example").await;

    create_booking(&app, &staff1, "Guest One").await;
    create_booking(&app, &staff2, "Guest Two").await;

    let body: serde_json::Value = app.get("/bookings", &admin).await.json().await.unwrap();
    assert_eq!(body["total"], 2);

    app.cleanup().await;
}

#[tokio::test]
async fn cross_establishment_fetch_is_denied_and_audited() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    let e2 = seed_establishment(&app, "Pension Alpenblick").await;
    let staff1 = app
        .seed_user("staff1@e1.example", Role::Staff, Some(e1.id.clone()))
        .await;
    app.seed_user("staff2@e2.example", Role::Staff, Some(e2.id.clone()))
        .await;
    app.seed_user("admin@hq.example", Role::Admin, None).await;

    let (staff1_token, _) = app.login("staff1@e1.example").await;
    let (staff2_token, _) = app.login("staff2@e2.example").await;
    let (admin_token, _) = app.login("admin@hq.example").await;

    let foreign_booking = create_booking(&app, &staff2_token, "Guest Two").await;
    let foreign_id = foreign_booking["_id"].as_str().unwrap();

    // Denied with the authorization (not authentication) status.
    let resp = app
        .get(&format!("/bookings/{}", foreign_id), &staff1_token)
        .await;
    assert_eq!(resp.status(), 403);

    // The denial was recorded with the caller, resource and reason.
    tokio::time::sleep(tokio::time::Duration::from_millis(300)).await;
    let violations: serde_json::Value = app
        .get("/audit/violations", &admin_token)
        .await
        .json()
        .await
        .unwrap();
    let violation = violations
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["user_id"] == staff1.id.as_str())
        .expect("denial should be in the audit log");
    assert_eq!(violation["allowed"], false);
    assert_eq!(violation["resource_type"], "booking");
    assert_eq!(violation["resource_id"], foreign_id);
    assert!(violation["reason"]
        .as_str()
        .unwrap()
        .contains("establishment mismatch"));

    // The same entry shows up in the resource's access history.
    let history: serde_json::Value = app
        .get(
            &format!("/audit/resources/booking/{}", foreign_id),
            &admin_token,
        )
        .await
        .json()
        .await
        .unwrap();
    assert!(history
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v["user_id"] == staff1.id.as_str() && v["allowed"] == false));

    app.cleanup().await;
}

#[tokio::test]
async fn repeated_denials_trip_the_suspicious_activity_check() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    let e2 = seed_establishment(&app, "Pension Alpenblick").await;
    let staff1 = app
        .seed_user("staff1@e1.example", Role::Staff, Some(e1.id.clone()))
        .await;
    app.seed_user("staff2@e2.example", Role::Staff, Some(e2.id.clone()))
        .await;
    app.seed_user("admin@hq.example", Role::Admin, None).await;

    let (staff1_token, _) = app.login("staff1@e1.example").await;
    let (staff2_token, _) = app.login("staff2@e2.example").await;
    let (admin_token, _) = app.login("admin@hq.example").await;

    let foreign_booking = create_booking(&app, &staff2_token, "Guest Two").await;
    let foreign_id = foreign_booking["_id"].as_str().unwrap();

    let suspicious_url = format!("/audit/users/{}/suspicious", staff1.id);

    // Below the threshold of 5 denials.
    for _ in 0..4 {
        let resp = app
            .get(&format!("/bookings/{}", foreign_id), &staff1_token)
            .await;
        assert_eq!(resp.status(), 403);
    }
    tokio::time::sleep(tokio::time::Duration::from_millis(300)).await;
    let body: serde_json::Value = app
        .get(&suspicious_url, &admin_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["suspicious"], false);

    // The fifth denial crosses it; further denials keep it tripped.
    for _ in 0..2 {
        let resp = app
            .get(&format!("/bookings/{}", foreign_id), &staff1_token)
            .await;
        assert_eq!(resp.status(), 403);
    }
    tokio::time::sleep(tokio::time::Duration::from_millis(300)).await;
    let body: serde_json::Value = app
        .get(&suspicious_url, &admin_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["suspicious"], true);

    app.cleanup().await;
}

#[tokio::test]
async fn cross_establishment_invoice_relationship_is_rejected() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    let e2 = seed_establishment(&app, "Pension Alpenblick").await;
    app.seed_user("staff2@e2.example", Role::Staff, Some(e2.id.clone()))
        .await;
    app.seed_user("admin@hq.example", Role::Admin, None).await;

    let (staff2_token, _) = app.login("staff2@e2.example").await;
    let (admin_token, _) = app.login("admin@hq.example").await;

    let booking = create_booking(&app, &staff2_token, "Guest Two").await;

    // Admin tries to raise an E1 invoice against an E2 booking.
    let resp = app
        .post_json(
            "/invoices",
            &admin_token,
            serde_json::json!({
                "booking_id": booking["_id"],
                "amount_cents": 12900,
                "currency": "EUR",
                "establishment_id": e1.id,
            }),
        )
        .await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("cross-establishment relationship"));

    app.cleanup().await;
}

#[tokio::test]
async fn scoped_invoice_summary_only_aggregates_own_establishment() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    let e2 = seed_establishment(&app, "Pension Alpenblick").await;
    app.seed_user("staff1@e1.example", Role::Staff, Some(e1.id.clone()))
        .await;
    app.seed_user("staff2@e2.example", Role::Staff, Some(e2.id.clone()))
        .await;

    let (staff1_token, _) = app.login("staff1@e1.example").await;
    let (staff2_token, _) = app.login("staff2@e2.example").await;

    let b1 = create_booking(&app, &staff1_token, "Guest One").await;
    let b2 = create_booking(&app, &staff2_token, "Guest Two").await;

    for (token, booking, amount) in [(&staff1_token, &b1, 100), (&staff2_token, &b2, 900)] {
        let resp = app
            .post_json(
                "/invoices",
                token,
                serde_json::json!({
                    "booking_id": booking["_id"],
                    "amount_cents": amount,
                    "currency": "EUR",
                }),
            )
            .await;
        assert_eq!(resp.status(), 201);
    }

    let summary: serde_json::Value = app
        .get("/invoices/summary", &staff1_token)
        .await
        .json()
        .await
        .unwrap();
    let rows = summary.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["total_cents"], 100);
    assert_eq!(rows[0]["count"], 1);

    app.cleanup().await;
}

#[tokio::test]
async fn unassigned_manager_is_guarded_until_bootstrap_assignment() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    let manager = app
        .seed_user("manager@e1.example", Role::Manager, None)
        .await;

    let (token, _) = app.login("manager@e1.example").await;

    // Data routes are off-limits while no establishment is assigned.
    let resp = app.get("/bookings", &token).await;
    assert_eq!(resp.status(), 403);

    // The bootstrap flow itself is reachable: self-assignment works.
    let resp = app
        .post_json(
            &format!("/establishments/{}/assign", e1.id),
            &token,
            serde_json::json!({ "user_id": manager.id }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    // But only self-assignment: another user is out of the allow-list.
    let other = app
        .seed_user("other@e1.example", Role::Staff, None)
        .await;
    let resp = app
        .post_json(
            &format!("/establishments/{}/assign", e1.id),
            &token,
            serde_json::json!({ "user_id": other.id }),
        )
        .await;
    assert_eq!(resp.status(), 403);

    // A fresh login picks up the assignment and opens the data routes.
    let (token, _) = app.login("manager@e1.example").await;
    let resp = app.get("/bookings", &token).await;
    assert_eq!(resp.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn logout_revokes_presented_tokens_and_refresh_reports_blacklisted() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    app.seed_user("staff1@e1.example", Role::Staff, Some(e1.id.clone()))
        .await;

    let (access, refresh) = app.login("staff1@e1.example").await;

    // Sanity: token works before logout.
    assert_eq!(app.get("/users/me", &access).await.status(), 200);

    let resp = app
        .post_json(
            "/auth/logout",
            &access,
            serde_json::json!({ "access_token": access, "refresh_token": refresh }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    // Authentication failure (401), distinct from authorization (403).
    let resp = app.get("/users/me", &access).await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("TOKEN_REVOKED"));

    // Refreshing with the revoked token names its reason code.
    let resp = app
        .post_json(
            "/auth/refresh",
            &access,
            serde_json::json!({ "refresh_token": refresh }),
        )
        .await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("TOKEN_BLACKLISTED"));

    // Logout with no tokens at all is still not an error.
    let resp = app
        .post_json("/auth/logout", &access, serde_json::json!({}))
        .await;
    assert_eq!(resp.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn refresh_without_a_token_names_the_no_token_reason() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/auth/refresh", app.address))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("NO_TOKEN"));

    app.cleanup().await;
}

#[tokio::test]
async fn scoped_manager_cannot_reach_the_audit_surface() {
    let app = TestApp::spawn().await;
    let e1 = seed_establishment(&app, "Hotel Bellevue").await;
    app.seed_user("manager@e1.example", Role::Manager, Some(e1.id.clone()))
        .await;

    let (token, _) = app.login("manager@e1.example").await;
    let resp = app.get("/audit/violations", &token).await;
    assert_eq!(resp.status(), 403);

    app.cleanup().await;
}
