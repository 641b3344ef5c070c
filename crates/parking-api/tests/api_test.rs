//! HTTP tests for the parking API
//!
//! Routes are exercised end to end against the in-memory store with a
//! frozen clock.

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use chrono::{Duration, TimeZone, Utc};
    use parking_api::dto::{ExitRequest, PaymentCreateRequest, PaymentQuery};
    use parking_api::OPERATOR_HEADER;
    use parking_core::config::ParkingConfig;
    use parking_core::models::PaymentMethod;
    use parking_core::{AppError, ManualClock};
    use parking_db::InMemoryParkingStore;
    use parking_services::{PaymentLookup, ParkingServices, SessionLookup};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Setup {
        data: web::Data<ParkingServices<InMemoryParkingStore>>,
        clock: Arc<ManualClock>,
        car: i64,
        operator: i64,
    }

    async fn setup() -> Setup {
        let store = Arc::new(InMemoryParkingStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        ));

        let car = store.register_vehicle_type("car").await.unwrap();
        store.register_vehicle("ABC123", car.id).await.unwrap();
        let operator = store.register_operator("agomez", "Ana Gomez").await.unwrap();

        let services =
            ParkingServices::new(store, clock.clone(), &ParkingConfig::default()).unwrap();

        Setup {
            data: web::Data::new(services),
            clock,
            car: car.id,
            operator: operator.id,
        }
    }

    fn decimal(value: &Value) -> Decimal {
        serde_json::from_value(value.clone()).unwrap()
    }

    #[::core::prelude::v1::test]
    fn test_exit_request_lookup() {
        let req = ExitRequest {
            ticket_code: Some(" T-202503010800-001 ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            req.lookup().unwrap(),
            SessionLookup::Ticket("T-202503010800-001".to_string())
        );

        let req = ExitRequest {
            license_plate: Some("abc123".to_string()),
            session_id: Some(1),
            ..Default::default()
        };
        assert!(matches!(req.lookup(), Err(AppError::Validation(_))));

        assert!(matches!(
            ExitRequest::default().lookup(),
            Err(AppError::Validation(_))
        ));
    }

    #[::core::prelude::v1::test]
    fn test_payment_request_conversion() {
        let req = PaymentCreateRequest {
            parking_session_id: Some(7),
            payment_method: Some("Credit_Card".to_string()),
            total_amount: None,
        };
        let converted = req.to_service_request(Some(3)).unwrap();
        assert_eq!(converted.payment_method, Some(PaymentMethod::CreditCard));
        assert_eq!(converted.operator_id, Some(3));

        let req = PaymentCreateRequest {
            payment_method: Some("bitcoin".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            req.to_service_request(Some(3)),
            Err(AppError::Validation(_))
        ));

        let query = PaymentQuery {
            id: None,
            parking_session_id: Some(7),
        };
        assert_eq!(query.lookup().unwrap(), PaymentLookup::BySession(7));
    }

    #[actix_web::test]
    async fn test_health() {
        let s = setup().await;
        let app = test::init_service(
            App::new()
                .app_data(s.data.clone())
                .configure(parking_api::configure::<InMemoryParkingStore>),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
    }

    #[actix_web::test]
    async fn test_full_parking_lifecycle() {
        let s = setup().await;
        let app = test::init_service(
            App::new()
                .app_data(s.data.clone())
                .configure(parking_api::configure::<InMemoryParkingStore>),
        )
        .await;
        let operator = s.operator.to_string();

        let req = test::TestRequest::post()
            .uri("/api/v1/spaces")
            .set_json(json!({ "space_number": "a1", "vehicle_type_id": s.car }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let space_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/rate-configs")
            .set_json(json!({
                "vehicle_type_id": s.car,
                "rate_per_hour": "2000",
                "minimum_charge_hours": 1,
                "maximum_daily_rate": "15000"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        // Entry
        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "license_plate": " abc123 " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let entry = &body["data"];
        let session_id = entry["session_id"].as_i64().unwrap();
        let ticket = entry["ticket_code"].as_str().unwrap().to_string();
        assert!(ticket.starts_with("T-202503010800-"));
        assert_eq!(entry["license_plate"], "ABC123");
        assert_eq!(entry["space_number"], "A1");
        assert_eq!(entry["operator_name"], "Ana Gomez");

        // Same vehicle again
        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "license_plate": "ABC123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri("/api/v1/sessions/active")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        s.clock.advance(Duration::minutes(130));

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/sessions/{}/amount", session_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["is_estimate"], true);
        assert_eq!(decimal(&body["data"]["total_amount"]), dec!(6000));

        // Exit by ticket
        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/exit")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "ticket_code": ticket }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(decimal(&body["data"]["hours_parked"]), dec!(2.17));
        assert_eq!(decimal(&body["data"]["total_amount"]), dec!(6000));

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/spaces/{}", space_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["occupied"], false);
        assert_eq!(body["data"]["available"], true);

        // Payment
        let req = test::TestRequest::post()
            .uri("/api/v1/payments")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "parking_session_id": session_id, "payment_method": "cash" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "paid");
        assert_eq!(body["data"]["payment_method"], "cash");
        assert_eq!(decimal(&body["data"]["total_amount"]), dec!(6000));
        let payment_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/payments")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "parking_session_id": session_id, "payment_method": "cash" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/payments?parking_session_id={}", session_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"].as_i64(), Some(payment_id));

        // Paid is terminal
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/payments/{}/cancel", payment_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_entry_error_statuses() {
        let s = setup().await;
        let app = test::init_service(
            App::new()
                .app_data(s.data.clone())
                .configure(parking_api::configure::<InMemoryParkingStore>),
        )
        .await;
        let operator = s.operator.to_string();

        // No operator header
        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .set_json(json!({ "license_plate": "ABC123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_error");

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .insert_header((OPERATOR_HEADER, "agomez"))
            .set_json(json!({ "license_plate": "ABC123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "license_plate": "ZZZ999" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // No spaces registered yet
        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "license_plate": "ABC123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "resource_exhausted");

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .insert_header(("content-type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_exit_without_rate_config_keeps_space() {
        let s = setup().await;
        let app = test::init_service(
            App::new()
                .app_data(s.data.clone())
                .configure(parking_api::configure::<InMemoryParkingStore>),
        )
        .await;
        let operator = s.operator.to_string();

        let space_id = s.data.spaces.create_space("B7", s.car).await.unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/entry")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "license_plate": "ABC123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        s.clock.advance(Duration::minutes(45));

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/exit")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "license_plate": "abc123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "calculation_error");

        let space = s.data.spaces.get_space(space_id).await.unwrap();
        assert!(space.occupied);
        assert_eq!(s.data.sessions.get_active_sessions().await.unwrap().len(), 1);

        // Two identifiers
        let req = test::TestRequest::post()
            .uri("/api/v1/sessions/exit")
            .insert_header((OPERATOR_HEADER, operator.as_str()))
            .set_json(json!({ "license_plate": "ABC123", "session_id": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_space_and_rate_config_routes() {
        let s = setup().await;
        let app = test::init_service(
            App::new()
                .app_data(s.data.clone())
                .configure(parking_api::configure::<InMemoryParkingStore>),
        )
        .await;

        for number in ["A1", "A2"] {
            let req = test::TestRequest::post()
                .uri("/api/v1/spaces")
                .set_json(json!({ "space_number": number, "vehicle_type_id": s.car }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::post()
            .uri("/api/v1/spaces")
            .set_json(json!({ "space_number": "a1", "vehicle_type_id": s.car }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/api/v1/spaces")
            .set_json(json!({ "space_number": "1A", "vehicle_type_id": s.car }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get()
            .uri("/api/v1/spaces?only_available=true")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let spaces = body["data"].as_array().unwrap();
        assert_eq!(spaces.len(), 2);
        let first = spaces[0]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/spaces/{}/occupy", first))
            .set_json(json!({ "license_plate": "xyz789" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["occupied_by_plate"], "XYZ789");

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/spaces/{}/deactivate", first))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri("/api/v1/spaces/summary")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["occupied"], 1);
        assert_eq!(body["data"][0]["available"], 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/spaces/{}/free", first))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/spaces/{}/free", first))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        // Rate configs
        let req = test::TestRequest::post()
            .uri("/api/v1/rate-configs")
            .set_json(json!({ "vehicle_type_id": s.car, "rate_per_hour": "2000" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let first_config = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/rate-configs")
            .set_json(json!({ "vehicle_type_id": s.car, "rate_per_hour": "2500" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let second_config = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/rate-configs/active/{}", s.car))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"].as_i64(), Some(second_config));
        assert_eq!(body["data"]["minimum_charge_hours"], 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/rate-configs/{}/activate", first_config))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/rate-configs?vehicle_type_id={}", s.car))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let active: Vec<i64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|c| c["active"] == true)
            .filter_map(|c| c["id"].as_i64())
            .collect();
        assert_eq!(active, vec![first_config]);

        let req = test::TestRequest::post()
            .uri("/api/v1/rate-configs")
            .set_json(json!({ "vehicle_type_id": s.car, "rate_per_hour": "2000", "minimum_charge_hours": 0 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
