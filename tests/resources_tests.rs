//! Resource wrappers: endpoint paths, paging queries and page normalization.

mod session_support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinic_client::auth::NoopNavigator;
use clinic_client::client::ApiClient;
use clinic_client::resources::{NewMainExam, NewPatient, NewVisitSession, Pageable};
use session_support::{client_for, jwt, CountingStore};

async fn client(server: &MockServer) -> ApiClient {
    client_for(
        &format!("{}/api", server.uri()),
        CountingStore::with_credentials(&jwt(3600), "r"),
        Arc::new(NoopNavigator),
    )
}

fn spring_page(content: Value) -> Value {
    let len = content.as_array().map(Vec::len).unwrap_or(0);
    let empty = len == 0;
    json!({
        "content": content,
        "totalElements": 40,
        "totalPages": 2,
        "size": 20,
        "number": 1,
        "first": false,
        "last": true,
        "numberOfElements": len,
        "empty": empty
    })
}

#[tokio::test]
async fn patient_search_sends_query_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients/search"))
        .and(query_param("query", "nakato"))
        .and(query_param("page", "1"))
        .and(query_param("size", "20"))
        .and(query_param("sort", "lastName,asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spring_page(json!([
            {"id": 7, "firstName": "Amina", "lastName": "Nakato"}
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let page = client
        .patients()
        .search("  nakato ", &Pageable::new(1, 20).sort("lastName,asc"))
        .await
        .unwrap();

    assert_eq!(page.total_elements, 40);
    assert_eq!(page.content[0].full_name(), "Amina Nakato");
    assert!(page.last);
}

#[tokio::test]
async fn patient_create_and_update_send_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/patients"))
        .and(body_json(json!({"firstName": "Amina", "lastName": "Nakato", "gender": "F"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(
            json!({"id": 12, "firstName": "Amina", "lastName": "Nakato", "gender": "F"}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/patients/12"))
        .and(body_json(json!({"phone": "0700123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"id": 12, "firstName": "Amina", "lastName": "Nakato", "phone": "0700123456"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let mut details = Map::new();
    details.insert("gender".into(), json!("F"));
    let created = client
        .patients()
        .create(&NewPatient {
            first_name: "Amina".into(),
            last_name: "Nakato".into(),
            details,
        })
        .await
        .unwrap();
    assert_eq!(created.id, 12);

    let mut changes = Map::new();
    changes.insert("phone".into(), json!("0700123456"));
    let updated = client.patients().update(12, &changes).await.unwrap();
    assert_eq!(updated.details["phone"], "0700123456");
}

#[tokio::test]
async fn visit_session_list_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patient-visit-sessions"))
        .and(query_param("search", "amina"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spring_page(json!([
            {"id": 3, "patientId": 7, "status": "REGISTERED", "currentStage": "RECEPTION"}
        ]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/patient-visit-sessions/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"status": "success", "message": "Visit session deleted", "deletedId": 3}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/patient-visit-sessions/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let visits = client.visit_sessions();
    let page = visits
        .list(&Pageable::new(0, 20), Some("amina"))
        .await
        .unwrap();
    assert_eq!(page.content[0].current_stage.as_deref(), Some("RECEPTION"));

    let deleted = visits.delete(3).await.unwrap().unwrap();
    assert_eq!(deleted.deleted_id, Some(3));
    assert_eq!(visits.delete(4).await.unwrap(), None);
}

#[tokio::test]
async fn visit_session_create_and_by_patient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/patient-visit-sessions"))
        .and(body_json(json!({"patientId": 7, "visitPurpose": "REVIEW"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 5, "patientId": 7})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/patient-visit-sessions/patient/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "patientId": 7},
            {"id": 2, "patientId": 7, "consultationFeePaid": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let created = client
        .visit_sessions()
        .create(&NewVisitSession {
            patient_id: 7,
            visit_purpose: "REVIEW".into(),
            chief_complaint: None,
            consultation_fee_amount: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, 5);
    assert!(!created.consultation_fee_paid);

    let history = client.visit_sessions().for_patient(7).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[1].consultation_fee_paid);
}

#[tokio::test]
async fn main_exam_list_accepts_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/main-exams"))
        .and(query_param("size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "visitSessionId": 3, "iopRight": 14.0},
            {"id": 2, "visitSessionId": 4, "advice": "Review in 3 months"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let pageable = Pageable {
        page: None,
        size: Some(10),
        sort: None,
    };
    let page = client.main_exams().list(&pageable).await.unwrap();

    assert_eq!(page.total_elements, 2);
    assert_eq!(page.size, 10);
    assert_eq!(page.number, 0);
    assert_eq!(page.content[0].iop_right, Some(14.0));
    assert_eq!(page.content[1].findings["advice"], "Review in 3 months");
}

#[tokio::test]
async fn main_exam_list_passes_spring_page_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/main-exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(spring_page(json!([
            {"id": 9, "visitSessionId": 3}
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let page = client.main_exams().list(&Pageable::default()).await.unwrap();
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.number, 1);
    assert_eq!(page.content[0].id, 9);
}

#[tokio::test]
async fn main_exam_crud_paths() {
    let server = MockServer::start().await;
    let exam = json!({"id": 9, "visitSessionId": 3, "cdrRight": 0.3});
    Mock::given(method("POST"))
        .and(path("/api/main-exams"))
        .and(body_json(json!({"visitSessionId": 3, "cdrRight": 0.3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(exam.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/main-exams/visit-session/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(exam.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/main-exams/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(exam.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/main-exams/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let exams = client.main_exams();
    let mut findings = Map::new();
    findings.insert("cdrRight".into(), json!(0.3));
    let request = NewMainExam {
        visit_session_id: 3,
        findings,
    };

    assert_eq!(exams.create(&request).await.unwrap().id, 9);
    assert_eq!(exams.for_visit_session(3).await.unwrap().findings["cdrRight"], 0.3);
    assert_eq!(exams.update(9, &request).await.unwrap().visit_session_id, 3);
    exams.delete(9).await.unwrap();
}
