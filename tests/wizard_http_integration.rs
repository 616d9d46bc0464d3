//! Integration tests for the wizard HTTP routes.
//!
//! Each test seeds an in-memory store, spins up an Axum server on a random
//! port and drives it with a redirect-free reqwest client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use tokio::net::TcpListener;
use tokio::time::timeout;

use kuusi::config::AppConfig;
use kuusi::store::{LibSqlBackend, SeedData, WizardStore, load_seed};
use kuusi::web::{MiniJinjaRenderer, SelectionForwarder, WizardService, wizard_routes};
use kuusi::wizard::{Session, SessionVersion};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const SEED: &str = r#"{
    "pages": [
        {"id": 1, "catalogue_id": "welcome", "title": "Welcome", "href": "?page=welcome", "next_page": 2, "require_session": false},
        {"id": 2, "catalogue_id": "desktop", "title": "Desktop", "href": "?page=desktop", "previous_page": 1, "next_page": 3,
         "visibility": {"kind": "latest_only"}},
        {"id": 3, "catalogue_id": "gaming", "title": "Gaming", "href": "?page=gaming", "previous_page": 2, "next_page": 4,
         "visibility": {"kind": "requires_selection", "facette": 5}},
        {"id": 4, "catalogue_id": "result", "title": "Result", "href": "?page=result", "previous_page": 3}
    ],
    "categories": [
        {"id": 1, "name": "Start", "icon": "home", "target_page": 1},
        {"id": 2, "name": "Questions", "icon": "list", "target_page": 2},
        {"id": 3, "name": "Result", "icon": "check", "target_page": 4}
    ],
    "choosables": [
        {"id": 1, "name": "Fedora", "meta": {"WEBSITE": {"meta_key": "WEBSITE", "meta_value": "https://fedoraproject.org"}}}
    ]
}"#;

/// Start an Axum server on a random port, return (base url, store).
async fn start_server() -> (String, Arc<dyn WizardStore>) {
    let store: Arc<dyn WizardStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    load_seed(store.as_ref(), &SeedData::from_json(SEED).unwrap())
        .await
        .unwrap();

    let service = WizardService::new(
        Arc::clone(&store),
        Arc::new(AppConfig::default()),
        Arc::new(MiniJinjaRenderer::new().unwrap()),
        Arc::new(SelectionForwarder::new(Arc::clone(&store))),
    );
    let app = wizard_routes(Arc::new(service));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), store)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// `name=value` part of a Set-Cookie header.
fn cookie_pair(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[tokio::test]
async fn welcome_page_needs_no_session() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let response = client().get(format!("{base}/en")).send().await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_pair(&response).is_none());
        let html = response.text().await.unwrap();
        assert!(html.contains("data-ku-page=\"welcome\""));
        assert!(html.contains("Questions"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn session_cookie_survives_the_wizard() {
    timeout(TEST_TIMEOUT, async {
        let (base, store) = start_server().await;
        let client = client();

        let response = client
            .get(format!("{base}/en?page=desktop"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = cookie_pair(&response).expect("session cookie");

        let response = client
            .post(format!("{base}/en?page=desktop"))
            .header(COOKIE, &cookie)
            .form(&[("facette_5", "steam")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/en?page=gaming");
        assert!(cookie_pair(&response).is_none());

        let id = cookie.split_once('=').unwrap().1.parse().unwrap();
        let selections = store.list_selections(id).await.unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].value, "steam");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn locked_page_is_skipped() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let response = client()
            .get(format!("{base}/en?page=gaming"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.text().await.unwrap().contains("data-ku-page=\"result\""));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn stale_cookie_gets_a_new_session() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let stale = "kuusi_session=00000000-0000-4000-8000-000000000000";
        let response = client()
            .get(format!("{base}/en?page=desktop"))
            .header(COOKIE, stale)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fresh = cookie_pair(&response).expect("replacement cookie");
        assert_ne!(fresh, stale);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn shared_result_is_copied() {
    timeout(TEST_TIMEOUT, async {
        let (base, store) = start_server().await;
        let mut shared = Session::new(None, None);
        shared.valid_for = SessionVersion::Archived("v1".into());
        store.insert_session(&shared).await.unwrap();
        store
            .upsert_selection(shared.result_id, 5, "steam")
            .await
            .unwrap();

        let response = client()
            .get(format!("{base}/en/{}?page=desktop", shared.result_id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = cookie_pair(&response).expect("session cookie");
        let html = response.text().await.unwrap();
        // Desktop is hidden for archived results; gaming is unlocked by the copy.
        assert!(html.contains("data-ku-page=\"gaming\""));
        assert!(html.contains("data-ku-old-session"));

        let id = cookie.split_once('=').unwrap().1.parse().unwrap();
        let copy = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(copy.session_origin, Some(shared.result_id));
        assert_eq!(store.list_selections(id).await.unwrap().len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_page_and_language_are_404() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let client = client();

        let response = client
            .get(format!("{base}/en?page=missing"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = client.get(format!("{base}/xx")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn outgoing_link_redirects_and_counts() {
    timeout(TEST_TIMEOUT, async {
        let (base, store) = start_server().await;
        let client = client();

        for _ in 0..2 {
            let response = client
                .get(format!("{base}/out/1/website"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[LOCATION], "https://fedoraproject.org");
        }
        assert_eq!(store.get_choosable(1).await.unwrap().unwrap().clicked, 2);

        let response = client
            .get(format!("{base}/out/1/missing"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn turbo_clients_get_validation_status() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let client = client();

        let plain = client
            .post(format!("{base}/en?page=welcome"))
            .form(&[("note", "nothing")])
            .send()
            .await
            .unwrap();
        assert_eq!(plain.status(), StatusCode::OK);

        let turbo = client
            .post(format!("{base}/en?page=welcome"))
            .header(ACCEPT, "text/vnd.turbo-stream.html, text/html")
            .form(&[("note", "nothing")])
            .send()
            .await
            .unwrap();
        assert_eq!(turbo.status(), StatusCode::UNPROCESSABLE_ENTITY);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_and_root() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let client = client();

        let health = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&health.text().await.unwrap()).unwrap();
        assert_eq!(body["status"], "ok");

        let root = client.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(root.status(), StatusCode::SEE_OTHER);
        assert_eq!(root.headers()[LOCATION], "/en");
    })
    .await
    .expect("test timed out");
}
