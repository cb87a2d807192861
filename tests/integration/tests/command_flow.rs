//! Slash-command flows driven over real HTTP against the command router,
//! with the identity table loaded from disk and both gateways faked.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ferry_access::IdentityDirectory;
use ferry_bridge::test_support::{FakeChat, FakeTracker};
use ferry_bridge::{build_command_router, Bridge, CallResponse, SessionBroker};
use serde_json::json;
use tokio::net::TcpListener;

fn directory_from_disk() -> (tempfile::TempDir, Arc<IdentityDirectory>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("identities.toml");
    std::fs::write(
        &path,
        "[identities]\n\
         \"artem.ismagilov\" = \"a.ismagilov\"\n\
         \"vasiliy.fedorov\" = \"v.fedorov\"\n\
         \"petya\" = \"p.petrov\"\n",
    )
    .expect("write identity table");
    let directory = IdentityDirectory::load(&path).expect("load identity table");
    (dir, Arc::new(directory))
}

async fn spawn_bridge_server(
    tracker: &FakeTracker,
    chat: &FakeChat,
    directory: Arc<IdentityDirectory>,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let bridge = Bridge::new(
        directory,
        SessionBroker::new(tracker.gateway()),
        chat.gateway(),
        "https://rm.example",
    );
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("resolve listener addr");
    let app = build_command_router(bridge);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, handle)
}

async fn post_call(addr: SocketAddr, endpoint: &str, payload: serde_json::Value) -> CallResponse {
    reqwest::Client::new()
        .post(format!("http://{addr}{endpoint}"))
        .json(&payload)
        .send()
        .await
        .expect("request sent")
        .json()
        .await
        .expect("response decoded")
}

fn acting_context(username: &str) -> serde_json::Value {
    json!({
        "acting_user": { "id": format!("id-{username}"), "username": username },
        "channel": { "id": "town-square" }
    })
}

#[tokio::test]
async fn integration_form_submit_creates_ticket_and_announces() {
    let tracker = FakeTracker::new();
    tracker.register_account("a.ismagilov", 5);
    tracker.register_account("v.fedorov", 7);
    let chat = FakeChat::new("bot");
    let (_dir, directory) = directory_from_disk();
    let (addr, handle) = spawn_bridge_server(&tracker, &chat, directory).await;

    let payload = json!({
        "context": acting_context("artem.ismagilov"),
        "values": {
            "project": { "label": "Testing", "value": "testing" },
            "tracker": { "label": "Bug", "value": "2" },
            "subject": "Купить колбасы",
            "description": "для праздника",
            "status": { "label": "New", "value": "1" },
            "priority": { "label": "Normal", "value": "4" },
            "assignee": { "label": "vasiliy.fedorov", "value": "vasiliy.fedorov" },
            "start_date": "09.05.2023",
            "end_date": "10.05.2023",
            "estimated_time": "8",
            "done": { "label": "0%", "value": "0" }
        }
    });
    let response = post_call(addr, "/new_task_submit", payload).await;
    assert_eq!(response.kind, "ok");
    assert_eq!(
        response.text.as_deref(),
        Some("# Ok, artem.ismagilov. I create task in redmine by form")
    );

    let drafts = tracker.created_drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].0, "a.ismagilov");
    assert_eq!(drafts[0].1.assigned_to_id, Some(7));

    let posts = chat.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].channel_id, "town-square");
    assert!(posts[0].attachments[0].text.contains("Купить колбасы"));
    handle.abort();
}

#[tokio::test]
async fn integration_batch_submit_keeps_input_order_in_report() {
    let tracker = FakeTracker::new();
    tracker.register_account("a.ismagilov", 5);
    tracker.register_account("v.fedorov", 7);
    tracker.register_account("p.petrov", 9);
    let chat = FakeChat::new("bot");
    let (_dir, directory) = directory_from_disk();
    let (addr, handle) = spawn_bridge_server(&tracker, &chat, directory).await;

    let payload = json!({
        "context": acting_context("artem.ismagilov"),
        "values": {
            "project": { "label": "Testing", "value": "testing" },
            "message": "1. Первая @vasiliy.fedorov 09.05.2030\n\
                        2. Вторая @petya 10.05.2030\n\
                        3. Третья @vasiliy.fedorov 11.05.2030"
        }
    });
    let response = post_call(addr, "/new_tasks_submit", payload).await;
    assert_eq!(response.kind, "ok");

    let drafts = tracker.created_drafts();
    let subjects: Vec<&str> = drafts.iter().map(|(_, d)| d.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Первая", "Вторая", "Третья"]);

    let table = chat.posts()[0].attachments[0].text.clone();
    let first = table.find("Первая").expect("first row");
    let second = table.find("Вторая").expect("second row");
    let third = table.find("Третья").expect("third row");
    assert!(first < second && second < third);
    handle.abort();
}

#[tokio::test]
async fn integration_earliest_pipeline_error_wins_over_http() {
    let tracker = FakeTracker::new();
    tracker.register_account("a.ismagilov", 5);
    tracker.hide_project_from("a.ismagilov");
    let chat = FakeChat::new("bot");
    let (_dir, directory) = directory_from_disk();
    let (addr, handle) = spawn_bridge_server(&tracker, &chat, directory).await;

    // Project membership and the end date are both wrong; the membership
    // check runs first, so its message must win.
    let payload = json!({
        "context": acting_context("artem.ismagilov"),
        "values": {
            "project": { "label": "Testing", "value": "testing" },
            "tracker": { "label": "Bug", "value": "2" },
            "subject": "x",
            "status": { "label": "New", "value": "1" },
            "priority": { "label": "Normal", "value": "4" },
            "end_date": "12.21.202",
            "done": { "label": "0%", "value": "0" }
        }
    });
    let response = post_call(addr, "/new_task_submit", payload).await;
    assert_eq!(response.kind, "error");
    assert_eq!(
        response.text.as_deref(),
        Some("# User with login 'a.ismagilov' haven't project with identifier `testing`.")
    );
    assert!(tracker.created_drafts().is_empty());
    handle.abort();
}

#[tokio::test]
async fn integration_unregistered_caller_is_refused_without_tracker_calls() {
    let tracker = FakeTracker::new();
    let chat = FakeChat::new("bot");
    let (_dir, directory) = directory_from_disk();
    let (addr, handle) = spawn_bridge_server(&tracker, &chat, directory).await;

    let payload = json!({ "context": acting_context("stranger") });
    let response = post_call(addr, "/tasks_by_me", payload).await;
    assert_eq!(response.kind, "error");
    assert!(response
        .text
        .expect("error text")
        .contains("`stranger` not added in config file"));
    assert!(tracker.calls().is_empty());
    handle.abort();
}
