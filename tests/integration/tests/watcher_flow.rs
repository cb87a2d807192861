//! Message-watcher flows across crates: identity table on disk, fake
//! gateways, full event handling including the single-edit guarantee.

use std::sync::Arc;

use ferry_access::IdentityDirectory;
use ferry_bridge::test_support::{ticket_fixture, FakeChat, FakeTracker};
use ferry_bridge::{MessageWatcher, SessionBroker, WatchOutcome};
use ferry_mattermost::PostedMessageEvent;

fn directory_from_disk() -> (tempfile::TempDir, Arc<IdentityDirectory>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("identities.toml");
    std::fs::write(&path, "[identities]\n\"artem.ismagilov\" = \"a.ismagilov\"\n")
        .expect("write identity table");
    let directory = IdentityDirectory::load(&path).expect("load identity table");
    (dir, Arc::new(directory))
}

fn watcher_with(
    tracker: &FakeTracker,
    chat: &FakeChat,
    directory: Arc<IdentityDirectory>,
) -> MessageWatcher {
    MessageWatcher::new(
        directory,
        SessionBroker::new(tracker.gateway()),
        chat.gateway(),
        "https://rm.example",
        "bot-user",
    )
}

fn posted(text: &str) -> PostedMessageEvent {
    PostedMessageEvent {
        post_id: "p1".to_string(),
        channel_id: "c1".to_string(),
        user_id: "u1".to_string(),
        sender_username: "artem.ismagilov".to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn integration_watcher_rewrites_every_tag_with_one_edit() {
    let tracker = FakeTracker::new();
    tracker.register_account("a.ismagilov", 5);
    tracker.register_issue(ticket_fixture(42, "Купить колбасы"));
    tracker.register_issue(ticket_fixture(7, "Написать симфонию"));
    let chat = FakeChat::new("bot-user");
    let (_dir, directory) = directory_from_disk();
    let watcher = watcher_with(&tracker, &chat, directory);

    let outcome = watcher
        .process_event(&posted("sausages in #t42, symphony in #t7"))
        .await;
    assert_eq!(outcome, WatchOutcome::Edited);

    let edits = chat.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(
        edits[0].text,
        "sausages in [#t42](https://rm.example/issues/42), symphony in [#t7](https://rm.example/issues/7)"
    );
    assert!(chat.ephemerals().is_empty());
}

#[tokio::test]
async fn integration_watcher_reprocessing_edited_text_is_a_no_op() {
    let tracker = FakeTracker::new();
    tracker.register_account("a.ismagilov", 5);
    tracker.register_issue(ticket_fixture(42, "Купить колбасы"));
    let chat = FakeChat::new("bot-user");
    let (_dir, directory) = directory_from_disk();
    let watcher = watcher_with(&tracker, &chat, directory);

    let first = watcher.process_event(&posted("see #t42 and #t42 again")).await;
    assert_eq!(first, WatchOutcome::Edited);
    let rewritten = chat.edits()[0].text.clone();

    let second = watcher.process_event(&posted(&rewritten)).await;
    assert_eq!(second, WatchOutcome::Unchanged);
    assert_eq!(chat.edits().len(), 1);
}

#[tokio::test]
async fn integration_watcher_aborts_event_on_first_missing_ticket() {
    let tracker = FakeTracker::new();
    tracker.register_account("a.ismagilov", 5);
    tracker.register_issue(ticket_fixture(42, "Купить колбасы"));
    let chat = FakeChat::new("bot-user");
    let (_dir, directory) = directory_from_disk();
    let watcher = watcher_with(&tracker, &chat, directory);

    let outcome = watcher.process_event(&posted("#t42 ok but #t99 missing")).await;
    assert_eq!(outcome, WatchOutcome::Refused);
    assert!(chat.edits().is_empty());

    let notices = chat.ephemerals();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].user_id, "u1");
    assert_eq!(notices[0].channel_id, "c1");
    assert_eq!(notices[0].text, "# You have not task with ID `99`");
}

#[tokio::test]
async fn integration_watcher_refuses_unregistered_poster_privately() {
    let tracker = FakeTracker::new();
    let chat = FakeChat::new("bot-user");
    let (_dir, directory) = directory_from_disk();
    let watcher = watcher_with(&tracker, &chat, directory);

    let mut event = posted("see #t42");
    event.sender_username = "stranger".to_string();
    let outcome = watcher.process_event(&event).await;
    assert_eq!(outcome, WatchOutcome::Refused);
    assert!(tracker.calls().is_empty());
    assert!(chat.edits().is_empty());
    assert!(chat.ephemerals()[0]
        .text
        .contains("`stranger` not added in config file"));
}
