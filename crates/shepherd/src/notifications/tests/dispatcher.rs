use std::sync::Arc;

use serde_json::json;

use crate::members::MemberId;
use crate::notifications::{
    Dispatch, DispatchError, NotificationDispatcher, NotificationDraft, NotificationId,
    NotificationRepository, NotificationType,
};
use crate::store::{MemoryStore, RepositoryError};
use crate::testing::{member, seed, FailingMailer, RecordingMailer};

fn recording_dispatcher(store: &Arc<MemoryStore>) -> (NotificationDispatcher<MemoryStore, RecordingMailer>, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    (
        NotificationDispatcher::new(store.clone(), mailer.clone(), "Grace Chapel"),
        mailer,
    )
}

fn greeting(member_id: MemberId) -> NotificationDraft {
    NotificationDraft::new(
        member_id,
        NotificationType::General,
        "Choir <practice>",
        "Saturday at 4pm & bring water",
    )
}

#[tokio::test]
async fn delivered_notifications_are_stored_and_mailed() {
    let store = Arc::new(MemoryStore::new());
    let ada = seed(&store, member("Ada", "Bassey")).await;
    let (dispatcher, mailer) = recording_dispatcher(&store);

    let outcome = dispatcher
        .dispatch(greeting(ada.id).with_metadata(json!({ "room": "B2" })))
        .await
        .expect("dispatch");
    let Dispatch::Delivered(notification) = outcome else {
        panic!("expected delivery, got {outcome:?}");
    };
    assert!(!notification.is_read);
    assert_eq!(notification.metadata, json!({ "room": "B2" }));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ada.email);
    assert_eq!(sent[0].to_name.as_deref(), Some("Ada Bassey"));
    assert_eq!(sent[0].subject, "Choir <practice>");
    assert!(sent[0].html.contains("Grace Chapel"));
    assert!(sent[0].html.contains("Choir &lt;practice&gt;"));
    assert!(sent[0].html.contains("4pm &amp; bring water"));
}

#[tokio::test]
async fn repeated_idempotency_keys_store_and_mail_once() {
    let store = Arc::new(MemoryStore::new());
    let ada = seed(&store, member("Ada", "Bassey")).await;
    let (dispatcher, mailer) = recording_dispatcher(&store);

    let first = dispatcher
        .dispatch(greeting(ada.id).with_idempotency_key("welcome:ada"))
        .await
        .expect("first");
    let second = dispatcher
        .dispatch(greeting(ada.id).with_idempotency_key("welcome:ada"))
        .await
        .expect("second");

    assert!(!first.is_duplicate());
    assert!(second.is_duplicate());
    assert_eq!(store.notifications().len(), 1);
    assert_eq!(mailer.sent().len(), 1);

    dispatcher.dispatch(greeting(ada.id)).await.expect("unkeyed");
    dispatcher.dispatch(greeting(ada.id)).await.expect("unkeyed");
    assert_eq!(store.notifications().len(), 3);
}

#[tokio::test]
async fn mail_failures_keep_the_inbox_row() {
    let store = Arc::new(MemoryStore::new());
    let ada = seed(&store, member("Ada", "Bassey")).await;
    let dispatcher = NotificationDispatcher::new(store.clone(), Arc::new(FailingMailer), "Grace Chapel");

    let outcome = dispatcher.dispatch(greeting(ada.id)).await.expect("dispatch");
    assert!(matches!(outcome, Dispatch::Stored(_)));

    let inbox = dispatcher.inbox(ada.id, None).await.expect("inbox");
    assert_eq!(inbox.len(), 1);
}

#[tokio::test]
async fn only_the_owner_can_mark_a_notification_read() {
    let store = Arc::new(MemoryStore::new());
    let ada = seed(&store, member("Ada", "Bassey")).await;
    let bola = seed(&store, member("Bola", "Eze")).await;
    let (dispatcher, _) = recording_dispatcher(&store);

    let Dispatch::Delivered(notification) =
        dispatcher.dispatch(greeting(ada.id)).await.expect("dispatch")
    else {
        panic!("expected delivery");
    };

    let err = dispatcher
        .mark_read(notification.id, bola.id)
        .await
        .expect_err("not the owner");
    assert!(matches!(
        err,
        DispatchError::Repository(RepositoryError::NotFound)
    ));

    let err = dispatcher
        .mark_read(NotificationId(uuid::Uuid::new_v4()), ada.id)
        .await
        .expect_err("unknown id");
    assert!(matches!(
        err,
        DispatchError::Repository(RepositoryError::NotFound)
    ));

    let read = dispatcher
        .mark_read(notification.id, ada.id)
        .await
        .expect("owner");
    assert!(read.is_read);
    assert!(read.read_at.is_some());
}

#[tokio::test]
async fn inbox_filters_by_read_state() {
    let store = Arc::new(MemoryStore::new());
    let ada = seed(&store, member("Ada", "Bassey")).await;
    let bola = seed(&store, member("Bola", "Eze")).await;
    let (dispatcher, _) = recording_dispatcher(&store);

    for _ in 0..3 {
        dispatcher.dispatch(greeting(ada.id)).await.expect("dispatch");
    }
    dispatcher.dispatch(greeting(bola.id)).await.expect("dispatch");

    let first = dispatcher.inbox(ada.id, None).await.expect("inbox")[0].clone();
    dispatcher.mark_read(first.id, ada.id).await.expect("read");

    assert_eq!(dispatcher.inbox(ada.id, Some(false)).await.expect("unread").len(), 2);
    assert_eq!(dispatcher.inbox(ada.id, Some(true)).await.expect("read").len(), 1);

    assert_eq!(dispatcher.mark_all_read(ada.id).await.expect("all"), 2);
    assert_eq!(dispatcher.mark_all_read(ada.id).await.expect("again"), 0);
    assert_eq!(
        store
            .notifications_for(bola.id, Some(false))
            .await
            .expect("untouched")
            .len(),
        1
    );
}
