use intellibuddy_core::session::{Message, Sender, SessionStore, UserInfoPatch};

#[test]
fn messages_keep_insertion_order() {
    let mut store = SessionStore::new();
    let session_id = store.create_session().session_id.clone();

    let texts = ["first", "second", "third", "fourth"];
    for text in texts {
        store.add_message(Some(&session_id), Message::user(text));
    }

    let session = store.get(&session_id).unwrap();
    // Seed greeting first, then the appended messages in call order.
    let appended: Vec<&str> = session.messages[1..].iter().map(|m| m.text.as_str()).collect();
    assert_eq!(appended, texts);
}

#[test]
fn unknown_or_absent_id_becomes_a_new_session() {
    let mut store = SessionStore::new();

    let fresh = store.get_or_create(None);
    assert_eq!(fresh.messages.len(), 1);
    assert_eq!(fresh.messages[0].sender, Sender::Bot);

    let from_unknown = store.get_or_create(Some("nonexistent-id")).session_id.clone();
    let session = store.get(&from_unknown).unwrap();
    assert_ne!(from_unknown, "nonexistent-id");
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.messages[0].sender, Sender::Bot);
}

#[test]
fn get_or_create_returns_the_existing_session() {
    let mut store = SessionStore::new();
    let session_id = store.create_session().session_id.clone();
    store.add_message(Some(&session_id), Message::user("hello"));

    let again = store.get_or_create(Some(&session_id));
    assert_eq!(again.session_id, session_id);
    assert_eq!(again.messages.len(), 2);
}

#[test]
fn clear_reports_whether_the_session_existed() {
    let mut store = SessionStore::new();
    let session_id = store.create_session().session_id.clone();

    assert!(store.clear(&session_id));
    assert!(!store.clear(&session_id));
    assert!(!store.clear("never-existed"));
}

#[test]
fn user_info_patch_merges_shallowly() {
    let mut store = SessionStore::new();
    let session_id = store.create_session().session_id.clone();

    store.update_user_info(
        Some(&session_id),
        UserInfoPatch {
            name: Some("Sam".to_string()),
            ..Default::default()
        },
    );
    store.update_user_info(
        Some(&session_id),
        UserInfoPatch {
            language: Some("fr".to_string()),
            ..Default::default()
        },
    );

    let info = &store.get(&session_id).unwrap().user_info;
    // The language patch must not have clobbered the name.
    assert_eq!(info.name.as_deref(), Some("Sam"));
    assert_eq!(info.language.as_deref(), Some("fr"));
}
