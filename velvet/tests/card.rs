mod common;

use common::{FlakyStore, fields};
use futures::executor::block_on;
use serde_json::json;
use velvet::{
    Card, CardConfig, DocumentStore, HeroConfig, MemoryStore, MusicSource, NoticeLevel, Session,
    SyncError, UserId,
};

fn config_with_token(token: Option<&str>) -> CardConfig {
    CardConfig {
        app_id: "test-card".into(),
        auth_token: token.map(String::from),
        ..CardConfig::default()
    }
}

#[test]
fn test_token_sign_in() -> anyhow::Result<()> {
    let store = FlakyStore::new();
    let mut card = block_on(Card::open(store.clone(), config_with_token(Some("abc"))))?;
    assert_eq!(
        card.session(),
        &Session::Authenticated(UserId::new("token-abc"))
    );

    let id = block_on(card.upload_photo("https://example.com/a.jpg", None))?;
    let stored = store
        .memory()
        .get(&card.config().photos_path().doc(id))?
        .expect("photo stored");
    assert_eq!(stored["userId"], json!("token-abc"));
    assert_eq!(stored["caption"], json!("Untold Story"));
    Ok(())
}

#[test]
fn test_token_failure_falls_back_to_anonymous() -> anyhow::Result<()> {
    let store = FlakyStore::new();
    store.set_fail_sign_in(true, false);
    let card = block_on(Card::open(store, config_with_token(Some("abc"))))?;

    assert_eq!(card.session(), &Session::Anonymous(UserId::new("anonymous")));
    assert!(card.notices().is_empty());
    Ok(())
}

#[test]
fn test_blank_token_signs_in_anonymously() -> anyhow::Result<()> {
    let card = block_on(Card::open(FlakyStore::new(), config_with_token(Some("  "))))?;
    assert_eq!(card.session(), &Session::Anonymous(UserId::new("anonymous")));
    Ok(())
}

#[test]
fn test_read_only_card_still_renders() -> anyhow::Result<()> {
    let store = FlakyStore::new();
    store.set_fail_sign_in(true, true);
    block_on(store.memory().create_document(
        &config_with_token(None).photos_path(),
        fields(json!({"url": "https://example.com/a.jpg"})),
    ))?;

    let mut card = block_on(Card::open(store.clone(), config_with_token(Some("abc"))))?;
    assert_eq!(card.session(), &Session::ReadOnly);
    assert!(!card.session().can_write());
    assert_eq!(card.photos().len(), 1);
    assert_eq!(card.notices().len(), 1);

    let result = block_on(card.upload_photo("https://example.com/b.jpg", Some("B")));
    assert!(matches!(result, Err(SyncError::ReadOnly)));
    assert!(matches!(
        block_on(card.post_message("hi", None)),
        Err(SyncError::ReadOnly)
    ));
    assert_eq!(store.writes(), 0);
    assert!(card.notices().iter().all(|n| n.level == NoticeLevel::Warning));
    Ok(())
}

#[test]
fn test_commit_failure_raises_a_notice_and_keeps_the_session() -> anyhow::Result<()> {
    let store = FlakyStore::new();
    let mut card = block_on(Card::open(store.clone(), CardConfig::default()))?;
    block_on(card.load_samples())?;
    card.pump();

    card.gallery_mut().begin_reorder()?;
    card.gallery_mut().move_item(0, 3)?;

    store.set_fail_next(true);
    assert!(block_on(card.commit_reorder()).is_err());
    assert!(card.gallery().is_editing());
    let notice = card.notices().iter().last().expect("error notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Failed to save new order.");

    block_on(card.commit_reorder())?;
    assert!(!card.gallery().is_editing());
    let notice = card.notices().iter().last().expect("success notice");
    assert_eq!(notice.level, NoticeLevel::Success);

    card.notices_mut().clear();
    assert!(card.notices().is_empty());
    Ok(())
}

#[test]
fn test_samples_are_one_batch() -> anyhow::Result<()> {
    let store = FlakyStore::new();
    let mut card = block_on(Card::open(store.clone(), CardConfig::default()))?;

    let ids = block_on(card.load_samples())?;
    assert_eq!(ids.len(), 4);
    assert_eq!(store.writes(), 1);

    card.pump();
    let mut captions: Vec<_> = card
        .photos()
        .iter()
        .map(|photo| photo.caption.as_str())
        .collect();
    captions.sort_unstable();
    assert_eq!(captions, vec!["Celebration", "Joy", "Moments", "Together"]);
    assert!(card.photos().iter().all(|photo| photo.user_id.is_some()));
    Ok(())
}

#[test]
fn test_guestbook() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut card = block_on(Card::open(store, CardConfig::default()))?;

    assert!(matches!(
        block_on(card.post_message("   ", Some("Ann"))),
        Err(SyncError::EmptyMessage)
    ));
    assert!(card.notices().is_empty());

    block_on(card.post_message("Happy birthday!", None))?;
    block_on(card.post_message("  Many happy returns  ", Some("Ann")))?;
    card.pump();

    let messages = card.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "Many happy returns");
    assert_eq!(messages[0].sender, "Ann");
    assert_eq!(messages[1].sender, "Friend");
    Ok(())
}

#[test]
fn test_hero_defaults_and_updates() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let config = CardConfig::default();
    let hero_path = config.hero_path();
    let mut card = block_on(Card::open(store.clone(), config))?;

    assert_eq!(card.hero(), &HeroConfig::default());
    assert!(matches!(card.music(), MusicSource::Audio { .. }));

    let hero = HeroConfig {
        title: "Happy 30th!".into(),
        music_url: "https://youtu.be/dQw4w9WgXcQ".into(),
        ..HeroConfig::default()
    };
    block_on(card.save_hero(hero))?;
    card.pump();
    assert_eq!(card.hero().title, "Happy 30th!");
    assert_eq!(
        card.music(),
        MusicSource::YouTube {
            video_id: "dQw4w9WgXcQ".into()
        }
    );

    // Partial documents written elsewhere only override what they carry
    block_on(store.upsert_document(&hero_path, fields(json!({"subtitle": "Thirty"}))))?;
    card.pump();
    assert_eq!(card.hero().subtitle, "Thirty");
    assert_eq!(card.hero().title, "Happy 30th!");
    Ok(())
}

#[test]
fn test_remote_failures_become_error_notices() -> anyhow::Result<()> {
    let store = FlakyStore::new();
    let mut card = block_on(Card::open(store.clone(), CardConfig::default()))?;

    store.set_fail_next(true);
    assert!(block_on(card.upload_photo("https://example.com/a.jpg", None)).is_err());
    store.set_fail_next(true);
    assert!(block_on(card.save_hero(HeroConfig::default())).is_err());

    let levels: Vec<_> = card.notices().iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![NoticeLevel::Error, NoticeLevel::Error]);
    let dismissed = card.notices_mut().dismiss(0).expect("notice exists");
    assert_eq!(dismissed.message, "Failed to upload photo.");
    assert_eq!(card.notices().len(), 1);
    Ok(())
}
