use tracing::{debug, info, warn};

use crate::{
    AtomicDocumentStore, Authenticator, CardConfig, DocumentId, DocumentStore, Guestbook,
    HeroConfig, HeroSync, MessageRecord, MusicSource, NewPhoto, Notice, Notices,
    OrderedCollectionSync, PhotoRecord, Session, UserId, WriteBatch, errors::SyncError,
};

const SAMPLES: [(&str, &str); 4] = [
    (
        "https://images.unsplash.com/photo-1513151233558-d860c5398176?q=80&w=1000",
        "Joy",
    ),
    (
        "https://images.unsplash.com/photo-1527481138388-318cd969c946?q=80&w=1000",
        "Moments",
    ),
    (
        "https://images.unsplash.com/photo-1464349153912-6b4b41244374?q=80&w=1000",
        "Together",
    ),
    (
        "https://images.unsplash.com/photo-1492684223066-81342ee5ff30?q=80&w=1000",
        "Celebration",
    ),
];

const READ_ONLY: &str = "This card is read-only right now.";

type CardResult<T, S> = Result<T, SyncError<<S as DocumentStore>::StoreError>>;

/// One open birthday card: the gallery, the guestbook and the hero section of
/// a single app id, plus the notices raised while using them.
pub struct Card<S: AtomicDocumentStore> {
    store: S,
    config: CardConfig,
    session: Session,
    gallery: OrderedCollectionSync<S>,
    guestbook: Guestbook<S>,
    hero: HeroSync<S>,
    notices: Notices,
}

impl<S> Card<S>
where
    S: AtomicDocumentStore + Authenticator + Clone,
{
    /// Signs in and subscribes to every feed of the card.
    pub async fn open(store: S, config: CardConfig) -> CardResult<Self, S> {
        let session = Session::establish(&store, config.auth_token.as_deref()).await;
        let mut notices = Notices::new();
        if !session.can_write() {
            notices.push(Notice::warning(READ_ONLY));
        }

        let mut gallery = OrderedCollectionSync::new(store.clone(), config.photos_path());
        gallery.subscribe(|photos| debug!(photos = photos.len(), "gallery changed"))?;
        let mut guestbook = Guestbook::new(store.clone(), config.messages_path());
        guestbook.subscribe()?;
        let mut hero = HeroSync::new(store.clone(), config.hero_path(), config.hero.clone());
        hero.subscribe()?;

        info!(app_id = %config.app_id, "card opened");
        Ok(Self {
            store,
            config,
            session,
            gallery,
            guestbook,
            hero,
            notices,
        })
    }

    /// Applies every snapshot that has already arrived on any feed.
    pub fn pump(&mut self) -> usize {
        self.gallery.pump() + self.guestbook.pump() + self.hero.pump()
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        self.gallery.visible()
    }

    pub fn gallery(&self) -> &OrderedCollectionSync<S> {
        &self.gallery
    }

    /// Gives access to the reorder session operations.
    pub fn gallery_mut(&mut self) -> &mut OrderedCollectionSync<S> {
        &mut self.gallery
    }

    pub fn messages(&self) -> &[MessageRecord] {
        self.guestbook.messages()
    }

    pub fn hero(&self) -> &HeroConfig {
        self.hero.hero()
    }

    pub fn music(&self) -> MusicSource {
        self.hero.hero().music()
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    pub async fn upload_photo(
        &mut self,
        url: &str,
        caption: Option<&str>,
    ) -> CardResult<DocumentId, S> {
        let user = self.writer()?;
        let photo = NewPhoto::new(url, caption).uploaded_by(user);
        let result = self.gallery.create_record(photo).await;
        self.report(result, "Failed to upload photo.")
    }

    /// Returns `false` if the caption was already current and nothing was written.
    pub async fn update_caption(&mut self, id: &DocumentId, caption: &str) -> CardResult<bool, S> {
        self.writer()?;
        let result = self.gallery.update_caption(id, caption).await;
        self.report(result, "Failed to update caption.")
    }

    pub async fn delete_photo(&mut self, id: &DocumentId) -> CardResult<(), S> {
        self.writer()?;
        let result = self.gallery.delete_record(id).await;
        self.report(result, "Failed to delete photo.")
    }

    /// Commits the open reorder session. It stays open if the store refuses the batch.
    pub async fn commit_reorder(&mut self) -> CardResult<(), S> {
        self.writer()?;
        let result = self.gallery.commit_reorder().await;
        let result = self.report(result, "Failed to save new order.");
        if result.is_ok() {
            self.notices.push(Notice::success("New order saved."));
        }
        result
    }

    pub async fn post_message(
        &mut self,
        text: &str,
        sender: Option<&str>,
    ) -> CardResult<DocumentId, S> {
        let user = self.writer()?;
        let result = self.guestbook.post(text, sender, Some(&user)).await;
        self.report(result, "Failed to send message.")
    }

    pub async fn save_hero(&mut self, hero: HeroConfig) -> CardResult<(), S> {
        self.writer()?;
        let result = self.hero.save(hero).await;
        self.report(result, "Failed to save settings.")
    }

    /// Adds the sample photos in a single batch.
    pub async fn load_samples(&mut self) -> CardResult<Vec<DocumentId>, S> {
        let user = self.writer()?;
        let path = self.gallery.path().clone();
        let mut batch = WriteBatch::new();
        let ids: Vec<DocumentId> = SAMPLES
            .iter()
            .map(|&(url, caption)| {
                let fields = NewPhoto::new(url, Some(caption))
                    .uploaded_by(user.clone())
                    .into_fields();
                batch.create(&path, fields)
            })
            .collect();

        let result = self
            .store
            .commit_batch(batch)
            .await
            .map(|()| ids)
            .map_err(SyncError::Remote);
        self.report(result, "Failed to load sample photos.")
    }

    fn writer(&mut self) -> CardResult<UserId, S> {
        match self.session.user_id() {
            Some(user) => Ok(user.clone()),
            None => {
                self.notices.push(Notice::warning(READ_ONLY));
                Err(SyncError::ReadOnly)
            }
        }
    }

    fn report<T>(&mut self, result: CardResult<T, S>, message: &str) -> CardResult<T, S> {
        if let Err(e) = &result {
            warn!(error = %e, "{message}");
            if e.is_transient() {
                self.notices.push(Notice::error(message));
            }
        }
        result
    }
}
