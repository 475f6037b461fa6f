//! Opens a card over an in-memory store, loads the sample photos, reorders
//! them and prints the gallery before and after.
//!
//! Run with `RUST_LOG=debug` to see the store and sync logs.

use futures::executor::block_on;
use tracing_subscriber::EnvFilter;
use velvet::{Card, CardConfig, MemoryStore, PhotoRecord};

fn print_gallery(title: &str, photos: &[PhotoRecord]) {
    println!("{title}:");
    for (index, photo) in photos.iter().enumerate() {
        let order = photo
            .order
            .order()
            .map_or_else(|| "-".to_string(), |order| order.to_string());
        println!("  {index}. {:<12} order {order}", photo.display_caption());
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    block_on(async {
        let store = MemoryStore::new();
        let mut card = Card::open(store, CardConfig::default()).await?;
        card.load_samples().await?;
        card.pump();
        print_gallery("Uploaded", card.photos());

        let gallery = card.gallery_mut();
        let last = gallery.visible().len().saturating_sub(1);
        let session = gallery.begin_reorder()?;
        session.move_item(last, 0)?;
        let first = session.items()[0].id.clone();
        gallery.edit_caption(&first, "Best day ever")?;
        card.commit_reorder().await?;
        card.pump();
        print_gallery("Reordered", card.photos());

        for notice in card.notices_mut().drain() {
            println!("[{}] {}", notice.level, notice.message);
        }
        anyhow::Ok(())
    })
}
