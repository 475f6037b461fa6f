use velvet::Document;

#[derive(Document)]
struct Photo {
    url: String,
}

fn main() {
    let photo = Photo { url: String::new() };
    let _ = photo.url;
}
