use velvet::Document;

#[derive(Document)]
#[collection("moods")]
enum Mood {
    Happy,
}

fn main() {
    let _ = Mood::Happy;
}
