use velvet::Document;

#[derive(Document, Debug, Clone, PartialEq)]
#[collection("wishes")]
struct Wish {
    text: String,
}

fn main() {
    assert_eq!(Wish::COLLECTION, "wishes");
    let wish = Wish { text: "Many happy returns".into() };
    assert_eq!(wish.clone(), wish);
}
