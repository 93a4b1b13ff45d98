use ironsilo::chunk::ChunkBuilder;
use ironsilo::document::{Document, DocumentBuilder};

fn doc(id: &str) -> Document {
    DocumentBuilder::new(id).field("value", "x".repeat(16)).build()
}

#[test]
fn record_bound_closes_the_chunk() {
    let mut builder = ChunkBuilder::new(2, usize::MAX);
    assert!(builder.try_push(doc("a")).is_ok());
    assert!(builder.try_push(doc("b")).is_ok());

    let returned = builder.try_push(doc("c")).expect_err("record bound hit");
    assert_eq!(returned.id().as_str(), "c");
    assert!(builder.is_full());

    let chunk = builder.take().expect("a formed chunk");
    assert_eq!(chunk.len(), 2);
    assert!(builder.try_push(returned).is_ok());
    assert_eq!(builder.len(), 1);
}

#[test]
fn byte_bound_closes_the_chunk() {
    let unit = doc("a").serialized_len();
    let mut builder = ChunkBuilder::new(100, unit * 2);
    assert!(builder.try_push(doc("a")).is_ok());
    assert!(builder.try_push(doc("b")).is_ok());
    assert!(builder.try_push(doc("c")).is_err());

    let chunk = builder.take().expect("a formed chunk");
    assert_eq!(chunk.len(), 2);
    assert_eq!(chunk.cumulative_bytes(), unit * 2);
}

#[test]
fn empty_builder_accepts_a_document_over_the_byte_bound() {
    let unit = doc("a").serialized_len();
    let mut builder = ChunkBuilder::new(100, unit - 1);

    // An oversized document lands alone rather than wedging assembly.
    assert!(builder.try_push(doc("a")).is_ok());
    assert!(builder.is_full());
    assert!(builder.try_push(doc("b")).is_err());

    let chunk = builder.take().expect("a formed chunk");
    assert_eq!(chunk.len(), 1);
    assert_eq!(chunk.cumulative_bytes(), unit);
}

#[test]
fn bytes_accumulate_and_reset_on_take() {
    let unit = doc("a").serialized_len();
    let mut builder = ChunkBuilder::new(100, usize::MAX);
    assert_eq!(builder.bytes(), 0);
    assert!(builder.try_push(doc("a")).is_ok());
    assert!(builder.try_push(doc("b")).is_ok());
    assert_eq!(builder.bytes(), unit * 2);

    let chunk = builder.take().expect("a formed chunk");
    assert_eq!(chunk.cumulative_bytes(), unit * 2);
    assert_eq!(builder.bytes(), 0);
    assert!(builder.is_empty());
    assert!(builder.take().is_none());
}

#[test]
fn retry_loop_yields_full_then_partial_chunks() {
    let mut builder = ChunkBuilder::new(2, usize::MAX);
    let mut sizes = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        let mut document = doc(name);
        loop {
            match builder.try_push(document) {
                Ok(()) => break,
                Err(returned) => {
                    sizes.push(builder.take().expect("a formed chunk").len());
                    document = returned;
                }
            }
        }
    }
    if let Some(tail) = builder.take() {
        sizes.push(tail.len());
    }
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn chunk_exposes_its_documents() {
    let mut builder = ChunkBuilder::new(10, usize::MAX);
    builder.try_push(doc("a")).expect("fits");
    builder.try_push(doc("b")).expect("fits");

    let chunk = builder.take().expect("a formed chunk");
    let ids: Vec<&str> = chunk.iter().map(|d| d.id().as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(chunk.documents().len(), 2);
    assert_eq!(chunk.into_documents().len(), 2);
}

#[test]
#[should_panic(expected = "max_records must be positive")]
fn zero_record_bound_is_rejected() {
    let _ = ChunkBuilder::new(0, 1024);
}
