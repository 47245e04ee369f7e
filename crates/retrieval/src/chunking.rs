pub fn chunk_words(body: &str, chunk_size: usize) -> Vec<String> {
    let words = body.split_whitespace().collect::<Vec<_>>();

    words
        .chunks(chunk_size.max(1))
        .map(|window| window.join(" "))
        .collect()
}
